//! Update dispatcher.
//!
//! Routes private-chat messages to commands or the creation wizard and
//! button presses to the wizard. Replies go back to the chat they came from.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::BotCommand;
use crate::store::GiveawayStore;
use crate::telegram::html::escape;
use crate::telegram::keyboards::callback;
use crate::telegram::types::{CallbackQuery, Message};
use crate::telegram::{ChatTarget, InlineKeyboard, MessagingGateway, Reply, Update};
use crate::wizard::{CreationWizard, WizardAction, WizardInput};

const MAX_ERROR_CHARS: usize = 100;

const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";
const CANCELLED: &str = "❌ Action cancelled.\nUse /start to begin again.";
const DRAFT_EXPIRED: &str =
    "⌛ This draft is no longer active. Press \"Create giveaway\" to start over.";
const PING_OK: &str = "✅ Connection to Telegram is working.";

fn welcome(first_name: &str) -> String {
    format!(
        "👋 Hi, {}!\n\n\
         I help you run giveaways in Telegram.\n\n\
         🎯 What I can do:\n\
         • Create giveaways with conditions\n\
         • Check channel subscriptions\n\
         • Pick the winners automatically\n\
         • Publish the results\n\n\
         Press the button below to start! 🚀",
        escape(first_name)
    )
}

fn help() -> String {
    let mut lines = vec!["<b>Commands</b>".to_owned(), String::new()];
    lines.extend(
        BotCommand::all()
            .iter()
            .map(|cmd| format!("{cmd} - {}", cmd.description())),
    );
    lines.join("\n")
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Routes incoming updates.
pub struct Dispatcher<G, S> {
    gateway: Arc<G>,
    wizard: Arc<CreationWizard<G, S>>,
}

impl<G, S> Dispatcher<G, S>
where
    G: MessagingGateway,
    S: GiveawayStore,
{
    #[must_use]
    pub fn new(gateway: Arc<G>, wizard: Arc<CreationWizard<G, S>>) -> Self {
        Self { gateway, wizard }
    }

    /// Handles updates until the channel closes.
    ///
    /// Each update runs on its own task so one slow channel check does not
    /// hold up other chats. Updates from the same chat are chained: a task
    /// waits for the previous one from that chat before it starts.
    pub async fn run(self: Arc<Self>, mut updates: mpsc::Receiver<Update>) {
        info!("Dispatcher started");
        let mut tails: HashMap<i64, JoinHandle<()>> = HashMap::new();
        while let Some(update) = updates.recv().await {
            tails.retain(|_, tail| !tail.is_finished());

            let chat_id = update.chat_id();
            let previous = chat_id.and_then(|id| tails.remove(&id));
            let dispatcher = Arc::clone(&self);
            let handle = tokio::spawn(async move {
                if let Some(previous) = previous {
                    let _ = previous.await;
                }
                dispatcher.dispatch(update).await;
            });
            if let Some(chat_id) = chat_id {
                tails.insert(chat_id, handle);
            }
        }
        info!("Update channel closed, dispatcher stopped");
    }

    /// Handles a single update.
    pub async fn dispatch(&self, update: Update) {
        if let Some(query) = update.callback_query {
            self.on_callback(query).await;
        } else if let Some(message) = update.message {
            self.on_message(message).await;
        }
    }

    async fn on_message(&self, message: Message) {
        if !message.chat.is_private() {
            return;
        }
        let (Some(from), Some(text)) = (message.from, message.text) else {
            return;
        };
        let chat_id = message.chat.id;

        let replies = if let Some(command) = BotCommand::parse(&text) {
            debug!("Handling command {} from user {}", command, from.id);
            self.execute(command, chat_id, from.id, &from.first_name)
                .await
        } else {
            match self.wizard.handle(chat_id, WizardInput::Text(text)).await {
                Some(replies) => replies,
                None => {
                    debug!("Ignoring text outside a wizard in chat {}", chat_id);
                    Vec::new()
                }
            }
        };

        self.send_all(chat_id, replies).await;
    }

    async fn on_callback(&self, query: CallbackQuery) {
        if let Err(e) = self.gateway.answer_callback(&query.id).await {
            warn!("Failed to answer callback {}: {}", query.id, e);
        }

        let Some(message) = query.message else {
            return;
        };
        if !message.chat.is_private() {
            return;
        }
        let chat_id = message.chat.id;
        let data = query.data.unwrap_or_default();

        let replies = if data == callback::CREATE_GIVEAWAY {
            self.wizard.start(chat_id, query.from.id).await
        } else if let Some(action) = WizardAction::from_callback(&data) {
            self.wizard
                .handle(chat_id, WizardInput::Action(action))
                .await
                .unwrap_or_else(|| vec![Reply::text(DRAFT_EXPIRED)])
        } else {
            debug!("Unknown callback data {:?} in chat {}", data, chat_id);
            Vec::new()
        };

        self.send_all(chat_id, replies).await;
    }

    async fn execute(
        &self,
        command: BotCommand,
        chat_id: i64,
        user_id: i64,
        first_name: &str,
    ) -> Vec<Reply> {
        match command {
            BotCommand::Start => vec![Reply::with_keyboard(
                welcome(first_name),
                InlineKeyboard::create_giveaway(),
            )],
            BotCommand::Create => self.wizard.start(chat_id, user_id).await,
            BotCommand::Cancel => {
                if self.wizard.cancel(chat_id).await {
                    info!("Wizard cancelled in chat {}", chat_id);
                    vec![Reply::text(CANCELLED)]
                } else {
                    vec![Reply::text(NOTHING_TO_CANCEL)]
                }
            }
            BotCommand::Ping => match self.gateway.get_self().await {
                Ok(_) => vec![Reply::text(PING_OK)],
                Err(e) => {
                    warn!("Ping from chat {} failed: {}", chat_id, e);
                    let detail = truncate(&e.to_string(), MAX_ERROR_CHARS);
                    vec![Reply::text(format!("❌ Request failed: {}", escape(&detail)))]
                }
            },
            BotCommand::Help => vec![Reply::text(help())],
        }
    }

    async fn send_all(&self, chat_id: i64, replies: Vec<Reply>) {
        let chat = ChatTarget::Id(chat_id);
        for reply in replies {
            if let Err(e) = self
                .gateway
                .send_message(&chat, &reply.text, reply.keyboard.as_ref())
                .await
            {
                warn!("Failed to reply in chat {}: {}", chat_id, e);
            }
        }
    }
}

impl<G, S> std::fmt::Debug for Dispatcher<G, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}
