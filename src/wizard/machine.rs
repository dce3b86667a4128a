//! Per-conversation creation sessions and their transitions.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::messages;
use super::state::{
    Draft, EndDateError, WizardState, normalize_channel, parse_end_date, parse_winner_count,
};
use crate::eligibility::EligibilityChecker;
use crate::store::{Giveaway, GiveawayStore};
use crate::telegram::keyboards::callback;
use crate::telegram::{ChatTarget, InlineKeyboard, MessagingGateway, Reply, UserId};

/// A wizard button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardAction {
    ConditionSubscription,
    RetryCheck,
    AddChannel,
    FinishChannels,
    Confirm,
    Cancel,
}

impl WizardAction {
    /// Maps a callback payload to an action.
    #[must_use]
    pub fn from_callback(data: &str) -> Option<Self> {
        match data {
            callback::CONDITION_SUBSCRIPTION => Some(Self::ConditionSubscription),
            callback::RETRY_CHECK => Some(Self::RetryCheck),
            callback::ADD_CHANNEL => Some(Self::AddChannel),
            callback::FINISH_CHANNELS => Some(Self::FinishChannels),
            callback::CONFIRM_CREATE => Some(Self::Confirm),
            callback::CANCEL_CREATE => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// One inbound event for a running wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardInput {
    Text(String),
    Action(WizardAction),
}

#[derive(Debug)]
struct WizardSession {
    owner_id: UserId,
    state: WizardState,
    draft: Draft,
}

type SessionHandle = Arc<Mutex<WizardSession>>;

/// Drives giveaway creation conversations, one session per chat.
///
/// The outer map lock is never held across an await; each session has its
/// own lock so a slow channel check only blocks its own conversation.
pub struct CreationWizard<G, S> {
    gateway: Arc<G>,
    store: Arc<S>,
    checker: Arc<EligibilityChecker<G>>,
    webapp_url: String,
    offset: FixedOffset,
    sessions: Mutex<HashMap<i64, SessionHandle>>,
}

impl<G, S> CreationWizard<G, S>
where
    G: MessagingGateway,
    S: GiveawayStore,
{
    #[must_use]
    pub fn new(
        gateway: Arc<G>,
        store: Arc<S>,
        checker: Arc<EligibilityChecker<G>>,
        webapp_url: String,
        offset: FixedOffset,
    ) -> Self {
        Self {
            gateway,
            store,
            checker,
            webapp_url,
            offset,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Starts (or restarts) a wizard in `chat_id` and returns the first prompt.
    pub async fn start(&self, chat_id: i64, owner_id: UserId) -> Vec<Reply> {
        let session = WizardSession {
            owner_id,
            state: WizardState::Title,
            draft: Draft::default(),
        };
        let replaced = self
            .sessions
            .lock()
            .await
            .insert(chat_id, Arc::new(Mutex::new(session)));
        if replaced.is_some() {
            debug!("Restarted wizard in chat {}", chat_id);
        }
        vec![Reply::text(messages::STEP_TITLE)]
    }

    /// Global cancel. Returns `false` when no wizard was running.
    pub async fn cancel(&self, chat_id: i64) -> bool {
        let Some(handle) = self.sessions.lock().await.remove(&chat_id) else {
            return false;
        };
        let mut session = handle.lock().await;
        if session.state.is_terminal() {
            return false;
        }
        session.state = WizardState::Cancelled;
        true
    }

    /// Current state of the wizard in `chat_id`, if one is running.
    pub async fn state_of(&self, chat_id: i64) -> Option<WizardState> {
        let handle = self.sessions.lock().await.get(&chat_id).cloned()?;
        let state = handle.lock().await.state.clone();
        Some(state)
    }

    /// Feeds one message or button press to the wizard in `chat_id`.
    ///
    /// Returns `None` when no wizard is running there.
    pub async fn handle(&self, chat_id: i64, input: WizardInput) -> Option<Vec<Reply>> {
        let handle = self.sessions.lock().await.get(&chat_id).cloned()?;
        let mut session = handle.lock().await;
        if session.state.is_terminal() {
            return None;
        }

        let replies = self.step(&mut session, input).await;

        if session.state.is_terminal() {
            let mut sessions = self.sessions.lock().await;
            if sessions
                .get(&chat_id)
                .is_some_and(|current| Arc::ptr_eq(current, &handle))
            {
                sessions.remove(&chat_id);
            }
        }
        Some(replies)
    }

    async fn step(&self, session: &mut WizardSession, input: WizardInput) -> Vec<Reply> {
        let state = session.state.clone();
        match (state, input) {
            (WizardState::Title, WizardInput::Text(text)) => {
                let Some(title) = non_empty(&text) else {
                    return vec![Reply::text(messages::EMPTY_TEXT)];
                };
                session.draft.title = title;
                session.state = WizardState::Prizes;
                vec![Reply::text(messages::STEP_PRIZES)]
            }
            (WizardState::Prizes, WizardInput::Text(text)) => {
                let Some(prizes) = non_empty(&text) else {
                    return vec![Reply::text(messages::EMPTY_TEXT)];
                };
                session.draft.prizes = prizes;
                session.state = WizardState::WinnerCount;
                vec![Reply::text(messages::STEP_WINNER_COUNT)]
            }
            (WizardState::WinnerCount, WizardInput::Text(text)) => {
                match parse_winner_count(&text) {
                    Some(count) => {
                        session.draft.winner_count = count;
                        session.state = WizardState::Conditions;
                        vec![Reply::with_keyboard(
                            messages::STEP_CONDITIONS,
                            InlineKeyboard::conditions(),
                        )]
                    }
                    None => vec![Reply::text(messages::INVALID_WINNER_COUNT)],
                }
            }
            (WizardState::Conditions, WizardInput::Action(WizardAction::ConditionSubscription)) => {
                session.draft.channels.clear();
                session.state = WizardState::ChannelInput;
                vec![Reply::text(messages::STEP_CHANNEL)]
            }
            (
                WizardState::ChannelInput | WizardState::ChannelVerifying { .. },
                WizardInput::Text(text),
            ) => {
                if text.trim().is_empty() {
                    return vec![Reply::text(messages::EMPTY_TEXT)];
                }
                self.verify_channel(session, normalize_channel(&text), false)
                    .await
            }
            (
                WizardState::ChannelVerifying { channel },
                WizardInput::Action(WizardAction::RetryCheck),
            ) => self.verify_channel(session, channel, true).await,
            (WizardState::MoreChannels, WizardInput::Action(WizardAction::AddChannel)) => {
                session.state = WizardState::ChannelInput;
                vec![Reply::text(messages::NEXT_CHANNEL)]
            }
            (WizardState::MoreChannels, WizardInput::Action(WizardAction::FinishChannels)) => {
                if session.draft.has_verified_channel() {
                    session.state = WizardState::EndDate;
                    vec![Reply::text(messages::STEP_END_DATE)]
                } else {
                    session.state = WizardState::ChannelInput;
                    vec![
                        Reply::text(messages::NEED_CHANNEL),
                        Reply::text(messages::STEP_CHANNEL),
                    ]
                }
            }
            (WizardState::EndDate, WizardInput::Text(text)) => {
                match parse_end_date(&text, self.offset, Utc::now()) {
                    Ok(ends_at) => {
                        session.draft.ends_at = Some(ends_at);
                        session.state = WizardState::Confirming;
                        vec![Reply::with_keyboard(
                            messages::preview(&session.draft, ends_at, self.offset),
                            InlineKeyboard::confirm(),
                        )]
                    }
                    Err(EndDateError::Format) => {
                        vec![Reply::text(messages::INVALID_DATE_FORMAT)]
                    }
                    Err(EndDateError::NotInFuture) => {
                        vec![Reply::text(messages::DATE_NOT_IN_FUTURE)]
                    }
                }
            }
            (WizardState::Confirming, WizardInput::Action(WizardAction::Confirm)) => {
                self.confirm(session).await
            }
            (WizardState::Confirming, WizardInput::Action(WizardAction::Cancel)) => {
                session.state = WizardState::Cancelled;
                vec![Reply::text(messages::CANCELLED)]
            }
            (state, _) => reprompt(&state),
        }
    }

    async fn verify_channel(
        &self,
        session: &mut WizardSession,
        channel: String,
        retry: bool,
    ) -> Vec<Reply> {
        if session.draft.has_channel(&channel) {
            session.state = WizardState::MoreChannels;
            return vec![
                Reply::text(messages::duplicate_channel(&channel)),
                more_channels_prompt(),
            ];
        }

        let mut replies = vec![Reply::text(messages::checking_channel(&channel))];
        let requirements = self
            .checker
            .check_requirements(session.owner_id, &channel)
            .await;

        if !requirements.member_ok {
            replies.push(Reply::with_keyboard(
                messages::not_subscribed(&channel, retry),
                InlineKeyboard::retry_check(),
            ));
            session.state = WizardState::ChannelVerifying { channel };
        } else if !requirements.bot_admin_ok {
            replies.push(Reply::with_keyboard(
                messages::bot_not_admin(&channel, retry),
                InlineKeyboard::retry_check(),
            ));
            session.state = WizardState::ChannelVerifying { channel };
        } else {
            session.draft.add_channel(&channel);
            debug!("Channel {} verified for user {}", channel, session.owner_id);
            replies.push(Reply::text(messages::channel_added(
                &channel,
                session.draft.channels.len(),
            )));
            replies.push(more_channels_prompt());
            session.state = WizardState::MoreChannels;
        }
        replies
    }

    async fn confirm(&self, session: &mut WizardSession) -> Vec<Reply> {
        let now = Utc::now();
        let new = match session.draft.to_new_giveaway(session.owner_id) {
            Some(new) if new.ends_at > now => new,
            _ => {
                session.state = WizardState::EndDate;
                return vec![
                    Reply::text(messages::DATE_NOT_IN_FUTURE),
                    Reply::text(messages::STEP_END_DATE),
                ];
            }
        };

        let giveaway = match self.store.create_giveaway(new).await {
            Ok(giveaway) => giveaway,
            Err(e) => {
                error!("Failed to save giveaway for user {}: {}", session.owner_id, e);
                return vec![Reply::with_keyboard(
                    messages::SAVE_FAILED,
                    InlineKeyboard::confirm(),
                )];
            }
        };

        info!(
            giveaway_id = %giveaway.id,
            owner_id = session.owner_id,
            "Giveaway created"
        );
        session.state = WizardState::Done;
        vec![Reply::text(self.publish(&giveaway).await)]
    }

    /// Posts the giveaway to its first channel and reports back to the creator.
    ///
    /// A failed post leaves the giveaway active and joinable.
    async fn publish(&self, giveaway: &Giveaway) -> String {
        let Some(channel) = giveaway.announcement_channel() else {
            return messages::publish_failed(giveaway, "-");
        };

        let link = messages::participate_link(&self.webapp_url, giveaway.id);
        let keyboard = InlineKeyboard::participate(&link);
        let text = messages::announcement(giveaway, self.offset);

        match self
            .gateway
            .send_message(&ChatTarget::from(channel), &text, Some(&keyboard))
            .await
        {
            Ok(message) => {
                if let Err(e) = self.store.set_published_message(giveaway.id, message).await {
                    warn!(giveaway_id = %giveaway.id, "Failed to record published message: {}", e);
                }
                messages::created(giveaway, channel, self.offset)
            }
            Err(e) => {
                warn!(giveaway_id = %giveaway.id, "Failed to publish to {}: {}", channel, e);
                messages::publish_failed(giveaway, channel)
            }
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn more_channels_prompt() -> Reply {
    Reply::with_keyboard(messages::MORE_CHANNELS, InlineKeyboard::more_channels())
}

/// Repeats the current step's prompt after unexpected input.
fn reprompt(state: &WizardState) -> Vec<Reply> {
    let reply = match state {
        WizardState::Title => Reply::text(messages::STEP_TITLE),
        WizardState::Prizes => Reply::text(messages::STEP_PRIZES),
        WizardState::WinnerCount => Reply::text(messages::STEP_WINNER_COUNT),
        WizardState::Conditions => {
            Reply::with_keyboard(messages::STEP_CONDITIONS, InlineKeyboard::conditions())
        }
        WizardState::ChannelInput => Reply::text(messages::STEP_CHANNEL),
        WizardState::ChannelVerifying { channel } => Reply::with_keyboard(
            messages::checking_channel(channel),
            InlineKeyboard::retry_check(),
        ),
        WizardState::MoreChannels => more_channels_prompt(),
        WizardState::EndDate => Reply::text(messages::STEP_END_DATE),
        WizardState::Confirming => {
            Reply::with_keyboard(messages::USE_BUTTONS, InlineKeyboard::confirm())
        }
        WizardState::Done | WizardState::Cancelled => return Vec::new(),
    };
    vec![reply]
}
