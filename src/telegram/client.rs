//! Bot API client over HTTPS.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::gateway::{
    BotIdentity, ChatTarget, MemberStatus, MessageRef, MessagingGateway, TelegramError, UserId,
};
use super::keyboards::InlineKeyboard;
use super::types::{ApiResponse, ChatMember, Message, Update, User};
use crate::config::TelegramConfig;

/// Extra time on top of the long-poll timeout before the HTTP client gives up.
const HTTP_TIMEOUT_MARGIN: Duration = Duration::from_secs(15);

#[derive(Serialize)]
struct NoParams {}

#[derive(Serialize)]
struct GetChatMemberParams<'a> {
    chat_id: &'a ChatTarget,
    user_id: UserId,
}

#[derive(Serialize)]
struct LinkPreviewOptions {
    is_disabled: bool,
}

#[derive(Serialize)]
struct SendMessageParams<'a> {
    chat_id: &'a ChatTarget,
    text: &'a str,
    parse_mode: &'static str,
    link_preview_options: LinkPreviewOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboard>,
}

#[derive(Serialize)]
struct AnswerCallbackParams<'a> {
    callback_query_id: &'a str,
}

#[derive(Serialize)]
struct GetUpdatesParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: &'static [&'static str],
}

/// High-level Bot API client.
pub struct BotApi {
    client: Client,

    /// `https://api.telegram.org/bot<token>`; never logged.
    base_url: String,

    long_poll_timeout_secs: u64,
}

impl BotApi {
    /// Builds a client for the configured bot.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &TelegramConfig) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.long_poll_timeout_secs) + HTTP_TIMEOUT_MARGIN)
            .build()
            .map_err(|e| TelegramError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.method_base_url(),
            long_poll_timeout_secs: config.long_poll_timeout_secs,
        })
    }

    /// Invokes a Bot API method with a JSON body.
    async fn call<P, T>(&self, method: &str, params: &P) -> Result<T, TelegramError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{method}", self.base_url);

        // `without_url` keeps the bot token out of error messages.
        let response = self
            .client
            .post(&url)
            .json(params)
            .send()
            .await
            .map_err(|e| TelegramError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TelegramError::Decode(format!("{method}: {}", e.without_url())))?;

        let result = envelope.into_result(method, status.as_u16());
        if let Err(TelegramError::FloodWait(seconds)) = &result {
            warn!("Flood wait on {}: {} seconds", method, seconds);
        }
        result
    }

    /// Long-polls for updates starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or Telegram rejects it.
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdatesParams {
            offset,
            timeout: self.long_poll_timeout_secs,
            allowed_updates: &["message", "callback_query"],
        };
        self.call("getUpdates", &params).await
    }
}

impl MessagingGateway for BotApi {
    async fn get_chat_member(
        &self,
        chat: &ChatTarget,
        user: UserId,
    ) -> Result<MemberStatus, TelegramError> {
        let params = GetChatMemberParams {
            chat_id: chat,
            user_id: user,
        };
        let member: ChatMember = self.call("getChatMember", &params).await?;
        debug!("User {} in {}: {:?}", user, chat, member.status);
        Ok(member.status)
    }

    async fn send_message(
        &self,
        chat: &ChatTarget,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<MessageRef, TelegramError> {
        let params = SendMessageParams {
            chat_id: chat,
            text,
            parse_mode: "HTML",
            link_preview_options: LinkPreviewOptions { is_disabled: true },
            reply_markup: keyboard,
        };
        let message: Message = self.call("sendMessage", &params).await?;
        Ok(MessageRef {
            chat_id: message.chat.id,
            message_id: message.message_id,
        })
    }

    async fn get_self(&self) -> Result<BotIdentity, TelegramError> {
        let me: User = self.call("getMe", &NoParams {}).await?;
        Ok(BotIdentity {
            id: me.id,
            first_name: me.first_name,
            username: me.username,
        })
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), TelegramError> {
        let params = AnswerCallbackParams {
            callback_query_id: callback_id,
        };
        let _: bool = self.call("answerCallbackQuery", &params).await?;
        Ok(())
    }
}

impl std::fmt::Debug for BotApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotApi")
            .field("long_poll_timeout_secs", &self.long_poll_timeout_secs)
            .finish_non_exhaustive()
    }
}
