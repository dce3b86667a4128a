//! Bot API wire types (the subset of fields the bot reads).

use serde::Deserialize;

use super::gateway::{MemberStatus, TelegramError};

/// An incoming update from `getUpdates`.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

impl Update {
    /// The chat this update belongs to, if any.
    #[must_use]
    pub fn chat_id(&self) -> Option<i64> {
        match (&self.message, &self.callback_query) {
            (Some(message), _) => Some(message.chat.id),
            (None, Some(query)) => query.message.as_ref().map(|m| m.chat.id),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Chat {
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.kind == "private"
    }
}

/// A button press on an inline keyboard.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    pub status: MemberStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseParameters {
    #[serde(default)]
    pub retry_after: Option<u32>,
}

/// The `{ok, result, description, ...}` envelope every method returns.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

impl<T> ApiResponse<T> {
    /// Unwraps the envelope, mapping rate limits to [`TelegramError::FloodWait`].
    pub fn into_result(self, method: &str, http_status: u16) -> Result<T, TelegramError> {
        if self.ok {
            return self
                .result
                .ok_or_else(|| TelegramError::Decode(format!("{method}: missing result")));
        }

        if let Some(seconds) = self.parameters.and_then(|p| p.retry_after) {
            return Err(TelegramError::FloodWait(seconds));
        }

        Err(TelegramError::Api {
            code: self.error_code.unwrap_or_else(|| i64::from(http_status)),
            description: self.description.unwrap_or_default(),
        })
    }
}
