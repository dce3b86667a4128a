//! The narrow messaging-platform contract the giveaway logic depends on.
//!
//! Everything outside `telegram` talks to Telegram through
//! [`MessagingGateway`], so eligibility checks, the wizard and the
//! scheduler can run against a scripted gateway in tests.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::keyboards::InlineKeyboard;

/// Telegram user identifier.
pub type UserId = i64;

/// Errors that can occur during Telegram operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelegramError {
    #[error("Bot API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Connection error: {0}")]
    Transport(String),

    #[error("Unexpected Bot API response: {0}")]
    Decode(String),
}

/// Where a message or membership query is addressed.
///
/// Serializes the way the Bot API expects `chat_id`: a bare integer or an
/// `@username` string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ChatTarget {
    Id(i64),
    Username(String),
}

impl From<i64> for ChatTarget {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<&str> for ChatTarget {
    fn from(username: &str) -> Self {
        Self::Username(username.to_owned())
    }
}

impl From<String> for ChatTarget {
    fn from(username: String) -> Self {
        Self::Username(username)
    }
}

impl fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => f.write_str(name),
        }
    }
}

/// A user's role in a chat as reported by `getChatMember`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
    #[serde(other)]
    Unknown,
}

impl MemberStatus {
    /// Subscribed in the giveaway sense: creator, administrator or member.
    #[must_use]
    pub const fn is_subscribed(self) -> bool {
        matches!(self, Self::Creator | Self::Administrator | Self::Member)
    }

    /// Holds admin rights: creator or administrator.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Creator | Self::Administrator)
    }
}

/// Reference to a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

/// The bot's own account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: UserId,
    pub first_name: String,
    pub username: Option<String>,
}

/// A text message with an optional inline keyboard, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<InlineKeyboard>,
}

impl Reply {
    /// Plain text reply.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    /// Reply with buttons attached.
    #[must_use]
    pub fn with_keyboard(text: impl Into<String>, keyboard: InlineKeyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// Operations the bot needs from the messaging platform.
pub trait MessagingGateway: Send + Sync + 'static {
    /// Looks up `user`'s role in `chat`.
    fn get_chat_member(
        &self,
        chat: &ChatTarget,
        user: UserId,
    ) -> impl Future<Output = Result<MemberStatus, TelegramError>> + Send;

    /// Sends an HTML-formatted message, optionally with inline buttons.
    fn send_message(
        &self,
        chat: &ChatTarget,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> impl Future<Output = Result<MessageRef, TelegramError>> + Send;

    /// Returns the bot's own identity.
    fn get_self(&self) -> impl Future<Output = Result<BotIdentity, TelegramError>> + Send;

    /// Acknowledges a button press so the client stops its spinner.
    fn answer_callback(
        &self,
        callback_id: &str,
    ) -> impl Future<Output = Result<(), TelegramError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_status_roles() {
        assert!(MemberStatus::Creator.is_subscribed());
        assert!(MemberStatus::Member.is_subscribed());
        assert!(!MemberStatus::Restricted.is_subscribed());
        assert!(!MemberStatus::Left.is_subscribed());

        assert!(MemberStatus::Administrator.is_admin());
        assert!(!MemberStatus::Member.is_admin());
    }

    #[test]
    fn test_member_status_unknown_value() {
        let status: MemberStatus = serde_json::from_str("\"owner\"").unwrap();
        assert_eq!(status, MemberStatus::Unknown);

        let status: MemberStatus = serde_json::from_str("\"kicked\"").unwrap();
        assert_eq!(status, MemberStatus::Kicked);
    }

    #[test]
    fn test_chat_target_serialization() {
        assert_eq!(serde_json::to_string(&ChatTarget::from(42)).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&ChatTarget::from("@news")).unwrap(),
            "\"@news\""
        );
    }
}
