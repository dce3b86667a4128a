//! Telegram Bot API integration.
//!
//! Provides the [`MessagingGateway`] contract used by the giveaway logic,
//! its HTTPS implementation, inline keyboards, and the update poller.

mod client;
mod gateway;
pub mod html;
pub mod keyboards;
mod poller;
pub mod types;

pub use client::BotApi;
pub use gateway::{
    BotIdentity, ChatTarget, MemberStatus, MessageRef, MessagingGateway, Reply, TelegramError,
    UserId,
};
pub use keyboards::{InlineButton, InlineKeyboard};
pub use poller::UpdatePoller;
pub use types::Update;
