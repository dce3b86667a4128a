//! Command handling module.
//!
//! Parses slash commands and dispatches incoming updates from private
//! chats to the command handlers and the creation wizard.

mod handler;
mod types;

pub use handler::Dispatcher;
pub use types::BotCommand;
