//! Giveaway Bot Library
//!
//! A Telegram bot that runs giveaways gated on channel subscriptions.
//!
//! This crate provides the core functionality for:
//! - Walking creators through a step-by-step giveaway wizard
//! - Verifying channel subscriptions and bot admin rights
//! - Registering participants from the web mini-app
//! - Closing expired giveaways, drawing winners and announcing them

pub mod api;
pub mod commands;
pub mod config;
pub mod eligibility;
pub mod registration;
pub mod scheduler;
pub mod store;
pub mod telegram;
pub mod wizard;

#[cfg(test)]
mod testing;
