//! Giveaway store.
//!
//! CRUD-style access to the three record collections (giveaways,
//! participants, winners). Business rules live in the callers; the store
//! only enforces creation invariants and participant uniqueness.

mod memory;
mod models;
mod sqlite;

use std::future::Future;

use thiserror::Error;

pub use memory::InMemoryStore;
pub use models::{
    Giveaway, GiveawayId, GiveawayStatus, NewGiveaway, Participant, RequiredChannel, Winner,
};
pub use sqlite::SqliteStore;

use crate::telegram::{MessageRef, UserId};

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The `(giveaway, user)` pair is already registered.
    #[error("Participant {user_id} is already registered for giveaway {giveaway_id}")]
    UniqueViolation {
        giveaway_id: GiveawayId,
        user_id: UserId,
    },

    #[error("Giveaway not found: {0}")]
    NotFound(GiveawayId),

    #[error("Invalid giveaway: {0}")]
    InvalidRecord(String),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Backend(format!("corrupt channel list: {err}"))
    }
}

/// Row-store operations used by the wizard, registration and scheduler.
pub trait GiveawayStore: Send + Sync + 'static {
    /// Inserts a new active giveaway and returns it with its assigned id.
    fn create_giveaway(
        &self,
        new: NewGiveaway,
    ) -> impl Future<Output = Result<Giveaway, StoreError>> + Send;

    fn giveaway(
        &self,
        id: GiveawayId,
    ) -> impl Future<Output = Result<Option<Giveaway>, StoreError>> + Send;

    fn giveaways_by_status(
        &self,
        status: GiveawayStatus,
    ) -> impl Future<Output = Result<Vec<Giveaway>, StoreError>> + Send;

    /// Records where the giveaway was published.
    fn set_published_message(
        &self,
        id: GiveawayId,
        message: MessageRef,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Inserts a participant; a duplicate yields [`StoreError::UniqueViolation`].
    fn add_participant(
        &self,
        participant: Participant,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn participant(
        &self,
        id: GiveawayId,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<Participant>, StoreError>> + Send;

    /// All participants in registration order.
    fn participants(
        &self,
        id: GiveawayId,
    ) -> impl Future<Output = Result<Vec<Participant>, StoreError>> + Send;

    fn winners(&self, id: GiveawayId)
    -> impl Future<Output = Result<Vec<Winner>, StoreError>> + Send;

    /// Atomically stores the winner batch and marks the giveaway completed.
    ///
    /// Returns `false` without writing anything when the giveaway is no
    /// longer active. Winners are only inserted if none exist yet.
    fn complete_giveaway(
        &self,
        id: GiveawayId,
        winners: Vec<Winner>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Completed giveaways whose results message has not been delivered.
    fn pending_announcements(&self)
    -> impl Future<Output = Result<Vec<Giveaway>, StoreError>> + Send;

    fn mark_results_announced(
        &self,
        id: GiveawayId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
