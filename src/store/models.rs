//! Giveaway, participant and winner records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::telegram::{MessageRef, UserId};

/// Store-assigned giveaway identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GiveawayId(Uuid);

impl GiveawayId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GiveawayId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GiveawayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for GiveawayId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GiveawayStatus {
    Active,
    Completed,
}

impl GiveawayStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// A channel participants must be subscribed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredChannel {
    /// Canonical `@handle`.
    pub username: String,
    pub is_verified: bool,
}

impl RequiredChannel {
    #[must_use]
    pub fn verified(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_verified: true,
        }
    }
}

/// A persisted giveaway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Giveaway {
    pub id: GiveawayId,
    pub owner_id: UserId,
    pub title: String,
    pub prizes: String,
    pub winner_count: u32,
    pub channels: Vec<RequiredChannel>,
    pub ends_at: DateTime<Utc>,
    pub status: GiveawayStatus,
    pub published_message: Option<MessageRef>,
    /// Set once the results message reached the channel.
    pub results_announced: bool,
    pub created_at: DateTime<Utc>,
}

impl Giveaway {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == GiveawayStatus::Active
    }

    /// Whether the end timestamp has been reached.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.ends_at
    }

    /// Channel the giveaway is announced in.
    #[must_use]
    pub fn announcement_channel(&self) -> Option<&str> {
        self.channels.first().map(|c| c.username.as_str())
    }

    /// Handles of every required channel, in creation order.
    #[must_use]
    pub fn channel_usernames(&self) -> Vec<String> {
        self.channels.iter().map(|c| c.username.clone()).collect()
    }
}

/// Fields for a giveaway about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGiveaway {
    pub owner_id: UserId,
    pub title: String,
    pub prizes: String,
    pub winner_count: u32,
    pub channels: Vec<RequiredChannel>,
    pub ends_at: DateTime<Utc>,
}

impl NewGiveaway {
    /// Checks the creation invariants.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), String> {
        if self.winner_count < 1 {
            return Err("winner count must be at least 1".to_owned());
        }
        if self.channels.is_empty() {
            return Err("at least one required channel is needed".to_owned());
        }
        if self.ends_at <= now {
            return Err("end date must be in the future".to_owned());
        }
        Ok(())
    }

    /// Materializes the record with a fresh id and `active` status.
    #[must_use]
    pub fn into_giveaway(self, now: DateTime<Utc>) -> Giveaway {
        Giveaway {
            id: GiveawayId::new(),
            owner_id: self.owner_id,
            title: self.title,
            prizes: self.prizes,
            winner_count: self.winner_count,
            channels: self.channels,
            ends_at: self.ends_at,
            status: GiveawayStatus::Active,
            published_message: None,
            results_announced: false,
            created_at: now,
        }
    }
}

/// A registered participant; unique per `(giveaway_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub giveaway_id: GiveawayId,
    pub user_id: UserId,
    pub first_name: String,
    pub username: Option<String>,
}

/// A drawn winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winner {
    pub giveaway_id: GiveawayId,
    pub user_id: UserId,
    pub first_name: String,
    pub username: Option<String>,
}

impl From<&Participant> for Winner {
    fn from(p: &Participant) -> Self {
        Self {
            giveaway_id: p.giveaway_id,
            user_id: p.user_id,
            first_name: p.first_name.clone(),
            username: p.username.clone(),
        }
    }
}
