//! Subscription and admin checks against the messaging gateway.
//!
//! The checker is fail-closed: a gateway error never grants access. Callers
//! only see booleans, but the [`MembershipCheck`] outcome keeps "checked,
//! not eligible" apart from "check failed" in the logs.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::telegram::{ChatTarget, MemberStatus, MessagingGateway, TelegramError, UserId};

/// Result of a single role lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipCheck {
    Granted(MemberStatus),
    Denied(MemberStatus),
    Failed(TelegramError),
}

impl MembershipCheck {
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// Both conditions a channel must meet before the wizard accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRequirements {
    pub member_ok: bool,
    pub bot_admin_ok: bool,
}

impl ChannelRequirements {
    #[must_use]
    pub const fn all_ok(self) -> bool {
        self.member_ok && self.bot_admin_ok
    }
}

/// Channels a user is not subscribed to, in the order they were asked about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EligibilityReport {
    pub missing: Vec<String>,
}

impl EligibilityReport {
    #[must_use]
    pub fn all_ok(&self) -> bool {
        self.missing.is_empty()
    }
}

pub struct EligibilityChecker<G> {
    gateway: Arc<G>,
    bot_id: OnceCell<UserId>,
}

impl<G: MessagingGateway> EligibilityChecker<G> {
    #[must_use]
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            bot_id: OnceCell::new(),
        }
    }

    async fn probe(
        &self,
        channel: &str,
        user: UserId,
        accept: fn(MemberStatus) -> bool,
    ) -> MembershipCheck {
        let chat = ChatTarget::from(channel);
        match self.gateway.get_chat_member(&chat, user).await {
            Ok(status) if accept(status) => MembershipCheck::Granted(status),
            Ok(status) => {
                debug!("User {} in {} has status {:?}", user, channel, status);
                MembershipCheck::Denied(status)
            }
            Err(e) => {
                warn!("Membership check for user {} in {} failed: {}", user, channel, e);
                MembershipCheck::Failed(e)
            }
        }
    }

    /// Looks up whether `user` is subscribed to `channel`.
    pub async fn check_member(&self, user: UserId, channel: &str) -> MembershipCheck {
        self.probe(channel, user, MemberStatus::is_subscribed).await
    }

    /// Looks up whether the bot account administers `channel`.
    pub async fn check_bot_admin(&self, channel: &str) -> MembershipCheck {
        let bot_id = self
            .bot_id
            .get_or_try_init(|| async { self.gateway.get_self().await.map(|me| me.id) })
            .await;

        match bot_id {
            Ok(&id) => self.probe(channel, id, MemberStatus::is_admin).await,
            Err(e) => {
                warn!("Could not resolve bot identity: {}", e);
                MembershipCheck::Failed(e)
            }
        }
    }

    pub async fn is_member(&self, user: UserId, channel: &str) -> bool {
        self.check_member(user, channel).await.passed()
    }

    pub async fn is_bot_admin(&self, channel: &str) -> bool {
        self.check_bot_admin(channel).await.passed()
    }

    /// Runs both channel checks concurrently, without short-circuiting.
    pub async fn check_requirements(&self, user: UserId, channel: &str) -> ChannelRequirements {
        let (member_ok, bot_admin_ok) =
            tokio::join!(self.is_member(user, channel), self.is_bot_admin(channel));
        ChannelRequirements {
            member_ok,
            bot_admin_ok,
        }
    }

    /// Checks `user` against every channel; `missing` follows `channels` order.
    pub async fn check_all(&self, user: UserId, channels: &[String]) -> EligibilityReport {
        let results = join_all(channels.iter().map(|c| self.is_member(user, c))).await;

        let missing = channels
            .iter()
            .zip(results)
            .filter(|(_, ok)| !ok)
            .map(|(channel, _)| channel.clone())
            .collect();

        EligibilityReport { missing }
    }
}
