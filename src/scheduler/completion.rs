//! Winner draw, completion and results announcement for one giveaway.

use std::fmt::Write as _;
use std::sync::Arc;

use rand::Rng;
use rand::seq::index::sample;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::{Giveaway, GiveawayStore, Participant, StoreError, Winner};
use crate::telegram::html::{escape, user_mention};
use crate::telegram::{ChatTarget, MessagingGateway};

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// This run moved the giveaway to `completed`.
    Completed { winners: usize, announced: bool },
    /// Another run got there first; nothing was written.
    AlreadyCompleted,
}

/// Draws `min(count, participants.len())` distinct participants uniformly.
pub fn select_winners<R: Rng + ?Sized>(
    participants: &[Participant],
    count: u32,
    rng: &mut R,
) -> Vec<Winner> {
    let amount = participants
        .len()
        .min(usize::try_from(count).unwrap_or(usize::MAX));
    sample(rng, participants.len(), amount)
        .into_iter()
        .map(|i| Winner::from(&participants[i]))
        .collect()
}

/// Results post for the announcement channel.
#[must_use]
pub fn format_results(giveaway: &Giveaway, winners: &[Winner]) -> String {
    if winners.is_empty() {
        return format!(
            "🎉 Giveaway \"{}\" has ended!\n\n❌ Unfortunately, there were no participants.",
            escape(&giveaway.title)
        );
    }

    let mut text = format!(
        "🏆 <b>Giveaway \"{}\" has ended!</b>\n\n🎁 <b>Prizes:</b>\n{}\n\n🎉 <b>Winners:</b>\n\n",
        escape(&giveaway.title),
        escape(&giveaway.prizes)
    );
    for (i, winner) in winners.iter().enumerate() {
        let _ = writeln!(
            text,
            "{}. {}",
            i + 1,
            user_mention(&winner.first_name, winner.username.as_deref())
        );
    }
    text.push_str("\n🎊 Congratulations to the winners!");
    text
}

pub struct CompletionProcess<G, S> {
    gateway: Arc<G>,
    store: Arc<S>,
}

impl<G, S> CompletionProcess<G, S>
where
    G: MessagingGateway,
    S: GiveawayStore,
{
    #[must_use]
    pub fn new(gateway: Arc<G>, store: Arc<S>) -> Self {
        Self { gateway, store }
    }

    /// Completes a due giveaway and announces the result.
    ///
    /// Winners already stored for the giveaway are reused instead of drawn
    /// again. A failed announcement does not fail the completion; it is
    /// retried through [`Self::announce_pending`].
    pub async fn complete(&self, giveaway: &Giveaway) -> Result<CompletionOutcome, CompletionError> {
        let id = giveaway.id;

        let mut winners = self.store.winners(id).await?;
        if winners.is_empty() {
            let participants = self.store.participants(id).await?;
            debug!(giveaway_id = %id, "Drawing from {} participants", participants.len());
            winners = select_winners(&participants, giveaway.winner_count, &mut rand::rng());
        } else {
            info!(giveaway_id = %id, "Reusing {} stored winners", winners.len());
        }

        if !self.store.complete_giveaway(id, winners).await? {
            return Ok(CompletionOutcome::AlreadyCompleted);
        }

        let winners = self.store.winners(id).await?;
        let announced = self.announce(giveaway, &winners).await;
        Ok(CompletionOutcome::Completed {
            winners: winners.len(),
            announced,
        })
    }

    /// Re-sends the results of a completed giveaway that was never announced.
    pub async fn announce_pending(&self, giveaway: &Giveaway) -> Result<bool, CompletionError> {
        let winners = self.store.winners(giveaway.id).await?;
        Ok(self.announce(giveaway, &winners).await)
    }

    async fn announce(&self, giveaway: &Giveaway, winners: &[Winner]) -> bool {
        let Some(channel) = giveaway.announcement_channel() else {
            warn!(giveaway_id = %giveaway.id, "Giveaway has no channel to announce in");
            return false;
        };

        let text = format_results(giveaway, winners);
        if let Err(e) = self
            .gateway
            .send_message(&ChatTarget::from(channel), &text, None)
            .await
        {
            warn!(giveaway_id = %giveaway.id, "Failed to announce results in {}: {}", channel, e);
            return false;
        }

        if let Err(e) = self.store.mark_results_announced(giveaway.id).await {
            warn!(giveaway_id = %giveaway.id, "Failed to record announcement: {}", e);
        }
        true
    }
}
