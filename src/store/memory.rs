//! Process-local store, used with `--ephemeral` and in tests.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::{
    Giveaway, GiveawayId, GiveawayStatus, GiveawayStore, NewGiveaway, Participant, StoreError,
    Winner,
};
use crate::telegram::{MessageRef, UserId};

#[derive(Debug, Default)]
struct Tables {
    giveaways: Vec<Giveaway>,
    participants: Vec<Participant>,
    winners: Vec<Winner>,
}

impl Tables {
    fn giveaway_mut(&mut self, id: GiveawayId) -> Result<&mut Giveaway, StoreError> {
        self.giveaways
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}

/// Keeps every record in memory behind a single lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|e| StoreError::Backend(format!("store lock poisoned: {e}")))
    }
}

impl GiveawayStore for InMemoryStore {
    async fn create_giveaway(&self, new: NewGiveaway) -> Result<Giveaway, StoreError> {
        let now = Utc::now();
        new.validate(now).map_err(StoreError::InvalidRecord)?;

        let giveaway = new.into_giveaway(now);
        self.lock()?.giveaways.push(giveaway.clone());
        Ok(giveaway)
    }

    async fn giveaway(&self, id: GiveawayId) -> Result<Option<Giveaway>, StoreError> {
        Ok(self.lock()?.giveaways.iter().find(|g| g.id == id).cloned())
    }

    async fn giveaways_by_status(
        &self,
        status: GiveawayStatus,
    ) -> Result<Vec<Giveaway>, StoreError> {
        Ok(self
            .lock()?
            .giveaways
            .iter()
            .filter(|g| g.status == status)
            .cloned()
            .collect())
    }

    async fn set_published_message(
        &self,
        id: GiveawayId,
        message: MessageRef,
    ) -> Result<(), StoreError> {
        self.lock()?.giveaway_mut(id)?.published_message = Some(message);
        Ok(())
    }

    async fn add_participant(&self, participant: Participant) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let duplicate = tables.participants.iter().any(|p| {
            p.giveaway_id == participant.giveaway_id && p.user_id == participant.user_id
        });
        if duplicate {
            return Err(StoreError::UniqueViolation {
                giveaway_id: participant.giveaway_id,
                user_id: participant.user_id,
            });
        }
        tables.participants.push(participant);
        Ok(())
    }

    async fn participant(
        &self,
        id: GiveawayId,
        user_id: UserId,
    ) -> Result<Option<Participant>, StoreError> {
        Ok(self
            .lock()?
            .participants
            .iter()
            .find(|p| p.giveaway_id == id && p.user_id == user_id)
            .cloned())
    }

    async fn participants(&self, id: GiveawayId) -> Result<Vec<Participant>, StoreError> {
        Ok(self
            .lock()?
            .participants
            .iter()
            .filter(|p| p.giveaway_id == id)
            .cloned()
            .collect())
    }

    async fn winners(&self, id: GiveawayId) -> Result<Vec<Winner>, StoreError> {
        Ok(self
            .lock()?
            .winners
            .iter()
            .filter(|w| w.giveaway_id == id)
            .cloned()
            .collect())
    }

    async fn complete_giveaway(
        &self,
        id: GiveawayId,
        winners: Vec<Winner>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.lock()?;
        if !tables.giveaway_mut(id)?.is_active() {
            return Ok(false);
        }

        if !tables.winners.iter().any(|w| w.giveaway_id == id) {
            tables.winners.extend(winners);
        }
        tables.giveaway_mut(id)?.status = GiveawayStatus::Completed;
        Ok(true)
    }

    async fn pending_announcements(&self) -> Result<Vec<Giveaway>, StoreError> {
        Ok(self
            .lock()?
            .giveaways
            .iter()
            .filter(|g| g.status == GiveawayStatus::Completed && !g.results_announced)
            .cloned()
            .collect())
    }

    async fn mark_results_announced(&self, id: GiveawayId) -> Result<(), StoreError> {
        self.lock()?.giveaway_mut(id)?.results_announced = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::store::RequiredChannel;

    fn new_giveaway() -> NewGiveaway {
        NewGiveaway {
            owner_id: 1,
            title: "Title".to_owned(),
            prizes: "Prize".to_owned(),
            winner_count: 2,
            channels: vec![RequiredChannel::verified("@chan")],
            ends_at: Utc::now() + Duration::hours(1),
        }
    }

    fn participant(id: GiveawayId, user_id: UserId) -> Participant {
        Participant {
            giveaway_id: id,
            user_id,
            first_name: format!("User {user_id}"),
            username: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_active_status() {
        let store = InMemoryStore::new();
        let giveaway = store.create_giveaway(new_giveaway()).await.unwrap();
        assert!(giveaway.is_active());
        assert_eq!(store.giveaway(giveaway.id).await.unwrap(), Some(giveaway));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid() {
        let store = InMemoryStore::new();
        let mut new = new_giveaway();
        new.winner_count = 0;
        assert!(matches!(
            store.create_giveaway(new).await,
            Err(StoreError::InvalidRecord(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_participant_is_unique_violation() {
        let store = InMemoryStore::new();
        let giveaway = store.create_giveaway(new_giveaway()).await.unwrap();

        store.add_participant(participant(giveaway.id, 5)).await.unwrap();
        let err = store
            .add_participant(participant(giveaway.id, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { user_id: 5, .. }));
        assert_eq!(store.participants(giveaway.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_is_once_only() {
        let store = InMemoryStore::new();
        let giveaway = store.create_giveaway(new_giveaway()).await.unwrap();
        let p = participant(giveaway.id, 5);
        store.add_participant(p.clone()).await.unwrap();

        assert!(store
            .complete_giveaway(giveaway.id, vec![Winner::from(&p)])
            .await
            .unwrap());
        assert!(!store
            .complete_giveaway(giveaway.id, vec![Winner::from(&p)])
            .await
            .unwrap());

        assert_eq!(store.winners(giveaway.id).await.unwrap().len(), 1);
        assert!(store
            .giveaways_by_status(GiveawayStatus::Active)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_pending_announcements() {
        let store = InMemoryStore::new();
        let giveaway = store.create_giveaway(new_giveaway()).await.unwrap();
        assert!(store.pending_announcements().await.unwrap().is_empty());

        store.complete_giveaway(giveaway.id, vec![]).await.unwrap();
        assert_eq!(store.pending_announcements().await.unwrap().len(), 1);

        store.mark_results_announced(giveaway.id).await.unwrap();
        assert!(store.pending_announcements().await.unwrap().is_empty());
    }
}
