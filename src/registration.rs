//! Participant registration.
//!
//! Eligibility is re-checked on every attempt; nothing from the creation
//! wizard is trusted.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::eligibility::EligibilityChecker;
use crate::store::{GiveawayId, GiveawayStore, Participant, StoreError};
use crate::telegram::html::is_valid_handle;
use crate::telegram::{MessagingGateway, UserId};

/// The user asking to join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applicant {
    pub user_id: UserId,
    pub first_name: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    AlreadyRegistered,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Giveaway not found")]
    NotFound,

    #[error("Giveaway is already finished")]
    Closed,

    #[error("Not subscribed to: {}", .0.join(", "))]
    Ineligible(Vec<String>),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub struct RegistrationService<G, S> {
    store: Arc<S>,
    checker: Arc<EligibilityChecker<G>>,
}

impl<G, S> RegistrationService<G, S>
where
    G: MessagingGateway,
    S: GiveawayStore,
{
    #[must_use]
    pub fn new(store: Arc<S>, checker: Arc<EligibilityChecker<G>>) -> Self {
        Self { store, checker }
    }

    /// Registers `applicant` for giveaway `id`.
    ///
    /// Registering twice is not an error: the second call reports
    /// [`RegistrationOutcome::AlreadyRegistered`].
    pub async fn register(
        &self,
        id: GiveawayId,
        applicant: Applicant,
    ) -> Result<RegistrationOutcome, RegistrationError> {
        let giveaway = self
            .store
            .giveaway(id)
            .await?
            .ok_or(RegistrationError::NotFound)?;
        if !giveaway.is_active() {
            return Err(RegistrationError::Closed);
        }

        let report = self
            .checker
            .check_all(applicant.user_id, &giveaway.channel_usernames())
            .await;
        if !report.all_ok() {
            debug!(
                giveaway_id = %id,
                "User {} is missing {:?}",
                applicant.user_id,
                report.missing
            );
            return Err(RegistrationError::Ineligible(report.missing));
        }

        if self
            .store
            .participant(id, applicant.user_id)
            .await?
            .is_some()
        {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }

        let participant = Participant {
            giveaway_id: id,
            user_id: applicant.user_id,
            first_name: applicant.first_name,
            username: applicant.username.as_deref().and_then(public_handle),
        };
        match self.store.add_participant(participant).await {
            Ok(()) => {
                info!(giveaway_id = %id, "User {} registered", applicant.user_id);
                Ok(RegistrationOutcome::Registered)
            }
            Err(StoreError::UniqueViolation { .. }) => Ok(RegistrationOutcome::AlreadyRegistered),
            Err(e) => Err(e.into()),
        }
    }
}

/// The stored form of a client-supplied username, or `None` when it is not a
/// valid Telegram handle.
fn public_handle(raw: &str) -> Option<String> {
    let handle = raw.trim();
    let handle = handle.strip_prefix('@').unwrap_or(handle);
    is_valid_handle(handle).then(|| handle.to_owned())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::store::{Giveaway, InMemoryStore, NewGiveaway, RequiredChannel};
    use crate::telegram::MemberStatus;
    use crate::testing::{FailingStore, MockGateway, StaleLookupStore};

    fn applicant(user_id: UserId) -> Applicant {
        Applicant {
            user_id,
            first_name: "Ann".to_owned(),
            username: None,
        }
    }

    async fn setup() -> (
        Arc<MockGateway>,
        Arc<InMemoryStore>,
        RegistrationService<MockGateway, InMemoryStore>,
        Giveaway,
    ) {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(InMemoryStore::new());
        let checker = Arc::new(EligibilityChecker::new(Arc::clone(&gateway)));
        let giveaway = store
            .create_giveaway(NewGiveaway {
                owner_id: 1,
                title: "Title".to_owned(),
                prizes: "Prize".to_owned(),
                winner_count: 1,
                channels: vec![
                    RequiredChannel::verified("@one"),
                    RequiredChannel::verified("@two"),
                ],
                ends_at: Utc::now() + Duration::hours(1),
            })
            .await
            .unwrap();
        let service = RegistrationService::new(Arc::clone(&store), checker);
        (gateway, store, service, giveaway)
    }

    #[tokio::test]
    async fn test_register_twice() {
        let (gateway, store, service, giveaway) = setup().await;
        gateway.set_status("@one", 7, MemberStatus::Member);
        gateway.set_status("@two", 7, MemberStatus::Administrator);

        let first = service.register(giveaway.id, applicant(7)).await.unwrap();
        let second = service.register(giveaway.id, applicant(7)).await.unwrap();
        assert_eq!(first, RegistrationOutcome::Registered);
        assert_eq!(second, RegistrationOutcome::AlreadyRegistered);
        assert_eq!(store.participants(giveaway.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_channels_are_reported_in_order() {
        let (gateway, store, service, giveaway) = setup().await;
        gateway.set_status("@two", 7, MemberStatus::Member);

        let err = service
            .register(giveaway.id, applicant(7))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Ineligible(ref missing) if missing == &["@one"]));
        assert!(store.participants(giveaway.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_and_closed_giveaways() {
        let (gateway, store, service, giveaway) = setup().await;
        gateway.allow("@one", 7);
        gateway.allow("@two", 7);

        assert!(matches!(
            service.register(GiveawayId::new(), applicant(7)).await,
            Err(RegistrationError::NotFound)
        ));

        store.complete_giveaway(giveaway.id, vec![]).await.unwrap();
        assert!(matches!(
            service.register(giveaway.id, applicant(7)).await,
            Err(RegistrationError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced() {
        let gateway = Arc::new(MockGateway::new());
        let checker = Arc::new(EligibilityChecker::new(gateway));
        let service = RegistrationService::new(Arc::new(FailingStore), checker);

        assert!(matches!(
            service.register(GiveawayId::new(), applicant(7)).await,
            Err(RegistrationError::Store(_))
        ));
    }

    #[tokio::test]
    async fn test_insert_conflict_counts_as_already_registered() {
        let gateway = Arc::new(MockGateway::new());
        gateway.allow("@one", 7);
        let store = Arc::new(StaleLookupStore::default());
        let giveaway = store
            .create_giveaway(NewGiveaway {
                owner_id: 1,
                title: "Title".to_owned(),
                prizes: "Prize".to_owned(),
                winner_count: 1,
                channels: vec![RequiredChannel::verified("@one")],
                ends_at: Utc::now() + Duration::hours(1),
            })
            .await
            .unwrap();
        let checker = Arc::new(EligibilityChecker::new(gateway));
        let service = RegistrationService::new(Arc::clone(&store), checker);

        let first = service.register(giveaway.id, applicant(7)).await.unwrap();
        let second = service.register(giveaway.id, applicant(7)).await.unwrap();
        assert_eq!(first, RegistrationOutcome::Registered);
        assert_eq!(second, RegistrationOutcome::AlreadyRegistered);
        assert_eq!(store.participants(giveaway.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_usernames_are_stored_only_when_valid() {
        let (gateway, store, service, giveaway) = setup().await;
        for user_id in [7, 8, 9] {
            gateway.allow("@one", user_id);
            gateway.allow("@two", user_id);
        }

        let with_name = |user_id, username: &str| Applicant {
            username: Some(username.to_owned()),
            ..applicant(user_id)
        };
        service
            .register(giveaway.id, with_name(7, "x\"><i>pwn"))
            .await
            .unwrap();
        service
            .register(giveaway.id, with_name(8, "@ann_99"))
            .await
            .unwrap();
        service.register(giveaway.id, with_name(9, "")).await.unwrap();

        let usernames: Vec<_> = store
            .participants(giveaway.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| (p.user_id, p.username))
            .collect();
        assert_eq!(
            usernames,
            vec![(7, None), (8, Some("ann_99".to_owned())), (9, None)]
        );
    }
}
