//! HTTP endpoints used by the participation mini-app.

mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::post;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use routes::{PingRequest, PingResponse, VerifyRequest, VerifyResponse};

use crate::registration::RegistrationService;
use crate::store::GiveawayStore;
use crate::telegram::MessagingGateway;

/// Shared handler state.
pub struct ApiState<G, S> {
    pub gateway: Arc<G>,
    pub registration: Arc<RegistrationService<G, S>>,
}

/// Builds the API router.
pub fn router<G, S>(state: ApiState<G, S>) -> Router
where
    G: MessagingGateway,
    S: GiveawayStore,
{
    Router::new()
        .route("/api/verify", post(routes::verify::<G, S>))
        .route("/api/ping", post(routes::ping::<G, S>))
        .with_state(Arc::new(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use serde::de::DeserializeOwned;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::eligibility::EligibilityChecker;
    use crate::store::{Giveaway, InMemoryStore, NewGiveaway, RequiredChannel};
    use crate::telegram::{ChatTarget, TelegramError};
    use crate::testing::MockGateway;

    async fn setup() -> (Arc<MockGateway>, Arc<InMemoryStore>, Router, Giveaway) {
        let gateway = Arc::new(MockGateway::new());
        let store = Arc::new(InMemoryStore::new());
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

        let checker = Arc::new(EligibilityChecker::new(Arc::clone(&gateway)));
        let registration = Arc::new(RegistrationService::new(Arc::clone(&store), checker));
        let app = router(ApiState {
            gateway: Arc::clone(&gateway),
            registration,
        });
        (gateway, store, app, giveaway)
    }

    async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    fn parse<T: DeserializeOwned>(bytes: &[u8]) -> T {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_verify_registers_subscribed_user() {
        let (gateway, store, app, giveaway) = setup().await;
        gateway.allow("@one", 7);
        gateway.allow("@two", 7);
        let body = json!({
            "user_id": 7,
            "first_name": "Ann",
            "username": "ann",
            "draw_id": giveaway.id.to_string(),
        });

        let (status, bytes) = post_json(&app, "/api/verify", body.clone()).await;
        assert_eq!(status, StatusCode::OK);
        let response: VerifyResponse = parse(&bytes);
        assert!(response.success);
        assert_eq!(response.already_participating, Some(false));

        let (_, bytes) = post_json(&app, "/api/verify", body).await;
        let response: VerifyResponse = parse(&bytes);
        assert!(response.success);
        assert_eq!(response.already_participating, Some(true));

        let stored = store.participant(giveaway.id, 7).await.unwrap().unwrap();
        assert_eq!(stored.username.as_deref(), Some("ann"));
    }

    #[tokio::test]
    async fn test_verify_lists_missing_channels() {
        let (gateway, _, app, giveaway) = setup().await;
        gateway.allow("@two", 7);

        let (status, bytes) = post_json(
            &app,
            "/api/verify",
            json!({"user_id": 7, "first_name": "Ann", "draw_id": giveaway.id.to_string()}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let response: VerifyResponse = parse(&bytes);
        assert!(!response.success);
        assert_eq!(response.missing_channels, Some(vec!["@one".to_owned()]));
    }

    #[tokio::test]
    async fn test_verify_rejects_incomplete_and_unknown() {
        let (_, _, app, _) = setup().await;

        let (_, bytes) = post_json(&app, "/api/verify", json!({"user_id": 7})).await;
        let response: VerifyResponse = parse(&bytes);
        assert!(!response.success);
        assert_eq!(response.message, "Insufficient data");
        assert!(response.missing_channels.is_none());

        let (_, bytes) = post_json(
            &app,
            "/api/verify",
            json!({"user_id": 7, "first_name": "Ann", "draw_id": "nope"}),
        )
        .await;
        let response: VerifyResponse = parse(&bytes);
        assert_eq!(response.message, "Giveaway not found");
    }

    #[tokio::test]
    async fn test_ping() {
        let (gateway, _, app, _) = setup().await;

        let (status, bytes) = post_json(&app, "/api/ping", json!({"user_id": 7})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(parse::<PingResponse>(&bytes), PingResponse { ok: true });
        assert_eq!(gateway.sent_to(ChatTarget::Id(7)).len(), 1);

        let (_, bytes) = post_json(&app, "/api/ping", json!({})).await;
        assert_eq!(parse::<PingResponse>(&bytes), PingResponse { ok: false });
    }

    #[tokio::test]
    async fn test_ping_transport_error_is_500() {
        let (gateway, _, app, _) = setup().await;
        gateway.fail_sends_to("8", TelegramError::Transport("connection refused".to_owned()));

        let (status, bytes) = post_json(&app, "/api/ping", json!({"user_id": 8})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(String::from_utf8(bytes).unwrap().starts_with("bot error: "));
    }
}
