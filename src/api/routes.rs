use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::ApiState;
use crate::registration::{Applicant, RegistrationError, RegistrationOutcome};
use crate::store::{GiveawayId, GiveawayStore};
use crate::telegram::{ChatTarget, MessagingGateway, TelegramError};

const PING_TEXT: &str = "Mini-app and bot connection check!";

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub user_id: Option<i64>,
    pub first_name: Option<String>,
    pub username: Option<String>,
    pub draw_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_channels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_participating: Option<bool>,
}

impl VerifyResponse {
    fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_owned(),
            missing_channels: None,
            already_participating: None,
        }
    }

    fn joined(already: bool) -> Self {
        let message = if already {
            "You are already participating in the giveaway!"
        } else {
            "You have successfully registered for the giveaway!"
        };
        Self {
            success: true,
            message: message.to_owned(),
            missing_channels: None,
            already_participating: Some(already),
        }
    }
}

/// `POST /api/verify`: checks subscriptions and registers the user.
///
/// Business outcomes are always `200 OK`; the body carries the result.
pub async fn verify<G, S>(
    State(state): State<Arc<ApiState<G, S>>>,
    Json(req): Json<VerifyRequest>,
) -> Json<VerifyResponse>
where
    G: MessagingGateway,
    S: GiveawayStore,
{
    let (Some(user_id), Some(first_name), Some(draw_id)) = (
        req.user_id,
        req.first_name.filter(|n| !n.is_empty()),
        req.draw_id.filter(|d| !d.is_empty()),
    ) else {
        return Json(VerifyResponse::failure("Insufficient data"));
    };

    let Ok(id) = draw_id.parse::<GiveawayId>() else {
        return Json(VerifyResponse::failure("Giveaway not found"));
    };

    let applicant = Applicant {
        user_id,
        first_name,
        username: req.username.filter(|u| !u.is_empty()),
    };

    let response = match state.registration.register(id, applicant).await {
        Ok(RegistrationOutcome::Registered) => VerifyResponse::joined(false),
        Ok(RegistrationOutcome::AlreadyRegistered) => VerifyResponse::joined(true),
        Err(RegistrationError::NotFound) => VerifyResponse::failure("Giveaway not found"),
        Err(RegistrationError::Closed) => VerifyResponse::failure("The giveaway has already ended"),
        Err(RegistrationError::Ineligible(missing)) => VerifyResponse {
            missing_channels: Some(missing),
            ..VerifyResponse::failure("You are not subscribed to all required channels")
        },
        Err(RegistrationError::Store(e)) => {
            error!(giveaway_id = %id, "Registration of user {} failed: {}", user_id, e);
            VerifyResponse::failure("Registration failed, please try again later")
        }
    };
    Json(response)
}

#[derive(Debug, Deserialize)]
pub struct PingRequest {
    pub user_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PingResponse {
    pub ok: bool,
}

/// `POST /api/ping`: sends a connectivity message to the user.
pub async fn ping<G, S>(
    State(state): State<Arc<ApiState<G, S>>>,
    Json(req): Json<PingRequest>,
) -> Response
where
    G: MessagingGateway,
    S: GiveawayStore,
{
    let Some(user_id) = req.user_id else {
        return Json(PingResponse { ok: false }).into_response();
    };

    match state
        .gateway
        .send_message(&ChatTarget::Id(user_id), PING_TEXT, None)
        .await
    {
        Ok(_) => Json(PingResponse { ok: true }).into_response(),
        Err(e @ TelegramError::Api { .. }) => {
            warn!("Ping to user {} rejected: {}", user_id, e);
            Json(PingResponse { ok: false }).into_response()
        }
        Err(e) => {
            warn!("Ping to user {} failed: {}", user_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("bot error: {e}")).into_response()
        }
    }
}
