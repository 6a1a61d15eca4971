//! services/api/src/web/webhook.rs
//!
//! The endpoint the wppconnect sidecar posts its events to. It carries no user
//! session; instead the sidecar was registered with a webhook URL holding the
//! shared `?token=`, and any call without it is refused before it reaches the
//! session.

use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

#[derive(Deserialize)]
pub struct WebhookQuery {
    pub token: Option<String>,
}

#[derive(Serialize)]
pub struct WebhookAck {
    pub accepted: bool,
}

#[utoipa::path(
    post,
    path = "/webhooks/wppconnect",
    params(("token" = String, Query, description = "Shared webhook token")),
    responses(
        (status = 200, description = "Event received; `accepted` is false when it was not forwarded"),
        (status = 401, description = "Missing or wrong webhook token")
    )
)]
pub async fn wppconnect_webhook_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WebhookQuery>,
    Json(payload): Json<Value>,
) -> Result<Json<WebhookAck>, StatusCode> {
    match query.token {
        Some(token) if token == state.config.webhook_token => Ok(Json(WebhookAck {
            accepted: state.webhooks.relay(&payload),
        })),
        _ => {
            warn!("Rejected a webhook call with a missing or wrong token");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
