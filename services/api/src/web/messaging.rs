//! services/api/src/web/messaging.rs
//!
//! Outbound messaging endpoints: bulk campaign sends, single reminders and the
//! sent-campaign ledger reset.

use crate::error::reject;
use crate::outreach::{CampaignSend, Recipient};
use crate::web::state::AppState;
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use outreach_core::phone;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
pub struct RecipientPayload {
    pub name: String,
    pub phone: String,
    pub title: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagesRequest {
    pub contacts: Vec<RecipientPayload>,
    /// May contain `{{name}}` and `{{title}}` placeholders.
    pub message: String,
    pub campaign_id: Option<String>,
    pub campaign_name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SendMessagesResponse {
    pub message: String,
    pub success: usize,
    pub failed: usize,
    pub duplicate: bool,
}

#[derive(Deserialize, ToSchema)]
pub struct SendReminderRequest {
    pub phone: String,
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/send-messages",
    request_body = SendMessagesRequest,
    responses(
        (status = 200, description = "Per-recipient result counts, or a duplicate marker", body = SendMessagesResponse),
        (status = 400, description = "No session, or malformed input")
    )
)]
pub async fn send_messages_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<SendMessagesRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let request = CampaignSend {
        recipients: req
            .contacts
            .into_iter()
            .map(|c| Recipient {
                name: c.name,
                phone: c.phone,
                title: c.title,
            })
            .collect(),
        message: req.message,
        campaign_id: req.campaign_id.filter(|id| !id.is_empty()),
        campaign_name: req.campaign_name.filter(|name| !name.is_empty()),
    };

    let report = state.outreach.send(user_id, request).await.map_err(reject)?;
    let message = if report.duplicate {
        "Campaign already processed"
    } else {
        "Messages sent"
    };
    Ok(Json(SendMessagesResponse {
        message: message.to_string(),
        success: report.success,
        failed: report.failed,
        duplicate: report.duplicate,
    }))
}

#[utoipa::path(
    post,
    path = "/api/send-reminder",
    request_body = SendReminderRequest,
    responses(
        (status = 200, description = "Reminder sent", body = MessageResponse),
        (status = 400, description = "Missing phone or message, or no session"),
        (status = 500, description = "The platform rejected the send")
    )
)]
pub async fn send_reminder_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendReminderRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if phone::normalize(&req.phone).is_empty() || req.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Phone and message required".to_string(),
        ));
    }
    if !state.session.has_client().await {
        return Err((
            StatusCode::BAD_REQUEST,
            "WhatsApp client not connected".to_string(),
        ));
    }

    let chat = phone::chat_id(&req.phone);
    state
        .session
        .send_text(&chat, &req.message)
        .await
        .map_err(|e| {
            error!("Reminder send to {} failed: {}", chat, e);
            reject(e)
        })?;
    info!("Reminder sent to {}", chat);
    Ok(Json(MessageResponse {
        success: true,
        message: "Reminder sent".to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/reset-sent-campaigns",
    responses(
        (status = 200, description = "Ledger cleared", body = MessageResponse),
        (status = 500, description = "Ledger could not be removed")
    )
)]
pub async fn reset_sent_campaigns_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.outreach.ledger().reset().await.map_err(reject)?;
    Ok(Json(MessageResponse {
        success: true,
        message: "Sent campaigns history has been reset".to_string(),
    }))
}
