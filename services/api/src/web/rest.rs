//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the messaging-session endpoints and the master
//! definition for the OpenAPI specification.

use crate::error::reject;
use crate::session::{SessionSnapshot, SessionState};
use crate::web::state::AppState;
use crate::web::{ai, auth, campaigns, contacts, faqs, messaging, replies, webhook};
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use outreach_core::domain::QrKind;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        start_session_handler,
        disconnect_session_handler,
        delete_session_handler,
        qr_handler,
        session_status_handler,
        contacts::list_contacts_handler,
        contacts::create_contact_handler,
        contacts::update_contact_handler,
        contacts::delete_contact_handler,
        campaigns::list_campaigns_handler,
        campaigns::get_campaign_handler,
        campaigns::create_campaign_handler,
        campaigns::update_campaign_handler,
        campaigns::delete_campaign_handler,
        faqs::list_faqs_handler,
        faqs::create_faq_handler,
        faqs::update_faq_handler,
        faqs::delete_faq_handler,
        replies::list_replies_handler,
        replies::create_reply_handler,
        replies::update_reply_handler,
        replies::delete_reply_handler,
        messaging::send_messages_handler,
        messaging::send_reminder_handler,
        messaging::reset_sent_campaigns_handler,
        ai::generate_tone_handler,
        ai::standardize_name_handler,
        ai::suggest_title_handler,
        ai::clean_phone_handler,
        ai::process_csv_handler,
        ai::analyze_sentiment_handler,
        ai::generate_autoreply_handler,
        webhook::wppconnect_webhook_handler,
    ),
    components(
        schemas(
            auth::SignupRequest, auth::LoginRequest, auth::AuthResponse,
            SessionActionResponse, SessionStatusResponse, QrResponse,
            contacts::ContactResponse, contacts::CreateContactRequest, contacts::UpdateContactRequest,
            campaigns::CampaignResponse, campaigns::ReplyStatsResponse,
            campaigns::CreateCampaignRequest, campaigns::UpdateCampaignRequest,
            faqs::FaqResponse, faqs::CreateFaqRequest, faqs::UpdateFaqRequest,
            replies::ReplyResponse, replies::CreateReplyRequest, replies::UpdateReplyRequest,
            messaging::RecipientPayload, messaging::SendMessagesRequest, messaging::SendMessagesResponse,
            messaging::SendReminderRequest, messaging::MessageResponse,
            ai::ToneRequest, ai::NameRequest, ai::TitleRequest, ai::PhoneRequest, ai::CsvRequest,
            ai::SentimentRequest, ai::AutoreplyRequest, ai::TextResponse, ai::PhoneResponse,
            ai::CsvResponse, ai::SentimentResponse, ai::AutoreplyResponse,
        )
    ),
    tags(
        (name = "WhatsApp Outreach API", description = "Contacts, campaigns, the messaging session and the FAQ autoresponder.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Session Payloads
//=========================================================================================

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionActionResponse {
    pub success: bool,
    pub message: String,
    pub status: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub status: String,
    /// The raw status string last reported by the platform.
    pub platform_status: Option<String>,
    pub has_client: bool,
    pub valid_session: bool,
    pub is_reconnecting: bool,
    pub is_pairing: bool,
    pub reconnect_attempts: u32,
    pub connection_state: Option<String>,
    pub error: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QrResponse {
    pub qr: Option<String>,
    pub status: String,
    pub valid_session: bool,
    pub has_qr: bool,
    pub qr_type: Option<String>,
}

fn failure_reason(state: &SessionState) -> Option<String> {
    match state {
        SessionState::Failed(reason) => Some(reason.clone()),
        _ => None,
    }
}

fn action(snapshot: &SessionSnapshot, message: &str) -> Json<SessionActionResponse> {
    Json(SessionActionResponse {
        success: true,
        message: message.to_string(),
        status: snapshot.state.as_str().to_string(),
    })
}

//=========================================================================================
// Session Handlers
//=========================================================================================

/// Start the messaging session (idempotent) and begin QR pairing.
#[utoipa::path(
    post,
    path = "/api/start-session",
    responses(
        (status = 200, description = "Session started, or already running", body = SessionActionResponse),
        (status = 401, description = "Not authenticated"),
        (status = 500, description = "The platform could not open a session")
    )
)]
pub async fn start_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let had_client = state.session.has_client().await;
    let snapshot = state.session.start(Some(user_id)).await.map_err(reject)?;
    let message = if had_client {
        "Session already exists"
    } else {
        "Session starting; scan the QR code to pair"
    };
    Ok(action(&snapshot, message))
}

#[utoipa::path(
    post,
    path = "/api/disconnect-session",
    responses(
        (status = 200, description = "Session disconnected (or there was none)", body = SessionActionResponse)
    )
)]
pub async fn disconnect_session_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let had_client = state.session.has_client().await;
    let snapshot = state.session.disconnect().await;
    let message = if had_client {
        "Session disconnected"
    } else {
        "No active session to disconnect"
    };
    Ok(action(&snapshot, message))
}

/// Disconnect and wipe the stored credentials of a corrupted session.
#[utoipa::path(
    post,
    path = "/api/delete-session",
    responses(
        (status = 200, description = "Session deleted and reset", body = SessionActionResponse),
        (status = 500, description = "Credentials could not be removed")
    )
)]
pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let snapshot = state.session.delete_session().await.map_err(reject)?;
    Ok(action(&snapshot, "Session deleted and reset"))
}

#[utoipa::path(
    get,
    path = "/api/qr",
    responses((status = 200, description = "The current QR code, if any", body = QrResponse))
)]
pub async fn qr_handler(State(state): State<Arc<AppState>>) -> Json<QrResponse> {
    let snapshot = state.session.snapshot().await;
    let qr_type = snapshot.qr.as_ref().map(|qr| {
        match qr.kind {
            QrKind::Image => "image",
            QrKind::Text => "text",
        }
        .to_string()
    });
    Json(QrResponse {
        has_qr: snapshot.qr.is_some(),
        qr: snapshot.qr.map(|qr| qr.payload),
        status: snapshot.state.as_str().to_string(),
        valid_session: snapshot.valid_session,
        qr_type,
    })
}

#[utoipa::path(
    get,
    path = "/api/session-status",
    responses((status = 200, description = "Session state", body = SessionStatusResponse))
)]
pub async fn session_status_handler(
    State(state): State<Arc<AppState>>,
) -> Json<SessionStatusResponse> {
    let snapshot = state.session.snapshot().await;
    let (connection_state, probe_error) = match state.session.connection_state().await {
        Ok(connection_state) => (connection_state, None),
        Err(e) => {
            warn!("Connection state probe failed: {}", e);
            (None, Some(e.to_string()))
        }
    };
    Json(SessionStatusResponse {
        status: snapshot.state.as_str().to_string(),
        error: failure_reason(&snapshot.state).or(probe_error),
        platform_status: snapshot.platform_status,
        has_client: snapshot.has_client,
        valid_session: snapshot.valid_session,
        is_reconnecting: snapshot.is_reconnecting,
        is_pairing: snapshot.is_pairing,
        reconnect_attempts: snapshot.reconnect_attempts,
        connection_state,
    })
}
