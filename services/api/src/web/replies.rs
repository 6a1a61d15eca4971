//! services/api/src/web/replies.rs
//!
//! Endpoints for inbound replies. Replies belong to campaigns, so every access
//! is checked against the caller's ownership of the campaign.

use crate::error::reject;
use crate::web::state::AppState;
use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use outreach_core::domain::{Reply, ReplyUpdate};
use outreach_core::ports::{PortError, PortResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub contact_id: Uuid,
    pub message: String,
    pub sentiment: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "isAIResponded")]
    pub is_ai_responded: bool,
    pub ai_response: Option<String>,
    pub ai_response_time: Option<DateTime<Utc>>,
    pub is_human_responded: bool,
    pub human_response: Option<String>,
}

impl From<Reply> for ReplyResponse {
    fn from(reply: Reply) -> Self {
        Self {
            id: reply.id,
            campaign_id: reply.campaign_id,
            contact_id: reply.contact_id,
            message: reply.message,
            sentiment: reply.sentiment.as_str().to_string(),
            timestamp: reply.received_at,
            is_ai_responded: reply.is_ai_responded,
            ai_response: reply.ai_response,
            ai_response_time: reply.ai_response_time,
            is_human_responded: reply.is_human_responded,
            human_response: reply.human_response,
        }
    }
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ReplyFilter {
    pub campaign_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReplyRequest {
    pub campaign_id: Uuid,
    pub contact_id: Uuid,
    pub message: String,
}

/// Records a human answer (or corrects the AI flags).
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReplyRequest {
    pub human_response: Option<String>,
    pub is_human_responded: Option<bool>,
    #[serde(rename = "isAIResponded")]
    pub is_ai_responded: Option<bool>,
    pub ai_response: Option<String>,
}

/// Loads a reply and checks the caller owns its campaign.
async fn owned_reply(state: &AppState, id: Uuid, user_id: Uuid) -> PortResult<Reply> {
    let reply = state.db.get_reply(id).await?;
    match state.db.get_campaign(reply.campaign_id, user_id).await {
        Ok(_) => Ok(reply),
        Err(PortError::NotFound(_)) => Err(PortError::NotFound(format!("reply {}", id))),
        Err(e) => Err(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/replies",
    params(ReplyFilter),
    responses(
        (status = 200, description = "Replies, newest first", body = [ReplyResponse]),
        (status = 404, description = "Unknown campaign or contact")
    )
)]
pub async fn list_replies_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(filter): Query<ReplyFilter>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut replies = match (filter.campaign_id, filter.contact_id) {
        (Some(campaign_id), contact_id) => {
            state
                .db
                .get_campaign(campaign_id, user_id)
                .await
                .map_err(reject)?;
            let mut replies = state
                .db
                .list_replies_for_campaign(campaign_id)
                .await
                .map_err(reject)?;
            if let Some(contact_id) = contact_id {
                replies.retain(|r| r.contact_id == contact_id);
            }
            replies
        }
        (None, Some(contact_id)) => {
            state
                .db
                .get_contact(contact_id, user_id)
                .await
                .map_err(reject)?;
            state
                .db
                .list_replies_for_contact(contact_id)
                .await
                .map_err(reject)?
        }
        (None, None) => {
            let mut all = Vec::new();
            for campaign in state.db.list_campaigns(user_id).await.map_err(reject)? {
                all.extend(
                    state
                        .db
                        .list_replies_for_campaign(campaign.id)
                        .await
                        .map_err(reject)?,
                );
            }
            all
        }
    };
    replies.sort_by(|a, b| b.received_at.cmp(&a.received_at));
    Ok(Json(
        replies
            .into_iter()
            .map(ReplyResponse::from)
            .collect::<Vec<_>>(),
    ))
}

/// Record an inbound reply by hand; sentiment is scored like any other reply.
#[utoipa::path(
    post,
    path = "/api/replies",
    request_body = CreateReplyRequest,
    responses(
        (status = 201, description = "Reply recorded", body = ReplyResponse),
        (status = 400, description = "Empty message"),
        (status = 404, description = "Unknown campaign or contact")
    )
)]
pub async fn create_reply_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateReplyRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message is required".to_string()));
    }
    state
        .db
        .get_campaign(req.campaign_id, user_id)
        .await
        .map_err(reject)?;
    state
        .db
        .get_contact(req.contact_id, user_id)
        .await
        .map_err(reject)?;

    let reply = state
        .autoresponder
        .record_reply(req.campaign_id, req.contact_id, &req.message)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(ReplyResponse::from(reply))))
}

#[utoipa::path(
    put,
    path = "/api/replies/{id}",
    request_body = UpdateReplyRequest,
    params(("id" = Uuid, Path, description = "Reply id")),
    responses(
        (status = 200, description = "Updated reply", body = ReplyResponse),
        (status = 404, description = "No such reply")
    )
)]
pub async fn update_reply_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateReplyRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    owned_reply(&state, id, user_id).await.map_err(reject)?;

    // A human answer always flips the takeover flag.
    let is_human_responded = req
        .is_human_responded
        .or(req.human_response.as_ref().map(|_| true));
    let ai_response_time = req.ai_response.as_ref().map(|_| Utc::now());
    let update = ReplyUpdate {
        is_ai_responded: req.is_ai_responded,
        ai_response: req.ai_response,
        ai_response_time,
        is_human_responded,
        human_response: req.human_response,
    };
    let reply = state.db.update_reply(id, update).await.map_err(reject)?;
    Ok(Json(ReplyResponse::from(reply)))
}

#[utoipa::path(
    delete,
    path = "/api/replies/{id}",
    params(("id" = Uuid, Path, description = "Reply id")),
    responses(
        (status = 204, description = "Reply deleted"),
        (status = 404, description = "No such reply")
    )
)]
pub async fn delete_reply_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    owned_reply(&state, id, user_id).await.map_err(reject)?;
    state.db.delete_reply(id).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}
