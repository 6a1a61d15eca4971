//! services/api/src/web/campaigns.rs
//!
//! CRUD endpoints for campaigns. Reply statistics are read-only here; they are
//! maintained by the autoresponder as replies arrive.

use crate::error::reject;
use crate::web::state::AppState;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use outreach_core::domain::{
    Campaign, CampaignStatus, CampaignUpdate, NewCampaign, ReplyStats,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, ToSchema)]
pub struct ReplyStatsResponse {
    pub total: i32,
    pub positive: i32,
    pub negative: i32,
    pub neutral: i32,
}

impl From<ReplyStats> for ReplyStatsResponse {
    fn from(stats: ReplyStats) -> Self {
        Self {
            total: stats.total,
            positive: stats.positive,
            negative: stats.negative,
            neutral: stats.neutral,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub message: String,
    pub selected_contacts: Vec<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// `draft`, `scheduled` or `sent`.
    pub status: String,
    pub autoreply_enabled: bool,
    pub reply_stats: ReplyStatsResponse,
    pub created_at: DateTime<Utc>,
}

impl From<Campaign> for CampaignResponse {
    fn from(campaign: Campaign) -> Self {
        Self {
            id: campaign.id,
            user_id: campaign.user_id,
            name: campaign.name,
            message: campaign.message,
            selected_contacts: campaign.selected_contacts,
            scheduled_at: campaign.scheduled_at,
            status: campaign.status.as_str().to_string(),
            autoreply_enabled: campaign.autoreply_enabled,
            reply_stats: campaign.reply_stats.into(),
            created_at: campaign.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub selected_contacts: Vec<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
    #[serde(default)]
    pub autoreply_enabled: bool,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCampaignRequest {
    pub name: Option<String>,
    pub message: Option<String>,
    pub selected_contacts: Option<Vec<Uuid>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub autoreply_enabled: Option<bool>,
}

fn parse_status(raw: Option<&str>) -> Result<Option<CampaignStatus>, (StatusCode, String)> {
    match raw {
        None => Ok(None),
        Some(value) => CampaignStatus::parse(value).map(Some).ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                format!("Unknown campaign status '{}'", value),
            )
        }),
    }
}

#[utoipa::path(
    get,
    path = "/api/campaigns",
    responses((status = 200, description = "Campaigns, newest first", body = [CampaignResponse]))
)]
pub async fn list_campaigns_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let campaigns = state.db.list_campaigns(user_id).await.map_err(reject)?;
    Ok(Json(
        campaigns
            .into_iter()
            .map(CampaignResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/api/campaigns/{id}",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "The campaign", body = CampaignResponse),
        (status = 404, description = "No such campaign")
    )
)]
pub async fn get_campaign_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let campaign = state.db.get_campaign(id, user_id).await.map_err(reject)?;
    Ok(Json(CampaignResponse::from(campaign)))
}

#[utoipa::path(
    post,
    path = "/api/campaigns",
    request_body = CreateCampaignRequest,
    responses(
        (status = 201, description = "Campaign created", body = CampaignResponse),
        (status = 400, description = "Missing name or message, or unknown status")
    )
)]
pub async fn create_campaign_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateCampaignRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.name.trim().is_empty() || req.message.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Name and message are required".to_string(),
        ));
    }
    let status = parse_status(req.status.as_deref())?.unwrap_or(CampaignStatus::Draft);
    let campaign = state
        .db
        .create_campaign(
            user_id,
            NewCampaign {
                name: req.name,
                message: req.message,
                selected_contacts: req.selected_contacts,
                scheduled_at: req.scheduled_at,
                status,
                autoreply_enabled: req.autoreply_enabled,
            },
        )
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(CampaignResponse::from(campaign))))
}

#[utoipa::path(
    put,
    path = "/api/campaigns/{id}",
    request_body = UpdateCampaignRequest,
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 200, description = "Updated campaign", body = CampaignResponse),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "No such campaign")
    )
)]
pub async fn update_campaign_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCampaignRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let update = CampaignUpdate {
        status: parse_status(req.status.as_deref())?,
        name: req.name,
        message: req.message,
        selected_contacts: req.selected_contacts,
        scheduled_at: req.scheduled_at,
        autoreply_enabled: req.autoreply_enabled,
    };
    let campaign = state
        .db
        .update_campaign(id, user_id, update)
        .await
        .map_err(reject)?;
    Ok(Json(CampaignResponse::from(campaign)))
}

#[utoipa::path(
    delete,
    path = "/api/campaigns/{id}",
    params(("id" = Uuid, Path, description = "Campaign id")),
    responses(
        (status = 204, description = "Campaign and its replies deleted"),
        (status = 404, description = "No such campaign")
    )
)]
pub async fn delete_campaign_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .delete_campaign(id, user_id)
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}
