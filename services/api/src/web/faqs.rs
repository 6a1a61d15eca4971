//! services/api/src/web/faqs.rs
//!
//! CRUD endpoints for the FAQ entries the autoresponder answers from.

use crate::error::reject;
use crate::web::state::AppState;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use outreach_core::domain::{Faq, FaqUpdate, NewFaq};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FaqResponse {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

impl From<Faq> for FaqResponse {
    fn from(faq: Faq) -> Self {
        Self {
            id: faq.id,
            question: faq.question,
            answer: faq.answer,
            category: faq.category,
            created_at: faq.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateFaqRequest {
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateFaqRequest {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub category: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/faqs",
    responses((status = 200, description = "The caller's FAQs", body = [FaqResponse]))
)]
pub async fn list_faqs_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let faqs = state.db.list_faqs(user_id).await.map_err(reject)?;
    Ok(Json(faqs.into_iter().map(FaqResponse::from).collect::<Vec<_>>()))
}

#[utoipa::path(
    post,
    path = "/api/faqs",
    request_body = CreateFaqRequest,
    responses(
        (status = 201, description = "FAQ created", body = FaqResponse),
        (status = 400, description = "Question and answer are required")
    )
)]
pub async fn create_faq_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateFaqRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.question.trim().is_empty() || req.answer.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Question and answer are required".to_string(),
        ));
    }
    let faq = state
        .db
        .create_faq(
            user_id,
            NewFaq {
                question: req.question,
                answer: req.answer,
                category: req.category.unwrap_or_else(|| "general".to_string()),
            },
        )
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(FaqResponse::from(faq))))
}

#[utoipa::path(
    put,
    path = "/api/faqs/{id}",
    request_body = UpdateFaqRequest,
    params(("id" = Uuid, Path, description = "FAQ id")),
    responses(
        (status = 200, description = "Updated FAQ", body = FaqResponse),
        (status = 404, description = "No such FAQ")
    )
)]
pub async fn update_faq_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateFaqRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let update = FaqUpdate {
        question: req.question,
        answer: req.answer,
        category: req.category,
    };
    let faq = state
        .db
        .update_faq(id, user_id, update)
        .await
        .map_err(reject)?;
    Ok(Json(FaqResponse::from(faq)))
}

#[utoipa::path(
    delete,
    path = "/api/faqs/{id}",
    params(("id" = Uuid, Path, description = "FAQ id")),
    responses(
        (status = 204, description = "FAQ deleted"),
        (status = 404, description = "No such FAQ")
    )
)]
pub async fn delete_faq_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.db.delete_faq(id, user_id).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}
