//! services/api/src/web/ai.rs
//!
//! AI helper endpoints used by the dashboard, plus the manual autoreply trigger.

use crate::autoreply::RouteOutcome;
use crate::error::reject;
use crate::web::state::AppState;
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ToneRequest {
    pub message: String,
    pub tone: String,
}

#[derive(Deserialize, ToSchema)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct TitleRequest {
    pub name: String,
    pub context: String,
}

#[derive(Deserialize, ToSchema)]
pub struct PhoneRequest {
    pub phone: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsvRequest {
    #[schema(value_type = Vec<Object>)]
    pub csv_data: Vec<Map<String, Value>>,
    pub headers: Vec<String>,
    pub user_prompt: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SentimentRequest {
    pub message: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoreplyRequest {
    pub campaign_id: Uuid,
    pub contact_id: Uuid,
    pub user_message: String,
}

#[derive(Serialize, ToSchema)]
pub struct TextResponse {
    pub success: bool,
    pub data: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PhoneResponse {
    pub success: bool,
    pub data: String,
    /// False when the local heuristic result was used.
    pub ai_assisted: bool,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsvResponse {
    pub success: bool,
    pub analysis: String,
    pub suggestions: Vec<String>,
    #[schema(value_type = Option<Object>)]
    pub transformed_data: Option<Value>,
}

#[derive(Serialize, ToSchema)]
pub struct SentimentResponse {
    pub success: bool,
    pub sentiment: String,
    pub confidence: f64,
    pub explanation: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoreplyResponse {
    pub should_reply: bool,
    pub response: Option<String>,
    pub message_sent: bool,
    pub queued_for_retry: bool,
    pub match_score: Option<f64>,
    pub message: String,
}

impl From<RouteOutcome> for AutoreplyResponse {
    fn from(outcome: RouteOutcome) -> Self {
        let silent = |message: &str| AutoreplyResponse {
            should_reply: false,
            response: None,
            message_sent: false,
            queued_for_retry: false,
            match_score: None,
            message: message.to_string(),
        };
        match outcome {
            RouteOutcome::Ignored(reason) => silent(&format!("Ignored: {:?}", reason)),
            RouteOutcome::Suppressed { .. } => {
                silent("User has already replied - AI will not respond")
            }
            RouteOutcome::NoMatch { .. } => silent("No matching FAQ found"),
            RouteOutcome::Delivered {
                response, score, ..
            } => AutoreplyResponse {
                should_reply: true,
                response: Some(response),
                message_sent: true,
                queued_for_retry: false,
                match_score: Some(score),
                message: "Autoreply sent".to_string(),
            },
            RouteOutcome::Queued {
                response, score, ..
            } => AutoreplyResponse {
                should_reply: true,
                response: Some(response),
                message_sent: false,
                queued_for_retry: true,
                match_score: Some(score),
                message: "Autoreply queued until the session reconnects".to_string(),
            },
        }
    }
}

fn require(fields: &[&str], message: &str) -> Result<(), (StatusCode, String)> {
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err((StatusCode::BAD_REQUEST, message.to_string()));
    }
    Ok(())
}

//=========================================================================================
// Handlers
//=========================================================================================

#[utoipa::path(
    post,
    path = "/api/ai/generate-message-tone",
    request_body = ToneRequest,
    responses(
        (status = 200, description = "Rewritten message", body = TextResponse),
        (status = 400, description = "Message and tone required"),
        (status = 500, description = "LLM unavailable or failed")
    )
)]
pub async fn generate_tone_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ToneRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require(&[req.message.as_str(), req.tone.as_str()], "Message and tone required")?;
    let data = state
        .assistant
        .rewrite_tone(&req.message, &req.tone)
        .await
        .map_err(reject)?;
    Ok(Json(TextResponse { success: true, data }))
}

#[utoipa::path(
    post,
    path = "/api/ai/standardize-contact-name",
    request_body = NameRequest,
    responses(
        (status = 200, description = "Standardized name", body = TextResponse),
        (status = 400, description = "Name required"),
        (status = 500, description = "LLM unavailable or failed")
    )
)]
pub async fn standardize_name_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NameRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require(&[req.name.as_str()], "Name required")?;
    let data = state
        .assistant
        .standardize_name(&req.name)
        .await
        .map_err(reject)?;
    Ok(Json(TextResponse { success: true, data }))
}

#[utoipa::path(
    post,
    path = "/api/ai/suggest-contact-title",
    request_body = TitleRequest,
    responses(
        (status = 200, description = "Suggested title", body = TextResponse),
        (status = 400, description = "Name and context required"),
        (status = 500, description = "LLM unavailable or failed")
    )
)]
pub async fn suggest_title_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TitleRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require(&[req.name.as_str(), req.context.as_str()], "Name and context required")?;
    let data = state
        .assistant
        .suggest_title(&req.name, &req.context)
        .await
        .map_err(reject)?;
    Ok(Json(TextResponse { success: true, data }))
}

#[utoipa::path(
    post,
    path = "/api/ai/clean-phone-number",
    request_body = PhoneRequest,
    responses(
        (status = 200, description = "Cleaned number", body = PhoneResponse),
        (status = 400, description = "Phone number required")
    )
)]
pub async fn clean_phone_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PhoneRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require(&[req.phone.as_str()], "Phone number required")?;
    let cleaned = state
        .assistant
        .clean_phone(&req.phone)
        .await
        .map_err(reject)?;
    Ok(Json(PhoneResponse {
        success: true,
        data: cleaned.phone,
        ai_assisted: cleaned.ai_assisted,
    }))
}

#[utoipa::path(
    post,
    path = "/api/ai/process-csv",
    request_body = CsvRequest,
    responses(
        (status = 200, description = "Analysis and suggestions", body = CsvResponse),
        (status = 400, description = "CSV data and a prompt are required"),
        (status = 500, description = "LLM unavailable or failed")
    )
)]
pub async fn process_csv_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CsvRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require(&[req.user_prompt.as_str()], "CSV data array and user prompt required")?;
    if req.headers.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "CSV headers required".to_string()));
    }
    let analysis = state
        .assistant
        .analyze_csv(&req.headers, &req.csv_data, &req.user_prompt)
        .await
        .map_err(reject)?;
    Ok(Json(CsvResponse {
        success: true,
        analysis: analysis.analysis,
        suggestions: analysis.suggestions,
        transformed_data: analysis.transformed_data,
    }))
}

#[utoipa::path(
    post,
    path = "/api/ai/analyze-sentiment",
    request_body = SentimentRequest,
    responses(
        (status = 200, description = "Sentiment of the message", body = SentimentResponse),
        (status = 400, description = "Message required"),
        (status = 500, description = "LLM unavailable or failed")
    )
)]
pub async fn analyze_sentiment_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SentimentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require(&[req.message.as_str()], "Message required")?;
    let result = state
        .assistant
        .analyze_sentiment(&req.message)
        .await
        .map_err(reject)?;
    Ok(Json(SentimentResponse {
        success: true,
        sentiment: result.sentiment.as_str().to_string(),
        confidence: result.confidence,
        explanation: result.explanation,
    }))
}

/// Run the autoresponder for a contact's latest reply in a campaign.
#[utoipa::path(
    post,
    path = "/api/ai/generate-autoreply",
    request_body = AutoreplyRequest,
    responses(
        (status = 200, description = "What the autoresponder did", body = AutoreplyResponse),
        (status = 400, description = "Message required"),
        (status = 404, description = "Unknown campaign or contact")
    )
)]
pub async fn generate_autoreply_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<AutoreplyRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    require(&[req.user_message.as_str()], "Missing required fields")?;
    let outcome = state
        .autoresponder
        .respond_to_contact(user_id, req.campaign_id, req.contact_id, &req.user_message)
        .await
        .map_err(reject)?;
    Ok(Json(AutoreplyResponse::from(outcome)))
}
