//! services/api/src/web/contacts.rs
//!
//! CRUD endpoints for the caller's contacts.

use crate::error::reject;
use crate::web::state::AppState;
use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use outreach_core::domain::{Contact, ContactUpdate, NewContact};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub id: Uuid,
    pub name: String,
    pub title: Option<String>,
    pub phone: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Contact> for ContactResponse {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id,
            name: contact.name,
            title: contact.title,
            phone: contact.phone,
            tags: contact.tags,
            created_at: contact.created_at,
            updated_at: contact.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateContactRequest {
    pub name: String,
    pub title: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateContactRequest {
    pub name: Option<String>,
    pub title: Option<String>,
    pub phone: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[utoipa::path(
    get,
    path = "/api/contacts",
    responses((status = 200, description = "The caller's contacts", body = [ContactResponse]))
)]
pub async fn list_contacts_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let contacts = state.db.list_contacts(user_id).await.map_err(reject)?;
    Ok(Json(
        contacts
            .into_iter()
            .map(ContactResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/contacts",
    request_body = CreateContactRequest,
    responses(
        (status = 201, description = "Contact created", body = ContactResponse),
        (status = 400, description = "Name and phone are required")
    )
)]
pub async fn create_contact_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateContactRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.name.trim().is_empty() || req.phone.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Name and phone are required".to_string(),
        ));
    }
    let contact = state
        .db
        .create_contact(
            user_id,
            NewContact {
                name: req.name,
                title: req.title,
                phone: req.phone,
                tags: req.tags,
            },
        )
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(ContactResponse::from(contact))))
}

#[utoipa::path(
    put,
    path = "/api/contacts/{id}",
    request_body = UpdateContactRequest,
    params(("id" = Uuid, Path, description = "Contact id")),
    responses(
        (status = 200, description = "Updated contact", body = ContactResponse),
        (status = 404, description = "No such contact")
    )
)]
pub async fn update_contact_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateContactRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let update = ContactUpdate {
        name: req.name,
        title: req.title,
        phone: req.phone,
        tags: req.tags,
    };
    let contact = state
        .db
        .update_contact(id, user_id, update)
        .await
        .map_err(reject)?;
    Ok(Json(ContactResponse::from(contact)))
}

#[utoipa::path(
    delete,
    path = "/api/contacts/{id}",
    params(("id" = Uuid, Path, description = "Contact id")),
    responses(
        (status = 204, description = "Contact deleted"),
        (status = 404, description = "No such contact")
    )
)]
pub async fn delete_contact_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .db
        .delete_contact(id, user_id)
        .await
        .map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}
