use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use uuid::Uuid;

use beacon_db::models::ContactRow;
use beacon_types::api::{ContactListResponse, CreateContactRequest};

use crate::convert;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::{AppState, run_db};

/// GET /contacts — the caller's emergency contacts.
pub async fn list_contacts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let rows = run_db(&state, move |db| db.contacts_for_user(&uid)).await?;
    Ok(Json(ContactListResponse {
        contacts: rows.iter().map(convert::contact).collect(),
    }))
}

/// POST /contacts
pub async fn create_contact(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateContactRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }
    if req.phone.trim().is_empty() {
        return Err(ApiError::Validation("phone must not be empty".into()));
    }
    if req.relationship.trim().is_empty() {
        return Err(ApiError::Validation("relationship must not be empty".into()));
    }

    let row = ContactRow {
        id: Uuid::new_v4().to_string(),
        user_id: claims.sub.to_string(),
        linked_user_id: req.linked_user_id.map(|u| u.to_string()),
        name: req.name.trim().to_string(),
        phone: req.phone.trim().to_string(),
        relationship: req.relationship.trim().to_string(),
        email: req.email,
    };

    let contact = convert::contact(&row);
    run_db(&state, move |db| db.create_contact(&row)).await?;

    Ok((StatusCode::CREATED, Json(contact)))
}
