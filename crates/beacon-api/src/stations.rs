use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use uuid::Uuid;

use beacon_db::models::StationRow;
use beacon_types::api::{CreateStationRequest, StationListResponse};

use crate::convert;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::tickets::validate_coords;
use crate::{AppState, run_db};

/// GET /stations
pub async fn list_stations(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = run_db(&state, |db| db.list_stations()).await?;
    Ok(Json(StationListResponse {
        stations: rows.iter().map(convert::station).collect(),
    }))
}

/// POST /stations — register a responding station.
pub async fn create_station(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<CreateStationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }
    if req.email.trim().is_empty() {
        return Err(ApiError::Validation("email must not be empty".into()));
    }
    if let (Some(lat), Some(lon)) = (req.latitude, req.longitude) {
        validate_coords(lat, lon)?;
    }

    let row = StationRow {
        id: Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        address: req.address,
        phone: req.phone,
        email: req.email.trim().to_string(),
        latitude: req.latitude,
        longitude: req.longitude,
        api_key: req.api_key,
    };

    let station = convert::station(&row);
    run_db(&state, move |db| db.create_station(&row)).await?;

    Ok((StatusCode::CREATED, Json(station)))
}
