use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use tracing::warn;
use uuid::Uuid;

use beacon_enrich::aggregate::{description_or_placeholder, enrich_video, transcript_or_placeholder};
use beacon_types::api::{AddLocationRequest, AddLocationResponse, AddMediaRequest, AddMediaResponse};
use beacon_types::models::{MediaKind, TicketStatus};

use crate::convert;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::tickets::{scoped_ticket, validate_coords, validate_not_future};
use crate::{AppState, run_db};

/// POST /ticket/{id}/location — merge a location point into the trail.
pub async fn add_location(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddLocationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_coords(req.latitude, req.longitude)?;
    validate_not_future("observed_at", req.observed_at)?;

    scoped_ticket(&state, ticket_id, claims.sub).await?;

    let observed_at = req.observed_at.format(beacon_db::SECOND_FMT).to_string();
    let added = {
        let tid = ticket_id.to_string();
        run_db(&state, move |db| {
            db.upsert_location(&tid, req.latitude, req.longitude, &observed_at)
        })
        .await?
    };

    let points = load_points(&state, ticket_id).await?;
    Ok(Json(AddLocationResponse { added, points }))
}

/// GET /ticket/{id}/location
pub async fn get_locations(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    scoped_ticket(&state, ticket_id, claims.sub).await?;
    let points = load_points(&state, ticket_id).await?;
    Ok(Json(points))
}

pub async fn add_image(
    state: State<AppState>,
    path: Path<Uuid>,
    claims: Extension<Claims>,
    req: Json<AddMediaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ingest_media(state, path, claims, req, MediaKind::Image).await
}

pub async fn add_audio(
    state: State<AppState>,
    path: Path<Uuid>,
    claims: Extension<Claims>,
    req: Json<AddMediaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ingest_media(state, path, claims, req, MediaKind::Audio).await
}

pub async fn add_video(
    state: State<AppState>,
    path: Path<Uuid>,
    claims: Extension<Claims>,
    req: Json<AddMediaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ingest_media(state, path, claims, req, MediaKind::Video).await
}

/// Shared ingestion path for the three media kinds: scoped ticket check,
/// bucket-ref dedup, then per-kind enrichment. The evidence row is saved
/// even when enrichment cannot be produced.
async fn ingest_media(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddMediaRequest>,
    kind: MediaKind,
) -> Result<impl IntoResponse, ApiError> {
    if req.bucket_ref.trim().is_empty() {
        return Err(ApiError::Validation("bucket_ref must not be empty".into()));
    }
    if req.source_url.trim().is_empty() {
        return Err(ApiError::Validation("source_url must not be empty".into()));
    }
    validate_not_future("observed_at", req.observed_at)?;

    let ticket = scoped_ticket(&state, ticket_id, claims.sub).await?;
    ensure_recording_allowed(kind, &ticket.status)?;

    let media_id = Uuid::new_v4();
    let observed_at = req.observed_at.format(beacon_db::SECOND_FMT).to_string();
    let added = {
        let mid = media_id.to_string();
        let tid = ticket_id.to_string();
        let (source_url, bucket_ref) = (req.source_url.clone(), req.bucket_ref.clone());
        run_db(&state, move |db| {
            db.insert_media(&mid, &tid, kind.as_str(), &source_url, &bucket_ref, &observed_at)
        })
        .await?
    };

    if added {
        enrich_new_media(&state, ticket_id, kind, &req.bucket_ref).await;
    }

    let items = {
        let tid = ticket_id.to_string();
        run_db(&state, move |db| db.list_media(&tid, kind.as_str())).await?
    };
    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(AddMediaResponse {
            added,
            items: items.iter().map(convert::media_item).collect(),
        }),
    ))
}

/// Stale tickets must not continue collecting live recordings; images
/// remain attachable after closure.
fn ensure_recording_allowed(kind: MediaKind, status: &str) -> Result<(), ApiError> {
    if matches!(kind, MediaKind::Audio | MediaKind::Video)
        && TicketStatus::parse(status) != Some(TicketStatus::Active)
    {
        return Err(ApiError::Forbidden("ticket is no longer active".into()));
    }
    Ok(())
}

async fn enrich_new_media(state: &AppState, ticket_id: Uuid, kind: MediaKind, bucket_ref: &str) {
    let tid = ticket_id.to_string();
    match kind {
        MediaKind::Image | MediaKind::Audio => {
            let text = match kind {
                MediaKind::Image => description_or_placeholder(state.enrich.as_ref(), bucket_ref).await,
                _ => transcript_or_placeholder(state.enrich.as_ref(), bucket_ref).await,
            };
            let bucket = bucket_ref.to_string();
            let result = run_db(state, move |db| {
                db.update_media_transcript(&tid, kind.as_str(), &bucket, &text, None)
            })
            .await;
            if let Err(e) = result {
                warn!("Failed to store enrichment for ticket {}: {}", ticket_id, e);
            }
        }
        MediaKind::Video => {
            let count = {
                let tid = tid.clone();
                run_db(state, move |db| db.count_media(&tid, MediaKind::Video.as_str())).await
            };
            match count {
                Ok(count) => {
                    enrich_video(state.enrich.as_ref(), &state.db, &tid, bucket_ref, count).await;
                }
                Err(e) => warn!("Skipping video analysis for ticket {}: {}", ticket_id, e),
            }
        }
    }
}

async fn load_points(
    state: &AppState,
    ticket_id: Uuid,
) -> Result<Vec<beacon_types::models::LocationPoint>, ApiError> {
    let tid = ticket_id.to_string();
    let rows = run_db(state, move |db| db.get_locations(&tid)).await?;
    Ok(rows.iter().map(convert::location_point).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recordings_on_closed_ticket_are_forbidden() {
        for kind in [MediaKind::Audio, MediaKind::Video] {
            let err = ensure_recording_allowed(kind, "closed").unwrap_err();
            assert!(matches!(err, ApiError::Forbidden(_)));
        }
    }

    #[test]
    fn images_attach_regardless_of_status() {
        assert!(ensure_recording_allowed(MediaKind::Image, "closed").is_ok());
        assert!(ensure_recording_allowed(MediaKind::Image, "active").is_ok());
    }

    #[test]
    fn active_ticket_accepts_all_kinds() {
        for kind in [MediaKind::Image, MediaKind::Audio, MediaKind::Video] {
            assert!(ensure_recording_allowed(kind, "active").is_ok());
        }
    }

    #[test]
    fn unrecognized_status_blocks_recordings() {
        let err = ensure_recording_allowed(MediaKind::Video, "garbage").unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
