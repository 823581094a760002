use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use beacon_notify::{ContactRecipient, StationRecipient, TicketAlert};
use beacon_types::api::{
    CreateTicketRequest, TicketDetailResponse, TicketResponse, TicketStatusResponse,
    TicketSummaryResponse,
};
use beacon_types::models::{MediaKind, TicketStatus};

use crate::convert;
use crate::error::ApiError;
use crate::middleware::Claims;
use crate::{AppState, run_db};

pub(crate) fn validate_coords(latitude: f64, longitude: f64) -> Result<(), ApiError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(ApiError::Validation("coordinates out of range".into()));
    }
    Ok(())
}

pub(crate) fn validate_not_future(field: &str, ts: DateTime<Utc>) -> Result<(), ApiError> {
    if ts > Utc::now() {
        return Err(ApiError::Validation(format!("{} must not be in the future", field)));
    }
    Ok(())
}

pub(crate) fn ensure_sos_enabled(user: &beacon_db::models::UserRow) -> Result<(), ApiError> {
    if !user.sos_enabled {
        return Err(ApiError::Forbidden("SOS alerts are not enabled for this account".into()));
    }
    Ok(())
}

/// POST /ticket — raise an SOS ticket.
///
/// Closes any previous Active ticket (best-effort), resolves the nearest
/// station (best-effort), persists the new ticket, then returns immediately
/// while alert fan-out continues in the background.
pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateTicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_coords(req.latitude, req.longitude)?;
    validate_not_future("created_at", req.created_at)?;

    let uid = claims.sub.to_string();

    let user = {
        let uid = uid.clone();
        run_db(&state, move |db| db.get_user_by_id(&uid)).await?
    }
    .ok_or(ApiError::NotFound("user"))?;
    ensure_sos_enabled(&user)?;

    // Best-effort: a failure here may transiently leave two Active tickets.
    {
        let uid = uid.clone();
        match run_db(&state, move |db| db.close_active_for_user(&uid)).await {
            Ok(n) if n > 0 => info!("Closed {} previous active ticket(s) for user {}", n, claims.sub),
            Ok(_) => {}
            Err(e) => warn!("Failed to close previous tickets for user {}: {}", claims.sub, e),
        }
    }

    // Best-effort responder resolution; absence is not an error.
    let (latitude, longitude) = (req.latitude, req.longitude);
    let station = {
        let state = state.clone();
        tokio::task::spawn_blocking(move || beacon_geo::resolve_nearest(&state.db, latitude, longitude))
            .await
            .unwrap_or_else(|e| {
                warn!("Station resolution task failed: {}", e);
                None
            })
    };

    let ticket_id = Uuid::new_v4();
    let created_at = req.created_at.format(beacon_db::SECOND_FMT).to_string();
    {
        let tid = ticket_id.to_string();
        let uid = uid.clone();
        let station_id = station.as_ref().map(|s| s.id.clone());
        let created_at = created_at.clone();
        run_db(&state, move |db| {
            db.create_ticket(&tid, &uid, station_id.as_deref(), latitude, longitude, &created_at)
        })
        .await?;
    }

    let response = TicketResponse {
        id: ticket_id,
        user_id: claims.sub,
        station_id: station.as_ref().map(|s| convert::parse_uuid("station id", &s.id)),
        status: TicketStatus::Active,
        priority: 0,
        transfer_reason: None,
        created_at: convert::parse_ts("created_at", &created_at),
    };

    // Fire-and-forget fan-out; the caller does not wait on delivery.
    let bg = state.clone();
    let alert = TicketAlert {
        ticket_id,
        alerter_name: user.display_name.clone(),
        latitude,
        longitude,
    };
    let station_rcpt = station.map(|s| StationRecipient { name: s.name, email: s.email });
    tokio::spawn(async move {
        let contacts = {
            let db_state = bg.clone();
            let uid = uid.clone();
            tokio::task::spawn_blocking(move || db_state.db.contacts_for_user(&uid)).await
        };
        let contacts: Vec<ContactRecipient> = match contacts {
            Ok(Ok(rows)) => rows
                .into_iter()
                .map(|c| ContactRecipient {
                    name: c.name,
                    phone: c.phone,
                    email: c.email,
                })
                .collect(),
            Ok(Err(e)) => {
                warn!("Failed to load contacts for ticket {}: {}", ticket_id, e);
                Vec::new()
            }
            Err(e) => {
                warn!("spawn_blocking join error: {}", e);
                Vec::new()
            }
        };
        bg.notifier.notify_all(&alert, station_rcpt, contacts).await;
    });

    Ok((StatusCode::CREATED, Json(response)))
}

/// PUT /ticket/{id}/close
pub async fn close_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let closed = {
        let tid = ticket_id.to_string();
        let uid = claims.sub.to_string();
        run_db(&state, move |db| db.close_ticket(&tid, &uid)).await?
    };
    if !closed {
        return Err(ApiError::NotFound("ticket"));
    }

    info!("Ticket {} closed by {}", ticket_id, claims.sub);
    Ok(Json(TicketStatusResponse {
        id: ticket_id,
        status: TicketStatus::Closed,
    }))
}

/// GET /ticket/{id} — full detail including evidence collections.
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let tid = ticket_id.to_string();
    let uid = claims.sub.to_string();

    let row = {
        let (tid, uid) = (tid.clone(), uid.clone());
        run_db(&state, move |db| db.get_ticket(&tid, &uid)).await?
    }
    .ok_or(ApiError::NotFound("ticket"))?;

    let (locations, images, audio, videos) = run_db(&state, move |db| {
        let locations = db.get_locations(&tid)?;
        let images = db.list_media(&tid, MediaKind::Image.as_str())?;
        let audio = db.list_media(&tid, MediaKind::Audio.as_str())?;
        let videos = db.list_media(&tid, MediaKind::Video.as_str())?;
        Ok((locations, images, audio, videos))
    })
    .await?;

    Ok(Json(TicketDetailResponse {
        analysis: convert::parse_analysis(&row),
        ticket: convert::ticket_response(&row),
        locations: locations.iter().map(convert::location_point).collect(),
        images: images.iter().map(convert::media_item).collect(),
        audio: audio.iter().map(convert::media_item).collect(),
        videos: videos.iter().map(convert::media_item).collect(),
    }))
}

/// GET /ticket/{id}/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let row = scoped_ticket(&state, ticket_id, claims.sub).await?;
    let ticket = convert::ticket_response(&row);
    Ok(Json(TicketStatusResponse {
        id: ticket.id,
        status: ticket.status,
    }))
}

/// GET /ticket/{id}/summary — latest aggregated analysis.
pub async fn get_summary(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let row = scoped_ticket(&state, ticket_id, claims.sub).await?;
    Ok(Json(TicketSummaryResponse {
        id: ticket_id,
        priority: row.priority,
        analysis: convert::parse_analysis(&row),
    }))
}

/// GET /tickets — the caller's tickets, newest first.
pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = claims.sub.to_string();
    let rows = run_db(&state, move |db| db.list_tickets_for_user(&uid)).await?;
    let tickets: Vec<TicketResponse> = rows.iter().map(convert::ticket_response).collect();
    Ok(Json(tickets))
}

/// DELETE /ticket/{id}
pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = {
        let tid = ticket_id.to_string();
        let uid = claims.sub.to_string();
        run_db(&state, move |db| db.delete_ticket(&tid, &uid)).await?
    };
    if !deleted {
        return Err(ApiError::NotFound("ticket"));
    }

    info!("Ticket {} deleted by {}", ticket_id, claims.sub);
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn scoped_ticket(
    state: &AppState,
    ticket_id: Uuid,
    user_id: Uuid,
) -> Result<beacon_db::models::TicketRow, ApiError> {
    let tid = ticket_id.to_string();
    let uid = user_id.to_string();
    run_db(state, move |db| db.get_ticket(&tid, &uid))
        .await?
        .ok_or(ApiError::NotFound("ticket"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_db::models::UserRow;

    fn user(sos_enabled: bool) -> UserRow {
        UserRow {
            id: "u1".into(),
            username: "asha".into(),
            password: "hash".into(),
            display_name: "Asha".into(),
            email: None,
            sos_enabled,
            created_at: "2026-08-30 09:00:00".into(),
        }
    }

    #[test]
    fn sos_disabled_account_is_forbidden() {
        let err = ensure_sos_enabled(&user(false)).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn sos_enabled_account_passes() {
        assert!(ensure_sos_enabled(&user(true)).is_ok());
    }

    #[test]
    fn coordinates_outside_range_are_rejected() {
        assert!(validate_coords(91.0, 0.0).is_err());
        assert!(validate_coords(0.0, 180.5).is_err());
        assert!(validate_coords(28.6139, 77.2090).is_ok());
    }

    #[test]
    fn future_timestamps_are_rejected() {
        let future = Utc::now() + chrono::Duration::hours(1);
        assert!(validate_not_future("created_at", future).is_err());
        assert!(validate_not_future("created_at", Utc::now() - chrono::Duration::hours(1)).is_ok());
    }
}
