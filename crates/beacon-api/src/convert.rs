//! Row -> API model conversions. Corrupt stored values are logged and
//! replaced with defaults rather than failing the read.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use beacon_db::SECOND_FMT;
use beacon_db::models::{ContactRow, LocationRow, MediaRow, StationRow, TicketRow};
use beacon_types::api::TicketResponse;
use beacon_types::models::{
    EmergencyContact, LocationPoint, MediaEvidence, PriorityReport, Station, TicketStatus,
};

pub fn parse_uuid(field: &str, value: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", field, value, e);
        Uuid::default()
    })
}

pub fn parse_ts(field: &str, value: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
            // Parse as naive UTC and convert.
            NaiveDateTime::parse_from_str(value, SECOND_FMT).map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}': {}", field, value, e);
            DateTime::default()
        })
}

pub fn ticket_response(row: &TicketRow) -> TicketResponse {
    TicketResponse {
        id: parse_uuid("ticket id", &row.id),
        user_id: parse_uuid("user_id", &row.user_id),
        station_id: row.station_id.as_deref().map(|s| parse_uuid("station_id", s)),
        status: TicketStatus::parse(&row.status).unwrap_or_else(|| {
            warn!("Corrupt status '{}' on ticket '{}'", row.status, row.id);
            TicketStatus::Closed
        }),
        priority: row.priority,
        transfer_reason: row.transfer_reason.clone(),
        created_at: parse_ts("created_at", &row.created_at),
    }
}

pub fn parse_analysis(row: &TicketRow) -> Option<PriorityReport> {
    row.analysis.as_deref().and_then(|s| match serde_json::from_str(s) {
        Ok(report) => Some(report),
        Err(e) => {
            warn!("Corrupt analysis on ticket '{}': {}", row.id, e);
            None
        }
    })
}

pub fn location_point(row: &LocationRow) -> LocationPoint {
    LocationPoint {
        latitude: row.latitude,
        longitude: row.longitude,
        observed_at: parse_ts("observed_at", &row.observed_at),
    }
}

pub fn media_item(row: &MediaRow) -> MediaEvidence {
    MediaEvidence {
        id: parse_uuid("media id", &row.id),
        source_url: row.source_url.clone(),
        bucket_ref: row.bucket_ref.clone(),
        observed_at: parse_ts("observed_at", &row.observed_at),
        transcript: row.transcript.clone(),
        transcript_local: row.transcript_local.clone(),
    }
}

pub fn station(row: &StationRow) -> Station {
    Station {
        id: parse_uuid("station id", &row.id),
        name: row.name.clone(),
        address: row.address.clone(),
        phone: row.phone.clone(),
        email: row.email.clone(),
        latitude: row.latitude,
        longitude: row.longitude,
    }
}

pub fn contact(row: &ContactRow) -> EmergencyContact {
    EmergencyContact {
        id: parse_uuid("contact id", &row.id),
        user_id: parse_uuid("user_id", &row.user_id),
        linked_user_id: row.linked_user_id.as_deref().map(|s| parse_uuid("linked_user_id", s)),
        name: row.name.clone(),
        phone: row.phone.clone(),
        relationship: row.relationship.clone(),
        email: row.email.clone(),
    }
}
