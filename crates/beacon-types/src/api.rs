use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    EmergencyContact, LocationPoint, MediaEvidence, PriorityReport, Station, TicketStatus,
};

// ── Auth ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// ── Tickets ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub station_id: Option<Uuid>,
    pub status: TicketStatus,
    pub priority: i64,
    pub transfer_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketDetailResponse {
    #[serde(flatten)]
    pub ticket: TicketResponse,
    pub locations: Vec<LocationPoint>,
    pub images: Vec<MediaEvidence>,
    pub audio: Vec<MediaEvidence>,
    pub videos: Vec<MediaEvidence>,
    pub analysis: Option<PriorityReport>,
}

#[derive(Debug, Serialize)]
pub struct TicketStatusResponse {
    pub id: Uuid,
    pub status: TicketStatus,
}

#[derive(Debug, Serialize)]
pub struct TicketSummaryResponse {
    pub id: Uuid,
    pub priority: i64,
    pub analysis: Option<PriorityReport>,
}

// ── Evidence ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AddLocationResponse {
    /// False when the point collapsed onto an existing same-second sample.
    pub added: bool,
    pub points: Vec<LocationPoint>,
}

#[derive(Debug, Deserialize)]
pub struct AddMediaRequest {
    pub source_url: String,
    pub bucket_ref: String,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AddMediaResponse {
    /// False when the bucket_ref was already registered (retry no-op).
    pub added: bool,
    pub items: Vec<MediaEvidence>,
}

// ── Contacts & stations ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub name: String,
    pub phone: String,
    pub relationship: String,
    pub email: Option<String>,
    pub linked_user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct ContactListResponse {
    pub contacts: Vec<EmergencyContact>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStationRequest {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StationListResponse {
    pub stations: Vec<Station>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BilingualSummary, CriticalInfo, MediaKind, PriorityScore};

    fn sample_report() -> PriorityReport {
        PriorityReport {
            critical: CriticalInfo {
                is_fake: false,
                threats: vec!["armed group".into()],
                location_text: Some("near the old bridge".into()),
                weapons: vec!["knife".into()],
            },
            priority: PriorityScore {
                score: 7,
                reason_en: "visible weapon".into(),
                reason_local: "दिखाई देने वाला हथियार".into(),
            },
            summary: BilingualSummary {
                summary_en: "Two people arguing, one armed".into(),
                summary_local: "दो लोग बहस कर रहे हैं, एक सशस्त्र".into(),
                confidence: 0.91,
            },
        }
    }

    #[test]
    fn ticket_detail_round_trips_nested_enrichment() {
        let now = Utc::now();
        let detail = TicketDetailResponse {
            ticket: TicketResponse {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                station_id: Some(Uuid::new_v4()),
                status: TicketStatus::Active,
                priority: 7,
                transfer_reason: None,
                created_at: now,
            },
            locations: vec![LocationPoint {
                latitude: 28.6139,
                longitude: 77.2090,
                observed_at: now,
            }],
            images: vec![MediaEvidence {
                id: Uuid::new_v4(),
                source_url: "https://cdn.example/img.jpg".into(),
                bucket_ref: "evidence/img-1".into(),
                observed_at: now,
                transcript: Some("street corner at night".into()),
                transcript_local: None,
            }],
            audio: vec![],
            videos: vec![MediaEvidence {
                id: Uuid::new_v4(),
                source_url: "https://cdn.example/vid.mp4".into(),
                bucket_ref: "evidence/vid-1".into(),
                observed_at: now,
                transcript: Some("Two people arguing, one armed".into()),
                transcript_local: Some("दो लोग बहस कर रहे हैं, एक सशस्त्र".into()),
            }],
            analysis: Some(sample_report()),
        };

        let json = serde_json::to_string(&detail).unwrap();
        let back: TicketDetailResponse = serde_json::from_str(&json).unwrap();

        assert_eq!(back.ticket.id, detail.ticket.id);
        assert_eq!(back.ticket.priority, 7);
        assert_eq!(back.locations.len(), 1);
        assert_eq!(back.images[0].transcript.as_deref(), Some("street corner at night"));
        assert_eq!(
            back.videos[0].transcript_local,
            detail.videos[0].transcript_local
        );
        let analysis = back.analysis.unwrap();
        assert_eq!(analysis.priority.score, 7);
        assert_eq!(analysis.critical.threats, vec!["armed group".to_string()]);
        assert!((analysis.summary.confidence - 0.91).abs() < 1e-9);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TicketStatus::Active).unwrap(), "\"active\"");
        assert_eq!(TicketStatus::parse("closed"), Some(TicketStatus::Closed));
        assert_eq!(TicketStatus::parse("archived"), None);
        assert_eq!(MediaKind::Video.as_str(), "video");
    }
}
