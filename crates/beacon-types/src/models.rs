use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an SOS ticket. Transitions are Active -> Closed only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Active,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Active => "active",
            TicketStatus::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(TicketStatus::Active),
            "closed" => Some(TicketStatus::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// One location sample on a ticket's trail. Deduplicated by `observed_at`
/// truncated to second precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: DateTime<Utc>,
}

/// One piece of uploaded evidence (image, audio or video). Deduplicated by
/// `bucket_ref` — retried upload-then-register calls collapse to one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaEvidence {
    pub id: Uuid,
    pub source_url: String,
    pub bucket_ref: String,
    pub observed_at: DateTime<Utc>,
    pub transcript: Option<String>,
    pub transcript_local: Option<String>,
}

/// AI-derived critical information extracted from a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriticalInfo {
    pub is_fake: bool,
    pub threats: Vec<String>,
    pub location_text: Option<String>,
    pub weapons: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityScore {
    pub score: i64,
    pub reason_en: String,
    pub reason_local: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BilingualSummary {
    pub summary_en: String,
    pub summary_local: String,
    pub confidence: f64,
}

/// Full per-video analysis produced by the enrichment service. The latest
/// report replaces the ticket's aggregated analysis wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityReport {
    pub critical: CriticalInfo,
    pub priority: PriorityScore,
    pub summary: BilingualSummary,
}

/// A responding authority (police station). Read-mostly; never mutated by
/// the ticket engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A person to be alerted when the owning user raises an SOS ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub id: Uuid,
    pub user_id: Uuid,
    pub linked_user_id: Option<Uuid>,
    pub name: String,
    pub phone: String,
    pub relationship: String,
    pub email: Option<String>,
}
