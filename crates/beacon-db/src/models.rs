/// Database row types — these map directly to SQLite rows.
/// Distinct from beacon-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub email: Option<String>,
    pub sos_enabled: bool,
    pub created_at: String,
}

pub struct TicketRow {
    pub id: String,
    pub user_id: String,
    pub station_id: Option<String>,
    pub status: String,
    pub priority: i64,
    pub analysis: Option<String>,
    pub transfer_reason: Option<String>,
    pub created_at: String,
}

pub struct LocationRow {
    pub ticket_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: String,
}

pub struct MediaRow {
    pub id: String,
    pub ticket_id: String,
    pub kind: String,
    pub source_url: String,
    pub bucket_ref: String,
    pub observed_at: String,
    pub transcript: Option<String>,
    pub transcript_local: Option<String>,
}

#[derive(Clone)]
pub struct StationRow {
    pub id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub api_key: Option<String>,
}

pub struct ContactRow {
    pub id: String,
    pub user_id: String,
    pub linked_user_id: Option<String>,
    pub name: String,
    pub phone: String,
    pub relationship: String,
    pub email: Option<String>,
}
