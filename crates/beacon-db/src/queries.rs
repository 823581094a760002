use crate::Database;
use crate::models::{ContactRow, LocationRow, MediaRow, StationRow, TicketRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        display_name: &str,
        email: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, password, display_name, email)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, username, password_hash, display_name, email],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username", username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    // -- Tickets --

    /// Insert a new Active ticket together with its seed location point.
    pub fn create_ticket(
        &self,
        id: &str,
        user_id: &str,
        station_id: Option<&str>,
        latitude: f64,
        longitude: f64,
        created_at: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO tickets (id, user_id, station_id, status, priority, created_at)
                 VALUES (?1, ?2, ?3, 'active', 0, ?4)",
                rusqlite::params![id, user_id, station_id, created_at],
            )?;
            conn.execute(
                "INSERT INTO ticket_locations (ticket_id, latitude, longitude, observed_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, latitude, longitude, created_at],
            )?;
            Ok(())
        })
    }

    /// Close every Active ticket owned by `user_id`. Returns how many were closed.
    pub fn close_active_for_user(&self, user_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE tickets SET status = 'closed' WHERE user_id = ?1 AND status = 'active'",
                [user_id],
            )?;
            Ok(n)
        })
    }

    /// Close one ticket scoped to (ticket, owner). Returns false if no such ticket.
    pub fn close_ticket(&self, ticket_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE tickets SET status = 'closed' WHERE id = ?1 AND user_id = ?2",
                [ticket_id, user_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Scoped lookup — ticket queries always pair (ticket id, user id) to
    /// prevent cross-user access.
    pub fn get_ticket(&self, ticket_id: &str, user_id: &str) -> Result<Option<TicketRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, station_id, status, priority, analysis, transfer_reason, created_at
                 FROM tickets WHERE id = ?1 AND user_id = ?2",
            )?;
            let row = stmt
                .query_row([ticket_id, user_id], map_ticket_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn list_tickets_for_user(&self, user_id: &str) -> Result<Vec<TicketRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, station_id, status, priority, analysis, transfer_reason, created_at
                 FROM tickets WHERE user_id = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], map_ticket_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn delete_ticket(&self, ticket_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM tickets WHERE id = ?1 AND user_id = ?2",
                [ticket_id, user_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Replace the aggregated analysis wholesale and overwrite the priority
    /// score with the latest report's value.
    pub fn set_ticket_analysis(&self, ticket_id: &str, analysis_json: &str, priority: i64) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE tickets SET analysis = ?2, priority = ?3 WHERE id = ?1",
                rusqlite::params![ticket_id, analysis_json, priority],
            )?;
            Ok(())
        })
    }

    // -- Locations --

    /// Merge a location point keyed by second-truncated timestamp.
    /// A same-timestamp entry is overwritten with the new coordinates.
    /// Returns true when this was a net-new point.
    pub fn upsert_location(
        &self,
        ticket_id: &str,
        latitude: f64,
        longitude: f64,
        observed_at: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let existing: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM ticket_locations WHERE ticket_id = ?1 AND observed_at = ?2",
                    [ticket_id, observed_at],
                    |row| row.get(0),
                )
                .optional()?;

            if existing.is_some() {
                conn.execute(
                    "UPDATE ticket_locations SET latitude = ?3, longitude = ?4
                     WHERE ticket_id = ?1 AND observed_at = ?2",
                    rusqlite::params![ticket_id, observed_at, latitude, longitude],
                )?;
                Ok(false)
            } else {
                conn.execute(
                    "INSERT INTO ticket_locations (ticket_id, latitude, longitude, observed_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    rusqlite::params![ticket_id, latitude, longitude, observed_at],
                )?;
                Ok(true)
            }
        })
    }

    pub fn get_locations(&self, ticket_id: &str) -> Result<Vec<LocationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT ticket_id, latitude, longitude, observed_at
                 FROM ticket_locations WHERE ticket_id = ?1 ORDER BY observed_at",
            )?;
            let rows = stmt
                .query_map([ticket_id], |row| {
                    Ok(LocationRow {
                        ticket_id: row.get(0)?,
                        latitude: row.get(1)?,
                        longitude: row.get(2)?,
                        observed_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Media evidence --

    /// Insert a media item unless one with the same bucket_ref already exists
    /// for this (ticket, kind). Returns true when inserted.
    pub fn insert_media(
        &self,
        id: &str,
        ticket_id: &str,
        kind: &str,
        source_url: &str,
        bucket_ref: &str,
        observed_at: &str,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM ticket_media WHERE ticket_id = ?1 AND kind = ?2 AND bucket_ref = ?3",
                    [ticket_id, kind, bucket_ref],
                    |row| row.get(0),
                )
                .optional()?;

            if existing.is_some() {
                return Ok(false);
            }

            conn.execute(
                "INSERT INTO ticket_media (id, ticket_id, kind, source_url, bucket_ref, observed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, ticket_id, kind, source_url, bucket_ref, observed_at],
            )?;
            Ok(true)
        })
    }

    pub fn list_media(&self, ticket_id: &str, kind: &str) -> Result<Vec<MediaRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, ticket_id, kind, source_url, bucket_ref, observed_at, transcript, transcript_local
                 FROM ticket_media WHERE ticket_id = ?1 AND kind = ?2 ORDER BY observed_at",
            )?;
            let rows = stmt
                .query_map([ticket_id, kind], map_media_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_media(&self, ticket_id: &str, kind: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM ticket_media WHERE ticket_id = ?1 AND kind = ?2",
                [ticket_id, kind],
                |row| row.get(0),
            )?;
            Ok(n)
        })
    }

    pub fn update_media_transcript(
        &self,
        ticket_id: &str,
        kind: &str,
        bucket_ref: &str,
        transcript: &str,
        transcript_local: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE ticket_media SET transcript = ?4, transcript_local = ?5
                 WHERE ticket_id = ?1 AND kind = ?2 AND bucket_ref = ?3",
                rusqlite::params![ticket_id, kind, bucket_ref, transcript, transcript_local],
            )?;
            Ok(())
        })
    }

    // -- Stations --

    pub fn create_station(&self, row: &StationRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO stations (id, name, address, phone, email, latitude, longitude, api_key)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    row.id,
                    row.name,
                    row.address,
                    row.phone,
                    row.email,
                    row.latitude,
                    row.longitude,
                    row.api_key,
                ],
            )?;
            Ok(())
        })
    }

    /// Bounding-box prefilter for nearest-station resolution. Only stations
    /// with non-null coordinates inside the box are returned; ranking by
    /// true distance happens in beacon-geo.
    pub fn stations_in_box(
        &self,
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
    ) -> Result<Vec<StationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, address, phone, email, latitude, longitude, api_key
                 FROM stations
                 WHERE latitude IS NOT NULL AND longitude IS NOT NULL
                   AND latitude BETWEEN ?1 AND ?2
                   AND longitude BETWEEN ?3 AND ?4",
            )?;
            let rows = stmt
                .query_map(
                    rusqlite::params![lat_min, lat_max, lon_min, lon_max],
                    map_station_row,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_stations(&self) -> Result<Vec<StationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, address, phone, email, latitude, longitude, api_key
                 FROM stations ORDER BY name",
            )?;
            let rows = stmt
                .query_map([], map_station_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Emergency contacts --

    pub fn create_contact(&self, row: &ContactRow) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO contacts (id, user_id, linked_user_id, name, phone, relationship, email)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    row.id,
                    row.user_id,
                    row.linked_user_id,
                    row.name,
                    row.phone,
                    row.relationship,
                    row.email,
                ],
            )?;
            Ok(())
        })
    }

    pub fn contacts_for_user(&self, user_id: &str) -> Result<Vec<ContactRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, linked_user_id, name, phone, relationship, email
                 FROM contacts WHERE user_id = ?1 ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ContactRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        linked_user_id: row.get(2)?,
                        name: row.get(3)?,
                        phone: row.get(4)?,
                        relationship: row.get(5)?,
                        email: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // column is a compile-time constant ("id" / "username"), never user input
    let sql = format!(
        "SELECT id, username, password, display_name, email, sos_enabled, created_at
         FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                display_name: row.get(3)?,
                email: row.get(4)?,
                sos_enabled: row.get(5)?,
                created_at: row.get(6)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn map_ticket_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TicketRow> {
    Ok(TicketRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        station_id: row.get(2)?,
        status: row.get(3)?,
        priority: row.get(4)?,
        analysis: row.get(5)?,
        transfer_reason: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_media_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MediaRow> {
    Ok(MediaRow {
        id: row.get(0)?,
        ticket_id: row.get(1)?,
        kind: row.get(2)?,
        source_url: row.get(3)?,
        bucket_ref: row.get(4)?,
        observed_at: row.get(5)?,
        transcript: row.get(6)?,
        transcript_local: row.get(7)?,
    })
}

fn map_station_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StationRow> {
    Ok(StationRow {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        phone: row.get(3)?,
        email: row.get(4)?,
        latitude: row.get(5)?,
        longitude: row.get(6)?,
        api_key: row.get(7)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
