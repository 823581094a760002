use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            display_name    TEXT NOT NULL,
            email           TEXT,
            sos_enabled     INTEGER NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS stations (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            address     TEXT NOT NULL,
            phone       TEXT NOT NULL,
            email       TEXT NOT NULL,
            latitude    REAL,
            longitude   REAL,
            api_key     TEXT,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_stations_coords
            ON stations(latitude, longitude);

        CREATE TABLE IF NOT EXISTS tickets (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL REFERENCES users(id),
            station_id      TEXT REFERENCES stations(id),
            status          TEXT NOT NULL DEFAULT 'active',
            priority        INTEGER NOT NULL DEFAULT 0,
            analysis        TEXT,
            transfer_reason TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_tickets_user
            ON tickets(user_id, status);

        CREATE TABLE IF NOT EXISTS ticket_locations (
            ticket_id   TEXT NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
            latitude    REAL NOT NULL,
            longitude   REAL NOT NULL,
            observed_at TEXT NOT NULL,
            UNIQUE(ticket_id, observed_at)
        );

        CREATE TABLE IF NOT EXISTS ticket_media (
            id               TEXT PRIMARY KEY,
            ticket_id        TEXT NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
            kind             TEXT NOT NULL,
            source_url       TEXT NOT NULL,
            bucket_ref       TEXT NOT NULL,
            observed_at      TEXT NOT NULL,
            transcript       TEXT,
            transcript_local TEXT,
            UNIQUE(ticket_id, kind, bucket_ref)
        );

        CREATE INDEX IF NOT EXISTS idx_media_ticket
            ON ticket_media(ticket_id, kind, observed_at);

        CREATE TABLE IF NOT EXISTS contacts (
            id              TEXT PRIMARY KEY,
            user_id         TEXT NOT NULL REFERENCES users(id),
            linked_user_id  TEXT,
            name            TEXT NOT NULL,
            phone           TEXT NOT NULL,
            relationship    TEXT NOT NULL,
            email           TEXT,
            created_at      TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_contacts_user
            ON contacts(user_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
