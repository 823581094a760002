pub mod auth;
pub mod contacts;
mod convert;
pub mod error;
pub mod evidence;
pub mod middleware;
pub mod stations;
pub mod tickets;

use std::sync::Arc;

use beacon_db::Database;
use beacon_enrich::EnrichmentApi;
use beacon_notify::Notifier;

use crate::error::ApiError;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub notifier: Notifier,
    pub enrich: Arc<dyn EnrichmentApi>,
}

pub type AppState = Arc<AppStateInner>;

/// Run blocking DB work off the async runtime.
pub(crate) async fn run_db<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("spawn_blocking join error: {}", e)))?
        .map_err(ApiError::Internal)
}
