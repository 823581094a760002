use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use beacon_api::middleware::require_auth;
use beacon_api::{AppState, AppStateInner, auth, contacts, evidence, stations, tickets};
use beacon_enrich::{EnrichConfig, EnrichmentClient};
use beacon_notify::{HttpEmailGateway, HttpSmsGateway, Notifier, NotifyConfig};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret = env_or("BEACON_JWT_SECRET", "dev-secret-change-me");
    let db_path = env_or("BEACON_DB_PATH", "beacon.db");
    let host = env_or("BEACON_HOST", "0.0.0.0");
    let port: u16 = env_or("BEACON_PORT", "4000").parse()?;

    let enrich_config = EnrichConfig {
        base_url: env_or("BEACON_ENRICH_URL", "http://localhost:8500"),
        token: env_or("BEACON_ENRICH_TOKEN", ""),
        // media analysis is slow; bounded but generous
        timeout_secs: env_or("BEACON_ENRICH_TIMEOUT_SECS", "600").parse()?,
    };

    let notify_config = NotifyConfig {
        sms_enabled: env_or("BEACON_SMS_ENABLED", "true").parse()?,
        country_prefix: env_or("BEACON_SMS_COUNTRY_PREFIX", "+91"),
        deep_link_base: env_or("BEACON_DEEP_LINK_BASE", "https://app.beacon.example"),
    };
    let sms_url = env_or("BEACON_SMS_URL", "http://localhost:8600/sms");
    let sms_token = env_or("BEACON_SMS_TOKEN", "");
    let email_url = env_or("BEACON_EMAIL_URL", "http://localhost:8600/email");
    let email_token = env_or("BEACON_EMAIL_TOKEN", "");
    let channel_timeout: u64 = env_or("BEACON_CHANNEL_TIMEOUT_SECS", "30").parse()?;

    // Init database
    let db = beacon_db::Database::open(&PathBuf::from(&db_path))?;

    // Alert channels share one short-timeout client; enrichment gets its own
    let gateway_http = reqwest::Client::builder()
        .timeout(Duration::from_secs(channel_timeout))
        .build()?;
    let notifier = Notifier::new(
        Arc::new(HttpSmsGateway::new(gateway_http.clone(), sms_url, sms_token)),
        Arc::new(HttpEmailGateway::new(gateway_http, email_url, email_token)),
        notify_config,
    );
    let enrich = Arc::new(EnrichmentClient::new(&enrich_config)?);

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        notifier,
        enrich,
    });

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/ticket", post(tickets::create_ticket))
        .route("/tickets", get(tickets::list_tickets))
        .route("/ticket/{id}", get(tickets::get_ticket))
        .route("/ticket/{id}", delete(tickets::delete_ticket))
        .route("/ticket/{id}/close", put(tickets::close_ticket))
        .route("/ticket/{id}/status", get(tickets::get_status))
        .route("/ticket/{id}/summary", get(tickets::get_summary))
        .route("/ticket/{id}/location", get(evidence::get_locations))
        .route("/ticket/{id}/location", post(evidence::add_location))
        .route("/ticket/{id}/image", post(evidence::add_image))
        .route("/ticket/{id}/audio", post(evidence::add_audio))
        .route("/ticket/{id}/video", post(evidence::add_video))
        .route("/contacts", get(contacts::list_contacts))
        .route("/contacts", post(contacts::create_contact))
        .route("/stations", get(stations::list_stations))
        .route("/stations", post(stations::create_station))
        .layer(middleware::from_fn_with_state(app_state.clone(), require_auth))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Beacon server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn health() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
