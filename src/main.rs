use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use reservations::config::AppConfig;
use reservations::db;
use reservations::handlers;
use reservations::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    anyhow::ensure!(
        config.bookings_per_page > 0,
        "BOOKINGS_PER_PAGE must be positive, got {}",
        config.bookings_per_page
    );
    if config.nonce_secret.is_empty() || config.quicklink_secret.is_empty() {
        tracing::warn!("NONCE_SECRET or QUICKLINK_SECRET is empty; signatures are guessable");
    }

    let conn = db::init_db(&config.database_url)?;
    let port = config.port;
    let state = Arc::new(AppState::new(config, conn));

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/admin/statuses", get(handlers::admin::get_statuses))
        .route("/api/admin/nonce", get(handlers::admin::get_nonce))
        .route(
            "/api/admin/bookings",
            get(handlers::admin::get_bookings).post(handlers::admin::post_bookings),
        )
        .route(
            "/api/admin/booking-modal",
            post(handlers::admin::booking_modal),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
