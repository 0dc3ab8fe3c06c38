use std::env;

use crate::services::lister::DEFAULT_PER_PAGE;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    pub viewer_token: Option<String>,
    pub nonce_secret: String,
    pub quicklink_secret: String,
    pub bookings_per_page: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "reservations.db".to_string()),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or_else(|_| "changeme".to_string()),
            viewer_token: env::var("VIEWER_TOKEN").ok().filter(|v| !v.is_empty()),
            nonce_secret: env::var("NONCE_SECRET").unwrap_or_default(),
            quicklink_secret: env::var("QUICKLINK_SECRET").unwrap_or_default(),
            bookings_per_page: env::var("BOOKINGS_PER_PAGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PER_PAGE),
        }
    }
}
