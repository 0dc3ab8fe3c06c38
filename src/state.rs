use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::services::booking_form::{BookingValidator, StandardValidator};
use crate::services::gate::{AdminRequestGate, TokenGate};
use crate::services::notifier::{BookingNotifier, LogNotifier};
use crate::services::quicklink::QuicklinkSigner;
use crate::services::transitions::ActionRegistry;
use crate::store::{BookingStore, SqliteBookingStore};

pub struct AppState {
    pub store: Arc<dyn BookingStore>,
    pub config: AppConfig,
    pub gate: Box<dyn AdminRequestGate>,
    pub quicklinks: QuicklinkSigner,
    pub actions: ActionRegistry,
    pub validator: Box<dyn BookingValidator>,
    pub notifier: Box<dyn BookingNotifier>,
}

impl AppState {
    pub fn new(config: AppConfig, conn: Connection) -> Self {
        let gate = TokenGate::new(
            config.admin_token.clone(),
            config.viewer_token.clone(),
            config.nonce_secret.clone(),
        );
        Self {
            store: Arc::new(SqliteBookingStore::new(Arc::new(Mutex::new(conn)))),
            quicklinks: QuicklinkSigner::new(config.quicklink_secret.clone()),
            gate: Box::new(gate),
            actions: ActionRegistry::new(),
            validator: Box::new(StandardValidator),
            notifier: Box::new(LogNotifier),
            config,
        }
    }
}
