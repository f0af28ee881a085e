//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::{DbAdapter, LogSink};
use crate::config::Config;
use inventory_core::ports::{MaterialStore, SessionStore, UserStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. Stores are held behind their ports so handlers never depend on
/// the concrete persistence backend.
#[derive(Clone)]
pub struct AppState {
    pub materials: Arc<dyn MaterialStore>,
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub oplog: Arc<LogSink>,
    pub config: Arc<Config>,
    /// Kept for the liveness probe; everything else goes through the ports.
    pub db: Arc<DbAdapter>,
}

impl AppState {
    pub fn new(db: DbAdapter, config: Arc<Config>) -> Self {
        let db = Arc::new(db);
        Self {
            materials: db.clone(),
            users: db.clone(),
            sessions: db.clone(),
            oplog: Arc::new(LogSink::new(config.operation_log_capacity)),
            config,
            db,
        }
    }
}
