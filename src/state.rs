//! Application state shared by every handler.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::events::EventSender;

/// Application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Arc<AppConfig>,
    /// Best-effort side channel for achievements and notifications
    pub events: EventSender,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig, events: EventSender) -> Self {
        Self {
            db,
            config: Arc::new(config),
            events,
        }
    }
}
