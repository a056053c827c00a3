//! Application state shared across handlers.

use std::sync::Arc;

use database::Database;
use matching::{MatchingEngine, NotificationSender};

/// Engine type served by the dispatcher.
pub type Engine = MatchingEngine<Arc<dyn NotificationSender>>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection.
    pub db: Database,
    /// Matching engine.
    pub engine: Arc<Engine>,
}

impl AppState {
    /// Create new application state.
    pub fn new(db: Database, engine: Arc<Engine>) -> Self {
        Self { db, engine }
    }
}
