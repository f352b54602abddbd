use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clubhouse_events::{Mailer, NotificationService};

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone: every field is a pool handle or behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: clubhouse_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// Order notifications, logging and retry.
    pub notifications: NotificationService,
    /// Set once a superuser exists; never cleared.
    setup_complete: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(pool: clubhouse_db::DbPool, config: ServerConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            notifications: NotificationService::new(pool.clone(), mailer),
            pool,
            config: Arc::new(config),
            setup_complete: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_setup_complete(&self) -> bool {
        self.setup_complete.load(Ordering::Acquire)
    }

    pub fn mark_setup_complete(&self) {
        self.setup_complete.store(true, Ordering::Release);
    }
}
