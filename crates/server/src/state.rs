// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use keyport_db::Database;
use keyport_queue::JobQueue;

use crate::auth::TokenService;
use crate::mailer::Mailer;
use crate::tasks::TaskTracker;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Database handle.
    pub db: Database,
    /// Job queue handle (enqueue + progress lookups).
    pub queue: Arc<JobQueue>,
    /// Task tracking record over `db` + `queue`.
    pub tracker: TaskTracker,
    /// Token issuance and verification.
    pub tokens: TokenService,
    /// Fire-and-forget transactional mail.
    pub mailer: Mailer,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(
        db: Database,
        queue: Arc<JobQueue>,
        tokens: TokenService,
        mailer: Mailer,
    ) -> Arc<Self> {
        let tracker = TaskTracker::new(db.clone(), Arc::clone(&queue));
        Arc::new(Self {
            start_time: Instant::now(),
            db,
            queue,
            tracker,
            tokens,
            mailer,
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_app_state_new() {
        let db = Database::new_in_memory().await.expect("in-memory DB");
        let (queue, _intake) = JobQueue::new();
        let state = AppState::new(
            db,
            queue,
            TokenService::new(b"test-secret"),
            Mailer::new(None),
        );
        assert!(state.uptime_secs() < 5);
    }
}
