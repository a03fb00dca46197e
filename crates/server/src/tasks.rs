// crates/server/src/tasks.rs
//! The task tracking record: maps an application to its one queue job.
//!
//! Launching replaces any previous task row for the application
//! (last-writer-wins), so only the most recent launch is ever observable
//! through the row, even if an older job is still running.

use std::sync::Arc;

use keyport_db::{Application, Database, DbResult, Task};
use keyport_queue::JobQueue;

/// Tracks at most one active background task per application.
#[derive(Clone)]
pub struct TaskTracker {
    db: Database,
    queue: Arc<JobQueue>,
}

impl TaskTracker {
    pub fn new(db: Database, queue: Arc<JobQueue>) -> Self {
        Self { db, queue }
    }

    /// Enqueue `job_name` for `app` and record the new job handle, deleting
    /// any pre-existing task row for the application first.
    pub async fn launch(
        &self,
        app: &Application,
        job_name: &str,
        user_id: i64,
    ) -> DbResult<Task> {
        let job_id = self.queue.enqueue(
            job_name,
            serde_json::json!({
                "application_id": app.id,
                "user_id": user_id,
            }),
        );
        let task = self.db.replace_task(&app.aid, &job_id).await?;
        tracing::info!(
            application_aid = %app.aid,
            job_name,
            job_id = %task.id,
            "task launched"
        );
        Ok(task)
    }

    /// True iff a task row exists for the application and its job reached
    /// the 100% milestone. False when no task was ever launched.
    pub async fn is_ready(&self, app: &Application) -> DbResult<bool> {
        let task = self.db.get_task_for_application(&app.aid).await?;
        Ok(task.map(|t| t.complete).unwrap_or(false))
    }

    /// Reported progress for a task's job, in [0,100].
    ///
    /// Returns 100 when the job handle cannot be resolved (expired or
    /// evicted). That is an assume-done fallback, not a completion signal:
    /// callers distinguish real success by cross-checking the task's
    /// `complete` flag.
    pub fn progress(&self, task: &Task) -> u8 {
        match self.queue.fetch_job(&task.id) {
            Some(snapshot) => snapshot.progress,
            None => 100,
        }
    }

    /// The current task row for an application, if any.
    pub async fn task_for(&self, app: &Application) -> DbResult<Option<Task>> {
        self.db.get_task_for_application(&app.aid).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyport_db::{NewApplication, NewUser};

    async fn tracker_with_app() -> (TaskTracker, Application) {
        let db = Database::new_in_memory().await.unwrap();
        let (queue, _intake) = JobQueue::new();
        let user = db
            .create_user(NewUser {
                username: "owner".to_string(),
                email: "owner@example.com".to_string(),
                company: "Owner Co".to_string(),
                password_hash: "$argon2id$fake".to_string(),
            })
            .await
            .unwrap();
        let app = db
            .create_application(NewApplication {
                aid: "aid-1".to_string(),
                name: "demo".to_string(),
                description: String::new(),
                user_id: user.id,
            })
            .await
            .unwrap();
        (TaskTracker::new(db, queue), app)
    }

    #[tokio::test]
    async fn test_relaunch_is_last_writer_wins() {
        let (tracker, app) = tracker_with_app().await;

        let first = tracker.launch(&app, "generate_key", 1).await.unwrap();
        let second = tracker.launch(&app, "renew_key", 1).await.unwrap();
        assert_ne!(first.id, second.id);

        let task = tracker.task_for(&app).await.unwrap().unwrap();
        assert_eq!(task.id, second.id);
    }

    #[tokio::test]
    async fn test_is_ready_lifecycle() {
        let (tracker, app) = tracker_with_app().await;

        // No task launched yet.
        assert!(!tracker.is_ready(&app).await.unwrap());

        let task = tracker.launch(&app, "generate_key", 1).await.unwrap();
        assert!(!tracker.is_ready(&app).await.unwrap());

        // Only the explicit 100% milestone flips readiness.
        tracker.db.complete_task(&task.id).await.unwrap();
        assert!(tracker.is_ready(&app).await.unwrap());
    }

    #[tokio::test]
    async fn test_progress_of_unknown_handle_is_100() {
        let (tracker, _app) = tracker_with_app().await;
        let ghost = Task {
            id: "evicted-job".to_string(),
            application_aid: "aid-1".to_string(),
            complete: false,
        };
        assert_eq!(tracker.progress(&ghost), 100);
    }

    #[tokio::test]
    async fn test_progress_tracks_queue_metadata() {
        let (tracker, app) = tracker_with_app().await;
        let task = tracker.launch(&app, "generate_key", 1).await.unwrap();

        assert_eq!(tracker.progress(&task), 0);
        tracker.queue.set_progress(&task.id, 75);
        assert_eq!(tracker.progress(&task), 75);
    }
}
