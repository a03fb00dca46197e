//! Task rows: the persistent link between an application and one queue job.
//!
//! Invariant: at most one task row per application aid. `replace_task`
//! enforces it with a delete-then-insert inside a single transaction
//! (last-writer-wins when launches race).

use crate::{Database, DbResult};

/// Persistent record linking an application to one external job handle.
#[derive(Debug, Clone)]
pub struct Task {
    /// The queue's job identifier.
    pub id: String,
    /// The owning application's external identifier (not the numeric id).
    pub application_aid: String,
    pub complete: bool,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for Task {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: row.try_get("id")?,
            application_aid: row.try_get("application_aid")?,
            complete: row.try_get("complete")?,
        })
    }
}

impl Database {
    /// Replace any existing task row for `application_aid` with a fresh one
    /// carrying `job_id`. Returns the new row.
    pub async fn replace_task(&self, application_aid: &str, job_id: &str) -> DbResult<Task> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM tasks WHERE application_aid = ?")
            .bind(application_aid)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO tasks (id, application_aid, complete) VALUES (?, ?, 0)")
            .bind(job_id)
            .bind(application_aid)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Task {
            id: job_id.to_string(),
            application_aid: application_aid.to_string(),
            complete: false,
        })
    }

    /// The task row for an application, if any.
    pub async fn get_task_for_application(
        &self,
        application_aid: &str,
    ) -> DbResult<Option<Task>> {
        let task = sqlx::query_as(
            "SELECT id, application_aid, complete FROM tasks WHERE application_aid = ?",
        )
        .bind(application_aid)
        .fetch_optional(self.pool())
        .await?;
        Ok(task)
    }

    /// Look a task up by job id.
    pub async fn get_task(&self, job_id: &str) -> DbResult<Option<Task>> {
        let task = sqlx::query_as(
            "SELECT id, application_aid, complete FROM tasks WHERE id = ?",
        )
        .bind(job_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(task)
    }

    /// Set the completion flag (100% milestone). A no-op when the row was
    /// already replaced by a newer launch.
    pub async fn complete_task(&self, job_id: &str) -> DbResult<()> {
        sqlx::query("UPDATE tasks SET complete = 1 WHERE id = ?")
            .bind(job_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewApplication, NewUser};

    async fn db_with_app(aid: &str) -> Database {
        let db = Database::new_in_memory().await.unwrap();
        let user = db
            .create_user(NewUser {
                username: "owner".to_string(),
                email: "owner@example.com".to_string(),
                company: "Owner Co".to_string(),
                password_hash: "$argon2id$fake".to_string(),
            })
            .await
            .unwrap();
        db.create_application(NewApplication {
            aid: aid.to_string(),
            name: "demo".to_string(),
            description: String::new(),
            user_id: user.id,
        })
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_replace_is_last_writer_wins() {
        let db = db_with_app("aid-1").await;

        db.replace_task("aid-1", "job-a").await.unwrap();
        db.replace_task("aid-1", "job-b").await.unwrap();

        // Exactly one row survives, carrying the second job's handle.
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE application_aid = 'aid-1'")
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(count.0, 1);

        let task = db.get_task_for_application("aid-1").await.unwrap().unwrap();
        assert_eq!(task.id, "job-b");
        assert!(!task.complete);
    }

    #[tokio::test]
    async fn test_new_task_starts_incomplete() {
        let db = db_with_app("aid-1").await;
        let task = db.replace_task("aid-1", "job-a").await.unwrap();
        assert!(!task.complete);

        db.complete_task("job-a").await.unwrap();
        let task = db.get_task("job-a").await.unwrap().unwrap();
        assert!(task.complete);
    }

    #[tokio::test]
    async fn test_complete_on_replaced_task_is_noop() {
        let db = db_with_app("aid-1").await;
        db.replace_task("aid-1", "job-a").await.unwrap();
        db.replace_task("aid-1", "job-b").await.unwrap();

        // The old job finishing late cannot resurrect its row.
        db.complete_task("job-a").await.unwrap();
        let task = db.get_task_for_application("aid-1").await.unwrap().unwrap();
        assert_eq!(task.id, "job-b");
        assert!(!task.complete);
    }

    #[tokio::test]
    async fn test_no_task_row_before_launch() {
        let db = db_with_app("aid-1").await;
        assert!(db.get_task_for_application("aid-1").await.unwrap().is_none());
    }
}
