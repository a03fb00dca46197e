//! Append-only per-user notification log with a "last read" watermark.
//!
//! Notifications are never mutated or deleted individually; marking read
//! advances the owner's watermark instead.

use crate::{now_micros, Database, DbResult, User};

/// One event in a user's notification log.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: i64,
    /// Category name, e.g. `unread_message_count`.
    pub name: String,
    pub user_id: i64,
    pub timestamp: i64,
    pub payload_json: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for Notification {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            user_id: row.try_get("user_id")?,
            timestamp: row.try_get("timestamp")?,
            payload_json: row.try_get("payload_json")?,
        })
    }
}

impl Notification {
    /// Parse the payload blob. Malformed JSON yields `Value::Null` rather
    /// than an error; the log is append-only and a bad row must not poison
    /// the whole listing.
    pub fn payload(&self) -> serde_json::Value {
        serde_json::from_str(&self.payload_json).unwrap_or(serde_json::Value::Null)
    }

    /// Look one key up in the payload. Absent keys yield `None`.
    pub fn payload_value(&self, key: &str) -> Option<serde_json::Value> {
        self.payload().get(key).cloned()
    }

    /// The human-readable message, when the payload carries one.
    pub fn message(&self) -> Option<String> {
        self.payload_value("message")
            .and_then(|v| v.as_str().map(|s| s.to_string()))
    }
}

impl Database {
    /// Append a notification. Committed immediately, independent of any
    /// caller transaction.
    pub async fn add_notification(
        &self,
        user_id: i64,
        name: &str,
        payload: &serde_json::Value,
    ) -> DbResult<Notification> {
        let timestamp = now_micros();
        let payload_json = payload.to_string();
        let result = sqlx::query(
            "INSERT INTO notifications (name, user_id, timestamp, payload_json) VALUES (?, ?, ?, ?)",
        )
        .bind(name)
        .bind(user_id)
        .bind(timestamp)
        .bind(&payload_json)
        .execute(self.pool())
        .await?;

        Ok(Notification {
            id: result.last_insert_rowid(),
            name: name.to_string(),
            user_id,
            timestamp,
            payload_json,
        })
    }

    /// All notifications for `user` newer than their read watermark, in
    /// insertion order.
    pub async fn unread_notifications(&self, user: &User) -> DbResult<Vec<Notification>> {
        let watermark = user.last_notification_read_at.unwrap_or(0);
        let rows = sqlx::query_as(
            "SELECT id, name, user_id, timestamp, payload_json FROM notifications \
             WHERE user_id = ? AND timestamp > ? ORDER BY timestamp ASC, id ASC",
        )
        .bind(user.id)
        .bind(watermark)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    /// Advance the user's watermark to now ("mark all as read").
    pub async fn mark_notifications_read(&self, user_id: i64) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_notification_read_at = ? WHERE id = ?")
            .bind(now_micros())
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
