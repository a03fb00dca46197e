/// Inline SQL migrations for the keyport database schema.
///
/// We use simple inline migrations rather than sqlx migration files
/// because the schema is small and self-contained.

pub const MIGRATIONS: &[&str] = &[
    // Migration 1: users table
    r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    company TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    confirmed INTEGER NOT NULL DEFAULT 0,
    member_since INTEGER NOT NULL,
    last_seen INTEGER NOT NULL,
    last_notification_read_at INTEGER
);
"#,
    // Migration 2: applications table. `aid` is the externally-exposed
    // identifier; `id` never leaves the server except in notification
    // payloads.
    r#"
CREATE TABLE IF NOT EXISTS applications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    aid TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    public_key TEXT NOT NULL DEFAULT '',
    private_key TEXT NOT NULL DEFAULT '',
    fingerprint TEXT NOT NULL DEFAULT '',
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
);
"#,
    r#"
CREATE INDEX IF NOT EXISTS idx_applications_user ON applications(user_id);
"#,
    // Migration 3: tasks table. One row per application aid at most; the
    // row id is the queue's job id.
    r#"
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    application_aid TEXT NOT NULL REFERENCES applications(aid) ON DELETE CASCADE,
    complete INTEGER NOT NULL DEFAULT 0
);
"#,
    r#"
CREATE INDEX IF NOT EXISTS idx_tasks_application ON tasks(application_aid);
"#,
    // Migration 4: notifications table (append-only)
    r#"
CREATE TABLE IF NOT EXISTS notifications (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    timestamp INTEGER NOT NULL,
    payload_json TEXT NOT NULL
);
"#,
    r#"
CREATE INDEX IF NOT EXISTS idx_notifications_user_time ON notifications(user_id, timestamp);
"#,
];
