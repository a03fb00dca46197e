//! User account queries.

use crate::{now_micros, Database, DbResult};

/// A registered user account.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub company: String,
    pub password_hash: String,
    pub confirmed: bool,
    pub member_since: i64,
    pub last_seen: i64,
    /// Notification read watermark; `None` means nothing has been read yet.
    pub last_notification_read_at: Option<i64>,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for User {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            company: row.try_get("company")?,
            password_hash: row.try_get("password_hash")?,
            confirmed: row.try_get("confirmed")?,
            member_since: row.try_get("member_since")?,
            last_seen: row.try_get("last_seen")?,
            last_notification_read_at: row.try_get("last_notification_read_at")?,
        })
    }
}

/// Fields required to create a user. The password is already hashed by the
/// caller; raw passwords never reach this crate.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub company: String,
    pub password_hash: String,
}

const SELECT_USER: &str = "SELECT id, username, email, company, password_hash, confirmed, \
     member_since, last_seen, last_notification_read_at FROM users";

impl Database {
    /// Insert a new user and return the stored row.
    pub async fn create_user(&self, new: NewUser) -> DbResult<User> {
        let now = now_micros();
        let result = sqlx::query(
            "INSERT INTO users (username, email, company, password_hash, confirmed, member_since, last_seen) \
             VALUES (?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.company)
        .bind(&new.password_hash)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        let user = self.get_user(id).await?.ok_or(sqlx::Error::RowNotFound)?;
        Ok(user)
    }

    /// Fetch a user by internal id.
    pub async fn get_user(&self, id: i64) -> DbResult<Option<User>> {
        let user = sqlx::query_as(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    /// Fetch a user by email (login lookup).
    pub async fn get_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as(&format!("{SELECT_USER} WHERE email = ?"))
            .bind(email)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    /// Fetch a user by username (registration uniqueness check).
    pub async fn get_user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as(&format!("{SELECT_USER} WHERE username = ?"))
            .bind(username)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    /// Fetch a user by company name (registration uniqueness check).
    pub async fn get_user_by_company(&self, company: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as(&format!("{SELECT_USER} WHERE company = ?"))
            .bind(company)
            .fetch_optional(self.pool())
            .await?;
        Ok(user)
    }

    /// Flip the confirmed flag after a valid confirmation token.
    pub async fn set_user_confirmed(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE users SET confirmed = 1 WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Replace the stored password hash.
    pub async fn update_user_password(&self, id: i64, password_hash: &str) -> DbResult<()> {
        sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Update profile fields.
    pub async fn update_user_profile(
        &self,
        id: i64,
        username: &str,
        email: &str,
        company: &str,
    ) -> DbResult<()> {
        sqlx::query("UPDATE users SET username = ?, email = ?, company = ? WHERE id = ?")
            .bind(username)
            .bind(email)
            .bind(company)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Record activity on an authenticated request.
    pub async fn ping_user(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_seen = ? WHERE id = ?")
            .bind(now_micros())
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Delete a user. Owned applications, their tasks, and notifications go
    /// with it (ON DELETE CASCADE).
    pub async fn delete_user(&self, id: i64) -> DbResult<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
