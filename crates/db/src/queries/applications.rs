//! Application queries.
//!
//! An application row is created with empty key fields; the background job
//! fills `public_key`, `private_key`, and `fingerprint` one milestone at a
//! time, so readers must tolerate partially-populated rows.

use crate::{now_micros, Database, DbResult};

/// A registered application owned by a user.
#[derive(Debug, Clone)]
pub struct Application {
    pub id: i64,
    /// Externally-exposed opaque identifier. Generated once, immutable.
    pub aid: String,
    pub name: String,
    pub description: String,
    pub created_at: i64,
    pub public_key: String,
    pub private_key: String,
    pub fingerprint: String,
    pub user_id: i64,
}

impl<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> for Application {
    fn from_row(row: &'r sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Self {
            id: row.try_get("id")?,
            aid: row.try_get("aid")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            public_key: row.try_get("public_key")?,
            private_key: row.try_get("private_key")?,
            fingerprint: row.try_get("fingerprint")?,
            user_id: row.try_get("user_id")?,
        })
    }
}

/// Fields required to create an application. Key fields start empty.
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub aid: String,
    pub name: String,
    pub description: String,
    pub user_id: i64,
}

const SELECT_APPLICATION: &str = "SELECT id, aid, name, description, created_at, public_key, \
     private_key, fingerprint, user_id FROM applications";

impl Database {
    /// Insert a new application and return the stored row.
    pub async fn create_application(&self, new: NewApplication) -> DbResult<Application> {
        sqlx::query(
            "INSERT INTO applications (aid, name, description, created_at, user_id) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&new.aid)
        .bind(&new.name)
        .bind(&new.description)
        .bind(now_micros())
        .bind(new.user_id)
        .execute(self.pool())
        .await?;

        let app = self
            .get_application(&new.aid)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        Ok(app)
    }

    /// Fetch an application by its external identifier.
    pub async fn get_application(&self, aid: &str) -> DbResult<Option<Application>> {
        let app = sqlx::query_as(&format!("{SELECT_APPLICATION} WHERE aid = ?"))
            .bind(aid)
            .fetch_optional(self.pool())
            .await?;
        Ok(app)
    }

    /// Fetch an application by internal id (used by job functions, which are
    /// handed the numeric id).
    pub async fn get_application_by_id(&self, id: i64) -> DbResult<Option<Application>> {
        let app = sqlx::query_as(&format!("{SELECT_APPLICATION} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(app)
    }

    /// List a user's applications, oldest first.
    pub async fn list_applications(&self, user_id: i64) -> DbResult<Vec<Application>> {
        let apps = sqlx::query_as(&format!(
            "{SELECT_APPLICATION} WHERE user_id = ? ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(apps)
    }

    /// Find an application of `user_id` by name. Name uniqueness is scoped
    /// to the owner, not global.
    pub async fn find_application_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> DbResult<Option<Application>> {
        let app = sqlx::query_as(&format!(
            "{SELECT_APPLICATION} WHERE user_id = ? AND name = ?"
        ))
        .bind(user_id)
        .bind(name)
        .fetch_optional(self.pool())
        .await?;
        Ok(app)
    }

    /// Update the user-editable fields.
    pub async fn update_application(
        &self,
        aid: &str,
        name: &str,
        description: &str,
    ) -> DbResult<()> {
        sqlx::query("UPDATE applications SET name = ?, description = ? WHERE aid = ?")
            .bind(name)
            .bind(description)
            .bind(aid)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Delete an application (its task rows go with it via CASCADE).
    pub async fn delete_application(&self, aid: &str) -> DbResult<()> {
        sqlx::query("DELETE FROM applications WHERE aid = ?")
            .bind(aid)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Milestone write: persist the exported public key.
    pub async fn set_application_public_key(&self, id: i64, pem: &str) -> DbResult<()> {
        sqlx::query("UPDATE applications SET public_key = ? WHERE id = ?")
            .bind(pem)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Milestone write: persist the exported private key.
    pub async fn set_application_private_key(&self, id: i64, pem: &str) -> DbResult<()> {
        sqlx::query("UPDATE applications SET private_key = ? WHERE id = ?")
            .bind(pem)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Milestone write: persist the key fingerprint.
    pub async fn set_application_fingerprint(&self, id: i64, fingerprint: &str) -> DbResult<()> {
        sqlx::query("UPDATE applications SET fingerprint = ? WHERE id = ?")
            .bind(fingerprint)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NewUser;

    async fn db_with_user() -> (Database, i64) {
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
        (db, user.id)
    }

    fn new_app(aid: &str, name: &str, user_id: i64) -> NewApplication {
        NewApplication {
            aid: aid.to_string(),
            name: name.to_string(),
            description: String::new(),
            user_id,
        }
    }

    #[tokio::test]
    async fn test_create_starts_with_empty_key_fields() {
        let (db, uid) = db_with_user().await;
        let app = db.create_application(new_app("aid-1", "demo", uid)).await.unwrap();

        assert_eq!(app.aid, "aid-1");
        assert!(app.public_key.is_empty());
        assert!(app.private_key.is_empty());
        assert!(app.fingerprint.is_empty());
    }

    #[tokio::test]
    async fn test_name_lookup_is_scoped_to_owner() {
        let (db, uid) = db_with_user().await;
        let other = db
            .create_user(NewUser {
                username: "other".to_string(),
                email: "other@example.com".to_string(),
                company: "Other Co".to_string(),
                password_hash: "$argon2id$fake".to_string(),
            })
            .await
            .unwrap();

        db.create_application(new_app("aid-1", "demo", uid)).await.unwrap();

        assert!(db.find_application_by_name(uid, "demo").await.unwrap().is_some());
        // Same name under a different owner is free.
        assert!(db
            .find_application_by_name(other.id, "demo")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_milestone_writes_are_independent() {
        let (db, uid) = db_with_user().await;
        let app = db.create_application(new_app("aid-1", "demo", uid)).await.unwrap();

        db.set_application_public_key(app.id, "PUB").await.unwrap();
        let mid = db.get_application("aid-1").await.unwrap().unwrap();
        assert_eq!(mid.public_key, "PUB");
        assert!(mid.private_key.is_empty());

        db.set_application_private_key(app.id, "PRIV").await.unwrap();
        db.set_application_fingerprint(app.id, "abcd1234").await.unwrap();
        let done = db.get_application("aid-1").await.unwrap().unwrap();
        assert_eq!(done.private_key, "PRIV");
        assert_eq!(done.fingerprint, "abcd1234");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (db, uid) = db_with_user().await;
        db.create_application(new_app("aid-1", "demo", uid)).await.unwrap();

        db.update_application("aid-1", "renamed", "new text").await.unwrap();
        let app = db.get_application("aid-1").await.unwrap().unwrap();
        assert_eq!(app.name, "renamed");
        assert_eq!(app.description, "new text");

        db.delete_application("aid-1").await.unwrap();
        assert!(db.get_application("aid-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_orders_by_creation() {
        let (db, uid) = db_with_user().await;
        db.create_application(new_app("aid-1", "first", uid)).await.unwrap();
        db.create_application(new_app("aid-2", "second", uid)).await.unwrap();

        let apps = db.list_applications(uid).await.unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].name, "first");
        assert_eq!(apps[1].name, "second");
    }
}
