// crates/db/tests/portal_lifecycle_test.rs
//! Cross-table lifecycle: user -> application -> task -> notification, plus
//! cascade behavior on deletes.

use keyport_db::{Database, NewApplication, NewUser};

async fn seed_user(db: &Database, n: u32) -> keyport_db::User {
    db.create_user(NewUser {
        username: format!("user{n}"),
        email: format!("user{n}@example.com"),
        company: format!("Company {n}"),
        password_hash: "$argon2id$fake".to_string(),
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn task_rows_follow_application_lifecycle() {
    let db = Database::new_in_memory().await.unwrap();
    let user = seed_user(&db, 1).await;
    let app = db
        .create_application(NewApplication {
            aid: "aid-1".to_string(),
            name: "demo".to_string(),
            description: String::new(),
            user_id: user.id,
        })
        .await
        .unwrap();

    // Launch, relaunch: exactly one row, newest job wins.
    db.replace_task(&app.aid, "job-a").await.unwrap();
    db.replace_task(&app.aid, "job-b").await.unwrap();
    let task = db.get_task_for_application(&app.aid).await.unwrap().unwrap();
    assert_eq!(task.id, "job-b");

    // Deleting the application takes the task row with it.
    db.delete_application(&app.aid).await.unwrap();
    assert!(db.get_task_for_application("aid-1").await.unwrap().is_none());
    assert!(db.get_task("job-b").await.unwrap().is_none());
}

#[tokio::test]
async fn user_delete_cascades_everything() {
    let db = Database::new_in_memory().await.unwrap();
    let user = seed_user(&db, 1).await;
    let survivor = seed_user(&db, 2).await;

    let app = db
        .create_application(NewApplication {
            aid: "aid-1".to_string(),
            name: "demo".to_string(),
            description: String::new(),
            user_id: user.id,
        })
        .await
        .unwrap();
    db.replace_task(&app.aid, "job-a").await.unwrap();
    db.add_notification(user.id, "application_ready", &serde_json::json!({"message": "hi"}))
        .await
        .unwrap();
    db.add_notification(survivor.id, "application_ready", &serde_json::json!({"message": "hi"}))
        .await
        .unwrap();

    db.delete_user(user.id).await.unwrap();

    assert!(db.get_application("aid-1").await.unwrap().is_none());
    assert!(db.get_task("job-a").await.unwrap().is_none());
    let survivor = db.get_user(survivor.id).await.unwrap().unwrap();
    assert_eq!(db.unread_notifications(&survivor).await.unwrap().len(), 1);
}

#[tokio::test]
async fn partially_populated_application_is_readable() {
    let db = Database::new_in_memory().await.unwrap();
    let user = seed_user(&db, 1).await;
    let app = db
        .create_application(NewApplication {
            aid: "aid-1".to_string(),
            name: "demo".to_string(),
            description: String::new(),
            user_id: user.id,
        })
        .await
        .unwrap();

    // Mid-job state: public key landed, rest still empty. Readers see it.
    db.set_application_public_key(app.id, "PUBLIC").await.unwrap();
    let mid = db.get_application("aid-1").await.unwrap().unwrap();
    assert_eq!(mid.public_key, "PUBLIC");
    assert!(mid.private_key.is_empty());
    assert!(mid.fingerprint.is_empty());
}
