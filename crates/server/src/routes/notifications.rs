// crates/server/src/routes/notifications.rs
//! Unread-notification polling and the read watermark.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::auth::ConfirmedUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
struct NotificationResponse {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    relative_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    application_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    link: Option<String>,
}

impl NotificationResponse {
    fn from_notification(n: &keyport_db::Notification) -> Self {
        let string_field = |key: &str| {
            n.payload_value(key)
                .and_then(|v| v.as_str().map(|s| s.to_string()))
        };
        Self {
            name: n.name.clone(),
            message: n.message(),
            relative_time: relative_time(n.timestamp, keyport_db::now_micros()),
            application_id: n.payload_value("applicationId").and_then(|v| v.as_i64()),
            fingerprint: string_field("fingerprint"),
            status_message: string_field("statusMessage"),
            link: string_field("applicationAid").map(|aid| format!("/api/applications/{aid}")),
        }
    }
}

/// Humanize the age of a timestamp (microseconds epoch).
fn relative_time(timestamp_micros: i64, now_micros: i64) -> String {
    let secs = (now_micros - timestamp_micros).max(0) / 1_000_000;
    match secs {
        0..=44 => "just now".to_string(),
        45..=89 => "a minute ago".to_string(),
        90..=2699 => format!("{} minutes ago", (secs + 30) / 60),
        2700..=5399 => "an hour ago".to_string(),
        5400..=79199 => format!("{} hours ago", (secs + 1800) / 3600),
        79200..=129599 => "a day ago".to_string(),
        _ => format!("{} days ago", (secs + 43200) / 86400),
    }
}

/// GET /api/notifications - Unread notifications, oldest first.
async fn unread(
    State(state): State<Arc<AppState>>,
    ConfirmedUser(user): ConfirmedUser,
) -> ApiResult<Json<Vec<NotificationResponse>>> {
    let notifications = state.db.unread_notifications(&user).await?;
    Ok(Json(
        notifications
            .iter()
            .map(NotificationResponse::from_notification)
            .collect(),
    ))
}

/// POST /api/notifications/reset - Advance the read watermark ("mark all as
/// read"); nothing is deleted.
async fn reset(
    State(state): State<Arc<AppState>>,
    ConfirmedUser(user): ConfirmedUser,
) -> ApiResult<Json<serde_json::Value>> {
    state.db.mark_notifications_read(user.id).await?;
    Ok(Json(serde_json::json!({})))
}

/// Create the notifications routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(unread))
        .route("/reset", post(reset))
}

#[cfg(test)]
mod tests {
    use super::relative_time;
    use crate::routes::test_helpers::{confirmed_user_token, request_json, test_app};
    use axum::http::StatusCode;
    use axum::Router;
    use std::time::Duration;

    const MICROS: i64 = 1_000_000;

    #[test]
    fn test_relative_time_buckets() {
        let now = 1_700_000_000 * MICROS;
        assert_eq!(relative_time(now, now), "just now");
        assert_eq!(relative_time(now - 30 * MICROS, now), "just now");
        assert_eq!(relative_time(now - 60 * MICROS, now), "a minute ago");
        assert_eq!(relative_time(now - 10 * 60 * MICROS, now), "10 minutes ago");
        assert_eq!(relative_time(now - 3600 * MICROS, now), "an hour ago");
        assert_eq!(relative_time(now - 5 * 3600 * MICROS, now), "5 hours ago");
        assert_eq!(relative_time(now - 24 * 3600 * MICROS, now), "a day ago");
        assert_eq!(relative_time(now - 72 * 3600 * MICROS, now), "3 days ago");
        // A clock skewed into the future still renders sanely.
        assert_eq!(relative_time(now + 60 * MICROS, now), "just now");
    }

    async fn wait_for_notifications(
        app: &Router,
        token: &str,
        count: usize,
    ) -> serde_json::Value {
        for _ in 0..400 {
            let (status, body) =
                request_json(app, "GET", "/api/notifications", Some(token), None).await;
            assert_eq!(status, StatusCode::OK);
            if body.as_array().map(|a| a.len()) == Some(count) {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("never saw {count} notifications");
    }

    #[tokio::test]
    async fn test_job_completion_surfaces_notification() {
        let (app, state) = test_app().await;
        let token = confirmed_user_token(&app, &state, "john", "john@example.com").await;

        let (status, created) = request_json(
            &app,
            "POST",
            "/api/applications",
            Some(&token),
            Some(serde_json::json!({"name": "demo"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let aid = created["aid"].as_str().unwrap();

        let body = wait_for_notifications(&app, &token, 1).await;
        let n = &body[0];
        assert_eq!(n["name"], "application_ready");
        assert!(n["message"].as_str().unwrap().contains("demo"));
        assert_eq!(n["statusMessage"], "Your application is ready");
        assert_eq!(n["link"], format!("/api/applications/{aid}"));
        assert_eq!(n["relativeTime"], "just now");
        assert_eq!(n["fingerprint"].as_str().unwrap().len(), 64);
        assert!(n["applicationId"].is_number());
    }

    #[tokio::test]
    async fn test_reset_advances_watermark() {
        let (app, state) = test_app().await;
        let token = confirmed_user_token(&app, &state, "john", "john@example.com").await;

        request_json(
            &app,
            "POST",
            "/api/applications",
            Some(&token),
            Some(serde_json::json!({"name": "demo"})),
        )
        .await;
        wait_for_notifications(&app, &token, 1).await;

        let (status, body) =
            request_json(&app, "POST", "/api/notifications/reset", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({}));

        let (_, body) = request_json(&app, "GET", "/api/notifications", Some(&token), None).await;
        assert!(body.as_array().unwrap().is_empty());

        // The rows themselves are still in the log; only the watermark moved.
        let user = state
            .db
            .get_user_by_email("john@example.com")
            .await
            .unwrap()
            .unwrap();
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = ?")
            .bind(user.id)
            .fetch_one(state.db.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }

    #[tokio::test]
    async fn test_requires_confirmed_account() {
        let (app, _state) = test_app().await;
        let (status, _) = request_json(&app, "GET", "/api/notifications", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
