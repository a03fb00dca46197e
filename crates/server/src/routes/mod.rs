//! API route handlers for the keyport server.

pub mod account;
pub mod applications;
pub mod auth;
pub mod health;
pub mod notifications;

use std::sync::Arc;

use axum::Router;
use serde::Serialize;

use crate::state::AppState;

/// Plain acknowledgment body used by mutating endpoints.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET  /api/health - Health check
/// - POST /api/auth/register - Create an account, send confirmation mail
/// - POST /api/auth/login - Exchange credentials for a bearer token
/// - POST /api/auth/confirm/{token} - Confirm the logged-in account
/// - POST /api/auth/confirm/resend - Re-send the confirmation mail
/// - POST /api/auth/password/change - Change password (authenticated)
/// - POST /api/auth/password/forgot - Request a reset mail
/// - POST /api/auth/password/reset/{token} - Reset password via token
/// - GET  /api/account/profile - Read the profile
/// - PUT  /api/account/profile - Update the profile
/// - DELETE /api/account - Delete the account and owned applications
/// - POST /api/applications - Create an application, launch key generation
/// - GET  /api/applications - List own applications
/// - GET  /api/applications/{aid} - Application detail with ready/progress
/// - PUT  /api/applications/{aid} - Edit name/description
/// - DELETE /api/applications/{aid} - Delete an application
/// - POST /api/applications/{aid}/renew - Launch key renewal
/// - GET  /api/applications/{aid}/download - Private key PEM attachment
/// - GET  /api/notifications - Unread notifications
/// - POST /api/notifications/reset - Advance the read watermark
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api/auth", auth::router())
        .nest("/api/account", account::router())
        .nest("/api/applications", applications::router())
        .nest("/api/notifications", notifications::router())
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::*;
    use test_helpers::test_app;

    #[tokio::test]
    async fn test_api_routes_creation() {
        let (_router, _state) = test_app().await;
    }
}
