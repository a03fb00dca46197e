//! Axum extractors for authenticated requests.
//!
//! `AuthUser` resolves the bearer token to a user row and records activity
//! (`last_seen`). `ConfirmedUser` additionally requires the email-confirmed
//! flag; all portal resources except the auth endpoints use it.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use keyport_db::User;

use crate::auth::tokens::TokenPurpose;
use crate::error::ApiError;
use crate::state::AppState;

/// A logged-in user (bearer token valid, account may be unconfirmed).
pub struct AuthUser(pub User);

/// A logged-in user whose email address has been confirmed.
pub struct ConfirmedUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;
        let user_id = state
            .tokens
            .verify(token, TokenPurpose::Access)
            .ok_or(ApiError::Unauthorized)?;
        let user = state
            .db
            .get_user(user_id)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        state.db.ping_user(user.id).await?;
        Ok(AuthUser(user))
    }
}

impl FromRequestParts<Arc<AppState>> for ConfirmedUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.confirmed {
            return Err(ApiError::Unconfirmed);
        }
        Ok(ConfirmedUser(user))
    }
}
