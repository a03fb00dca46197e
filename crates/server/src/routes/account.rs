// crates/server/src/routes/account.rs
//! Profile management and account deletion.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::ConfirmedUser;
use crate::error::{ApiError, ApiResult};
use crate::routes::MessageResponse;
use crate::state::AppState;

#[derive(Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    username: String,
    email: String,
    company: String,
    confirmed: bool,
    member_since: i64,
    last_seen: i64,
}

impl From<keyport_db::User> for ProfileResponse {
    fn from(user: keyport_db::User) -> Self {
        Self {
            username: user.username,
            email: user.email,
            company: user.company,
            confirmed: user.confirmed,
            member_since: user.member_since,
            last_seen: user.last_seen,
        }
    }
}

#[derive(Deserialize)]
struct UpdateProfileRequest {
    username: String,
    email: String,
    company: String,
}

/// GET /api/account/profile - Read the caller's profile.
async fn get_profile(ConfirmedUser(user): ConfirmedUser) -> Json<ProfileResponse> {
    Json(user.into())
}

/// PUT /api/account/profile - Update profile fields.
///
/// Uniqueness checks exclude the caller's own current values, so
/// re-submitting an unchanged profile always succeeds.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    ConfirmedUser(user): ConfirmedUser,
    Json(body): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    if body.username.trim().is_empty() {
        return Err(ApiError::Validation("Please enter your name".to_string()));
    }
    if body.company.trim().is_empty() {
        return Err(ApiError::Validation(
            "Please enter your organization/company name".to_string(),
        ));
    }

    if body.username != user.username
        && state.db.get_user_by_username(&body.username).await?.is_some()
    {
        return Err(ApiError::Validation(
            "Please use a different name".to_string(),
        ));
    }
    if body.email != user.email && state.db.get_user_by_email(&body.email).await?.is_some() {
        return Err(ApiError::Validation(
            "Please use a different email address".to_string(),
        ));
    }
    if body.company != user.company
        && state.db.get_user_by_company(&body.company).await?.is_some()
    {
        return Err(ApiError::Validation(
            "Please use a different company name".to_string(),
        ));
    }

    state
        .db
        .update_user_profile(user.id, &body.username, &body.email, &body.company)
        .await?;
    let user = state
        .db
        .get_user(user.id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(user.into()))
}

/// DELETE /api/account - Delete the account and everything it owns.
async fn delete_account(
    State(state): State<Arc<AppState>>,
    ConfirmedUser(user): ConfirmedUser,
) -> ApiResult<Json<MessageResponse>> {
    state.db.delete_user(user.id).await?;
    Ok(Json(MessageResponse::new("Your account has been deleted.")))
}

/// Create the account routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/", delete(delete_account))
}
