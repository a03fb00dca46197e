// crates/server/src/routes/auth.rs
//! Registration, login, email confirmation, and password management.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::password::{
    hash_password, is_strong_password, verify_password, WEAK_PASSWORD_MESSAGE,
};
use crate::auth::{AuthUser, TokenPurpose};
use crate::error::{ApiError, ApiResult};
use crate::mailer::MailTemplate;
use crate::routes::MessageResponse;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    username: String,
    email: String,
    company: String,
    password: String,
    password_confirm: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    old_password: String,
    password: String,
}

#[derive(Deserialize)]
struct ForgotPasswordRequest {
    email: String,
}

#[derive(Deserialize)]
struct ResetPasswordRequest {
    password: String,
}

/// Minimal shape check; real validation is the confirmation mail.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !email.contains(char::is_whitespace)
}

/// POST /api/auth/register - Create an account and send the confirmation mail.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    if body.username.trim().is_empty() {
        return Err(ApiError::Validation("Please enter your name".to_string()));
    }
    if !is_valid_email(&body.email) {
        return Err(ApiError::Validation(
            "Please enter a valid email address".to_string(),
        ));
    }
    if body.company.trim().is_empty() {
        return Err(ApiError::Validation(
            "Please enter your organization/company name".to_string(),
        ));
    }
    if body.password != body.password_confirm {
        return Err(ApiError::Validation("Passwords must match".to_string()));
    }
    if !is_strong_password(&body.password) {
        return Err(ApiError::Validation(WEAK_PASSWORD_MESSAGE.to_string()));
    }

    if state.db.get_user_by_username(&body.username).await?.is_some() {
        return Err(ApiError::Validation(
            "Please use a different name".to_string(),
        ));
    }
    if state.db.get_user_by_email(&body.email).await?.is_some() {
        return Err(ApiError::Validation(
            "Please use a different email address".to_string(),
        ));
    }
    if state.db.get_user_by_company(&body.company).await?.is_some() {
        return Err(ApiError::Validation(
            "Please use a different company name".to_string(),
        ));
    }

    let password_hash = hash_password(&body.password)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;
    let user = state
        .db
        .create_user(keyport_db::NewUser {
            username: body.username,
            email: body.email,
            company: body.company,
            password_hash,
        })
        .await?;

    send_confirmation_mail(&state, &user)?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(
            "A confirmation email has been sent to you",
        )),
    ))
}

fn send_confirmation_mail(state: &AppState, user: &keyport_db::User) -> ApiResult<()> {
    let token = state
        .tokens
        .issue(TokenPurpose::Confirm, user.id)
        .map_err(|e| ApiError::Internal(format!("token issuance failed: {e}")))?;
    state.mailer.send(
        &user.email,
        "Confirm Your Account",
        MailTemplate::ConfirmAccount,
        &serde_json::json!({"username": user.username, "token": token}),
    );
    Ok(())
}

/// POST /api/auth/login - Exchange credentials for a bearer token.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let user = state
        .db
        .get_user_by_email(&body.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    let verified = verify_password(&body.password, &user.password_hash).unwrap_or(false);
    if !verified {
        return Err(ApiError::InvalidCredentials);
    }

    let token = state
        .tokens
        .issue(TokenPurpose::Access, user.id)
        .map_err(|e| ApiError::Internal(format!("token issuance failed: {e}")))?;
    Ok(Json(TokenResponse { token }))
}

/// POST /api/auth/confirm/{token} - Confirm the logged-in user's account.
///
/// An invalid, expired, or foreign token is indistinguishable from an
/// unknown one.
async fn confirm(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(token): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    if user.confirmed {
        return Ok(Json(MessageResponse::new(
            "Your account is already confirmed",
        )));
    }

    let token_user = state
        .tokens
        .verify(&token, TokenPurpose::Confirm)
        .ok_or(ApiError::NotFound)?;
    if token_user != user.id {
        return Err(ApiError::NotFound);
    }

    state.db.set_user_confirmed(user.id).await?;
    Ok(Json(MessageResponse::new(
        "You have confirmed your account. Thanks!",
    )))
}

/// POST /api/auth/confirm/resend - Re-send the confirmation mail.
async fn resend_confirmation(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<MessageResponse>> {
    if !user.confirmed {
        send_confirmation_mail(&state, &user)?;
    }
    Ok(Json(MessageResponse::new(
        "A confirmation email has been sent to you",
    )))
}

/// POST /api/auth/password/change - Change password (requires the current one).
async fn change_password(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(body): Json<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let verified = verify_password(&body.old_password, &user.password_hash).unwrap_or(false);
    if !verified {
        return Err(ApiError::Validation(
            "Current password could not be validated".to_string(),
        ));
    }
    if !is_strong_password(&body.password) {
        return Err(ApiError::Validation(WEAK_PASSWORD_MESSAGE.to_string()));
    }

    let password_hash = hash_password(&body.password)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;
    state.db.update_user_password(user.id, &password_hash).await?;

    Ok(Json(MessageResponse::new(
        "Your password has been successfully changed.",
    )))
}

/// POST /api/auth/password/forgot - Request a reset mail.
///
/// Always acknowledges, whether or not the account exists.
async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if let Some(user) = state.db.get_user_by_email(&body.email).await? {
        let token = state
            .tokens
            .issue(TokenPurpose::Reset, user.id)
            .map_err(|e| ApiError::Internal(format!("token issuance failed: {e}")))?;
        state.mailer.send(
            &user.email,
            "Reset Your Password",
            MailTemplate::ResetPassword,
            &serde_json::json!({"username": user.username, "token": token}),
        );
    }
    Ok(Json(MessageResponse::new(
        "Check your email for the instructions to reset your password",
    )))
}

/// POST /api/auth/password/reset/{token} - Set a new password via reset token.
async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(body): Json<ResetPasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let user_id = state
        .tokens
        .verify(&token, TokenPurpose::Reset)
        .ok_or(ApiError::NotFound)?;
    let user = state.db.get_user(user_id).await?.ok_or(ApiError::NotFound)?;

    if !is_strong_password(&body.password) {
        return Err(ApiError::Validation(WEAK_PASSWORD_MESSAGE.to_string()));
    }

    let password_hash = hash_password(&body.password)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;
    state.db.update_user_password(user.id, &password_hash).await?;

    Ok(Json(MessageResponse::new("Your password has been reset")))
}

/// Create the auth routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/confirm/resend", post(resend_confirmation))
        .route("/confirm/{token}", post(confirm))
        .route("/password/change", post(change_password))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset/{token}", post(reset_password))
}
