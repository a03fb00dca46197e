// crates/server/src/routes/applications.rs
//! Application CRUD, key renewal, and private-key download.
//!
//! Every handler scopes lookups to the calling owner; an application that
//! exists but belongs to someone else is indistinguishable from one that
//! does not exist.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::ConfirmedUser;
use crate::error::{ApiError, ApiResult};
use crate::jobs::{GENERATE_KEY, RENEW_KEY};
use crate::routes::MessageResponse;
use crate::state::AppState;

/// Maximum description length, matching the create/edit form contract.
const MAX_DESCRIPTION_LEN: usize = 600;

#[derive(Deserialize)]
struct CreateApplicationRequest {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
struct EditApplicationRequest {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
#[serde(rename_all = "camelCase")]
struct ApplicationResponse {
    aid: String,
    name: String,
    description: String,
    created_at: i64,
    public_key: String,
    fingerprint: String,
    /// True once the latest launched key job hit its 100% milestone.
    ready: bool,
    /// Queue-reported progress of the latest job; absent when no job was
    /// ever launched. 100 can also mean "job handle expired"; `ready` is
    /// the authoritative completion signal.
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<u8>,
}

async fn application_response(
    state: &AppState,
    app: keyport_db::Application,
) -> ApiResult<ApplicationResponse> {
    let task = state.tracker.task_for(&app).await?;
    let (ready, progress) = match task {
        Some(task) => (task.complete, Some(state.tracker.progress(&task))),
        None => (false, None),
    };
    Ok(ApplicationResponse {
        aid: app.aid,
        name: app.name,
        description: app.description,
        created_at: app.created_at,
        public_key: app.public_key,
        fingerprint: app.fingerprint,
        ready,
        progress,
    })
}

/// Fetch an application owned by `user`, or `NotFound`.
async fn owned_application(
    state: &AppState,
    user: &keyport_db::User,
    aid: &str,
) -> ApiResult<keyport_db::Application> {
    let app = state
        .db
        .get_application(aid)
        .await?
        .ok_or(ApiError::NotFound)?;
    if app.user_id != user.id {
        return Err(ApiError::NotFound);
    }
    Ok(app)
}

fn validate_fields(name: &str, description: &str) -> ApiResult<()> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation(
            "Please enter an application name".to_string(),
        ));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::Validation(
            "Description cannot be longer than 600 characters".to_string(),
        ));
    }
    Ok(())
}

/// POST /api/applications - Create an application and launch key generation.
async fn create(
    State(state): State<Arc<AppState>>,
    ConfirmedUser(user): ConfirmedUser,
    Json(body): Json<CreateApplicationRequest>,
) -> ApiResult<(StatusCode, Json<ApplicationResponse>)> {
    validate_fields(&body.name, &body.description)?;
    if state
        .db
        .find_application_by_name(user.id, &body.name)
        .await?
        .is_some()
    {
        return Err(ApiError::Validation(
            "Please use a different application name".to_string(),
        ));
    }

    let app = state
        .db
        .create_application(keyport_db::NewApplication {
            aid: uuid::Uuid::new_v4().to_string(),
            name: body.name,
            description: body.description,
            user_id: user.id,
        })
        .await?;

    state.tracker.launch(&app, GENERATE_KEY, user.id).await?;

    let response = application_response(&state, app).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/applications - List the caller's applications.
async fn list(
    State(state): State<Arc<AppState>>,
    ConfirmedUser(user): ConfirmedUser,
) -> ApiResult<Json<Vec<ApplicationResponse>>> {
    let apps = state.db.list_applications(user.id).await?;
    let mut out = Vec::with_capacity(apps.len());
    for app in apps {
        out.push(application_response(&state, app).await?);
    }
    Ok(Json(out))
}

/// GET /api/applications/{aid} - Application detail.
async fn view(
    State(state): State<Arc<AppState>>,
    ConfirmedUser(user): ConfirmedUser,
    Path(aid): Path<String>,
) -> ApiResult<Json<ApplicationResponse>> {
    let app = owned_application(&state, &user, &aid).await?;
    Ok(Json(application_response(&state, app).await?))
}

/// PUT /api/applications/{aid} - Edit name/description.
async fn edit(
    State(state): State<Arc<AppState>>,
    ConfirmedUser(user): ConfirmedUser,
    Path(aid): Path<String>,
    Json(body): Json<EditApplicationRequest>,
) -> ApiResult<Json<ApplicationResponse>> {
    let app = owned_application(&state, &user, &aid).await?;
    validate_fields(&body.name, &body.description)?;

    // Renaming onto another of the caller's applications is a collision;
    // keeping the current name is not.
    if body.name != app.name
        && state
            .db
            .find_application_by_name(user.id, &body.name)
            .await?
            .is_some()
    {
        return Err(ApiError::Validation(
            "Please use a different application name".to_string(),
        ));
    }

    state
        .db
        .update_application(&app.aid, &body.name, &body.description)
        .await?;
    let app = owned_application(&state, &user, &aid).await?;
    Ok(Json(application_response(&state, app).await?))
}

/// DELETE /api/applications/{aid} - Delete an application.
async fn remove(
    State(state): State<Arc<AppState>>,
    ConfirmedUser(user): ConfirmedUser,
    Path(aid): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let app = owned_application(&state, &user, &aid).await?;
    state.db.delete_application(&app.aid).await?;
    Ok(Json(MessageResponse::new(
        "Your application has been deleted.",
    )))
}

/// POST /api/applications/{aid}/renew - Launch key renewal.
async fn renew(
    State(state): State<Arc<AppState>>,
    ConfirmedUser(user): ConfirmedUser,
    Path(aid): Path<String>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let app = owned_application(&state, &user, &aid).await?;
    state.tracker.launch(&app, RENEW_KEY, user.id).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse::new("Key renewal has been started")),
    ))
}

/// GET /api/applications/{aid}/download - Private key as a PEM attachment
/// named after the first 8 hex chars of the fingerprint.
async fn download(
    State(state): State<Arc<AppState>>,
    ConfirmedUser(user): ConfirmedUser,
    Path(aid): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let app = owned_application(&state, &user, &aid).await?;
    if app.private_key.is_empty() || app.fingerprint.len() < 8 {
        return Err(ApiError::Conflict(
            "Application keys are not ready yet".to_string(),
        ));
    }

    let filename = format!("{}.pem", &app.fingerprint[..8]);
    Ok((
        [
            (header::CONTENT_TYPE, "application/x-pem-file".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        app.private_key,
    ))
}

/// Create the applications routes router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create).get(list))
        .route("/{aid}", get(view).put(edit).delete(remove))
        .route("/{aid}/renew", post(renew))
        .route("/{aid}/download", get(download))
}
