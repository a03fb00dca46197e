// crates/server/src/lib.rs
//! Keyport server library.
//!
//! This crate provides the Axum-based HTTP server for the keyport portal:
//! account registration and confirmation, application management, and the
//! background key-generation pipeline (task tracking, job functions,
//! notifications).

pub mod auth;
pub mod config;
pub mod error;
pub mod jobs;
pub mod keygen;
pub mod mailer;
pub mod routes;
pub mod state;
pub mod tasks;

pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (auth, account, applications, notifications, health)
/// - CORS for development (allows any origin)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
