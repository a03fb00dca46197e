// crates/server/src/config.rs
//! Environment-driven configuration.

use std::path::PathBuf;

use crate::mailer::MailConfig;

/// Default port for the server.
const DEFAULT_PORT: u16 = 4870;

/// Default number of concurrent background jobs.
const DEFAULT_WORKERS: usize = 2;

/// Fallback signing secret for development setups.
const DEV_SECRET_KEY: &str = "you-will-never-guess";

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Database file; `None` means the platform default location.
    pub database_path: Option<PathBuf>,
    /// HMAC secret for session/confirmation/reset tokens.
    pub secret_key: String,
    /// Concurrency of the background worker pool.
    pub worker_concurrency: usize,
    /// Mail provider settings; `None` disables delivery.
    pub mail: Option<MailConfig>,
    /// Log to stdout instead of the rolling file under `logs/`.
    pub log_to_stdout: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let secret_key = match std::env::var("SECRET_KEY") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!("SECRET_KEY not set; using insecure development default");
                DEV_SECRET_KEY.to_string()
            }
        };

        Self {
            port: get_port(),
            database_path: std::env::var("DATABASE_PATH").ok().map(PathBuf::from),
            secret_key,
            worker_concurrency: std::env::var("WORKER_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_WORKERS),
            mail: mail_config_from_env(),
            log_to_stdout: std::env::var("LOG_TO_STDOUT").is_ok(),
        }
    }
}

/// Get the server port from environment or use default.
fn get_port() -> u16 {
    std::env::var("KEYPORT_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT)
}

/// Mail settings are all-or-nothing: delivery is enabled only when the
/// endpoint, key, and sender are all present.
fn mail_config_from_env() -> Option<MailConfig> {
    let api_url = non_empty_env("MAIL_API_URL")?;
    let api_key = non_empty_env("MAIL_API_KEY")?;
    let sender = non_empty_env("MAIL_SENDER")?;
    Some(MailConfig {
        api_url,
        api_key,
        sender,
    })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
