// crates/server/src/jobs.rs
//! Background job functions: key generation and key renewal.
//!
//! Both jobs follow one state machine, persisting a partial result at each
//! milestone so progress polls observe real state:
//!
//!   0%   started
//!   25%  public key persisted
//!   50%  private key persisted
//!   75%  fingerprint persisted
//!   100% task marked complete, notification appended
//!
//! A job that errors is masked: progress is forced to 100 so pollers stop
//! waiting, the error is logged, no notification is appended, and nothing
//! is retried. Clients detect the difference by checking whether the key
//! fields were actually populated.

use keyport_db::{Database, DbError};
use keyport_queue::{JobContext, JobRegistry};
use thiserror::Error;

use crate::keygen::{KeyPair, KeygenError};

/// Queue name of the initial key-generation job.
pub const GENERATE_KEY: &str = "generate_key";
/// Queue name of the key-renewal job.
pub const RENEW_KEY: &str = "renew_key";

#[derive(Debug, Error)]
enum JobError {
    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("key generation failed: {0}")]
    Keygen(#[from] KeygenError),

    #[error("job arguments missing {0}")]
    MissingArg(&'static str),

    #[error("application {0} no longer exists")]
    MissingApplication(i64),
}

/// Which of the two jobs is running; they differ only in the notification
/// they append.
#[derive(Debug, Clone, Copy)]
enum KeyJob {
    Generate,
    Renew,
}

impl KeyJob {
    fn notification_name(self) -> &'static str {
        match self {
            KeyJob::Generate => "application_ready",
            KeyJob::Renew => "application_renewed",
        }
    }

    fn message(self, app_name: &str) -> String {
        match self {
            KeyJob::Generate => format!("Your new application {app_name} is ready"),
            KeyJob::Renew => format!("Application keys for {app_name} have been renewed"),
        }
    }
}

/// Build the worker registry with both key jobs bound to `db`.
pub fn registry(db: Database) -> JobRegistry {
    let mut registry = JobRegistry::new();

    let gen_db = db.clone();
    registry.register(GENERATE_KEY, move |ctx| {
        run_key_job(gen_db.clone(), ctx, KeyJob::Generate)
    });

    let renew_db = db;
    registry.register(RENEW_KEY, move |ctx| {
        run_key_job(renew_db.clone(), ctx, KeyJob::Renew)
    });

    registry
}

/// Top-level job entry point; this is where failures are masked.
async fn run_key_job(db: Database, ctx: JobContext, job: KeyJob) -> Result<(), String> {
    match generate_and_record(&db, &ctx, job).await {
        Ok(fingerprint) => {
            tracing::info!(job_id = %ctx.id, fingerprint, "key job complete");
        }
        Err(e) => {
            // Force pollers out of their wait loop; do not notify, do not
            // retry. The application row keeps whatever milestones landed.
            ctx.set_progress(100);
            tracing::error!(job_id = %ctx.id, error = %e, "unhandled error in key job");
        }
    }
    Ok(())
}

/// The actual state machine, with an explicit outcome.
async fn generate_and_record(
    db: &Database,
    ctx: &JobContext,
    job: KeyJob,
) -> Result<String, JobError> {
    let application_id = ctx.args["application_id"]
        .as_i64()
        .ok_or(JobError::MissingArg("application_id"))?;
    let user_id = ctx.args["user_id"]
        .as_i64()
        .ok_or(JobError::MissingArg("user_id"))?;

    let app = db
        .get_application_by_id(application_id)
        .await?
        .ok_or(JobError::MissingApplication(application_id))?;

    set_task_progress(db, ctx, 0).await?;

    let pair = KeyPair::generate()?;

    db.set_application_public_key(app.id, &pair.public_pem).await?;
    set_task_progress(db, ctx, 25).await?;

    db.set_application_private_key(app.id, &pair.private_pem).await?;
    set_task_progress(db, ctx, 50).await?;

    let fingerprint = pair.fingerprint();
    db.set_application_fingerprint(app.id, &fingerprint).await?;
    set_task_progress(db, ctx, 75).await?;

    set_task_progress(db, ctx, 100).await?;

    let payload = serde_json::json!({
        "message": job.message(&app.name),
        "statusMessage": "Your application is ready",
        "applicationId": app.id,
        "applicationAid": app.aid,
        "fingerprint": fingerprint,
    });
    db.add_notification(user_id, job.notification_name(), &payload)
        .await?;

    Ok(fingerprint)
}

/// Report progress to the queue; at the 100% milestone also flip the task
/// row's completion flag.
async fn set_task_progress(
    db: &Database,
    ctx: &JobContext,
    progress: u8,
) -> Result<(), JobError> {
    ctx.set_progress(progress);
    if progress >= 100 {
        db.complete_task(&ctx.id).await?;
    }
    Ok(())
}
