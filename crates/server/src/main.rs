// crates/server/src/main.rs
//! Keyport server binary.
//!
//! `keyport serve` (the default) starts the HTTP server and the background
//! worker pool in one process. `keyport db seed|clear` manage development
//! data.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use keyport_db::Database;
use keyport_queue::{JobQueue, Worker};
use keyport_server::auth::TokenService;
use keyport_server::config::Config;
use keyport_server::keygen::KeyPair;
use keyport_server::mailer::Mailer;
use keyport_server::{create_app, jobs, AppState};

#[derive(Parser)]
#[command(name = "keyport", version, about = "Application key management portal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server and worker pool (default).
    Serve,
    /// Database maintenance commands.
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
}

#[derive(Subcommand)]
enum DbCommand {
    /// Clear and re-populate the database with demo data.
    Seed,
    /// Clear all portal data.
    Clear,
}

/// Initialize tracing: stdout when `LOG_TO_STDOUT` is set, otherwise a
/// daily-rolling file under `logs/`. The returned guard must stay alive for
/// the file writer to flush.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if std::env::var("LOG_TO_STDOUT").is_ok() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        None
    } else {
        let appender = tracing_appender::rolling::daily("logs", "keyport.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing();
    let config = Config::from_env();

    let db = match &config.database_path {
        Some(path) => Database::new(path).await?,
        None => Database::open_default().await?,
    };

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, db).await,
        Command::Db {
            command: DbCommand::Seed,
        } => seed(&db).await,
        Command::Db {
            command: DbCommand::Clear,
        } => {
            db.clear_all().await?;
            tracing::info!("cleared all portal data");
            Ok(())
        }
    }
}

async fn serve(config: Config, db: Database) -> Result<()> {
    let (queue, intake) = JobQueue::new();
    Worker::spawn(
        Arc::clone(&queue),
        intake,
        jobs::registry(db.clone()),
        config.worker_concurrency,
    );

    let state = AppState::new(
        db,
        queue,
        TokenService::new(config.secret_key.as_bytes()),
        Mailer::new(config.mail.clone()),
    );
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        workers = config.worker_concurrency,
        "keyport v{} listening on http://{addr}",
        env!("CARGO_PKG_VERSION")
    );
    axum::serve(listener, app).await?;
    Ok(())
}

/// Reset the database and insert a confirmed demo user with one fully
/// provisioned application.
async fn seed(db: &Database) -> Result<()> {
    db.clear_all().await?;

    let password_hash = keyport_server::auth::password::hash_password("S3cret!!")
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
    let user = db
        .create_user(keyport_db::NewUser {
            username: "John Doe".to_string(),
            email: "john.doe@example.com".to_string(),
            company: "ACME Inc.".to_string(),
            password_hash,
        })
        .await?;
    db.set_user_confirmed(user.id).await?;

    let app = db
        .create_application(keyport_db::NewApplication {
            aid: uuid::Uuid::new_v4().to_string(),
            name: "keyport-demo-app".to_string(),
            description: "demo application.".to_string(),
            user_id: user.id,
        })
        .await?;

    let pair = KeyPair::generate()?;
    db.set_application_public_key(app.id, &pair.public_pem).await?;
    db.set_application_private_key(app.id, &pair.private_pem).await?;
    db.set_application_fingerprint(app.id, &pair.fingerprint()).await?;

    let task = db.replace_task(&app.aid, &uuid::Uuid::new_v4().to_string()).await?;
    db.complete_task(&task.id).await?;

    tracing::info!(email = %user.email, application = %app.aid, "seeded demo data");
    Ok(())
}
