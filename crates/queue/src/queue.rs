// crates/queue/src/queue.rs
//! The job queue handle shared between web handlers and workers.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

use crate::job::{JobId, JobRecord, JobSnapshot, JobStatus};

/// A job waiting for a worker, as sent over the intake channel.
#[derive(Debug)]
pub(crate) struct QueuedJob {
    pub(crate) id: JobId,
    pub(crate) name: String,
    pub(crate) args: serde_json::Value,
}

/// Receiving end of the queue; handed to exactly one [`Worker`](crate::Worker).
pub struct JobIntake {
    pub(crate) rx: mpsc::UnboundedReceiver<QueuedJob>,
}

/// Shared job queue.
///
/// Thread-safe via `Arc` wrapping. `enqueue` hands a job name and JSON args
/// to the worker side and returns an opaque job id; `fetch_job` resolves an
/// id to a progress snapshot, or `None` once the handle is unknown or
/// evicted.
pub struct JobQueue {
    jobs: RwLock<HashMap<JobId, Arc<JobRecord>>>,
    tx: mpsc::UnboundedSender<QueuedJob>,
    /// How long finished jobs stay resolvable before eviction.
    retention: std::time::Duration,
}

impl JobQueue {
    /// Default retention window for finished job records.
    pub const DEFAULT_RETENTION: std::time::Duration = std::time::Duration::from_secs(3600);

    /// Create a queue and its intake half.
    pub fn new() -> (Arc<Self>, JobIntake) {
        Self::with_retention(Self::DEFAULT_RETENTION)
    }

    /// Create a queue whose finished jobs are evicted after `retention`.
    pub fn with_retention(retention: std::time::Duration) -> (Arc<Self>, JobIntake) {
        let (tx, rx) = mpsc::unbounded_channel();
        let queue = Arc::new(Self {
            jobs: RwLock::new(HashMap::new()),
            tx,
            retention,
        });
        (queue, JobIntake { rx })
    }

    /// Enqueue `name` with the given arguments; returns the job handle.
    ///
    /// The handle is valid immediately, even before a worker picks the job
    /// up. When no worker is attached the job stays pending forever; that is
    /// the caller's deployment problem, not an enqueue error.
    pub fn enqueue(&self, name: &str, args: serde_json::Value) -> JobId {
        let id = uuid::Uuid::new_v4().to_string();
        let record = Arc::new(JobRecord::new(id.clone(), name.to_string()));

        match self.jobs.write() {
            Ok(mut jobs) => {
                jobs.insert(id.clone(), record);
            }
            Err(e) => tracing::error!("RwLock poisoned writing jobs map: {e}"),
        }

        if self
            .tx
            .send(QueuedJob {
                id: id.clone(),
                name: name.to_string(),
                args,
            })
            .is_err()
        {
            tracing::warn!(job_name = name, "no worker attached to queue; job will not run");
        }

        id
    }

    /// Resolve a job handle. `None` means unknown or evicted.
    pub fn fetch_job(&self, id: &str) -> Option<JobSnapshot> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(id).map(|r| r.snapshot()),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                None
            }
        }
    }

    /// Update a job's reported progress. Unknown handles are ignored.
    pub fn set_progress(&self, id: &str, pct: u8) {
        if let Ok(jobs) = self.jobs.read() {
            if let Some(record) = jobs.get(id) {
                record.set_progress(pct);
            }
        }
    }

    /// Remove a job record, making its handle unresolvable.
    pub fn evict(&self, id: &str) {
        if let Ok(mut jobs) = self.jobs.write() {
            jobs.remove(id);
        }
    }

    pub(crate) fn set_status(&self, id: &str, status: JobStatus) {
        if let Ok(jobs) = self.jobs.read() {
            if let Some(record) = jobs.get(id) {
                record.set_status(status);
            }
        }
    }

    pub(crate) fn retention(&self) -> std::time::Duration {
        self.retention
    }
}
