// crates/queue/src/job.rs
//! Job records and the snapshots handed to callers.

use std::sync::atomic::{AtomicU8, Ordering};

/// Opaque job identifier handed back by `enqueue`.
pub type JobId = String;

/// Execution state of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Finished,
    Failed,
}

impl JobStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => JobStatus::Pending,
            1 => JobStatus::Running,
            2 => JobStatus::Finished,
            _ => JobStatus::Failed,
        }
    }
}

/// Point-in-time view of a job, as returned by `fetch_job`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct JobSnapshot {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,
    /// Fractional progress in [0,100], reported by the job itself.
    pub progress: u8,
    pub enqueued_at: i64,
}

/// Mutable per-job state shared between the queue map and the worker.
///
/// Status and progress use lock-free atomics so progress polls never block
/// a running job.
pub(crate) struct JobRecord {
    pub(crate) id: JobId,
    pub(crate) name: String,
    status: AtomicU8,
    progress: AtomicU8,
    pub(crate) enqueued_at: i64,
}

impl JobRecord {
    pub(crate) fn new(id: JobId, name: String) -> Self {
        Self {
            id,
            name,
            status: AtomicU8::new(JobStatus::Pending as u8),
            progress: AtomicU8::new(0),
            enqueued_at: chrono::Utc::now().timestamp_micros(),
        }
    }

    pub(crate) fn set_status(&self, status: JobStatus) {
        self.status.store(status as u8, Ordering::Relaxed);
    }

    pub(crate) fn set_progress(&self, pct: u8) {
        self.progress.store(pct.min(100), Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            status: JobStatus::from_u8(self.status.load(Ordering::Relaxed)),
            progress: self.progress.load(Ordering::Relaxed),
            enqueued_at: self.enqueued_at,
        }
    }
}
