// crates/queue/src/lib.rs
//! In-process background job queue.
//!
//! Provides:
//! - `JobQueue` — enqueue jobs by name, look up progress metadata by handle
//! - `Worker` — dispatcher executing registered job handlers with bounded
//!   concurrency
//! - `JobRegistry` / `JobContext` — handler registration and the handle a
//!   running job uses to report progress
//!
//! Consumers treat the queue as an external collaborator: `enqueue` returns
//! an opaque job id, and `fetch_job` returns `None` once a handle is
//! unknown or evicted, exactly like an expiring broker-side job record.

pub mod job;
pub mod queue;
pub mod worker;

pub use job::{JobId, JobSnapshot, JobStatus};
pub use queue::{JobIntake, JobQueue};
pub use worker::{JobContext, JobRegistry, Worker};
