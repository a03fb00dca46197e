// crates/queue/src/worker.rs
//! Worker dispatcher: pulls queued jobs and runs registered handlers.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::job::{JobId, JobStatus};
use crate::queue::{JobIntake, JobQueue};

type BoxedJobFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;
type JobHandler = Arc<dyn Fn(JobContext) -> BoxedJobFuture + Send + Sync>;

/// Handle a running job uses to report progress.
#[derive(Clone)]
pub struct JobContext {
    pub id: JobId,
    pub args: serde_json::Value,
    queue: Arc<JobQueue>,
}

impl JobContext {
    /// Report fractional progress (clamped to [0,100]); visible to pollers
    /// through `fetch_job`.
    pub fn set_progress(&self, pct: u8) {
        self.queue.set_progress(&self.id, pct);
    }
}

/// Named job handlers, registered before the worker starts.
#[derive(Clone, Default)]
pub struct JobRegistry {
    handlers: HashMap<String, JobHandler>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async handler under `name`. Later registrations replace
    /// earlier ones.
    pub fn register<F, Fut>(&mut self, name: &str, handler: F)
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        self.handlers
            .insert(name.to_string(), Arc::new(move |ctx| Box::pin(handler(ctx))));
    }

    fn get(&self, name: &str) -> Option<JobHandler> {
        self.handlers.get(name).cloned()
    }
}

/// Background worker executing jobs from a [`JobQueue`].
pub struct Worker;

impl Worker {
    /// Spawn the dispatcher loop. Jobs run on their own tasks, at most
    /// `concurrency` at a time, so jobs for different applications execute
    /// in parallel.
    ///
    /// The returned handle finishes when the queue side is dropped.
    pub fn spawn(
        queue: Arc<JobQueue>,
        mut intake: JobIntake,
        registry: JobRegistry,
        concurrency: usize,
    ) -> JoinHandle<()> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

        tokio::spawn(async move {
            while let Some(job) = intake.rx.recv().await {
                let Some(handler) = registry.get(&job.name) else {
                    tracing::error!(job_id = %job.id, job_name = %job.name, "no handler registered");
                    queue.set_status(&job.id, JobStatus::Failed);
                    continue;
                };

                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };

                let queue = Arc::clone(&queue);
                tokio::spawn(async move {
                    let ctx = JobContext {
                        id: job.id.clone(),
                        args: job.args,
                        queue: Arc::clone(&queue),
                    };

                    queue.set_status(&job.id, JobStatus::Running);
                    tracing::debug!(job_id = %job.id, job_name = %job.name, "job started");

                    match handler(ctx).await {
                        Ok(()) => {
                            queue.set_status(&job.id, JobStatus::Finished);
                            tracing::debug!(job_id = %job.id, "job finished");
                        }
                        Err(e) => {
                            queue.set_status(&job.id, JobStatus::Failed);
                            tracing::error!(job_id = %job.id, error = %e, "job failed");
                        }
                    }
                    drop(permit);

                    // Finished handles eventually become unresolvable, like
                    // an expiring broker-side record.
                    let retention = queue.retention();
                    if retention.is_zero() {
                        queue.evict(&job.id);
                    } else {
                        tokio::spawn(async move {
                            tokio::time::sleep(retention).await;
                            queue.evict(&job.id);
                        });
                    }
                });
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobStatus;
    use std::time::Duration;

    async fn wait_for_status(queue: &JobQueue, id: &str, want: JobStatus) {
        for _ in 0..200 {
            if queue.fetch_job(id).map(|s| s.status) == Some(want) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {id} never reached {want:?}");
    }

    #[tokio::test]
    async fn test_worker_runs_registered_handler() {
        let (queue, intake) = JobQueue::new();
        let mut registry = JobRegistry::new();
        registry.register("echo", |ctx| async move {
            ctx.set_progress(100);
            Ok(())
        });
        Worker::spawn(Arc::clone(&queue), intake, registry, 2);

        let id = queue.enqueue("echo", serde_json::Value::Null);
        wait_for_status(&queue, &id, JobStatus::Finished).await;
        assert_eq!(queue.fetch_job(&id).unwrap().progress, 100);
    }

    #[tokio::test]
    async fn test_handler_error_marks_job_failed() {
        let (queue, intake) = JobQueue::new();
        let mut registry = JobRegistry::new();
        registry.register("boom", |_ctx| async move { Err("kaput".to_string()) });
        Worker::spawn(Arc::clone(&queue), intake, registry, 2);

        let id = queue.enqueue("boom", serde_json::Value::Null);
        wait_for_status(&queue, &id, JobStatus::Failed).await;
    }

    #[tokio::test]
    async fn test_unregistered_name_marks_job_failed() {
        let (queue, intake) = JobQueue::new();
        Worker::spawn(Arc::clone(&queue), intake, JobRegistry::new(), 2);

        let id = queue.enqueue("no_such_job", serde_json::Value::Null);
        wait_for_status(&queue, &id, JobStatus::Failed).await;
    }

    #[tokio::test]
    async fn test_handler_receives_args() {
        let (queue, intake) = JobQueue::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<serde_json::Value>();
        let tx = std::sync::Mutex::new(Some(tx));

        let mut registry = JobRegistry::new();
        registry.register("capture", move |ctx| {
            let tx = tx.lock().unwrap().take();
            async move {
                if let Some(tx) = tx {
                    let _ = tx.send(ctx.args.clone());
                }
                Ok(())
            }
        });
        Worker::spawn(Arc::clone(&queue), intake, registry, 2);

        queue.enqueue("capture", serde_json::json!({"application_id": 7, "user_id": 3}));
        let args = tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .expect("handler ran")
            .unwrap();
        assert_eq!(args["application_id"], 7);
        assert_eq!(args["user_id"], 3);
    }

    #[tokio::test]
    async fn test_jobs_run_in_parallel() {
        let (queue, intake) = JobQueue::new();
        let gate = Arc::new(tokio::sync::Barrier::new(2));

        let mut registry = JobRegistry::new();
        let gate_clone = Arc::clone(&gate);
        registry.register("meet", move |_ctx| {
            let gate = Arc::clone(&gate_clone);
            async move {
                // Deadlocks unless both jobs run concurrently.
                gate.wait().await;
                Ok(())
            }
        });
        Worker::spawn(Arc::clone(&queue), intake, registry, 2);

        let a = queue.enqueue("meet", serde_json::Value::Null);
        let b = queue.enqueue("meet", serde_json::Value::Null);
        wait_for_status(&queue, &a, JobStatus::Finished).await;
        wait_for_status(&queue, &b, JobStatus::Finished).await;
    }

    #[tokio::test]
    async fn test_finished_jobs_are_evicted_after_retention() {
        let (queue, intake) = JobQueue::with_retention(Duration::ZERO);
        let mut registry = JobRegistry::new();
        registry.register("echo", |_ctx| async move { Ok(()) });
        Worker::spawn(Arc::clone(&queue), intake, registry, 1);

        let id = queue.enqueue("echo", serde_json::Value::Null);
        for _ in 0..200 {
            if queue.fetch_job(&id).is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("finished job was never evicted");
    }
}
