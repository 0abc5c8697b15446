//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use uuid::Uuid;

use shortvid_queue::{JobQueue, RenderJob};

use crate::error::WorkerResult;
use crate::pipeline::{process_render, RenderContext};

/// Job executor that processes render jobs from the queue.
///
/// Consumed messages are acked exactly once after processing, whatever the
/// outcome: terminal truth lives in the job store and failed jobs are not
/// redelivered.
pub struct JobExecutor {
    ctx: Arc<RenderContext>,
    queue: Arc<JobQueue>,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(ctx: RenderContext, queue: JobQueue) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(ctx.config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            ctx: Arc::new(ctx),
            queue: Arc::new(queue),
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Start the executor.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.ctx.config.max_concurrent_jobs
        );

        self.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        info!("Waiting for in-flight jobs to complete...");
        let _ = tokio::time::timeout(self.ctx.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("Job executor stopped");
        Ok(())
    }

    /// Consume and process jobs from the queue.
    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            // All slots busy, wait a bit
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let jobs = self
            .queue
            .consume(
                &self.consumer_name,
                1000, // Block for 1 second
                available.min(5),
            )
            .await?;

        if jobs.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", jobs.len());

        for (message_id, job) in jobs {
            let ctx = Arc::clone(&self.ctx);
            let queue = Arc::clone(&self.queue);
            let permit = match self.job_semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break, // Semaphore closed during shutdown
            };

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(ctx, queue, message_id, job).await;
            });
        }

        Ok(())
    }

    /// Execute a single job and ack it.
    async fn execute_job(
        ctx: Arc<RenderContext>,
        queue: Arc<JobQueue>,
        message_id: String,
        job: RenderJob,
    ) {
        let job_id = job.job_id.clone();
        info!("Executing job {}", job_id);

        if let Err(e) = process_render(&ctx, &job).await {
            // Infrastructure failure before the terminal write; record it
            // best-effort so status callers are not left polling forever.
            error!("Job {} processing error: {}", job_id, e);
            ctx.store
                .mark_failed(&job_id, &format!("worker error: {e}"), &[])
                .await
                .ok();
        }

        if let Err(e) = queue.ack(&message_id).await {
            error!("Failed to ack job {}: {}", job_id, e);
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            let available = self.job_semaphore.available_permits();
            if available == self.ctx.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
