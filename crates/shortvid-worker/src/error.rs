//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Generation error: {0}")]
    Gen(#[from] shortvid_gen::GenError),

    #[error("Media error: {0}")]
    Media(#[from] shortvid_media::MediaError),

    #[error("Store error: {0}")]
    Store(#[from] shortvid_store::StoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] shortvid_queue::QueueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }
}
