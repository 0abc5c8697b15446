//! Expiring progress cache on Redis.

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use shortvid_models::{JobId, ProgressSnapshot};

use crate::error::QueueResult;

/// Time-to-live for progress keys. An entry that outlives its job simply
/// expires; absence means "derive from the job status".
const PROGRESS_TTL_SECS: u64 = 300;

/// Write contract for interim progress. The orchestrator reports through
/// this; status queries read the cache directly.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Record the current percent/step for a job.
    async fn update(&self, job_id: &JobId, percent: u8, step: &str) -> QueueResult<()>;
}

/// Redis-backed progress cache with a fixed expiry window.
pub struct ProgressCache {
    client: redis::Client,
}

impl ProgressCache {
    /// Create a new progress cache.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Create from the `REDIS_URL` environment variable.
    pub fn from_env() -> QueueResult<Self> {
        let redis_url = std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&redis_url)
    }

    /// Key for a job's progress entry.
    pub fn key(job_id: &JobId) -> String {
        format!("shortvid:progress:{}", job_id)
    }

    /// Read the snapshot for a job. Missing, expired and corrupt entries all
    /// read as `None`; the caller falls back to the job status.
    pub async fn get(&self, job_id: &JobId) -> QueueResult<Option<ProgressSnapshot>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(Self::key(job_id)).await?;

        Ok(payload.and_then(|p| serde_json::from_str(&p).ok()))
    }

    /// Ping Redis; used by readiness checks.
    pub async fn check_connectivity(&self) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

#[async_trait]
impl ProgressSink for ProgressCache {
    async fn update(&self, job_id: &JobId, percent: u8, step: &str) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let snapshot = ProgressSnapshot::new(percent, step);
        let payload = serde_json::to_string(&snapshot)?;

        conn.set_ex::<_, _, ()>(Self::key(job_id), payload, PROGRESS_TTL_SECS)
            .await?;

        debug!(job_id = %job_id, percent, step, "Progress updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_namespaced_by_job_id() {
        let a = ProgressCache::key(&JobId::from_string("job-a"));
        let b = ProgressCache::key(&JobId::from_string("job-b"));
        assert_eq!(a, "shortvid:progress:job-a");
        assert_ne!(a, b);
    }
}
