//! SQLite-backed job repository.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use shortvid_models::{Job, JobId, JobStatus, SceneOutcome, VideoStyle};

use crate::error::{StoreError, StoreResult};

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, user_id, topic, style, speaker, preview, status, \
    result_path, error_detail, scene_outcomes, created_at, completed_at";

/// Maximum rows returned by a history query.
const MAX_HISTORY_LIMIT: u32 = 100;

/// Durable record of jobs; owns the `jobs` table.
#[derive(Clone)]
pub struct JobStore {
    pool: SqlitePool,
}

/// Raw row shape; converted into the shared `Job` model after decode.
#[derive(Debug, FromRow)]
struct JobRow {
    id: String,
    user_id: String,
    topic: String,
    style: String,
    speaker: i64,
    preview: bool,
    status: String,
    result_path: Option<String>,
    error_detail: Option<String>,
    scene_outcomes: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl JobRow {
    fn into_job(self) -> StoreResult<Job> {
        let status = JobStatus::parse(&self.status)
            .ok_or_else(|| StoreError::corrupt_row(format!("bad status {:?}", self.status)))?;
        let style = VideoStyle::from_str(&self.style)
            .map_err(|e| StoreError::corrupt_row(e.to_string()))?;
        let scene_outcomes: Vec<SceneOutcome> = serde_json::from_str(&self.scene_outcomes)?;

        Ok(Job {
            id: JobId::from_string(self.id),
            user_id: self.user_id,
            topic: self.topic,
            style,
            speaker: self.speaker as u32,
            preview: self.preview,
            status,
            result_path: self.result_path,
            error_detail: self.error_detail,
            scene_outcomes,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

impl JobStore {
    /// Open (creating if missing) the SQLite database at `url` and ensure
    /// the schema exists.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(sqlx::Error::from)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Create from the `DATABASE_URL` environment variable.
    pub async fn from_env() -> StoreResult<Self> {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://shortvid.db".to_string());
        Self::connect(&url).await
    }

    /// In-memory store for tests. A single connection keeps the shared
    /// memory database alive for the pool's lifetime.
    pub async fn connect_in_memory() -> StoreResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Idempotent schema initialization.
    async fn init_schema(&self) -> StoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                topic TEXT NOT NULL,
                style TEXT NOT NULL,
                speaker INTEGER NOT NULL,
                preview INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                result_path TEXT,
                error_detail TEXT,
                scene_outcomes TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                completed_at TEXT
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_jobs_user_created
             ON jobs (user_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new pending job. Durable once this returns.
    pub async fn create(&self, job: &Job) -> StoreResult<()> {
        let outcomes = serde_json::to_string(&job.scene_outcomes)?;

        sqlx::query(
            "INSERT INTO jobs (id, user_id, topic, style, speaker, preview, status, \
             result_path, error_detail, scene_outcomes, created_at, completed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(job.id.as_str())
        .bind(&job.user_id)
        .bind(&job.topic)
        .bind(job.style.as_filename_part())
        .bind(job.speaker as i64)
        .bind(job.preview)
        .bind(job.status.as_str())
        .bind(&job.result_path)
        .bind(&job.error_detail)
        .bind(outcomes)
        .bind(job.created_at)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await?;

        debug!(job_id = %job.id, "Created job record");
        Ok(())
    }

    /// Fetch a job by ID.
    pub async fn get(&self, id: &JobId) -> StoreResult<Job> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE id = ?");
        let row: Option<JobRow> = sqlx::query_as(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.ok_or_else(|| StoreError::not_found(id.as_str()))?
            .into_job()
    }

    /// Transition `pending -> processing`.
    pub async fn mark_processing(&self, id: &JobId) -> StoreResult<()> {
        let result = sqlx::query("UPDATE jobs SET status = 'processing' WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(id.as_str()));
        }
        Ok(())
    }

    /// Transition to the terminal `completed` state.
    pub async fn mark_completed(
        &self,
        id: &JobId,
        result_path: &str,
        outcomes: &[SceneOutcome],
    ) -> StoreResult<()> {
        let outcomes = serde_json::to_string(outcomes)?;
        let result = sqlx::query(
            "UPDATE jobs SET status = 'completed', result_path = ?, \
             scene_outcomes = ?, completed_at = ? WHERE id = ?",
        )
        .bind(result_path)
        .bind(outcomes)
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(id.as_str()));
        }
        Ok(())
    }

    /// Transition to the terminal `failed` state, recording the error verbatim.
    pub async fn mark_failed(
        &self,
        id: &JobId,
        error: &str,
        outcomes: &[SceneOutcome],
    ) -> StoreResult<()> {
        let outcomes = serde_json::to_string(outcomes)?;
        let result = sqlx::query(
            "UPDATE jobs SET status = 'failed', error_detail = ?, \
             scene_outcomes = ?, completed_at = ? WHERE id = ?",
        )
        .bind(error)
        .bind(outcomes)
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(id.as_str()));
        }
        Ok(())
    }

    /// Reverse-chronological job history for one user.
    pub async fn list_for_user(&self, user_id: &str, limit: u32) -> StoreResult<Vec<Job>> {
        let limit = limit.min(MAX_HISTORY_LIMIT);
        let query = format!(
            "SELECT {COLUMNS} FROM jobs WHERE user_id = ? \
             ORDER BY created_at DESC LIMIT ?"
        );
        let rows: Vec<JobRow> = sqlx::query_as(&query)
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    /// Ping the database; used by readiness checks.
    pub async fn check_connectivity(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
