//! Generation job definitions and lifecycle.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::style::VideoStyle;

/// Unique identifier for a generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle state.
///
/// `Completed` and `Failed` are terminal; no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job accepted, not yet picked up
    #[default]
    Pending,
    /// Pipeline is running
    Processing,
    /// Output file produced
    Completed,
    /// Pipeline failed with no usable output
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Parse from the stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// What became of one scene during asset generation and encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SceneDisposition {
    /// Scene made it into the encoded output
    Rendered,
    /// Image generation degraded past recovery; scene dropped
    MissingImage,
    /// Speech synthesis returned nothing; scene dropped
    MissingAudio,
}

/// Per-scene outcome, recorded at the job's terminal transition.
///
/// Lets callers distinguish a full success from a job that silently dropped
/// scenes on the way to `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SceneOutcome {
    /// Index of the scene in the original script order
    pub scene_index: u32,
    pub disposition: SceneDisposition,
}

impl SceneOutcome {
    pub fn rendered(scene_index: u32) -> Self {
        Self {
            scene_index,
            disposition: SceneDisposition::Rendered,
        }
    }

    pub fn dropped(scene_index: u32, disposition: SceneDisposition) -> Self {
        Self {
            scene_index,
            disposition,
        }
    }
}

/// One request to produce a finished video from a topic and style.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// Owning user, "anonymous" when the submission carried none
    pub user_id: String,

    /// Topic the script is generated from
    pub topic: String,

    /// Visual style for images and the title card
    pub style: VideoStyle,

    /// Speech synthesis speaker ID
    pub speaker: u32,

    /// Whether the submission asked for script preview mode
    #[serde(default)]
    pub preview: bool,

    /// Lifecycle state
    #[serde(default)]
    pub status: JobStatus,

    /// Path of the encoded output; set only on `Completed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,

    /// Failure detail, recorded verbatim; set only on `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    /// Per-scene dispositions, filled at the terminal transition
    #[serde(default)]
    pub scene_outcomes: Vec<SceneOutcome>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Terminal transition timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new pending job from submission parameters.
    pub fn new(
        user_id: impl Into<String>,
        topic: impl Into<String>,
        style: VideoStyle,
        speaker: u32,
        preview: bool,
    ) -> Self {
        Self {
            id: JobId::new(),
            user_id: user_id.into(),
            topic: topic.into(),
            style,
            speaker,
            preview,
            status: JobStatus::Pending,
            result_path: None,
            error_detail: None,
            scene_outcomes: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Start processing the job.
    pub fn start(mut self) -> Self {
        self.status = JobStatus::Processing;
        self
    }

    /// Mark job as completed with the output location.
    pub fn complete(mut self, result_path: impl Into<String>, outcomes: Vec<SceneOutcome>) -> Self {
        self.status = JobStatus::Completed;
        self.result_path = Some(result_path.into());
        self.scene_outcomes = outcomes;
        self.completed_at = Some(Utc::now());
        self
    }

    /// Mark job as failed, recording the error verbatim.
    pub fn fail(mut self, error: impl Into<String>, outcomes: Vec<SceneOutcome>) -> Self {
        self.status = JobStatus::Failed;
        self.error_detail = Some(error.into());
        self.scene_outcomes = outcomes;
        self.completed_at = Some(Utc::now());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_creation() {
        let job = Job::new("user123", "diet mistakes", VideoStyle::Ghibli, 1, false);

        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.user_id, "user123");
        assert!(job.result_path.is_none());
        assert!(job.error_detail.is_none());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_job_state_transitions() {
        let job = Job::new("user123", "topic", VideoStyle::Anime, 1, false);

        let started = job.start();
        assert_eq!(started.status, JobStatus::Processing);
        assert!(!started.status.is_terminal());

        let completed = started.complete("/out/abc.mp4", vec![SceneOutcome::rendered(0)]);
        assert_eq!(completed.status, JobStatus::Completed);
        assert!(completed.status.is_terminal());
        assert_eq!(completed.result_path.as_deref(), Some("/out/abc.mp4"));
        assert!(completed.completed_at.is_some());
    }

    #[test]
    fn test_job_failure_records_detail() {
        let job = Job::new("user123", "topic", VideoStyle::Realistic, 3, false);

        let failed = job.start().fail("upstream exploded", Vec::new());
        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.error_detail.as_deref(), Some("upstream exploded"));
        assert!(failed.result_path.is_none());
        assert!(failed.completed_at.is_some());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("dead_lettered"), None);
    }
}
