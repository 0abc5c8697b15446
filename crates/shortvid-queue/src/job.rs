//! Queue payload types.

use serde::{Deserialize, Serialize};
use shortvid_models::{JobId, VideoStyle};

/// Job payload handed from the dispatcher to the worker.
///
/// Mirrors the persisted submission parameters; the job record itself stays
/// in the store and is looked up by ID. No idempotency key: every
/// submission is an independent job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderJob {
    /// Unique job ID, allocated at submission
    pub job_id: JobId,
    /// Owning user
    pub user_id: String,
    /// Topic the script is generated from
    pub topic: String,
    /// Visual style
    pub style: VideoStyle,
    /// Speech synthesis speaker ID
    pub speaker: u32,
    /// Script preview mode flag
    #[serde(default)]
    pub preview: bool,
}

impl RenderJob {
    pub fn new(
        job_id: JobId,
        user_id: impl Into<String>,
        topic: impl Into<String>,
        style: VideoStyle,
        speaker: u32,
        preview: bool,
    ) -> Self {
        Self {
            job_id,
            user_id: user_id.into(),
            topic: topic.into(),
            style,
            speaker,
            preview,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_round_trip() {
        let job = RenderJob::new(
            JobId::from_string("abc-123"),
            "user1",
            "diet mistakes",
            VideoStyle::Ghibli,
            1,
            false,
        );

        let json = serde_json::to_string(&job).unwrap();
        assert!(json.contains("\"ghibli\""));

        let back: RenderJob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.job_id.as_str(), "abc-123");
        assert_eq!(back.style, VideoStyle::Ghibli);
        assert_eq!(back.speaker, 1);
    }
}
