//! Shared data models for the ShortVid backend.
//!
//! This crate provides Serde-serializable types for:
//! - Generation jobs and their lifecycle
//! - Scripts, scenes and per-scene outcomes
//! - Visual styles
//! - Progress snapshots

pub mod job;
pub mod progress;
pub mod script;
pub mod style;

// Re-export common types
pub use job::{Job, JobId, JobStatus, SceneDisposition, SceneOutcome};
pub use progress::ProgressSnapshot;
pub use script::{Scene, Script, ScriptError};
pub use style::{StyleParseError, VideoStyle};
