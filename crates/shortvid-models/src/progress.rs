//! Interim progress snapshot.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Ephemeral progress record for an in-flight job.
///
/// Advisory only: the job record's status is authoritative. Absence (expired
/// or never written) is a valid state meaning "derive from the job status".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProgressSnapshot {
    /// Completion percentage, 0-100
    pub percent: u8,
    /// Human-readable stage label
    pub step: String,
}

impl ProgressSnapshot {
    pub fn new(percent: u8, step: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            step: step.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_clamped() {
        assert_eq!(ProgressSnapshot::new(250, "x").percent, 100);
        assert_eq!(ProgressSnapshot::new(42, "x").percent, 42);
    }
}
