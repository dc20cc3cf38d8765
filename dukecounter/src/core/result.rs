//! Per-stage results and the run report.

use super::StageStatus;
use crate::utils::format_elapsed;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Outcome of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageResult {
    /// Stage name.
    pub name: String,
    /// Final status.
    pub status: StageStatus,
    /// Time spent in the stage.
    pub elapsed: Duration,
    /// Why the stage was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StageResult {
    /// Creates a completed result.
    #[must_use]
    pub fn ok(name: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            name: name.into(),
            status: StageStatus::Ok,
            elapsed,
            detail: None,
        }
    }

    /// Creates a skipped result.
    #[must_use]
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StageStatus::Skip,
            elapsed: Duration::ZERO,
            detail: Some(reason.into()),
        }
    }

    /// Returns the duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Everything a run reports once it finishes.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Run identifier, also recorded on the run's tracing span.
    pub run_id: String,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Stage results in execution order.
    pub stages: Vec<StageResult>,
    /// Total wall-clock time.
    pub total: Duration,
}

impl RunReport {
    /// Looks up a stage result by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// The `Total time ...` line printed at the end of a run.
    #[must_use]
    pub fn summary_line(&self) -> String {
        format!("Total time for the simulation = {}.", format_elapsed(self.total))
    }
}
