//! Job status reporting.
//!
//! A job reports RUNNING when it starts (and as files complete), then exactly one terminal
//! status: SUCCEED or TERMINATED. Tracker failures are logged and never fail the job.

mod journal;
mod memory;
mod progress;

pub use journal::JournalTracker;
pub use memory::MemoryTracker;
pub use progress::ProgressReporter;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Running,
    Succeed,
    Terminated,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Running => "RUNNING",
            JobStatus::Succeed => "SUCCEED",
            JobStatus::Terminated => "TERMINATED",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobUpdate {
    pub session_id: String,
    pub job_id: String,
    pub status: JobStatus,
    /// Percent complete, 0..=100.
    pub progress: u8,
    pub payload: Value,
}

pub trait JobTracker: Send + Sync {
    fn update(&self, update: &JobUpdate) -> anyhow::Result<()>;
}

/// Send `update`, logging instead of propagating a tracker failure.
pub fn report(tracker: &dyn JobTracker, update: &JobUpdate) {
    if let Err(e) = tracker.update(update) {
        warn!(
            job_id = %update.job_id,
            status = %update.status,
            error = %format!("{e:#}"),
            "job status update failed"
        );
    }
}
