use std::sync::{Mutex, MutexGuard};

use anyhow::bail;

use super::{JobStatus, JobTracker, JobUpdate};

/// Tracker that keeps every update in memory.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    updates: Mutex<Vec<JobUpdate>>,
    failing: Mutex<bool>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn updates_guard(&self) -> MutexGuard<'_, Vec<JobUpdate>> {
        self.updates.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every later update fail.
    pub fn fail_updates(&self) {
        *self.failing.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = true;
    }

    pub fn updates(&self) -> Vec<JobUpdate> {
        self.updates_guard().clone()
    }

    pub fn statuses(&self) -> Vec<JobStatus> {
        self.updates_guard().iter().map(|u| u.status).collect()
    }

    pub fn last(&self) -> Option<JobUpdate> {
        self.updates_guard().last().cloned()
    }
}

impl JobTracker for MemoryTracker {
    fn update(&self, update: &JobUpdate) -> anyhow::Result<()> {
        if *self.failing.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) {
            bail!("job tracker unavailable");
        }
        self.updates_guard().push(update.clone());
        Ok(())
    }
}
