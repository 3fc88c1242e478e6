//! Job tracker that appends each status update as one JSON line.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;

use super::{JobTracker, JobUpdate};
use crate::fs_ops::io_error_with_help;

pub struct JournalTracker {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JournalTracker {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error_with_help("create job journal directory", parent))?;
        }
        Ok(JournalTracker {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl JobTracker for JournalTracker {
    fn update(&self, update: &JobUpdate) -> Result<()> {
        let mut record = serde_json::to_value(update).context("serialize job update")?;
        record["at"] = json!(Utc::now().to_rfc3339());
        let line = serde_json::to_string(&record).context("serialize job update")?;

        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_error_with_help("open job journal", &self.path))?;
        writeln!(f, "{line}").map_err(io_error_with_help("append job journal", &self.path))?;
        Ok(())
    }
}
