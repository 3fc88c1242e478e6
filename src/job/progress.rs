use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use super::{report, JobStatus, JobTracker, JobUpdate};

/// Emits a RUNNING update with a percentage each time a file completes.
pub struct ProgressReporter<'a> {
    tracker: &'a dyn JobTracker,
    session_id: &'a str,
    job_id: &'a str,
    total: usize,
    done: AtomicUsize,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(tracker: &'a dyn JobTracker, session_id: &'a str, job_id: &'a str, total: usize) -> Self {
        ProgressReporter {
            tracker,
            session_id,
            job_id,
            total,
            done: AtomicUsize::new(0),
        }
    }

    pub fn percent(done: usize, total: usize) -> u8 {
        if total == 0 {
            return 100;
        }
        ((done.min(total) * 100) / total) as u8
    }

    pub fn file_done(&self, display_path: &str) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        report(
            self.tracker,
            &JobUpdate {
                session_id: self.session_id.to_string(),
                job_id: self.job_id.to_string(),
                status: JobStatus::Running,
                progress: Self::percent(done, self.total),
                payload: json!({ "completed": done, "total": self.total, "last": display_path }),
            },
        );
    }

    pub fn completed(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::MemoryTracker;

    #[test]
    fn percent_is_clamped() {
        assert_eq!(ProgressReporter::percent(0, 0), 100);
        assert_eq!(ProgressReporter::percent(1, 3), 33);
        assert_eq!(ProgressReporter::percent(5, 3), 100);
    }

    #[test]
    fn each_file_reports_running() {
        let tracker = MemoryTracker::new();
        let p = ProgressReporter::new(&tracker, "s", "j", 2);
        p.file_done("admin/a");
        p.file_done("admin/b");
        let updates = tracker.updates();
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| u.status == JobStatus::Running));
        assert_eq!(updates[1].progress, 100);
        assert_eq!(p.completed(), 2);
    }
}
