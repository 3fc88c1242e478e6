//! File-backed collaborators rooted at `Config::data_root`.
//!
//! Every store lives in its own file or directory so several job processes on one machine
//! coordinate through the lock directory exactly as they would through a shared lock service.

use anyhow::{Context, Result};
use tracing::debug;

use crate::approval::JsonApprovals;
use crate::blob::LocalObjectStore;
use crate::config::Config;
use crate::graph::{JsonGraph, UuidIssuer};
use crate::job::JournalTracker;
use crate::lock::FileLockService;
use crate::metadata::JournalSink;
use crate::services::Services;

pub struct LocalBackends {
    pub locks: FileLockService,
    pub graph: JsonGraph,
    pub ids: UuidIssuer,
    pub blobs: LocalObjectStore,
    pub metadata: JournalSink,
    pub jobs: JournalTracker,
    pub approvals: JsonApprovals,
}

impl LocalBackends {
    /// Open (creating where needed) every store under the configured data root.
    pub fn open(config: &Config) -> Result<Self> {
        let locks = FileLockService::new(config.locks_dir()).context("open lock directory")?;
        let graph = JsonGraph::open(config.graph_file()).context("open graph store")?;
        let blobs = LocalObjectStore::new(config.objects_dir()).context("open object store")?;
        let metadata = JournalSink::new(config.metadata_journal()).context("open metadata journal")?;
        let jobs = JournalTracker::new(config.job_journal()).context("open job journal")?;
        let approvals = JsonApprovals::open(config.approvals_file()).context("open approvals")?;
        debug!(data_root = %config.data_root.display(), "local backends opened");
        Ok(LocalBackends {
            locks,
            graph,
            ids: UuidIssuer,
            blobs,
            metadata,
            jobs,
            approvals,
        })
    }

    pub fn services(&self) -> Services<'_> {
        Services {
            locks: &self.locks,
            graph: &self.graph,
            ids: &self.ids,
            blobs: &self.blobs,
            metadata: &self.metadata,
            jobs: &self.jobs,
            approvals: &self.approvals,
        }
    }
}
