use crate::approval::ApprovalSource;
use crate::blob::BlobStore;
use crate::graph::{IdIssuer, NodeRepository};
use crate::job::JobTracker;
use crate::lock::LockService;
use crate::metadata::MetadataSink;

/// The external systems a job talks to, borrowed for the job's lifetime.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub locks: &'a dyn LockService,
    pub graph: &'a dyn NodeRepository,
    pub ids: &'a dyn IdIssuer,
    pub blobs: &'a dyn BlobStore,
    pub metadata: &'a dyn MetadataSink,
    pub jobs: &'a dyn JobTracker,
    pub approvals: &'a dyn ApprovalSource,
}
