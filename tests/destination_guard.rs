mod common;

use std::sync::atomic::{AtomicBool, Ordering};

use common::{Fixture, PROJECT, UPLOADER};
use zone_transfer::blob::MemoryObjectStore;
use zone_transfer::driver::run_transfer_job;
use zone_transfer::graph::{MemoryGraph, NodeRepository};
use zone_transfer::job::JobStatus;
use zone_transfer::lock::{LockMode, LockService, MemoryLockService};
use zone_transfer::walker::TerminalAction;
use zone_transfer::{run_job, JobRequest, Location, Node, NodeKind, ObjectKey, Services, TransferError, TransferJob, Zone};

fn copy(src: &str, dst: &str) -> JobRequest {
    JobRequest::new(TerminalAction::Copy, src, PROJECT, UPLOADER).with_destination(dst)
}

/// Lock service that lets another writer land `admin/a.txt` in core just as the first lock
/// is taken, i.e. after planning has already looked at the destination.
struct LateWriter<'a> {
    inner: &'a MemoryLockService,
    graph: &'a MemoryGraph,
    blobs: &'a MemoryObjectStore,
    core_home: Node,
    endpoint: String,
    fired: AtomicBool,
}

impl LateWriter<'_> {
    fn write_other_job(&self) {
        let key = ObjectKey::new("core-proj", "admin/a.txt");
        self.blobs.put(&key, b"OTHER JOB".to_vec());
        let mut node = Node::new("other-job-file", NodeKind::File, Zone::Core, PROJECT, "a.txt");
        node.display_path = "admin/a.txt".into();
        node.parent_folder_path = "admin".into();
        node.folder_level = 1;
        node.uploader = UPLOADER.into();
        node.file_size = 9;
        node.location = Some(Location::new(&self.endpoint, key));
        self.graph.create_file(&self.core_home.geid, node).unwrap();
    }
}

impl LockService for LateWriter<'_> {
    fn try_acquire(&self, key: &str, mode: LockMode) -> anyhow::Result<bool> {
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.write_other_job();
        }
        self.inner.try_acquire(key, mode)
    }

    fn release(&self, key: &str, mode: LockMode) -> anyhow::Result<()> {
        self.inner.release(key, mode)
    }
}

#[test]
fn destination_written_after_planning_is_left_alone() {
    let fx = Fixture::new();
    let f = fx.file(&fx.gr_home, "a.txt", 10);
    let late = LateWriter {
        inner: &fx.locks,
        graph: &fx.graph,
        blobs: &fx.blobs,
        core_home: fx.core_home.clone(),
        endpoint: fx.config.object_endpoint.clone(),
        fired: AtomicBool::new(false),
    };
    let services = Services {
        locks: &late,
        ..fx.services()
    };

    let err = run_job(&fx.config, services, copy(&f.geid, &fx.core_home.geid)).unwrap_err();
    match &err {
        TransferError::DestinationExists { path } => assert_eq!(path, "admin/a.txt"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(err.is_retriable());

    assert_eq!(
        fx.blobs.get(&ObjectKey::new("core-proj", "admin/a.txt")).unwrap(),
        b"OTHER JOB".to_vec()
    );
    let live: Vec<_> = fx
        .graph
        .find_by_path(Zone::Core, "admin/a.txt")
        .into_iter()
        .filter(|n| !n.archived)
        .collect();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].geid, "other-job-file");

    assert!(!fx.locks.is_locked("gr-proj/admin/a.txt"));
    assert!(!fx.locks.is_locked("core-proj/admin/a.txt"));
    assert!(!fx.node(&f.geid).has_system_tag("copied-to-core"));
    let last = fx.jobs.last().unwrap();
    assert_eq!(last.status, JobStatus::Terminated);
    assert_eq!(last.payload["error_code"], "destination_exists");
}

#[test]
fn taken_substitute_name_fails_before_locking() {
    let fx = Fixture::new();
    let f = fx.file(&fx.gr_home, "a.txt", 10);
    fx.file_in(Zone::Core, &fx.core_home, "a.txt", 3);
    let leftover = fx.file_in(Zone::Core, &fx.core_home, "a_1700000000.txt", 3);

    let job = TransferJob::with_timestamp(copy(&f.geid, &fx.core_home.geid), 1_700_000_000);
    let err = run_transfer_job(&fx.config, fx.services(), &job).unwrap_err();
    match &err {
        TransferError::DestinationExists { path } => assert_eq!(path, "admin/a_1700000000.txt"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(fx.locks.acquired().is_empty());
    assert_eq!(
        fx.blobs.get(&leftover.object_key().unwrap().clone()).unwrap(),
        vec![7u8; 3]
    );

    // A later run picks a fresh suffix.
    let job = TransferJob::with_timestamp(copy(&f.geid, &fx.core_home.geid), 1_700_000_001);
    let summary = run_transfer_job(&fx.config, fx.services(), &job).unwrap();
    assert_eq!(summary.report.renamed[0].destination, "admin/a_1700000001.txt");
}
