//! Shared fixture: a project "proj" with uploader "admin", backed by in-memory services.
#![allow(dead_code)]

use tempfile::TempDir;
use zone_transfer::approval::MemoryApprovals;
use zone_transfer::blob::MemoryObjectStore;
use zone_transfer::graph::{MemoryGraph, NodeRepository, UuidIssuer};
use zone_transfer::job::MemoryTracker;
use zone_transfer::lock::MemoryLockService;
use zone_transfer::metadata::RecordingSink;
use zone_transfer::model::join_display_path;
use zone_transfer::{Config, Location, Node, NodeKind, ObjectKey, Services, Zone};

pub const PROJECT: &str = "proj";
pub const UPLOADER: &str = "admin";

pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
    pub locks: MemoryLockService,
    pub graph: MemoryGraph,
    pub ids: UuidIssuer,
    pub blobs: MemoryObjectStore,
    pub metadata: RecordingSink,
    pub jobs: MemoryTracker,
    pub approvals: MemoryApprovals,
    pub project: Node,
    /// Greenroom name folder `admin`.
    pub gr_home: Node,
    /// Core name folder `admin`.
    pub core_home: Node,
    seq: std::cell::Cell<u32>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::new(dir.path().join("data"));
        let graph = MemoryGraph::new();
        let project = graph
            .create_project(Node::new("project-1", NodeKind::Container, Zone::Greenroom, PROJECT, PROJECT))
            .expect("project");
        let mut fx = Fixture {
            dir,
            config,
            locks: MemoryLockService::new(),
            graph,
            ids: UuidIssuer,
            blobs: MemoryObjectStore::new(),
            metadata: RecordingSink::new(),
            jobs: MemoryTracker::new(),
            approvals: MemoryApprovals::new(),
            gr_home: project.clone(),
            core_home: project.clone(),
            project,
            seq: std::cell::Cell::new(0),
        };
        let project = fx.project.clone();
        fx.gr_home = fx.folder_in(Zone::Greenroom, &project, UPLOADER);
        fx.core_home = fx.folder_in(Zone::Core, &project, UPLOADER);
        fx
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

    fn next_geid(&self, prefix: &str) -> String {
        let n = self.seq.get() + 1;
        self.seq.set(n);
        format!("{prefix}-{n}")
    }

    fn base(&self, kind: NodeKind, zone: Zone, parent: &Node, name: &str) -> Node {
        let mut node = Node::new(self.next_geid(kind.label()), kind, zone, PROJECT, name);
        node.display_path = join_display_path(&parent.display_path, name);
        node.parent_folder_path = parent.display_path.clone();
        node.folder_level = node.display_path.matches('/').count() as u32;
        node.uploader = UPLOADER.to_string();
        node.operator = UPLOADER.to_string();
        node
    }

    pub fn folder_in(&self, zone: Zone, parent: &Node, name: &str) -> Node {
        let node = self.base(NodeKind::Folder, zone, parent, name);
        self.graph.create_folder(&parent.geid, node).expect("create folder")
    }

    pub fn file_in(&self, zone: Zone, parent: &Node, name: &str, size: usize) -> Node {
        let mut node = self.base(NodeKind::File, zone, parent, name);
        let key = ObjectKey::new(self.config.bucket_for(zone, PROJECT), &node.display_path);
        self.blobs.put(&key, vec![7u8; size]);
        node.file_size = size as i64;
        node.location = Some(Location::new(&self.config.object_endpoint, key));
        node.version_id = Some("v0".into());
        self.graph.create_file(&parent.geid, node).expect("create file")
    }

    /// Greenroom folder.
    pub fn folder(&self, parent: &Node, name: &str) -> Node {
        self.folder_in(Zone::Greenroom, parent, name)
    }

    /// Greenroom file of `size` bytes.
    pub fn file(&self, parent: &Node, name: &str, size: usize) -> Node {
        self.file_in(Zone::Greenroom, parent, name, size)
    }

    /// `admin/A` with `x.txt` and `B/y.txt`, 2 KB each. Returns (A, x, B, y).
    pub fn tree_a(&self) -> (Node, Node, Node, Node) {
        let a = self.folder(&self.gr_home, "A");
        let x = self.file(&a, "x.txt", 2048);
        let b = self.folder(&a, "B");
        let y = self.file(&b, "y.txt", 2048);
        (a, x, b, y)
    }

    pub fn node(&self, geid: &str) -> Node {
        self.graph.get_by_geid(geid).expect("node")
    }

    pub fn core_node(&self, path: &str) -> Option<Node> {
        self.graph
            .find_by_path(Zone::Core, path)
            .into_iter()
            .find(|n| !n.archived)
    }
}
