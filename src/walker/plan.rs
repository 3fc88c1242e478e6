//! Planning pass: resolve every node the job will touch, detect destination collisions and
//! derive the ordered lock set, before anything is written.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use super::{append_suffix, DuplicatedFileNames, TerminalAction, TreeWalker};
use crate::approval::ApprovedEntities;
use crate::errors::TransferError;
use crate::graph::GraphResult;
use crate::lock::{LockMode, LockRequest};
use crate::model::{join_display_path, Node, NodeKind, Zone};

/// One node of the source tree and where it will land.
#[derive(Debug, Clone)]
pub struct PlannedNode {
    pub node: Node,
    /// Destination directory (display path) the node is written into.
    pub dest_dir: String,
    /// Destination name before duplicate resolution.
    pub requested_name: String,
    /// Destination folder that already exists and will be reused.
    pub existing: Option<Node>,
    pub children: Vec<PlannedNode>,
}

impl PlannedNode {
    fn walk<'p>(&'p self, out: &mut Vec<&'p PlannedNode>) {
        out.push(self);
        for c in &self.children {
            c.walk(out);
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub action: TerminalAction,
    pub timestamp: i64,
    pub project: Node,
    /// Parent of the root's counterpart: the destination folder of a copy, the project
    /// root for an archive.
    pub attach_to: Node,
    pub root: PlannedNode,
    /// Every lock the job needs, in acquisition order, without repeats.
    pub locks: Vec<LockRequest>,
    pub duplicates: DuplicatedFileNames,
    pub approvals: Option<ApprovedEntities>,
    pub files: usize,
    pub folders: usize,
    pub bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub kind: NodeKind,
    pub geid: String,
    pub source: String,
    pub destination: String,
    pub reuses_existing: bool,
    pub renamed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub action: TerminalAction,
    pub project: String,
    pub timestamp: i64,
    pub files: usize,
    pub folders: usize,
    pub bytes: u64,
    pub locks: Vec<LockRequest>,
    pub entries: Vec<PlanEntry>,
}

impl TransferPlan {
    pub fn dest_name(&self, pn: &PlannedNode) -> String {
        if pn.node.is_file() {
            self.duplicates.resolve(&pn.node.display_path, &pn.requested_name)
        } else {
            pn.requested_name.clone()
        }
    }

    pub fn dest_path(&self, pn: &PlannedNode) -> String {
        join_display_path(&pn.dest_dir, &self.dest_name(pn))
    }

    /// Planned nodes in visiting order (parents before children).
    pub fn nodes(&self) -> Vec<&PlannedNode> {
        let mut out = Vec::new();
        self.root.walk(&mut out);
        out
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            action: self.action,
            project: self.project.project_code.clone(),
            timestamp: self.timestamp,
            files: self.files,
            folders: self.folders,
            bytes: self.bytes,
            locks: self.locks.clone(),
            entries: self
                .nodes()
                .into_iter()
                .map(|pn| PlanEntry {
                    kind: pn.node.kind,
                    geid: pn.node.geid.clone(),
                    source: pn.node.display_path.clone(),
                    destination: self.dest_path(pn),
                    reuses_existing: pn.existing.is_some(),
                    renamed: self.duplicates.get(&pn.node.display_path).is_some(),
                })
                .collect(),
        }
    }
}

/// Ordered lock list that ignores repeats of the same key and mode.
#[derive(Default)]
struct LockList {
    seen: HashSet<LockRequest>,
    ordered: Vec<LockRequest>,
}

impl LockList {
    fn push(&mut self, key: String, mode: LockMode) {
        let req = LockRequest::new(key, mode);
        if self.seen.insert(req.clone()) {
            self.ordered.push(req);
        }
    }
}

pub(super) fn graph<T>(op: &'static str, result: GraphResult<T>) -> Result<T, TransferError> {
    result.map_err(|e| e.into_transfer(op))
}

impl TreeWalker<'_> {
    pub fn plan(&self) -> Result<TransferPlan, TransferError> {
        let req = &self.job.request;
        let action = req.action;
        let repo = self.services.graph;

        let project = graph("find_project", repo.find_project(&req.project_code))?
            .ok_or_else(|| TransferError::NotFound(format!("project {}", req.project_code)))?;
        let source = self.live_node(&req.source_geid, "source")?;
        if source.project_code != req.project_code {
            return Err(TransferError::Configuration(format!(
                "source {} belongs to project {}, not {}",
                source.geid, source.project_code, req.project_code
            )));
        }
        if !(source.is_file() || source.is_folder()) {
            return Err(TransferError::Configuration(format!(
                "source {} is a {}; only files and folders can be transferred",
                source.geid, source.kind
            )));
        }

        let approvals = if action.is_approval_gated() {
            let approvals = self.load_approvals()?;
            let listed = if source.is_file() {
                approvals.is_approved(&source.geid)
            } else {
                approvals.on_path(&source.geid)
            };
            if !listed {
                return Err(TransferError::Configuration(format!(
                    "source {} is not approved in request {}",
                    source.geid,
                    req.approval_request_id.as_deref().unwrap_or_default()
                )));
            }
            Some(approvals)
        } else {
            None
        };

        let (attach_to, dest_dir, root_name) = if action.writes_destination() {
            let dest = self.destination(&source)?;
            let name = match &req.rename {
                Some(name) => validate_name(name)?,
                None => source.name.clone(),
            };
            let dir = dest.display_path.clone();
            (dest, dir, name)
        } else {
            let name = append_suffix(&source.name, &self.job.timestamp.to_string());
            (project.clone(), source.uploader.clone(), name)
        };

        let mut duplicates = DuplicatedFileNames::new(self.job.timestamp);
        let root = self
            .plan_node(&source, &dest_dir, root_name, approvals.as_ref(), &mut duplicates)?
            .ok_or_else(|| {
                TransferError::Configuration(format!("nothing to transfer under {}", source.geid))
            })?;

        let mut plan = TransferPlan {
            action,
            timestamp: self.job.timestamp,
            project,
            attach_to,
            root,
            locks: Vec::new(),
            duplicates,
            approvals,
            files: 0,
            folders: 0,
            bytes: 0,
        };
        let (mut files, mut folders, mut bytes) = (0, 0, 0u64);
        for pn in plan.nodes() {
            if pn.node.is_file() {
                files += 1;
                bytes += pn.node.file_size.max(0) as u64;
            } else {
                folders += 1;
            }
        }
        plan.files = files;
        plan.folders = folders;
        plan.bytes = bytes;
        plan.locks = self.lock_order(&plan);

        info!(
            action = %action,
            source = %source.display_path,
            files = plan.files,
            folders = plan.folders,
            locks = plan.locks.len(),
            renamed = plan.duplicates.len(),
            "transfer planned"
        );
        Ok(plan)
    }

    /// Re-check the destination of every planned node once the write locks are held.
    ///
    /// A file path must still be free, and a folder must still be the one planning found
    /// (or still be absent). Anything written there between planning and locking fails the
    /// job with `DestinationExists` before a single byte is copied.
    pub fn verify_destinations(&self, plan: &TransferPlan) -> Result<(), TransferError> {
        if !plan.action.writes_destination() {
            return Ok(());
        }
        let repo = self.services.graph;
        for pn in plan.nodes() {
            let path = plan.dest_path(pn);
            let project = &pn.node.project_code;
            let changed = match pn.node.kind {
                NodeKind::File => graph("file_exists", repo.file_exists(Zone::Core, project, &path))?.is_some(),
                NodeKind::Folder => {
                    let now = graph("folder_exists", repo.folder_exists(Zone::Core, project, &path))?;
                    now.map(|n| n.geid) != pn.existing.as_ref().map(|n| n.geid.clone())
                }
                NodeKind::TrashFile | NodeKind::Container => false,
            };
            if changed {
                warn!(path = %path, "destination changed after planning");
                return Err(TransferError::DestinationExists { path });
            }
        }
        Ok(())
    }

    /// Node that exists and is not archived.
    fn live_node(&self, geid: &str, role: &str) -> Result<Node, TransferError> {
        let node = graph("get_by_geid", self.services.graph.get_by_geid(geid))
            .map_err(|e| match e {
                TransferError::NotFound(_) => TransferError::NotFound(format!("{role} node {geid}")),
                other => other,
            })?;
        if node.archived {
            return Err(TransferError::NotFound(format!("{role} node {geid} is archived")));
        }
        Ok(node)
    }

    fn destination(&self, source: &Node) -> Result<Node, TransferError> {
        let req = &self.job.request;
        let geid = req.destination_geid.as_deref().ok_or_else(|| {
            TransferError::Configuration(format!("{} requires a destination", req.action))
        })?;
        let dest = self.live_node(geid, "destination")?;
        if dest.project_code != source.project_code {
            return Err(TransferError::Configuration(format!(
                "destination {} belongs to project {}, not {}",
                dest.geid, dest.project_code, source.project_code
            )));
        }
        match dest.kind {
            NodeKind::Container => Ok(dest),
            NodeKind::Folder if dest.zone == Zone::Core => Ok(dest),
            NodeKind::Folder => Err(TransferError::Configuration(format!(
                "destination {} is not in the {} zone",
                dest.geid,
                Zone::Core
            ))),
            other => Err(TransferError::Configuration(format!(
                "destination {} is a {other}, not a folder",
                dest.geid
            ))),
        }
    }

    fn load_approvals(&self) -> Result<ApprovedEntities, TransferError> {
        let req = &self.job.request;
        let request_id = req.approval_request_id.as_deref().ok_or_else(|| {
            TransferError::Configuration("approval copy requires an approval request id".into())
        })?;
        let source = self.services.approvals;
        let lookup_failed = |e: anyhow::Error| {
            TransferError::Configuration(format!("approval request {request_id}: {e:#}"))
        };
        let request = source
            .get_request(request_id)
            .map_err(lookup_failed)?
            .ok_or_else(|| {
                TransferError::Configuration(format!("approval request {request_id} does not exist"))
            })?;
        if request.project_code != req.project_code {
            return Err(TransferError::Configuration(format!(
                "approval request {request_id} belongs to project {}",
                request.project_code
            )));
        }
        let entities = source.get_entities(request_id).map_err(lookup_failed)?;
        debug!(request_id, entities = entities.len(), "approval entities loaded");
        Ok(ApprovedEntities::new(entities))
    }

    fn plan_node(
        &self,
        node: &Node,
        dest_dir: &str,
        requested_name: String,
        approvals: Option<&ApprovedEntities>,
        duplicates: &mut DuplicatedFileNames,
    ) -> Result<Option<PlannedNode>, TransferError> {
        if node.archived {
            trace!(geid = %node.geid, "archived node skipped");
            return Ok(None);
        }
        let writes = self.job.request.action.writes_destination();
        let repo = self.services.graph;

        match node.kind {
            NodeKind::File => {
                if let Some(approved) = approvals
                    && !approved.is_approved(&node.geid)
                {
                    debug!(geid = %node.geid, path = %node.display_path, "file not approved; skipped");
                    return Ok(None);
                }
                if node.location.is_none() {
                    return Err(TransferError::Configuration(format!(
                        "file {} has no object location",
                        node.geid
                    )));
                }
                if writes {
                    let candidate = join_display_path(dest_dir, &requested_name);
                    let taken = graph(
                        "file_exists",
                        repo.file_exists(Zone::Core, &node.project_code, &candidate),
                    )?;
                    if taken.is_some() {
                        let renamed = duplicates.add(&node.display_path, &requested_name);
                        let substitute = join_display_path(dest_dir, &renamed);
                        if graph("file_exists", repo.file_exists(Zone::Core, &node.project_code, &substitute))?
                            .is_some()
                        {
                            return Err(TransferError::DestinationExists { path: substitute });
                        }
                        info!(path = %candidate, renamed = %renamed, "destination exists; file will be renamed");
                    }
                }
                Ok(Some(PlannedNode {
                    node: node.clone(),
                    dest_dir: dest_dir.to_string(),
                    requested_name,
                    existing: None,
                    children: Vec::new(),
                }))
            }
            NodeKind::Folder => {
                if let Some(approved) = approvals
                    && !approved.on_path(&node.geid)
                {
                    debug!(geid = %node.geid, path = %node.display_path, "folder not on approval path; skipped");
                    return Ok(None);
                }
                let dest_path = join_display_path(dest_dir, &requested_name);
                let existing = if writes {
                    graph(
                        "folder_exists",
                        repo.folder_exists(Zone::Core, &node.project_code, &dest_path),
                    )?
                } else {
                    None
                };
                let mut children = Vec::new();
                for child in graph("get_children", repo.get_children(&node.geid))? {
                    let name = child.name.clone();
                    if let Some(planned) = self.plan_node(&child, &dest_path, name, approvals, duplicates)? {
                        children.push(planned);
                    }
                }
                Ok(Some(PlannedNode {
                    node: node.clone(),
                    dest_dir: dest_dir.to_string(),
                    requested_name,
                    existing,
                    children,
                }))
            }
            NodeKind::TrashFile | NodeKind::Container => {
                trace!(geid = %node.geid, kind = %node.kind, "not transferable; skipped");
                Ok(None)
            }
        }
    }

    /// Lock key of a source node; `None` for name folders, which are never locked.
    fn source_key(&self, node: &Node) -> Option<String> {
        if node.is_name_folder() {
            return None;
        }
        match node.kind {
            NodeKind::File => node.object_key().map(|k| k.to_string()),
            NodeKind::Folder => Some(self.config.lock_key(node.zone, &node.project_code, &node.display_path)),
            NodeKind::TrashFile | NodeKind::Container => None,
        }
    }

    /// Source before destination, parent before child. The destination root comes right
    /// after the root's own source lock unless it is a project root or a name folder.
    fn lock_order(&self, plan: &TransferPlan) -> Vec<LockRequest> {
        let mut locks = LockList::default();
        let source_mode = plan.action.source_lock_mode();

        if let Some(key) = self.source_key(&plan.root.node) {
            locks.push(key, source_mode);
        }
        let target = &plan.attach_to;
        if plan.action.writes_destination() && !(target.is_container() || target.is_name_folder()) {
            locks.push(
                self.config.lock_key(Zone::Core, &target.project_code, &target.display_path),
                LockMode::Write,
            );
        }
        self.push_destination_lock(plan, &plan.root, &mut locks);
        for child in &plan.root.children {
            self.push_subtree_locks(plan, child, &mut locks);
        }
        locks.ordered
    }

    fn push_subtree_locks(&self, plan: &TransferPlan, pn: &PlannedNode, locks: &mut LockList) {
        if let Some(key) = self.source_key(&pn.node) {
            locks.push(key, plan.action.source_lock_mode());
        }
        self.push_destination_lock(plan, pn, locks);
        for child in &pn.children {
            self.push_subtree_locks(plan, child, locks);
        }
    }

    fn push_destination_lock(&self, plan: &TransferPlan, pn: &PlannedNode, locks: &mut LockList) {
        if !plan.action.writes_destination() {
            return;
        }
        let path = plan.dest_path(pn);
        if pn.node.is_folder() && path == pn.node.uploader {
            return;
        }
        locks.push(
            self.config.lock_key(Zone::Core, &pn.node.project_code, &path),
            LockMode::Write,
        );
    }
}

fn validate_name(name: &str) -> Result<String, TransferError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains('/') || trimmed == "." || trimmed == ".." {
        return Err(TransferError::Configuration(format!(
            "'{name}' is not a valid node name"
        )));
    }
    Ok(trimmed.to_string())
}
