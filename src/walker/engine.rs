use serde::Serialize;
use tracing::{debug, info};

use super::plan::{graph, PlannedNode, TransferPlan};
use crate::approval::CopyStatus;
use crate::blob::{BlobTransfer, TransferMode};
use crate::config::Config;
use crate::errors::TransferError;
use crate::graph::NodePatch;
use crate::job::ProgressReporter;
use crate::metadata::{MetadataPropagator, MetadataStep};
use crate::model::{join_display_path, Location, Node, NodeKind, ObjectKey, TransferJob, Zone};
use crate::services::Services;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamedFile {
    pub source: String,
    pub destination: String,
}

/// What one execution changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub files_copied: usize,
    pub files_archived: usize,
    pub folders_created: usize,
    pub folders_reused: usize,
    pub folders_archived: usize,
    pub bytes_transferred: u64,
    pub staged_transfers: usize,
    pub renamed: Vec<RenamedFile>,
    /// Node created (or reused) for the root of the tree.
    pub root_geid: Option<String>,
}

pub struct TreeWalker<'a> {
    pub(super) config: &'a Config,
    pub(super) services: Services<'a>,
    pub(super) job: &'a TransferJob,
}

/// Per-execution state threaded through the recursion.
struct Execution<'p> {
    plan: &'p TransferPlan,
    blobs: BlobTransfer<'p>,
    metadata: MetadataPropagator<'p>,
    progress: Option<&'p ProgressReporter<'p>>,
    report: ExecutionReport,
}

impl<'a> TreeWalker<'a> {
    pub fn new(config: &'a Config, services: Services<'a>, job: &'a TransferJob) -> Self {
        TreeWalker {
            config,
            services,
            job,
        }
    }

    /// Visit the planned tree. Every lock in `plan.locks` must already be held.
    ///
    /// The first failing node aborts the walk; nothing done before it is undone.
    pub fn execute(
        &self,
        plan: &TransferPlan,
        progress: Option<&ProgressReporter<'_>>,
    ) -> Result<ExecutionReport, TransferError> {
        let req = &self.job.request;
        let mut ex = Execution {
            plan,
            blobs: BlobTransfer::new(
                self.services.blobs,
                self.config.large_object_threshold,
                &self.config.staging_dir,
            ),
            metadata: MetadataPropagator::new(
                self.services.metadata,
                plan.action.pipeline(),
                &req.operator,
                &req.project_code,
            ),
            progress,
            report: ExecutionReport::default(),
        };

        let root = if plan.action.writes_destination() {
            self.copy_node(&mut ex, &plan.root, &plan.attach_to)?
        } else {
            self.archive_node(&mut ex, &plan.root, &plan.attach_to)?
        };
        ex.report.root_geid = Some(root.geid);
        Ok(ex.report)
    }

    fn copy_node(
        &self,
        ex: &mut Execution<'_>,
        pn: &PlannedNode,
        parent: &Node,
    ) -> Result<Node, TransferError> {
        let src = &pn.node;
        let repo = self.services.graph;
        let dest_name = ex.plan.dest_name(pn);
        let dest_path = join_display_path(&pn.dest_dir, &dest_name);

        match src.kind {
            NodeKind::File => {
                let src_key = self.object_key_of(src)?;
                let dst_key = ObjectKey::new(
                    self.config.bucket_for(Zone::Core, &src.project_code),
                    dest_path.clone(),
                );
                let outcome = ex.blobs.transfer(src_key, &dst_key)?;

                let mut node = self.mirror(src, NodeKind::File, Zone::Core, &pn.dest_dir, &dest_name)?;
                node.location = Some(Location::new(&self.config.object_endpoint, dst_key));
                node.version_id = Some(outcome.version_id);
                let created = graph("create_file", repo.create_file(&parent.geid, node))?;
                info!(src = %src.display_path, dst = %created.display_path, geid = %created.geid, "file copied");

                ex.metadata.on_file_transferred(src, &created)?;
                self.tag_source(src)?;
                self.mark_copied(ex, src)?;

                ex.report.files_copied += 1;
                ex.report.bytes_transferred += outcome.bytes;
                if outcome.mode == TransferMode::Staged {
                    ex.report.staged_transfers += 1;
                }
                if ex.plan.duplicates.get(&src.display_path).is_some() {
                    ex.report.renamed.push(RenamedFile {
                        source: src.display_path.clone(),
                        destination: dest_path.clone(),
                    });
                }
                if let Some(p) = ex.progress {
                    p.file_done(&dest_path);
                }
                Ok(created)
            }
            NodeKind::Folder => {
                let folder = match &pn.existing {
                    Some(existing) => {
                        debug!(path = %dest_path, geid = %existing.geid, "destination folder exists; reusing");
                        ex.report.folders_reused += 1;
                        existing.clone()
                    }
                    None => {
                        let node = self.mirror(src, NodeKind::Folder, Zone::Core, &pn.dest_dir, &dest_name)?;
                        let created = graph("create_folder", repo.create_folder(&parent.geid, node))?;
                        ex.metadata.on_folder_created(src, &created)?;
                        ex.report.folders_created += 1;
                        debug!(path = %dest_path, geid = %created.geid, "destination folder created");
                        created
                    }
                };
                for child in &pn.children {
                    self.copy_node(ex, child, &folder)?;
                }
                self.tag_source(src)?;
                self.mark_copied(ex, src)?;
                Ok(folder)
            }
            other => Err(not_transferable(src, other)),
        }
    }

    fn archive_node(
        &self,
        ex: &mut Execution<'_>,
        pn: &PlannedNode,
        parent: &Node,
    ) -> Result<Node, TransferError> {
        let src = &pn.node;
        let repo = self.services.graph;
        let dest_name = ex.plan.dest_name(pn);

        match src.kind {
            NodeKind::File => {
                ex.blobs.remove(self.object_key_of(src)?)?;

                let mut trash = self.mirror(src, NodeKind::TrashFile, src.zone, &pn.dest_dir, &dest_name)?;
                trash.archived = true;
                trash.in_trashbin = true;
                let created = graph("create_file", repo.create_file(&parent.geid, trash))?;
                ex.metadata.on_file_archived(src, &created)?;
                graph(
                    "update_fields",
                    repo.update_fields(NodeKind::File, &src.geid, &NodePatch::archive()),
                )?;
                info!(src = %src.display_path, trash = %created.display_path, "file moved to trash");

                ex.report.files_archived += 1;
                if let Some(p) = ex.progress {
                    p.file_done(&src.display_path);
                }
                Ok(created)
            }
            NodeKind::Folder => {
                let mut trash = self.mirror(src, NodeKind::Folder, src.zone, &pn.dest_dir, &dest_name)?;
                trash.archived = true;
                trash.in_trashbin = true;
                let created = graph("create_folder", repo.create_folder(&parent.geid, trash))?;
                ex.metadata.on_folder_archived(src)?;
                for child in &pn.children {
                    self.archive_node(ex, child, &created)?;
                }
                graph(
                    "update_fields",
                    repo.update_fields(NodeKind::Folder, &src.geid, &NodePatch::archive()),
                )?;
                debug!(src = %src.display_path, trash = %created.display_path, "folder moved to trash");
                ex.report.folders_archived += 1;
                Ok(created)
            }
            other => Err(not_transferable(src, other)),
        }
    }

    fn object_key_of<'n>(&self, node: &'n Node) -> Result<&'n ObjectKey, TransferError> {
        node.object_key().ok_or_else(|| {
            TransferError::Configuration(format!("file {} has no object location", node.geid))
        })
    }

    /// New node mirroring `src` at `dest_dir/name` with a freshly minted geid.
    fn mirror(
        &self,
        src: &Node,
        kind: NodeKind,
        zone: Zone,
        dest_dir: &str,
        name: &str,
    ) -> Result<Node, TransferError> {
        let geid = self.services.ids.mint().map_err(|e| TransferError::GraphStore {
            op: "mint_id",
            reason: format!("{e:#}"),
        })?;
        let mut node = Node::new(geid, kind, zone, &src.project_code, name);
        node.display_path = join_display_path(dest_dir, name);
        node.parent_folder_path = dest_dir.to_string();
        node.folder_level = node.display_path.matches('/').count() as u32;
        if kind != NodeKind::Folder {
            node.file_size = src.file_size;
        }
        node.uploader = src.uploader.clone();
        node.operator = self.job.request.operator.clone();
        node.tags = src.tags.clone();
        node.list_priority = src.list_priority;
        node.manifest_id = src.manifest_id;
        node.attributes = src.attributes.clone();
        Ok(node)
    }

    fn tag_source(&self, src: &Node) -> Result<(), TransferError> {
        graph(
            "update_fields",
            self.services
                .graph
                .update_fields(src.kind, &src.geid, &NodePatch::tag(&self.config.copied_tag)),
        )?;
        Ok(())
    }

    /// Only entities reviewed as approved are marked copied. Pending folders the copy merely
    /// passed through keep their status.
    fn mark_copied(&self, ex: &Execution<'_>, src: &Node) -> Result<(), TransferError> {
        let Some(entity) = ex
            .plan
            .approvals
            .as_ref()
            .filter(|a| a.is_approved(&src.geid))
            .and_then(|a| a.get(&src.geid))
        else {
            return Ok(());
        };
        self.services
            .approvals
            .update_copy_status(&entity.id, CopyStatus::Copied)
            .map_err(|e| TransferError::MetadataPropagationFailure {
                step: MetadataStep::CopyStatus,
                geid: src.geid.clone(),
                reason: format!("{e:#}"),
            })
    }
}

fn not_transferable(node: &Node, kind: NodeKind) -> TransferError {
    TransferError::Configuration(format!("{} {} cannot be transferred", kind, node.geid))
}
