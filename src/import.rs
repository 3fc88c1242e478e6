//! Seed the graph and object store from a local directory tree.
//!
//! The tree is placed in the greenroom under `<uploader>/`, creating the project container
//! and the uploader's name folder on first use. Folders and files that already exist at the
//! same display path are reused, so an import can be re-run after adding files.

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::blob::BlobStore;
use crate::config::Config;
use crate::graph::{IdIssuer, NodeRepository};
use crate::model::{join_display_path, Location, Node, NodeKind, ObjectKey, Zone};
use crate::shutdown;

#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub source_dir: PathBuf,
    pub project_code: String,
    pub uploader: String,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ImportReport {
    pub project_geid: String,
    pub name_folder_geid: String,
    pub folders_created: usize,
    pub files_created: usize,
    pub skipped: usize,
    pub bytes: u64,
}

struct Importer<'a> {
    config: &'a Config,
    graph: &'a dyn NodeRepository,
    ids: &'a dyn IdIssuer,
    blobs: &'a dyn BlobStore,
    project: &'a str,
    uploader: &'a str,
}

pub fn import_tree(
    config: &Config,
    graph: &dyn NodeRepository,
    ids: &dyn IdIssuer,
    blobs: &dyn BlobStore,
    req: &ImportRequest,
) -> Result<ImportReport> {
    if req.project_code.trim().is_empty() || req.uploader.trim().is_empty() {
        bail!("import needs a project code and an uploader");
    }
    if req.uploader.contains('/') {
        bail!("uploader '{}' must not contain '/'", req.uploader);
    }
    if !req.source_dir.is_dir() {
        bail!("import source '{}' is not a directory", req.source_dir.display());
    }

    let imp = Importer {
        config,
        graph,
        ids,
        blobs,
        project: &req.project_code,
        uploader: &req.uploader,
    };
    let mut report = ImportReport::default();

    let project = imp.ensure_project()?;
    let name_folder = imp.ensure_folder(&project.geid, "", &req.uploader, &mut report)?;
    report.project_geid = project.geid;
    report.name_folder_geid = name_folder.geid.clone();

    // Relative directory -> (geid, display path).
    let mut dirs: HashMap<PathBuf, (String, String)> = HashMap::new();
    dirs.insert(PathBuf::new(), (name_folder.geid, name_folder.display_path));

    for entry in WalkDir::new(&req.source_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        if shutdown::is_requested() {
            bail!("import interrupted");
        }
        let entry = entry.with_context(|| format!("walk {}", req.source_dir.display()))?;
        let rel = entry
            .path()
            .strip_prefix(&req.source_dir)
            .with_context(|| format!("entry outside import root: {}", entry.path().display()))?
            .to_path_buf();
        let name = entry.file_name().to_string_lossy().into_owned();
        let parent_rel = rel.parent().map(Path::to_path_buf).unwrap_or_default();
        let Some((parent_geid, parent_path)) = dirs.get(&parent_rel).cloned() else {
            // Parent was skipped (e.g. a symlinked directory).
            report.skipped += 1;
            continue;
        };

        let ft = entry.file_type();
        if ft.is_dir() {
            let folder = imp.ensure_folder(&parent_geid, &parent_path, &name, &mut report)?;
            dirs.insert(rel, (folder.geid, folder.display_path));
        } else if ft.is_file() {
            imp.import_file(&parent_geid, &parent_path, &name, entry.path(), &mut report)?;
        } else {
            warn!(path = %entry.path().display(), "skipping non-regular entry");
            report.skipped += 1;
        }
    }

    info!(
        project = %req.project_code,
        uploader = %req.uploader,
        folders = report.folders_created,
        files = report.files_created,
        bytes = report.bytes,
        "import finished"
    );
    Ok(report)
}

impl Importer<'_> {
    fn mint(&self) -> Result<String> {
        self.ids.mint().context("mint node id")
    }

    fn ensure_project(&self) -> Result<Node> {
        if let Some(p) = self.graph.find_project(self.project)? {
            return Ok(p);
        }
        let node = Node::new(self.mint()?, NodeKind::Container, Zone::Greenroom, self.project, self.project);
        let created = self.graph.create_project(node)?;
        info!(project = %self.project, geid = %created.geid, "created project");
        Ok(created)
    }

    fn base_node(&self, kind: NodeKind, parent_path: &str, name: &str) -> Result<Node> {
        let mut node = Node::new(self.mint()?, kind, Zone::Greenroom, self.project, name);
        node.display_path = join_display_path(parent_path, name);
        node.parent_folder_path = parent_path.to_string();
        node.folder_level = node.display_path.matches('/').count() as u32;
        node.uploader = self.uploader.to_string();
        node.operator = self.uploader.to_string();
        Ok(node)
    }

    fn ensure_folder(
        &self,
        parent_geid: &str,
        parent_path: &str,
        name: &str,
        report: &mut ImportReport,
    ) -> Result<Node> {
        let path = join_display_path(parent_path, name);
        if let Some(existing) = self.graph.folder_exists(Zone::Greenroom, self.project, &path)? {
            debug!(path = %path, geid = %existing.geid, "folder already present");
            return Ok(existing);
        }
        let node = self.base_node(NodeKind::Folder, parent_path, name)?;
        let created = self.graph.create_folder(parent_geid, node)?;
        report.folders_created += 1;
        debug!(path = %path, geid = %created.geid, "folder created");
        Ok(created)
    }

    fn import_file(
        &self,
        parent_geid: &str,
        parent_path: &str,
        name: &str,
        local: &Path,
        report: &mut ImportReport,
    ) -> Result<()> {
        let path = join_display_path(parent_path, name);
        if self.graph.file_exists(Zone::Greenroom, self.project, &path)?.is_some() {
            warn!(path = %path, "file already present; skipping");
            report.skipped += 1;
            return Ok(());
        }

        let key = ObjectKey::new(self.config.bucket_for(Zone::Greenroom, self.project), &path);
        let version = self
            .blobs
            .upload_from_file(local, &key)
            .with_context(|| format!("upload {} -> {key}", local.display()))?;
        let size = self.blobs.stat(&key)?;

        let mut node = self.base_node(NodeKind::File, parent_path, name)?;
        node.file_size = i64::try_from(size).map_err(|_| anyhow!("{key} is too large"))?;
        node.location = Some(Location::new(&self.config.object_endpoint, key));
        node.version_id = Some(version);
        self.graph.create_file(parent_geid, node)?;

        report.files_created += 1;
        report.bytes += size;
        debug!(path = %path, size, "file imported");
        Ok(())
    }
}
