//! Graph persisted as a single JSON document, rewritten atomically after every mutation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use super::{GraphResult, GraphState, MemoryGraph, NodePatch, NodeRepository};
use crate::fs_ops::{io_error_with_help, write_atomic};
use crate::model::{Node, NodeKind, Zone};

pub struct JsonGraph {
    path: PathBuf,
    inner: MemoryGraph,
}

impl JsonGraph {
    /// Load `path`, or start empty if it does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let state = if path.exists() {
            let bytes = fs::read(&path).map_err(io_error_with_help("read graph", &path))?;
            serde_json::from_slice::<GraphState>(&bytes)
                .with_context(|| format!("parse graph file {}", path.display()))?
        } else {
            GraphState::default()
        };
        debug!(path = %path.display(), nodes = state.nodes.len(), "graph loaded");
        Ok(JsonGraph {
            path,
            inner: MemoryGraph::from_state(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> GraphResult<()> {
        let bytes = serde_json::to_vec_pretty(&self.inner.snapshot()).context("serialize graph")?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }

    fn mutate<T>(&self, f: impl FnOnce(&MemoryGraph) -> GraphResult<T>) -> GraphResult<T> {
        let out = f(&self.inner)?;
        self.persist()?;
        Ok(out)
    }
}

impl NodeRepository for JsonGraph {
    fn get_by_geid(&self, geid: &str) -> GraphResult<Node> {
        self.inner.get_by_geid(geid)
    }

    fn get_children(&self, folder_geid: &str) -> GraphResult<Vec<Node>> {
        self.inner.get_children(folder_geid)
    }

    fn create_file(&self, parent_geid: &str, node: Node) -> GraphResult<Node> {
        self.mutate(|g| g.create_file(parent_geid, node))
    }

    fn create_folder(&self, parent_geid: &str, node: Node) -> GraphResult<Node> {
        self.mutate(|g| g.create_folder(parent_geid, node))
    }

    fn create_project(&self, node: Node) -> GraphResult<Node> {
        self.mutate(|g| g.create_project(node))
    }

    fn update_fields(&self, kind: NodeKind, geid: &str, patch: &NodePatch) -> GraphResult<Node> {
        self.mutate(|g| g.update_fields(kind, geid, patch))
    }

    fn folder_exists(&self, zone: Zone, project_code: &str, path: &str) -> GraphResult<Option<Node>> {
        self.inner.folder_exists(zone, project_code, path)
    }

    fn file_exists(&self, zone: Zone, project_code: &str, path: &str) -> GraphResult<Option<Node>> {
        self.inner.file_exists(zone, project_code, path)
    }

    fn find_project(&self, code: &str) -> GraphResult<Option<Node>> {
        self.inner.find_project(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn mutations_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("graph.json");
        {
            let g = JsonGraph::open(&path).unwrap();
            g.create_project(Node::new("root", NodeKind::Container, Zone::Greenroom, "p", "p"))
                .unwrap();
            let mut f = Node::new("f", NodeKind::Folder, Zone::Greenroom, "p", "admin");
            f.display_path = "admin".into();
            g.create_folder("root", f).unwrap();
        }
        let g = JsonGraph::open(&path).unwrap();
        assert_eq!(g.get_children("root").unwrap().len(), 1);
        assert!(g.folder_exists(Zone::Greenroom, "p", "admin").unwrap().is_some());
    }
}
