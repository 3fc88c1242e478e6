//! Graph store access.
//!
//! Nodes are connected by ownership edges (parent -> child). The walker only needs the
//! handful of queries declared on [`NodeRepository`]; [`MemoryGraph`] serves tests and
//! [`JsonGraph`] persists the same state to a JSON file for the binary.

mod ids;
mod json;
mod memory;

pub use ids::{IdIssuer, UuidIssuer};
pub use json::JsonGraph;
pub use memory::{GraphState, MemoryGraph, OwnEdge};

use thiserror::Error;

use crate::errors::TransferError;
use crate::model::{Node, NodeKind, Zone};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node {0} not found")]
    NotFound(String),

    #[error("parent node {0} does not exist")]
    MissingParent(String),

    #[error("a node with geid {0} already exists")]
    DuplicateGeid(String),

    #[error("invalid node: {0}")]
    Invalid(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;

impl GraphError {
    /// Lift into the job error taxonomy; `op` names the repository call that failed.
    pub fn into_transfer(self, op: &'static str) -> TransferError {
        match self {
            GraphError::NotFound(geid) => TransferError::NotFound(format!("node {geid}")),
            GraphError::MissingParent(geid) => {
                TransferError::NotFound(format!("parent node {geid}"))
            }
            GraphError::DuplicateGeid(_) | GraphError::Invalid(_) => {
                TransferError::Configuration(self.to_string())
            }
            GraphError::Backend(e) => TransferError::GraphStore {
                op,
                reason: format!("{e:#}"),
            },
        }
    }
}

/// Field changes applied by `update_fields`. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub archived: Option<bool>,
    pub add_system_tags: Vec<String>,
    pub name: Option<String>,
}

impl NodePatch {
    pub fn archive() -> Self {
        NodePatch {
            archived: Some(true),
            ..Default::default()
        }
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        NodePatch {
            add_system_tags: vec![tag.into()],
            ..Default::default()
        }
    }

    pub fn apply(&self, node: &mut Node) {
        if let Some(archived) = self.archived {
            node.archived = archived;
        }
        for t in &self.add_system_tags {
            node.system_tags.insert(t.clone());
        }
        if let Some(name) = &self.name {
            node.name = name.clone();
        }
    }
}

pub trait NodeRepository: Send + Sync {
    fn get_by_geid(&self, geid: &str) -> GraphResult<Node>;

    /// Direct children that are not archived, ordered by name.
    fn get_children(&self, folder_geid: &str) -> GraphResult<Vec<Node>>;

    /// Create a file (or trash file) node owned by `parent_geid`.
    fn create_file(&self, parent_geid: &str, node: Node) -> GraphResult<Node>;

    fn create_folder(&self, parent_geid: &str, node: Node) -> GraphResult<Node>;

    /// Register a project root. Containers have no parent.
    fn create_project(&self, node: Node) -> GraphResult<Node>;

    /// Update fields on the node of `kind` with `geid`; a kind mismatch is `NotFound`.
    fn update_fields(&self, kind: NodeKind, geid: &str, patch: &NodePatch) -> GraphResult<Node>;

    /// Unarchived folder at `path` in `zone` of the project, if any.
    fn folder_exists(&self, zone: Zone, project_code: &str, path: &str)
        -> GraphResult<Option<Node>>;

    fn file_exists(&self, zone: Zone, project_code: &str, path: &str) -> GraphResult<Option<Node>>;

    fn find_project(&self, code: &str) -> GraphResult<Option<Node>>;
}
