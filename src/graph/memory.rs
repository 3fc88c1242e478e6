use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use super::{GraphError, GraphResult, NodePatch, NodeRepository};
use crate::model::{Node, NodeKind, Zone};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnEdge {
    pub parent: String,
    pub child: String,
}

/// Whole graph: nodes by geid plus ownership edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphState {
    #[serde(default)]
    pub nodes: BTreeMap<String, Node>,
    #[serde(default)]
    pub edges: Vec<OwnEdge>,
}

impl GraphState {
    pub fn parent_of(&self, geid: &str) -> Option<&Node> {
        self.edges
            .iter()
            .find(|e| e.child == geid)
            .and_then(|e| self.nodes.get(&e.parent))
    }

    fn insert(&mut self, parent: Option<&str>, node: Node) -> GraphResult<Node> {
        if node.geid.is_empty() {
            return Err(GraphError::Invalid("empty geid".into()));
        }
        if self.nodes.contains_key(&node.geid) {
            return Err(GraphError::DuplicateGeid(node.geid));
        }
        if let Some(parent) = parent {
            match self.nodes.get(parent) {
                Some(p) if matches!(p.kind, NodeKind::Folder | NodeKind::Container) => {}
                Some(p) => {
                    return Err(GraphError::Invalid(format!(
                        "{} {} cannot own children",
                        p.kind, p.geid
                    )));
                }
                None => return Err(GraphError::MissingParent(parent.to_string())),
            }
            self.edges.push(OwnEdge {
                parent: parent.to_string(),
                child: node.geid.clone(),
            });
        }
        self.nodes.insert(node.geid.clone(), node.clone());
        Ok(node)
    }

    fn find_live(&self, kind: NodeKind, zone: Zone, project: &str, path: &str) -> Option<Node> {
        self.nodes
            .values()
            .find(|n| {
                n.kind == kind
                    && n.zone == zone
                    && !n.archived
                    && n.project_code == project
                    && n.display_path == path
            })
            .cloned()
    }
}

/// Graph held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryGraph {
    state: Mutex<GraphState>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_state(state: GraphState) -> Self {
        MemoryGraph {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> GraphState {
        self.state().clone()
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.state().nodes.values().cloned().collect()
    }

    pub fn parent_of(&self, geid: &str) -> Option<Node> {
        self.state().parent_of(geid).cloned()
    }

    /// Every node with `display_path` in `zone`, archived ones included.
    pub fn find_by_path(&self, zone: Zone, path: &str) -> Vec<Node> {
        self.state()
            .nodes
            .values()
            .filter(|n| n.zone == zone && n.display_path == path)
            .cloned()
            .collect()
    }
}

fn expect_kind(node: &Node, allowed: &[NodeKind], op: &str) -> GraphResult<()> {
    if allowed.contains(&node.kind) {
        Ok(())
    } else {
        Err(GraphError::Invalid(format!("{op} cannot store a {} node", node.kind)))
    }
}

impl NodeRepository for MemoryGraph {
    fn get_by_geid(&self, geid: &str) -> GraphResult<Node> {
        self.state()
            .nodes
            .get(geid)
            .cloned()
            .ok_or_else(|| GraphError::NotFound(geid.to_string()))
    }

    fn get_children(&self, folder_geid: &str) -> GraphResult<Vec<Node>> {
        let state = self.state();
        if !state.nodes.contains_key(folder_geid) {
            return Err(GraphError::NotFound(folder_geid.to_string()));
        }
        let mut children: Vec<Node> = state
            .edges
            .iter()
            .filter(|e| e.parent == folder_geid)
            .filter_map(|e| state.nodes.get(&e.child))
            .filter(|n| !n.archived)
            .cloned()
            .collect();
        children.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.geid.cmp(&b.geid)));
        Ok(children)
    }

    fn create_file(&self, parent_geid: &str, node: Node) -> GraphResult<Node> {
        expect_kind(&node, &[NodeKind::File, NodeKind::TrashFile], "create_file")?;
        self.state().insert(Some(parent_geid), node)
    }

    fn create_folder(&self, parent_geid: &str, node: Node) -> GraphResult<Node> {
        expect_kind(&node, &[NodeKind::Folder], "create_folder")?;
        self.state().insert(Some(parent_geid), node)
    }

    fn create_project(&self, node: Node) -> GraphResult<Node> {
        expect_kind(&node, &[NodeKind::Container], "create_project")?;
        self.state().insert(None, node)
    }

    fn update_fields(&self, kind: NodeKind, geid: &str, patch: &NodePatch) -> GraphResult<Node> {
        let mut state = self.state();
        match state.nodes.get_mut(geid) {
            Some(node) if node.kind == kind => {
                patch.apply(node);
                Ok(node.clone())
            }
            _ => Err(GraphError::NotFound(geid.to_string())),
        }
    }

    fn folder_exists(&self, zone: Zone, project_code: &str, path: &str) -> GraphResult<Option<Node>> {
        Ok(self.state().find_live(NodeKind::Folder, zone, project_code, path))
    }

    fn file_exists(&self, zone: Zone, project_code: &str, path: &str) -> GraphResult<Option<Node>> {
        Ok(self.state().find_live(NodeKind::File, zone, project_code, path))
    }

    fn find_project(&self, code: &str) -> GraphResult<Option<Node>> {
        Ok(self
            .state()
            .nodes
            .values()
            .find(|n| n.is_container() && n.project_code == code)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(geid: &str, name: &str, path: &str) -> Node {
        let mut n = Node::new(geid, NodeKind::Folder, Zone::Greenroom, "p", name);
        n.display_path = path.into();
        n
    }

    #[test]
    fn children_skip_archived_and_sort_by_name() {
        let g = MemoryGraph::new();
        g.create_project(Node::new("root", NodeKind::Container, Zone::Greenroom, "p", "p"))
            .unwrap();
        g.create_folder("root", folder("f1", "b", "b")).unwrap();
        g.create_folder("root", folder("f2", "a", "a")).unwrap();
        let mut gone = folder("f3", "c", "c");
        gone.archived = true;
        g.create_folder("root", gone).unwrap();

        let names: Vec<_> = g.get_children("root").unwrap().into_iter().map(|n| n.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn rejects_duplicates_and_orphans() {
        let g = MemoryGraph::new();
        g.create_project(Node::new("root", NodeKind::Container, Zone::Greenroom, "p", "p"))
            .unwrap();
        assert!(matches!(
            g.create_folder("missing", folder("f", "a", "a")),
            Err(GraphError::MissingParent(_))
        ));
        g.create_folder("root", folder("f", "a", "a")).unwrap();
        assert!(matches!(
            g.create_folder("root", folder("f", "a", "a")),
            Err(GraphError::DuplicateGeid(_))
        ));
    }

    #[test]
    fn update_requires_matching_kind() {
        let g = MemoryGraph::new();
        g.create_project(Node::new("root", NodeKind::Container, Zone::Greenroom, "p", "p"))
            .unwrap();
        g.create_folder("root", folder("f", "a", "a")).unwrap();
        assert!(matches!(
            g.update_fields(NodeKind::File, "f", &NodePatch::archive()),
            Err(GraphError::NotFound(_))
        ));
        let updated = g
            .update_fields(NodeKind::Folder, "f", &NodePatch::tag("copied-to-core"))
            .unwrap();
        assert!(updated.has_system_tag("copied-to-core"));
        g.update_fields(NodeKind::Folder, "f", &NodePatch::archive()).unwrap();
        assert!(g.folder_exists(Zone::Greenroom, "p", "a").unwrap().is_none());
    }
}
