use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::{Location, ObjectKey};

/// `file_size` recorded for folders.
pub const FOLDER_SIZE: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Folder,
    /// Mirror of a deleted file, created in the trash bin.
    TrashFile,
    /// Project root; owns the top-level (name) folders of both zones.
    Container,
}

impl NodeKind {
    pub fn label(self) -> &'static str {
        match self {
            NodeKind::File => "File",
            NodeKind::Folder => "Folder",
            NodeKind::TrashFile => "TrashFile",
            NodeKind::Container => "Container",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Storage zone. Data lands in the greenroom and is promoted to core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Greenroom,
    Core,
}

impl Zone {
    pub fn label(self) -> &'static str {
        match self {
            Zone::Greenroom => "Greenroom",
            Zone::Core => "Core",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Zone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "greenroom" | "gr" => Ok(Zone::Greenroom),
            "core" => Ok(Zone::Core),
            other => Err(format!("unknown zone '{other}' (expected greenroom or core)")),
        }
    }
}

/// A file, folder, trash entry or project root as stored in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub geid: String,
    pub kind: NodeKind,
    pub zone: Zone,
    pub project_code: String,
    pub name: String,
    /// Path below the project root, including the node's own name. Empty for containers.
    #[serde(default)]
    pub display_path: String,
    #[serde(default)]
    pub parent_folder_path: String,
    #[serde(default)]
    pub folder_level: u32,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub uploader: String,
    #[serde(default)]
    pub operator: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub system_tags: BTreeSet<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub in_trashbin: bool,
    #[serde(default)]
    pub list_priority: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_id: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Node {
    /// Bare node of `kind` with every optional field at its default.
    pub fn new(
        geid: impl Into<String>,
        kind: NodeKind,
        zone: Zone,
        project_code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Node {
            geid: geid.into(),
            kind,
            zone,
            project_code: project_code.into(),
            name: name.into(),
            display_path: String::new(),
            parent_folder_path: String::new(),
            folder_level: 0,
            file_size: if kind == NodeKind::File || kind == NodeKind::TrashFile {
                0
            } else {
                FOLDER_SIZE
            },
            uploader: String::new(),
            operator: String::new(),
            tags: BTreeSet::new(),
            system_tags: BTreeSet::new(),
            archived: false,
            in_trashbin: false,
            list_priority: 0,
            location: None,
            version_id: None,
            manifest_id: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn geid(&self) -> &str {
        &self.geid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn is_container(&self) -> bool {
        self.kind == NodeKind::Container
    }

    /// A user's top-level folder: its display path is exactly the uploader name.
    pub fn is_name_folder(&self) -> bool {
        self.is_folder() && !self.uploader.is_empty() && self.display_path == self.uploader
    }

    pub fn object_key(&self) -> Option<&ObjectKey> {
        self.location.as_ref().map(|l| &l.key)
    }

    pub fn has_system_tag(&self, tag: &str) -> bool {
        self.system_tags.contains(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_folder_detection() {
        let mut n = Node::new("g1", NodeKind::Folder, Zone::Greenroom, "proj", "admin");
        n.display_path = "admin".into();
        n.uploader = "admin".into();
        assert!(n.is_name_folder());

        n.display_path = "admin/A".into();
        assert!(!n.is_name_folder());

        let mut f = Node::new("g2", NodeKind::File, Zone::Greenroom, "proj", "admin");
        f.display_path = "admin".into();
        f.uploader = "admin".into();
        assert!(!f.is_name_folder());
    }

    #[test]
    fn folders_default_to_sentinel_size() {
        let n = Node::new("g", NodeKind::Folder, Zone::Core, "p", "A");
        assert_eq!(n.file_size, FOLDER_SIZE);
        let f = Node::new("g", NodeKind::File, Zone::Core, "p", "x");
        assert_eq!(f.file_size, 0);
    }

    #[test]
    fn zone_parses_short_names() {
        assert_eq!("gr".parse::<Zone>().unwrap(), Zone::Greenroom);
        assert_eq!("Core".parse::<Zone>().unwrap(), Zone::Core);
        assert!("vre".parse::<Zone>().is_err());
    }

    #[test]
    fn serde_roundtrip_skips_empty_optionals() {
        let n = Node::new("g", NodeKind::Folder, Zone::Core, "p", "A");
        let json = serde_json::to_string(&n).unwrap();
        assert!(!json.contains("location"));
        assert!(json.contains("\"zone\":\"core\""));
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, n);
    }
}
