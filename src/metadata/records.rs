use serde::Serialize;

use crate::model::{Node, Zone};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineageEdge {
    pub input_geid: String,
    pub output_geid: String,
    pub input_path: String,
    pub output_path: String,
    pub pipeline: String,
    pub description: String,
    pub project_code: String,
    pub operator: String,
}

/// One row of the project's file activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditEntry {
    pub action: String,
    pub operator: String,
    pub project_code: String,
    /// `Greenroom/<display path>` or `Core/<display path>`.
    pub target: String,
    pub outcome: String,
    pub source_geid: String,
    pub target_geid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexedAttribute {
    pub name: String,
    pub value: String,
}

/// Document written to the search index for a newly created file or folder.
///
/// Placement fields (geid, zone, path, location) describe the new node; provenance fields
/// (uploader, manifest, attributes, source geid and path) come from the node it was copied
/// from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchDocument {
    pub global_entity_id: String,
    pub data_type: String,
    pub zone: String,
    pub project_code: String,
    pub file_name: String,
    pub display_path: String,
    pub location: String,
    pub file_size: i64,
    pub uploader: String,
    pub operator: String,
    pub source_geid: String,
    /// `<Zone label>/<display path>` of the source.
    pub source_path: String,
    pub tags: Vec<String>,
    pub archived: bool,
    pub process_pipeline: String,
    /// Catalog guid; empty for folders, which are not registered in the catalog.
    pub atlas_guid: String,
    pub manifest_id: Option<i64>,
    pub attributes: Vec<IndexedAttribute>,
}

/// `<Zone label>/<display path>`, the path form used by audit rows and lineage.
pub fn zone_path(node: &Node) -> String {
    format!("{}/{}", node.zone.label(), node.display_path)
}

impl SearchDocument {
    /// Document for `node`, newly created as the counterpart of `src`.
    pub fn for_transfer(node: &Node, src: &Node, pipeline: &str, guid: &str) -> Self {
        SearchDocument {
            global_entity_id: node.geid.clone(),
            data_type: if node.is_folder() { "Folder" } else { "File" }.to_string(),
            zone: match node.zone {
                Zone::Greenroom => "greenroom",
                Zone::Core => "core",
            }
            .to_string(),
            project_code: node.project_code.clone(),
            file_name: node.name.clone(),
            display_path: node.display_path.clone(),
            location: node.location.as_ref().map(|l| l.to_string()).unwrap_or_default(),
            file_size: node.file_size,
            uploader: src.uploader.clone(),
            operator: node.operator.clone(),
            source_geid: src.geid.clone(),
            source_path: zone_path(src),
            tags: node.tags.iter().cloned().collect(),
            archived: node.archived,
            process_pipeline: pipeline.to_string(),
            atlas_guid: guid.to_string(),
            manifest_id: src.manifest_id,
            attributes: src
                .attributes
                .iter()
                .map(|(k, v)| IndexedAttribute {
                    name: k.clone(),
                    value: v.clone(),
                })
                .collect(),
        }
    }
}
