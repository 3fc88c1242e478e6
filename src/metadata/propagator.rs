//! Ordered metadata writes per walker event.
//!
//! For a copied file: lineage, catalog entity, search index, audit row. For an archived
//! file: lineage, catalog entity (of the trash mirror), audit row, then the source's index
//! entry is deprecated. A failure stops the sequence and names the step; nothing already
//! written is rolled back.

use tracing::debug;

use super::records::zone_path;
use super::{AuditEntry, LineageEdge, MetadataSink, MetadataStep, SearchDocument};
use crate::errors::TransferError;
use crate::model::Node;
use crate::walker::Pipeline;

pub struct MetadataPropagator<'a> {
    sink: &'a dyn MetadataSink,
    pipeline: Pipeline,
    operator: &'a str,
    project_code: &'a str,
}

impl<'a> MetadataPropagator<'a> {
    pub fn new(
        sink: &'a dyn MetadataSink,
        pipeline: Pipeline,
        operator: &'a str,
        project_code: &'a str,
    ) -> Self {
        MetadataPropagator {
            sink,
            pipeline,
            operator,
            project_code,
        }
    }

    fn step<T>(
        &self,
        step: MetadataStep,
        geid: &str,
        result: anyhow::Result<T>,
    ) -> Result<T, TransferError> {
        result.map_err(|e| TransferError::MetadataPropagationFailure {
            step,
            geid: geid.to_string(),
            reason: format!("{e:#}"),
        })
    }

    fn lineage(&self, src: &Node, dst: &Node) -> LineageEdge {
        LineageEdge {
            input_geid: src.geid.clone(),
            output_geid: dst.geid.clone(),
            input_path: zone_path(src),
            output_path: zone_path(dst),
            pipeline: self.pipeline.name.to_string(),
            description: self.pipeline.description.to_string(),
            project_code: self.project_code.to_string(),
            operator: self.operator.to_string(),
        }
    }

    fn audit(&self, src: &Node, target: &Node) -> AuditEntry {
        AuditEntry {
            action: self.pipeline.audit_action.to_string(),
            operator: self.operator.to_string(),
            project_code: self.project_code.to_string(),
            target: zone_path(src),
            outcome: zone_path(target),
            source_geid: src.geid.clone(),
            target_geid: target.geid.clone(),
        }
    }

    pub fn on_file_transferred(&self, src: &Node, dst: &Node) -> Result<(), TransferError> {
        let geid = dst.geid.as_str();
        self.step(MetadataStep::Lineage, geid, self.sink.record_lineage(&self.lineage(src, dst)))?;
        let guid = self.step(
            MetadataStep::CatalogEntity,
            geid,
            self.sink.register_catalog_entity(dst, self.operator),
        )?;
        let doc = SearchDocument::for_transfer(dst, src, self.pipeline.name, &guid);
        self.step(MetadataStep::SearchIndex, geid, self.sink.index_new(&doc))?;
        let entry = self.audit(src, dst);
        self.step(MetadataStep::AuditLog, geid, self.sink.record_audit(&entry))?;
        debug!(src = %src.geid, dst = %geid, "file metadata propagated");
        Ok(())
    }

    /// Folders are indexed but have no catalog entity.
    pub fn on_folder_created(&self, src: &Node, folder: &Node) -> Result<(), TransferError> {
        let doc = SearchDocument::for_transfer(folder, src, self.pipeline.name, "");
        self.step(MetadataStep::SearchIndex, &folder.geid, self.sink.index_new(&doc))
    }

    pub fn on_file_archived(&self, src: &Node, trash: &Node) -> Result<(), TransferError> {
        let geid = trash.geid.as_str();
        self.step(MetadataStep::Lineage, geid, self.sink.record_lineage(&self.lineage(src, trash)))?;
        self.step(
            MetadataStep::CatalogEntity,
            geid,
            self.sink.register_catalog_entity(trash, self.operator),
        )?;
        let entry = self.audit(src, trash);
        self.step(MetadataStep::AuditLog, geid, self.sink.record_audit(&entry))?;
        self.step(MetadataStep::DeprecateIndex, &src.geid, self.sink.deprecate_index(&src.geid))?;
        debug!(src = %src.geid, trash = %geid, "archive metadata propagated");
        Ok(())
    }

    pub fn on_folder_archived(&self, src: &Node) -> Result<(), TransferError> {
        self.step(MetadataStep::DeprecateIndex, &src.geid, self.sink.deprecate_index(&src.geid))
    }
}
