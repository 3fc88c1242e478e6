//! Metadata propagation: lineage, catalog entities, search index and audit log.
//!
//! [`MetadataSink`] is the transport; [`MetadataPropagator`] fixes which records are written
//! for each walker event and in what order.

mod journal;
mod propagator;
mod recording;
mod records;

pub use journal::JournalSink;
pub use propagator::MetadataPropagator;
pub use recording::{MetadataEvent, RecordingSink};
pub use records::{AuditEntry, IndexedAttribute, LineageEdge, SearchDocument};

use serde::Serialize;
use std::fmt;

use crate::model::Node;

/// One stage of metadata propagation; named in `MetadataPropagationFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataStep {
    Lineage,
    CatalogEntity,
    SearchIndex,
    AuditLog,
    DeprecateIndex,
    /// Copy status written back to the approval service.
    CopyStatus,
}

impl MetadataStep {
    pub fn as_str(self) -> &'static str {
        match self {
            MetadataStep::Lineage => "lineage",
            MetadataStep::CatalogEntity => "catalog_entity",
            MetadataStep::SearchIndex => "search_index",
            MetadataStep::AuditLog => "audit_log",
            MetadataStep::DeprecateIndex => "deprecate_index",
            MetadataStep::CopyStatus => "copy_status",
        }
    }
}

impl fmt::Display for MetadataStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait MetadataSink: Send + Sync {
    fn record_lineage(&self, edge: &LineageEdge) -> anyhow::Result<()>;

    /// Register `node` with the data catalog; returns the catalog guid.
    fn register_catalog_entity(&self, node: &Node, operator: &str) -> anyhow::Result<String>;

    fn index_new(&self, doc: &SearchDocument) -> anyhow::Result<()>;

    fn record_audit(&self, entry: &AuditEntry) -> anyhow::Result<()>;

    /// Mark the search-index document for `geid` as no longer current.
    fn deprecate_index(&self, geid: &str) -> anyhow::Result<()>;
}
