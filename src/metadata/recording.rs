use std::sync::{Mutex, MutexGuard};

use anyhow::bail;
use uuid::Uuid;

use super::{AuditEntry, LineageEdge, MetadataSink, MetadataStep, SearchDocument};
use crate::model::Node;

#[derive(Debug, Clone, PartialEq)]
pub enum MetadataEvent {
    Lineage(LineageEdge),
    Catalog { geid: String, guid: String },
    Index(SearchDocument),
    Audit(AuditEntry),
    Deprecate(String),
}

impl MetadataEvent {
    pub fn step(&self) -> MetadataStep {
        match self {
            MetadataEvent::Lineage(_) => MetadataStep::Lineage,
            MetadataEvent::Catalog { .. } => MetadataStep::CatalogEntity,
            MetadataEvent::Index(_) => MetadataStep::SearchIndex,
            MetadataEvent::Audit(_) => MetadataStep::AuditLog,
            MetadataEvent::Deprecate(_) => MetadataStep::DeprecateIndex,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    events: Vec<MetadataEvent>,
    fail_at: Option<MetadataStep>,
}

/// Sink that keeps every record in memory and can be told to fail at one step.
#[derive(Debug, Default)]
pub struct RecordingSink {
    state: Mutex<State>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn fail_at(&self, step: MetadataStep) {
        self.state().fail_at = Some(step);
    }

    pub fn events(&self) -> Vec<MetadataEvent> {
        self.state().events.clone()
    }

    pub fn count(&self, step: MetadataStep) -> usize {
        self.state().events.iter().filter(|e| e.step() == step).count()
    }

    pub fn deprecated(&self) -> Vec<String> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                MetadataEvent::Deprecate(g) => Some(g.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn indexed(&self) -> Vec<SearchDocument> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                MetadataEvent::Index(d) => Some(d.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, step: MetadataStep, event: MetadataEvent) -> anyhow::Result<()> {
        let mut state = self.state();
        if state.fail_at == Some(step) {
            bail!("{step} service unavailable");
        }
        state.events.push(event);
        Ok(())
    }
}

impl MetadataSink for RecordingSink {
    fn record_lineage(&self, edge: &LineageEdge) -> anyhow::Result<()> {
        self.record(MetadataStep::Lineage, MetadataEvent::Lineage(edge.clone()))
    }

    fn register_catalog_entity(&self, node: &Node, _operator: &str) -> anyhow::Result<String> {
        let guid = Uuid::new_v4().to_string();
        self.record(
            MetadataStep::CatalogEntity,
            MetadataEvent::Catalog {
                geid: node.geid.clone(),
                guid: guid.clone(),
            },
        )?;
        Ok(guid)
    }

    fn index_new(&self, doc: &SearchDocument) -> anyhow::Result<()> {
        self.record(MetadataStep::SearchIndex, MetadataEvent::Index(doc.clone()))
    }

    fn record_audit(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        self.record(MetadataStep::AuditLog, MetadataEvent::Audit(entry.clone()))
    }

    fn deprecate_index(&self, geid: &str) -> anyhow::Result<()> {
        self.record(MetadataStep::DeprecateIndex, MetadataEvent::Deprecate(geid.to_string()))
    }
}
