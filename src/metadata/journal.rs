//! Metadata sink that appends one JSON object per record to a journal file.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{AuditEntry, LineageEdge, MetadataSink, SearchDocument};
use crate::fs_ops::io_error_with_help;
use crate::model::Node;

pub struct JournalSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JournalSink {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error_with_help("create journal directory", parent))?;
        }
        Ok(JournalSink {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, kind: &str, body: Value) -> Result<()> {
        let line = serde_json::to_string(&json!({
            "record": kind,
            "at": Utc::now().to_rfc3339(),
            "body": body,
        }))
        .context("serialize journal record")?;
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_error_with_help("open metadata journal", &self.path))?;
        writeln!(f, "{line}").map_err(io_error_with_help("append metadata journal", &self.path))?;
        Ok(())
    }
}

impl MetadataSink for JournalSink {
    fn record_lineage(&self, edge: &LineageEdge) -> Result<()> {
        self.append("lineage", serde_json::to_value(edge)?)
    }

    fn register_catalog_entity(&self, node: &Node, operator: &str) -> Result<String> {
        let guid = Uuid::new_v4().to_string();
        self.append(
            "catalog_entity",
            json!({
                "guid": guid,
                "global_entity_id": node.geid,
                "type": node.kind.label(),
                "name": node.display_path,
                "file_size": node.file_size,
                "location": node.location.as_ref().map(|l| l.to_string()),
                "operator": operator,
                "archived": node.archived,
            }),
        )?;
        Ok(guid)
    }

    fn index_new(&self, doc: &SearchDocument) -> Result<()> {
        self.append("search_index", serde_json::to_value(doc)?)
    }

    fn record_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.append("audit", serde_json::to_value(entry)?)
    }

    fn deprecate_index(&self, geid: &str) -> Result<()> {
        self.append("deprecate_index", json!({ "global_entity_id": geid }))
    }
}
