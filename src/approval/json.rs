//! Approval requests stored in a JSON file (`{"requests": [...], "entities": [...]}`).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::{ApprovalEntity, ApprovalRequest, ApprovalSource, CopyStatus};
use crate::fs_ops::{io_error_with_help, write_atomic};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ApprovalFile {
    #[serde(default)]
    requests: Vec<ApprovalRequest>,
    #[serde(default)]
    entities: Vec<ApprovalEntity>,
}

pub struct JsonApprovals {
    path: PathBuf,
    data: Mutex<ApprovalFile>,
}

impl JsonApprovals {
    /// Load `path`; a missing file means no requests.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let bytes = fs::read(&path).map_err(io_error_with_help("read approvals", &path))?;
            serde_json::from_slice(&bytes)
                .with_context(|| format!("parse approvals file {}", path.display()))?
        } else {
            ApprovalFile::default()
        };
        Ok(JsonApprovals {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn data(&self) -> MutexGuard<'_, ApprovalFile> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ApprovalSource for JsonApprovals {
    fn get_request(&self, request_id: &str) -> Result<Option<ApprovalRequest>> {
        Ok(self.data().requests.iter().find(|r| r.id == request_id).cloned())
    }

    fn get_entities(&self, request_id: &str) -> Result<Vec<ApprovalEntity>> {
        Ok(self
            .data()
            .entities
            .iter()
            .filter(|e| e.request_id == request_id)
            .cloned()
            .collect())
    }

    fn update_copy_status(&self, entity_id: &str, status: CopyStatus) -> Result<()> {
        let mut data = self.data();
        let Some(entity) = data.entities.iter_mut().find(|e| e.id == entity_id) else {
            bail!("approval entity {entity_id} does not exist");
        };
        entity.copy_status = status;
        let bytes = serde_json::to_vec_pretty(&*data).context("serialize approvals")?;
        write_atomic(&self.path, &bytes)
    }
}
