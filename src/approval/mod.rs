//! Approval requests gate which entities an approval copy may touch.
//!
//! A request lists entities (files and folders) with a review status. Only approved files
//! are copied; folders present in the request are traversed so that approved files below
//! them can be reached. After each entity is copied its copy status is set to `copied`.

mod json;
mod memory;

pub use json::JsonApprovals;
pub use memory::MemoryApprovals;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Folder,
    File,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Denied,
    Pending,
    Approved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyStatus {
    Pending,
    Copied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: String,
    pub project_code: String,
    #[serde(default)]
    pub requested_by: String,
    /// Destination folder chosen when the request was filed.
    #[serde(default)]
    pub destination_geid: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEntity {
    pub id: String,
    pub request_id: String,
    pub entity_geid: String,
    pub entity_type: EntityType,
    pub review_status: ReviewStatus,
    #[serde(default)]
    pub parent_geid: Option<String>,
    pub copy_status: CopyStatus,
    #[serde(default)]
    pub name: Option<String>,
}

pub trait ApprovalSource: Send + Sync {
    fn get_request(&self, request_id: &str) -> anyhow::Result<Option<ApprovalRequest>>;

    fn get_entities(&self, request_id: &str) -> anyhow::Result<Vec<ApprovalEntity>>;

    fn update_copy_status(&self, entity_id: &str, status: CopyStatus) -> anyhow::Result<()>;
}

/// Entities of one request keyed by the geid of the node they refer to.
#[derive(Debug, Clone, Default)]
pub struct ApprovedEntities {
    by_geid: HashMap<String, ApprovalEntity>,
}

impl ApprovedEntities {
    pub fn new(entities: impl IntoIterator<Item = ApprovalEntity>) -> Self {
        ApprovedEntities {
            by_geid: entities
                .into_iter()
                .map(|e| (e.entity_geid.clone(), e))
                .collect(),
        }
    }

    pub fn get(&self, geid: &str) -> Option<&ApprovalEntity> {
        self.by_geid.get(geid)
    }

    /// Listed in the request at all (any review status).
    pub fn contains(&self, geid: &str) -> bool {
        self.by_geid.contains_key(geid)
    }

    /// A folder the copy descends through: listed and not denied.
    pub fn on_path(&self, geid: &str) -> bool {
        self.get(geid)
            .is_some_and(|e| e.review_status != ReviewStatus::Denied)
    }

    pub fn is_approved(&self, geid: &str) -> bool {
        self.get(geid)
            .is_some_and(|e| e.review_status == ReviewStatus::Approved)
    }

    pub fn len(&self) -> usize {
        self.by_geid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_geid.is_empty()
    }
}
