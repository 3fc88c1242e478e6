use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::lock::LockMode;

/// What the walker does with each node it visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalAction {
    /// Mirror the tree into the core zone and tag the sources.
    Copy,
    /// Move the tree to the trash bin: remove blobs, archive sources.
    Archive,
    /// Copy restricted to the entities of an approval request.
    ApprovalCopy,
}

/// Names recorded in lineage, index and audit records for one kind of job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pipeline {
    pub name: &'static str,
    pub description: &'static str,
    pub audit_action: &'static str,
}

impl TerminalAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TerminalAction::Copy => "copy",
            TerminalAction::Archive => "archive",
            TerminalAction::ApprovalCopy => "approval_copy",
        }
    }

    pub fn pipeline(self) -> Pipeline {
        match self {
            TerminalAction::Copy => Pipeline {
                name: "data_transfer_folder",
                description: "the script will copy the data from greenroom to core",
                audit_action: "data_transfer",
            },
            TerminalAction::Archive => Pipeline {
                name: "data_delete_folder",
                description: "the script will move the data into the trash bin",
                audit_action: "data_delete",
            },
            TerminalAction::ApprovalCopy => Pipeline {
                name: "data_transfer_approved",
                description: "the script will copy approved data from greenroom to core",
                audit_action: "data_transfer",
            },
        }
    }

    /// Mode of the lock taken on every source key.
    pub fn source_lock_mode(self) -> LockMode {
        match self {
            TerminalAction::Copy | TerminalAction::ApprovalCopy => LockMode::Read,
            TerminalAction::Archive => LockMode::Write,
        }
    }

    /// Copies write into a destination tree; archives only touch the source.
    pub fn writes_destination(self) -> bool {
        !matches!(self, TerminalAction::Archive)
    }

    pub fn is_approval_gated(self) -> bool {
        matches!(self, TerminalAction::ApprovalCopy)
    }
}

impl fmt::Display for TerminalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TerminalAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "copy" => Ok(TerminalAction::Copy),
            "archive" | "delete" | "move" => Ok(TerminalAction::Archive),
            "approval_copy" => Ok(TerminalAction::ApprovalCopy),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_locks_sources_exclusively() {
        assert_eq!(TerminalAction::Archive.source_lock_mode(), LockMode::Write);
        assert_eq!(TerminalAction::Copy.source_lock_mode(), LockMode::Read);
        assert!(!TerminalAction::Archive.writes_destination());
        assert_eq!(TerminalAction::Archive.pipeline().audit_action, "data_delete");
    }

    #[test]
    fn parses_aliases() {
        assert_eq!("delete".parse::<TerminalAction>().unwrap(), TerminalAction::Archive);
        assert_eq!("approval-copy".parse::<TerminalAction>().unwrap(), TerminalAction::ApprovalCopy);
        assert!("sync".parse::<TerminalAction>().is_err());
    }
}
