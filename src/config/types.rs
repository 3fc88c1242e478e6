//! Core configuration types.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::{
    COPIED_TAG_DEFAULT, CORE_PREFIX_DEFAULT, DATA_ROOT_DEFAULT, GREENROOM_PREFIX_DEFAULT,
    LARGE_OBJECT_THRESHOLD, OBJECT_ENDPOINT_DEFAULT,
};
use crate::model::Zone;

/// Verbosity levels exposed to users and config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    #[default]
    Normal,
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common names (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" | "warn" => Some(LogLevel::Normal),
            "info" | "verbose" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        })
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root of the file-backed stores (locks, objects, graph, journals).
    pub data_root: PathBuf,
    /// Where large objects are staged between download and upload.
    pub staging_dir: PathBuf,
    pub large_object_threshold: u64,
    pub greenroom_prefix: String,
    pub core_prefix: String,
    /// Object store endpoint recorded in node locations.
    pub object_endpoint: String,
    pub copied_tag: String,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DATA_ROOT_DEFAULT)
    }
}

impl Config {
    /// Defaults rooted at `data_root`; staging lives in `<data_root>/staging`.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        let data_root = data_root.into();
        Self {
            staging_dir: data_root.join("staging"),
            data_root,
            large_object_threshold: LARGE_OBJECT_THRESHOLD,
            greenroom_prefix: GREENROOM_PREFIX_DEFAULT.to_string(),
            core_prefix: CORE_PREFIX_DEFAULT.to_string(),
            object_endpoint: OBJECT_ENDPOINT_DEFAULT.to_string(),
            copied_tag: COPIED_TAG_DEFAULT.to_string(),
            log_level: LogLevel::Normal,
            log_file: None,
        }
    }

    pub fn zone_prefix(&self, zone: Zone) -> &str {
        match zone {
            Zone::Greenroom => &self.greenroom_prefix,
            Zone::Core => &self.core_prefix,
        }
    }

    /// `<zone prefix><project>`, the bucket holding a project's objects in `zone`.
    pub fn bucket_for(&self, zone: Zone, project_code: &str) -> String {
        format!("{}{}", self.zone_prefix(zone), project_code)
    }

    /// Lock key of a folder (or destination path): `<bucket>/<display path>`.
    pub fn lock_key(&self, zone: Zone, project_code: &str, display_path: &str) -> String {
        format!("{}/{}", self.bucket_for(zone, project_code), display_path)
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.data_root.join("locks")
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.data_root.join("objects")
    }

    pub fn graph_file(&self) -> PathBuf {
        self.data_root.join("graph.json")
    }

    pub fn metadata_journal(&self) -> PathBuf {
        self.data_root.join("metadata.jsonl")
    }

    pub fn job_journal(&self) -> PathBuf {
        self.data_root.join("jobs.jsonl")
    }

    pub fn approvals_file(&self) -> PathBuf {
        self.data_root.join("approvals.json")
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_and_buckets() {
        let cfg = Config::new("/tmp/zt");
        assert_eq!(cfg.bucket_for(Zone::Greenroom, "proj"), "gr-proj");
        assert_eq!(cfg.lock_key(Zone::Core, "proj", "admin/A"), "core-proj/admin/A");
        assert_eq!(cfg.staging_dir, PathBuf::from("/tmp/zt/staging"));
        assert_eq!(cfg.large_object_threshold, 5_000_000_000);
    }

    #[test]
    fn log_level_names() {
        assert_eq!("TRACE".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!(LogLevel::parse(" quiet "), Some(LogLevel::Quiet));
        assert!("loud".parse::<LogLevel>().is_err());
    }
}
