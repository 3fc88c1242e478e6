//! Config validation: numeric bounds, prefix sanity and usable directories.

use anyhow::{bail, Context, Result};
use std::fs::{self, OpenOptions};
use std::path::Path;
use tracing::{debug, info};

use super::types::Config;
use crate::fs_ops::unique_temp_path;

fn check_prefix(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        bail!("{name} must not be empty");
    }
    if value.contains('/') || value.chars().any(char::is_whitespace) {
        bail!("{name} '{value}' must not contain '/' or whitespace");
    }
    Ok(())
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.large_object_threshold == 0 {
            bail!("large_object_threshold must be greater than zero");
        }
        check_prefix("greenroom_prefix", &self.greenroom_prefix)?;
        check_prefix("core_prefix", &self.core_prefix)?;
        if self.greenroom_prefix == self.core_prefix {
            bail!(
                "greenroom_prefix and core_prefix are both '{}'; zones must map to distinct buckets",
                self.core_prefix
            );
        }
        if self.copied_tag.trim().is_empty() {
            bail!("copied_tag must not be empty");
        }
        if self.object_endpoint.trim().is_empty() {
            bail!("object_endpoint must not be empty");
        }

        ensure_dir_is_or_create(&self.data_root, "data_root")?;
        ensure_writable(&self.data_root, "data_root")?;
        ensure_dir_is_or_create(&self.staging_dir, "staging_dir")?;
        ensure_writable(&self.staging_dir, "staging_dir")?;

        info!(
            data_root = %self.data_root.display(),
            staging_dir = %self.staging_dir.display(),
            threshold = self.large_object_threshold,
            "config validated"
        );
        Ok(())
    }
}

/// Create the directory if missing; an existing non-directory is an error.
fn ensure_dir_is_or_create(path: &Path, name: &str) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            bail!("{name} exists but isn't a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create {name} directory '{}'", path.display()))?;
        info!("created {name} directory: {}", path.display());
    }
    Ok(())
}

fn ensure_writable(path: &Path, name: &str) -> Result<()> {
    let probe = unique_temp_path(path);
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe)
        .with_context(|| format!("cannot write to {name} '{}'; check permissions", path.display()))?;
    let _ = fs::remove_file(&probe);
    debug!("{name} writable: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_directories() {
        let dir = tempdir().unwrap();
        let cfg = Config::new(dir.path().join("data"));
        cfg.validate().unwrap();
        assert!(cfg.data_root.is_dir());
        assert!(cfg.staging_dir.is_dir());
    }

    #[test]
    fn rejects_bad_values() {
        let dir = tempdir().unwrap();
        let base = Config::new(dir.path());

        let mut cfg = base.clone();
        cfg.large_object_threshold = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = base.clone();
        cfg.core_prefix = cfg.greenroom_prefix.clone();
        assert!(cfg.validate().unwrap_err().to_string().contains("distinct"));

        let mut cfg = base.clone();
        cfg.greenroom_prefix = String::new();
        assert!(cfg.validate().is_err());

        let mut cfg = base;
        cfg.data_root = dir.path().join("file");
        fs::write(&cfg.data_root, b"x").unwrap();
        assert!(cfg.validate().is_err());
    }
}
