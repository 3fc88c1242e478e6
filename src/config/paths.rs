//! Default path helpers and symlink checks.

use anyhow::{anyhow, Result};
use dirs::{config_dir, data_dir, home_dir};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "zone_transfer";

/// `<config dir>/zone_transfer/config.xml`, falling back to `~/.config`.
pub fn default_config_path() -> Result<PathBuf> {
    let base = config_dir()
        .or_else(|| home_dir().map(|h| h.join(".config")))
        .ok_or_else(|| anyhow!("cannot determine a config directory for this user"))?;
    Ok(base.join(APP_DIR).join("config.xml"))
}

/// `<data dir>/zone_transfer/zone_transfer.log`, falling back to `~/.local/share`.
pub fn default_log_path() -> Result<PathBuf> {
    let base = data_dir()
        .or_else(|| home_dir().map(|h| h.join(".local").join("share")))
        .ok_or_else(|| anyhow!("cannot determine a data directory for this user"))?;
    Ok(base.join(APP_DIR).join("zone_transfer.log"))
}

/// True if any existing ancestor of `path` is a symlink.
pub fn path_has_symlink_ancestor(path: &Path) -> io::Result<bool> {
    let mut p = path.parent();
    while let Some(anc) = p {
        if anc.exists() && fs::symlink_metadata(anc)?.file_type().is_symlink() {
            return Ok(true);
        }
        p = anc.parent();
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_end_in_app_dir() {
        if let Ok(p) = default_config_path() {
            assert!(p.ends_with("zone_transfer/config.xml"));
        }
        if let Ok(p) = default_log_path() {
            assert!(p.ends_with("zone_transfer/zone_transfer.log"));
        }
    }

    #[cfg(unix)]
    #[test]
    fn detects_symlinked_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();
        assert!(path_has_symlink_ancestor(&link.join("config.xml")).unwrap());
        assert!(!path_has_symlink_ancestor(&real.join("config.xml")).unwrap());
    }
}
