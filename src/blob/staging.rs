use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, warn};

use crate::fs_ops::{io_error_with_help, unique_temp_path};

/// A reserved path in the staging directory, removed when dropped.
#[derive(Debug)]
pub struct StagingFile {
    path: PathBuf,
}

impl StagingFile {
    pub fn reserve(staging_dir: &Path) -> Result<Self> {
        fs::create_dir_all(staging_dir)
            .map_err(io_error_with_help("create staging directory", staging_dir))?;
        let path = unique_temp_path(staging_dir);
        debug!(path = %path.display(), "staging file reserved");
        Ok(StagingFile { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "staging file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "could not remove staging file"),
        }
    }
}
