//! Atomic rename with context-rich errors; fsyncs the destination directory on Unix.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub fn try_atomic_move(src: &Path, dst: &Path) -> Result<()> {
    // rename does not overwrite on Windows.
    #[cfg(windows)]
    if let Err(e) = fs::remove_file(dst)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        return Err(e)
            .with_context(|| format!("remove existing destination before rename: {}", dst.display()));
    }

    fs::rename(src, dst)
        .with_context(|| format!("atomic rename '{}' -> '{}'", src.display(), dst.display()))?;

    // The rename already happened; a failed directory fsync must not turn it into an error.
    if let Some(parent) = dst.parent() {
        let _ = super::util::fsync_dir(parent);
    }
    Ok(())
}
