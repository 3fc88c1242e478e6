//! Copy or write into a temp file beside the destination, then rename it into place.

use anyhow::{anyhow, Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use super::atomic::try_atomic_move;
use super::helpers::io_error_with_help;
use super::{io_copy, util};

fn prepare_parent(dest: &Path) -> Result<&Path> {
    let dest_dir = dest
        .parent()
        .ok_or_else(|| anyhow!("destination has no parent: {}", dest.display()))?;
    fs::create_dir_all(dest_dir)
        .map_err(io_error_with_help("create destination directory", dest_dir))?;
    Ok(dest_dir)
}

fn rename_or_cleanup(tmp_path: &Path, dest: &Path) -> Result<()> {
    if let Err(e) = try_atomic_move(tmp_path, dest) {
        let _ = fs::remove_file(tmp_path);
        return Err(e).with_context(|| {
            format!("rename temporary file '{}' -> '{}'", tmp_path.display(), dest.display())
        });
    }
    Ok(())
}

/// Copy `src` to `dest` via a temp file in the destination directory. Returns bytes copied.
pub fn safe_copy_and_rename(src: &Path, dest: &Path) -> Result<u64> {
    let dest_dir = prepare_parent(dest)?;
    let tmp_path = util::unique_temp_path(dest_dir);

    let bytes = match io_copy::copy_streaming(src, &tmp_path) {
        Ok(n) => n,
        Err(e) => {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_error_with_help("copy to temporary file", src)(e));
        }
    };
    rename_or_cleanup(&tmp_path, dest)?;
    Ok(bytes)
}

/// Replace `dest` with `bytes` atomically.
pub fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let dest_dir = prepare_parent(dest)?;
    let tmp_path = util::unique_temp_path(dest_dir);

    let written = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)
        .and_then(|mut f| {
            f.write_all(bytes)?;
            f.sync_all()
        });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_error_with_help("write temporary file", &tmp_path)(e));
    }
    rename_or_cleanup(&tmp_path, dest)
}
