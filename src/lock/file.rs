//! Advisory lock service backed by lock files.
//!
//! Each key maps to a file `<dir>/<encoded key>.lock`. Read locks take a shared lock on a
//! fresh handle; write locks take an exclusive one. Neither call blocks: a conflicting holder
//! (in this or any other process) yields `Ok(false)`.
//!
//! Lock files are left in place after release; unlinking one would let a later caller lock a
//! different inode than a current holder.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use fs2::FileExt;
use tracing::trace;

use super::{LockMode, LockRequest, LockService};
use crate::fs_ops::io_error_with_help;

const MAX_STEM_LEN: usize = 200;

pub struct FileLockService {
    dir: PathBuf,
    handles: Mutex<HashMap<LockRequest, Vec<File>>>,
}

impl FileLockService {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_error_with_help("create lock directory", &dir))?;
        Ok(FileLockService {
            dir,
            handles: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<LockRequest, Vec<File>>> {
        self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn lock_file_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.lock", encode_key(key)))
    }
}

/// Percent-encode everything outside `[A-Za-z0-9._-]` so a key is one flat file name.
/// Over-long names are truncated and disambiguated with a hash of the full key.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    if out.starts_with('.') {
        out.replace_range(0..1, "%2E");
    }
    if out.len() > MAX_STEM_LEN {
        let hash = fnv1a(key.as_bytes());
        out.truncate(MAX_STEM_LEN - 17);
        out.push_str(&format!("~{:016x}", hash));
    }
    out
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
        (h ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

fn is_contended(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
        || (e.raw_os_error().is_some()
            && e.raw_os_error() == fs2::lock_contended_error().raw_os_error())
}

impl LockService for FileLockService {
    fn try_acquire(&self, key: &str, mode: LockMode) -> Result<bool> {
        let path = self.lock_file_path(key);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(io_error_with_help("open lock file", &path))?;

        let attempt = match mode {
            LockMode::Read => FileExt::try_lock_shared(&file),
            LockMode::Write => FileExt::try_lock_exclusive(&file),
        };
        match attempt {
            Ok(()) => {
                trace!(path = %path.display(), mode = %mode, "try-lock success");
                self.handles()
                    .entry(LockRequest::new(key, mode))
                    .or_default()
                    .push(file);
                Ok(true)
            }
            Err(e) if is_contended(&e) => {
                trace!(path = %path.display(), mode = %mode, "try-lock would block");
                Ok(false)
            }
            Err(e) => Err(io_error_with_help("lock", &path)(e)),
        }
    }

    fn release(&self, key: &str, mode: LockMode) -> Result<()> {
        let file = {
            let mut handles = self.handles();
            let req = LockRequest::new(key, mode);
            let file = handles.get_mut(&req).and_then(|v| v.pop());
            if handles.get(&req).is_some_and(|v| v.is_empty()) {
                handles.remove(&req);
            }
            file
        };
        let file = file.ok_or_else(|| anyhow!("{key} ({mode}) is not held by this process"))?;
        let path = self.lock_file_path(key);
        FileExt::unlock(&file).map_err(io_error_with_help("unlock", &path))?;
        trace!(path = %path.display(), mode = %mode, "lock released");
        Ok(())
    }
}
