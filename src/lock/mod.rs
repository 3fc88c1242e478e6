//! Resource locking.
//!
//! Locks are named by string keys: `<bucket>/<object path>` for files and
//! `<zone prefix><project>/<display path>` for folders. A [`LockService`] grants or refuses a
//! lock without blocking; [`ResourceLock`] keeps a per-job ledger of what it acquired so that
//! every acquired lock is released exactly once, on success and on failure alike.

mod file;
mod memory;
mod resource;

pub use file::FileLockService;
pub use memory::{LockEvent, MemoryLockService};
pub use resource::{ReleaseFailure, ResourceLock};

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    /// Shared; many readers may hold the same key.
    Read,
    /// Exclusive; refused while any other lock on the key is held.
    Write,
}

impl LockMode {
    pub fn as_str(self) -> &'static str {
        match self {
            LockMode::Read => "read",
            LockMode::Write => "write",
        }
    }
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockRequest {
    pub key: String,
    pub mode: LockMode,
}

impl LockRequest {
    pub fn new(key: impl Into<String>, mode: LockMode) -> Self {
        LockRequest {
            key: key.into(),
            mode,
        }
    }

    pub fn read(key: impl Into<String>) -> Self {
        Self::new(key, LockMode::Read)
    }

    pub fn write(key: impl Into<String>) -> Self {
        Self::new(key, LockMode::Write)
    }
}

impl fmt::Display for LockRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.key, self.mode)
    }
}

/// External lock service. Implementations must not block waiting for a holder.
pub trait LockService: Send + Sync {
    /// `Ok(true)` if granted, `Ok(false)` if another holder conflicts.
    fn try_acquire(&self, key: &str, mode: LockMode) -> anyhow::Result<bool>;

    fn release(&self, key: &str, mode: LockMode) -> anyhow::Result<()>;
}
