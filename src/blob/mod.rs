//! Object store access and the size-dependent transfer strategy.

mod local;
mod memory;
mod staging;
mod transfer;

pub use local::LocalObjectStore;
pub use memory::{BlobCall, MemoryObjectStore};
pub use staging::StagingFile;
pub use transfer::{BlobTransfer, TransferMode, TransferOutcome};

use std::path::Path;

use crate::model::{Credentials, ObjectKey};

/// S3-style object store. Every write returns the version id of the new object.
pub trait BlobStore: Send + Sync {
    /// Size in bytes of the object at `key`.
    fn stat(&self, key: &ObjectKey) -> anyhow::Result<u64>;

    /// Server-side copy.
    fn copy_object(&self, src: &ObjectKey, dst: &ObjectKey) -> anyhow::Result<String>;

    /// Download into `dest`, which must not exist yet. Returns bytes written.
    fn download_to_file(&self, src: &ObjectKey, dest: &Path) -> anyhow::Result<u64>;

    fn upload_from_file(&self, src: &Path, dst: &ObjectKey) -> anyhow::Result<String>;

    fn remove_object(&self, key: &ObjectKey) -> anyhow::Result<()>;

    /// Check the caller's tokens before a job touches any object. Stores without access
    /// control accept anything, including no credentials at all.
    fn authorize(&self, credentials: Option<&Credentials>) -> anyhow::Result<()> {
        let _ = credentials;
        Ok(())
    }
}
