//! Size-dependent object copy.
//!
//! Objects up to the threshold (inclusive) are copied server-side. Larger ones are
//! downloaded to a staging file and uploaded again, because the store's server-side copy
//! rejects objects over its single-request limit. The staging file is removed whether the
//! upload succeeds or not.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use super::{BlobStore, StagingFile};
use crate::errors::TransferError;
use crate::model::ObjectKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    Direct,
    Staged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub version_id: String,
    pub bytes: u64,
    pub mode: TransferMode,
}

pub struct BlobTransfer<'a> {
    store: &'a dyn BlobStore,
    threshold: u64,
    staging_dir: &'a Path,
}

impl<'a> BlobTransfer<'a> {
    pub fn new(store: &'a dyn BlobStore, threshold: u64, staging_dir: &'a Path) -> Self {
        BlobTransfer {
            store,
            threshold,
            staging_dir,
        }
    }

    pub fn mode_for(&self, size: u64) -> TransferMode {
        if size <= self.threshold {
            TransferMode::Direct
        } else {
            TransferMode::Staged
        }
    }

    pub fn transfer(&self, src: &ObjectKey, dst: &ObjectKey) -> Result<TransferOutcome, TransferError> {
        let fail = |e: anyhow::Error| TransferError::TransferFailure {
            src: src.to_string(),
            dst: dst.to_string(),
            reason: format!("{e:#}"),
        };

        let size = self.store.stat(src).map_err(fail)?;
        let mode = self.mode_for(size);
        debug!(src = %src, dst = %dst, size, mode = ?mode, "object transfer starting");

        let version_id = match mode {
            TransferMode::Direct => self.store.copy_object(src, dst).map_err(fail)?,
            TransferMode::Staged => {
                let staged = StagingFile::reserve(self.staging_dir).map_err(fail)?;
                self.store
                    .download_to_file(src, staged.path())
                    .map_err(fail)?;
                self.store
                    .upload_from_file(staged.path(), dst)
                    .map_err(fail)?
            }
        };

        info!(src = %src, dst = %dst, bytes = size, mode = ?mode, "object transferred");
        Ok(TransferOutcome {
            version_id,
            bytes: size,
            mode,
        })
    }

    pub fn remove(&self, key: &ObjectKey) -> Result<(), TransferError> {
        self.store
            .remove_object(key)
            .map_err(|e| TransferError::TransferFailure {
                src: key.to_string(),
                dst: "(removed)".into(),
                reason: format!("{e:#}"),
            })?;
        info!(key = %key, "object removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{BlobCall, MemoryObjectStore};
    use tempfile::tempdir;

    const THRESHOLD: u64 = 5_000_000_000;

    fn store_with(size: u64) -> MemoryObjectStore {
        let store = MemoryObjectStore::new();
        store.put(&ObjectKey::new("gr-p", "admin/a.bin"), b"abc".to_vec());
        store.report_size(&ObjectKey::new("gr-p", "admin/a.bin"), size);
        store
    }

    #[test]
    fn up_to_threshold_is_direct() {
        let dir = tempdir().unwrap();
        for size in [THRESHOLD - 1, THRESHOLD] {
            let store = store_with(size);
            let t = BlobTransfer::new(&store, THRESHOLD, dir.path());
            let out = t
                .transfer(&ObjectKey::new("gr-p", "admin/a.bin"), &ObjectKey::new("core-p", "admin/a.bin"))
                .unwrap();
            assert_eq!(out.mode, TransferMode::Direct);
            assert_eq!(out.bytes, size);
            assert!(store.calls().iter().any(|c| matches!(c, BlobCall::Copy { .. })));
        }
    }

    #[test]
    fn above_threshold_is_staged_and_cleans_up() {
        let dir = tempdir().unwrap();
        let store = store_with(THRESHOLD + 1);
        let t = BlobTransfer::new(&store, THRESHOLD, dir.path());
        let out = t
            .transfer(&ObjectKey::new("gr-p", "admin/a.bin"), &ObjectKey::new("core-p", "admin/a.bin"))
            .unwrap();
        assert_eq!(out.mode, TransferMode::Staged);
        assert_eq!(store.get(&ObjectKey::new("core-p", "admin/a.bin")).unwrap(), b"abc");
        assert!(!store.calls().iter().any(|c| matches!(c, BlobCall::Copy { .. })));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_upload_still_removes_staging_file() {
        let dir = tempdir().unwrap();
        let store = store_with(THRESHOLD + 1);
        store.fail_writes_to(&ObjectKey::new("core-p", "admin/a.bin"));
        let t = BlobTransfer::new(&store, THRESHOLD, dir.path());
        let err = t
            .transfer(&ObjectKey::new("gr-p", "admin/a.bin"), &ObjectKey::new("core-p", "admin/a.bin"))
            .unwrap_err();
        assert!(matches!(err, TransferError::TransferFailure { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_source_is_transfer_failure() {
        let dir = tempdir().unwrap();
        let store = MemoryObjectStore::new();
        let t = BlobTransfer::new(&store, THRESHOLD, dir.path());
        let err = t
            .transfer(&ObjectKey::new("gr-p", "nope"), &ObjectKey::new("core-p", "nope"))
            .unwrap_err();
        assert_eq!(err.code(), "transfer_failure");
    }
}
