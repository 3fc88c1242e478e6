//! Object store laid out on the local filesystem as `<root>/<bucket>/<object path>`.
//!
//! Object paths are validated segment by segment so that no key can escape the root.
//! Writes go through a temp file and an atomic rename; every write returns a fresh version
//! id (the store keeps only the latest version).

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Result};
use tracing::debug;
use uuid::Uuid;

use super::BlobStore;
use crate::fs_ops::{copy_streaming, io_error_with_help, safe_copy_and_rename};
use crate::model::ObjectKey;

pub struct LocalObjectStore {
    root: PathBuf,
}

fn check_segment(segment: &str, key: &ObjectKey) -> Result<()> {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains('\\') {
        bail!("invalid object key '{key}': bad path segment '{segment}'");
    }
    if Path::new(segment)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        bail!("invalid object key '{key}': segment '{segment}' is not a plain name");
    }
    Ok(())
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(io_error_with_help("create object root", &root))?;
        Ok(LocalObjectStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn object_path(&self, key: &ObjectKey) -> Result<PathBuf> {
        check_segment(&key.bucket, key)?;
        if key.path.starts_with('/') {
            bail!("invalid object key '{key}': absolute object path");
        }
        let mut p = self.root.join(&key.bucket);
        for segment in key.path.split('/') {
            check_segment(segment, key)?;
            p.push(segment);
        }
        Ok(p)
    }
}

impl BlobStore for LocalObjectStore {
    fn stat(&self, key: &ObjectKey) -> Result<u64> {
        let path = self.object_path(key)?;
        let meta = fs::metadata(&path).map_err(io_error_with_help("stat object", &path))?;
        if !meta.is_file() {
            bail!("object '{key}' is not a regular file");
        }
        Ok(meta.len())
    }

    fn copy_object(&self, src: &ObjectKey, dst: &ObjectKey) -> Result<String> {
        let from = self.object_path(src)?;
        let to = self.object_path(dst)?;
        let bytes = safe_copy_and_rename(&from, &to)?;
        debug!(src = %src, dst = %dst, bytes, "object copied");
        Ok(Uuid::new_v4().to_string())
    }

    fn download_to_file(&self, src: &ObjectKey, dest: &Path) -> Result<u64> {
        let from = self.object_path(src)?;
        copy_streaming(&from, dest).map_err(io_error_with_help("download object", dest))
    }

    fn upload_from_file(&self, src: &Path, dst: &ObjectKey) -> Result<String> {
        let to = self.object_path(dst)?;
        let bytes = safe_copy_and_rename(src, &to)?;
        debug!(dst = %dst, bytes, "object uploaded");
        Ok(Uuid::new_v4().to_string())
    }

    fn remove_object(&self, key: &ObjectKey) -> Result<()> {
        let path = self.object_path(key)?;
        fs::remove_file(&path).map_err(io_error_with_help("remove object", &path))
    }
}
