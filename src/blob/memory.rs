use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use uuid::Uuid;

use super::BlobStore;
use crate::fs_ops::io_error_with_help;
use crate::model::{Credentials, ObjectKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobCall {
    Stat(ObjectKey),
    Copy { src: ObjectKey, dst: ObjectKey },
    Download { src: ObjectKey, dest: PathBuf },
    Upload { src: PathBuf, dst: ObjectKey },
    Remove(ObjectKey),
}

#[derive(Debug, Default)]
struct State {
    objects: HashMap<ObjectKey, Vec<u8>>,
    reported_sizes: HashMap<ObjectKey, u64>,
    failing: HashSet<ObjectKey>,
    calls: Vec<BlobCall>,
    required_token: Option<String>,
    authorized: Vec<String>,
}

/// Object store held in memory, with a call log, size overrides and write failures.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    state: Mutex<State>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn put(&self, key: &ObjectKey, bytes: Vec<u8>) {
        self.state().objects.insert(key.clone(), bytes);
    }

    pub fn get(&self, key: &ObjectKey) -> Option<Vec<u8>> {
        self.state().objects.get(key).cloned()
    }

    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.state().objects.contains_key(key)
    }

    /// Make `stat` report `size` for `key` regardless of its real length.
    pub fn report_size(&self, key: &ObjectKey, size: u64) {
        self.state().reported_sizes.insert(key.clone(), size);
    }

    /// Make every write or removal targeting `key` fail.
    pub fn fail_writes_to(&self, key: &ObjectKey) {
        self.state().failing.insert(key.clone());
    }

    /// Refuse jobs whose access token is not `token`.
    pub fn require_access_token(&self, token: &str) {
        self.state().required_token = Some(token.to_string());
    }

    /// Access tokens of the jobs that were let in, in order.
    pub fn authorized_tokens(&self) -> Vec<String> {
        self.state().authorized.clone()
    }

    pub fn calls(&self) -> Vec<BlobCall> {
        self.state().calls.clone()
    }

    pub fn keys(&self) -> Vec<ObjectKey> {
        let mut keys: Vec<_> = self.state().objects.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn check_writable(state: &State, key: &ObjectKey) -> Result<()> {
        if state.failing.contains(key) {
            bail!("object store refused write to {key}");
        }
        Ok(())
    }
}

impl BlobStore for MemoryObjectStore {
    fn authorize(&self, credentials: Option<&Credentials>) -> Result<()> {
        let mut state = self.state();
        let token = credentials.map(|c| c.access_token.clone());
        if let Some(required) = &state.required_token
            && token.as_ref() != Some(required)
        {
            bail!("access token missing or not accepted");
        }
        state.authorized.push(token.unwrap_or_default());
        Ok(())
    }

    fn stat(&self, key: &ObjectKey) -> Result<u64> {
        let mut state = self.state();
        state.calls.push(BlobCall::Stat(key.clone()));
        if let Some(size) = state.reported_sizes.get(key) {
            return Ok(*size);
        }
        state
            .objects
            .get(key)
            .map(|b| b.len() as u64)
            .ok_or_else(|| anyhow!("object {key} does not exist"))
    }

    fn copy_object(&self, src: &ObjectKey, dst: &ObjectKey) -> Result<String> {
        let mut state = self.state();
        state.calls.push(BlobCall::Copy {
            src: src.clone(),
            dst: dst.clone(),
        });
        Self::check_writable(&state, dst)?;
        let bytes = state
            .objects
            .get(src)
            .cloned()
            .ok_or_else(|| anyhow!("object {src} does not exist"))?;
        state.objects.insert(dst.clone(), bytes);
        Ok(Uuid::new_v4().to_string())
    }

    fn download_to_file(&self, src: &ObjectKey, dest: &Path) -> Result<u64> {
        let bytes = {
            let mut state = self.state();
            state.calls.push(BlobCall::Download {
                src: src.clone(),
                dest: dest.to_path_buf(),
            });
            state
                .objects
                .get(src)
                .cloned()
                .ok_or_else(|| anyhow!("object {src} does not exist"))?
        };
        let mut f = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .map_err(io_error_with_help("create download target", dest))?;
        f.write_all(&bytes)
            .map_err(io_error_with_help("write download target", dest))?;
        Ok(bytes.len() as u64)
    }

    fn upload_from_file(&self, src: &Path, dst: &ObjectKey) -> Result<String> {
        let mut state = self.state();
        state.calls.push(BlobCall::Upload {
            src: src.to_path_buf(),
            dst: dst.clone(),
        });
        Self::check_writable(&state, dst)?;
        let bytes = fs::read(src).map_err(io_error_with_help("read upload source", src))?;
        state.objects.insert(dst.clone(), bytes);
        Ok(Uuid::new_v4().to_string())
    }

    fn remove_object(&self, key: &ObjectKey) -> Result<()> {
        let mut state = self.state();
        state.calls.push(BlobCall::Remove(key.clone()));
        Self::check_writable(&state, key)?;
        state
            .objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| anyhow!("object {key} does not exist"))
    }
}
