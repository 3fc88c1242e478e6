use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::bail;

use super::{LockMode, LockRequest, LockService};

/// What happened to a key, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockEvent {
    Acquired(LockRequest),
    Contended(LockRequest),
    Released(LockRequest),
    ReleaseFailed(LockRequest),
}

#[derive(Debug, Default)]
struct Holders {
    readers: usize,
    writer: bool,
}

#[derive(Debug, Default)]
struct State {
    holders: HashMap<String, Holders>,
    events: Vec<LockEvent>,
    fail_release: HashSet<String>,
}

/// In-process lock service with read/write semantics and an event log.
#[derive(Debug, Default)]
pub struct MemoryLockService {
    state: Mutex<State>,
}

impl MemoryLockService {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every later release of `key` fail (the lock is still dropped).
    pub fn fail_release_of(&self, key: &str) {
        self.state().fail_release.insert(key.to_string());
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.state()
            .holders
            .get(key)
            .is_some_and(|h| h.writer || h.readers > 0)
    }

    pub fn events(&self) -> Vec<LockEvent> {
        self.state().events.clone()
    }

    /// Successful acquisitions, in order.
    pub fn acquired(&self) -> Vec<LockRequest> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                LockEvent::Acquired(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    /// Release calls made, successful or not.
    pub fn release_calls(&self) -> usize {
        self.state()
            .events
            .iter()
            .filter(|e| matches!(e, LockEvent::Released(_) | LockEvent::ReleaseFailed(_)))
            .count()
    }
}

impl LockService for MemoryLockService {
    fn try_acquire(&self, key: &str, mode: LockMode) -> anyhow::Result<bool> {
        let mut state = self.state();
        let holders = state.holders.entry(key.to_string()).or_default();
        let granted = match mode {
            LockMode::Read if !holders.writer => {
                holders.readers += 1;
                true
            }
            LockMode::Write if !holders.writer && holders.readers == 0 => {
                holders.writer = true;
                true
            }
            _ => false,
        };
        let req = LockRequest::new(key, mode);
        state.events.push(if granted {
            LockEvent::Acquired(req)
        } else {
            LockEvent::Contended(req)
        });
        Ok(granted)
    }

    fn release(&self, key: &str, mode: LockMode) -> anyhow::Result<()> {
        let mut state = self.state();
        let req = LockRequest::new(key, mode);
        let Some(holders) = state.holders.get_mut(key) else {
            state.events.push(LockEvent::ReleaseFailed(req));
            bail!("{key} is not locked");
        };
        match mode {
            LockMode::Read => holders.readers = holders.readers.saturating_sub(1),
            LockMode::Write => holders.writer = false,
        }
        if state.fail_release.contains(key) {
            state.events.push(LockEvent::ReleaseFailed(req));
            bail!("lock service unavailable while releasing {key}");
        }
        state.events.push(LockEvent::Released(req));
        Ok(())
    }
}
