use std::fmt;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use super::{LockMode, LockRequest, LockService};
use crate::errors::TransferError;

/// A release that the lock service refused. Logged and reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFailure {
    pub key: String,
    pub mode: LockMode,
    pub reason: String,
}

impl fmt::Display for ReleaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "release of {} ({}) failed: {}", self.key, self.mode, self.reason)
    }
}

/// Per-job ledger over a [`LockService`].
///
/// Every successful acquire is recorded; `release_all` walks the ledger in reverse and calls
/// the service once per entry. Anything still held when the ledger is dropped is released
/// then.
pub struct ResourceLock<'a> {
    service: &'a dyn LockService,
    held: Mutex<Vec<LockRequest>>,
}

impl<'a> ResourceLock<'a> {
    pub fn new(service: &'a dyn LockService) -> Self {
        ResourceLock {
            service,
            held: Mutex::new(Vec::new()),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Vec<LockRequest>> {
        self.held.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn acquire(&self, key: &str, mode: LockMode) -> Result<(), TransferError> {
        match self.service.try_acquire(key, mode) {
            Ok(true) => {
                debug!(key = %key, mode = %mode, "lock acquired");
                self.ledger().push(LockRequest::new(key, mode));
                Ok(())
            }
            Ok(false) => Err(TransferError::LockContention {
                key: key.to_string(),
                mode,
            }),
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(key = %key, mode = %mode, error = %reason, "lock service failed");
                Err(TransferError::LockService {
                    key: key.to_string(),
                    mode,
                    reason,
                })
            }
        }
    }

    /// Acquire `requests` in order. On the first refusal everything already taken by this
    /// ledger is released before the error is returned.
    pub fn acquire_all(&self, requests: &[LockRequest]) -> Result<(), TransferError> {
        for req in requests {
            if let Err(e) = self.acquire(&req.key, req.mode) {
                let failures = self.release_all();
                debug!(
                    refused = %req,
                    release_failures = failures.len(),
                    "lock acquisition aborted; partial set released"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// Release one held lock. Unknown `(key, mode)` pairs are a no-op.
    pub fn release(&self, key: &str, mode: LockMode) -> Result<(), ReleaseFailure> {
        let held = {
            let mut ledger = self.ledger();
            ledger
                .iter()
                .rposition(|r| r.key == key && r.mode == mode)
                .map(|idx| ledger.remove(idx))
        };
        match held {
            Some(req) => self.release_one(&req),
            None => Ok(()),
        }
    }

    fn release_one(&self, req: &LockRequest) -> Result<(), ReleaseFailure> {
        match self.service.release(&req.key, req.mode) {
            Ok(()) => {
                debug!(key = %req.key, mode = %req.mode, "lock released");
                Ok(())
            }
            Err(e) => {
                let failure = ReleaseFailure {
                    key: req.key.clone(),
                    mode: req.mode,
                    reason: format!("{e:#}"),
                };
                warn!(key = %req.key, mode = %req.mode, reason = %failure.reason, "lock release failed");
                Err(failure)
            }
        }
    }

    /// Release every held lock in reverse acquisition order; failures are collected.
    pub fn release_all(&self) -> Vec<ReleaseFailure> {
        let drained: Vec<LockRequest> = std::mem::take(&mut *self.ledger());
        drained
            .iter()
            .rev()
            .filter_map(|req| self.release_one(req).err())
            .collect()
    }

    pub fn held(&self) -> Vec<LockRequest> {
        self.ledger().clone()
    }
}

impl Drop for ResourceLock<'_> {
    fn drop(&mut self) {
        let remaining = self.ledger().len();
        if remaining > 0 {
            warn!(remaining, "resource lock dropped while holding locks; releasing");
            let _ = self.release_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::{LockEvent, MemoryLockService};

    #[test]
    fn acquire_all_rolls_back_on_contention() {
        let svc = MemoryLockService::new();
        assert!(svc.try_acquire("core-p/admin/B", LockMode::Write).unwrap());

        let ledger = ResourceLock::new(&svc);
        let reqs = vec![
            LockRequest::read("gr-p/admin/A"),
            LockRequest::write("core-p/admin/A"),
            LockRequest::read("core-p/admin/B"),
        ];
        let err = ledger.acquire_all(&reqs).unwrap_err();
        assert!(matches!(err, TransferError::LockContention { ref key, .. } if key == "core-p/admin/B"));
        assert!(ledger.held().is_empty());
        assert!(!svc.is_locked("gr-p/admin/A"));
        assert!(!svc.is_locked("core-p/admin/A"));
    }

    /// A service that is up for the first `healthy` calls and errors afterwards.
    struct FlakyService {
        inner: MemoryLockService,
        healthy: Mutex<usize>,
    }

    impl LockService for FlakyService {
        fn try_acquire(&self, key: &str, mode: LockMode) -> anyhow::Result<bool> {
            let mut left = self.healthy.lock().unwrap();
            if *left == 0 {
                anyhow::bail!("lock service unreachable");
            }
            *left -= 1;
            self.inner.try_acquire(key, mode)
        }

        fn release(&self, key: &str, mode: LockMode) -> anyhow::Result<()> {
            self.inner.release(key, mode)
        }
    }

    #[test]
    fn service_outage_is_not_contention() {
        let svc = FlakyService {
            inner: MemoryLockService::new(),
            healthy: Mutex::new(1),
        };
        let ledger = ResourceLock::new(&svc);
        let err = ledger
            .acquire_all(&[LockRequest::read("gr-p/admin/A"), LockRequest::write("core-p/admin/A")])
            .unwrap_err();
        match &err {
            TransferError::LockService { key, mode, reason } => {
                assert_eq!(key, "core-p/admin/A");
                assert_eq!(*mode, LockMode::Write);
                assert!(reason.contains("unreachable"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(err.code(), "lock_service_failure");
        assert!(ledger.held().is_empty());
        assert!(!svc.inner.is_locked("gr-p/admin/A"));
    }

    #[test]
    fn release_all_runs_in_reverse() {
        let svc = MemoryLockService::new();
        let ledger = ResourceLock::new(&svc);
        ledger
            .acquire_all(&[LockRequest::read("a"), LockRequest::write("b")])
            .unwrap();
        assert!(ledger.release_all().is_empty());

        let released: Vec<_> = svc
            .events()
            .into_iter()
            .filter_map(|e| match e {
                LockEvent::Released(r) => Some(r.key),
                _ => None,
            })
            .collect();
        assert_eq!(released, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn release_failure_is_reported_not_raised() {
        let svc = MemoryLockService::new();
        svc.fail_release_of("b");
        let ledger = ResourceLock::new(&svc);
        ledger
            .acquire_all(&[LockRequest::read("a"), LockRequest::write("b")])
            .unwrap();
        let failures = ledger.release_all();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].key, "b");
        assert!(!svc.is_locked("a"));
        assert!(ledger.held().is_empty());
    }

    #[test]
    fn release_is_idempotent() {
        let svc = MemoryLockService::new();
        let ledger = ResourceLock::new(&svc);
        ledger.acquire("k", LockMode::Read).unwrap();
        ledger.release("k", LockMode::Read).unwrap();
        ledger.release("k", LockMode::Read).unwrap();
        assert_eq!(svc.release_calls(), 1);
    }

    #[test]
    fn drop_releases_leftovers() {
        let svc = MemoryLockService::new();
        {
            let ledger = ResourceLock::new(&svc);
            ledger.acquire("k", LockMode::Write).unwrap();
        }
        assert!(!svc.is_locked("k"));
    }
}
