//! Per-resource write serialization.
//!
//! Read-modify-write cycles against the same resource (one account, one area)
//! must not interleave or the later write silently drops the earlier update.
//! [`WriteSerializer`] hands out one async mutex per resource key, created on
//! demand and dropped from the table once nobody holds or waits on it.
//!
//! There is no acquisition timeout: callers queue until the current holder
//! finishes. tokio's mutex is fair, so waiters on one key run in FIFO order.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

#[derive(Debug, Clone, Default)]
pub struct WriteSerializer {
    locks: Arc<LockTable>,
}

impl WriteSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `operation` while holding the lock for `resource_key`.
    ///
    /// The lock is released on every exit path, including when the returned
    /// future is dropped mid-wait or mid-operation. Errors inside `operation`
    /// come back to the caller untouched.
    pub async fn run_exclusive<F, Fut, T>(&self, resource_key: &str, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lock = self.lock_for(resource_key);
        let mut lease = Lease {
            table: &self.locks,
            key: resource_key,
            lock: Some(lock.clone()),
            guard: None,
        };
        lease.guard = Some(lock.lock_owned().await);
        tracing::trace!("acquired write lock for {resource_key}");
        operation().await
    }

    /// Number of keys with a live lock entry.
    pub fn active_keys(&self) -> usize {
        self.locks.lock().len()
    }

    fn lock_for(&self, resource_key: &str) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .entry(resource_key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// Releases the guard, then drops the table entry if this was the last user.
struct Lease<'a> {
    table: &'a LockTable,
    key: &'a str,
    lock: Option<Arc<AsyncMutex<()>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let Some(lock) = self.lock.take() else {
            return;
        };
        let mut table = self.table.lock();
        // New clones are taken under the table lock, and every lease drops its
        // guard first and its own ref while still holding the table lock. Two
        // strong refs (table + ours) therefore means no one else holds or
        // waits on this key, and the last lease to leave always sees two.
        let unused = table
            .get(self.key)
            .is_some_and(|entry| Arc::ptr_eq(entry, &lock) && Arc::strong_count(&lock) == 2);
        drop(lock);
        if unused {
            table.remove(self.key);
        }
    }
}
