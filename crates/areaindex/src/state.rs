//! Index lifecycle state and rebuild bookkeeping.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Index lifecycle.
///
/// `Uninitialized -> Loading -> Ready | Rebuilding -> Ready`, then
/// `Ready -> Rebuilding -> Ready` for full rebuilds and
/// `Ready -> Updating -> Ready` for incremental inserts.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum IndexState {
    Uninitialized = 0,
    Loading = 1,
    Rebuilding = 2,
    Ready = 3,
    Updating = 4,
}

impl IndexState {
    /// Loads the state from an atomic.
    pub fn load(atomic: &AtomicU8) -> Self {
        match atomic.load(Ordering::Acquire) {
            1 => Self::Loading,
            2 => Self::Rebuilding,
            3 => Self::Ready,
            4 => Self::Updating,
            _ => Self::Uninitialized,
        }
    }

    pub fn store(self, atomic: &AtomicU8) {
        atomic.store(self as u8, Ordering::Release);
    }

    /// Returns the state as a string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Loading => "loading",
            Self::Rebuilding => "rebuilding",
            Self::Ready => "ready",
            Self::Updating => "updating",
        }
    }
}

/// Counters for rebuilds and incremental updates.
#[derive(Debug, Default)]
pub struct IndexProgress {
    pub rebuild_count: AtomicU64,
    pub incremental_count: AtomicU64,
    pub skipped_documents: AtomicU64,
    pub last_rebuild_at: AtomicU64,
    pub loaded_from_cache_at: AtomicU64,
}

impl IndexProgress {
    pub fn record_rebuild(&self, skipped: usize) {
        self.rebuild_count.fetch_add(1, Ordering::Relaxed);
        self.skipped_documents
            .store(skipped as u64, Ordering::Relaxed);
        self.last_rebuild_at.store(unix_now_secs(), Ordering::Relaxed);
    }

    pub fn record_incremental(&self) {
        self.incremental_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_load(&self) {
        self.loaded_from_cache_at
            .store(unix_now_secs(), Ordering::Relaxed);
    }
}

/// Returns the current Unix timestamp in seconds.
pub fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| value.as_secs())
        .unwrap_or(0)
}

/// Converts 0 to None for optional timestamps.
pub fn zero_to_none(value: u64) -> Option<u64> {
    if value == 0 {
        None
    } else {
        Some(value)
    }
}
