//! AreaIndex - the live area index and its lifecycle.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;

use docstore::SharedDocumentStore;
use parking_lot::{Mutex, RwLock};
use tracing::Instrument;

use crate::builder::rebuild_index;
use crate::data::AreaIndexData;
use crate::entry::AreaIndexEntry;
use crate::error::IndexResult;
use crate::persistence::{IndexCache, SnapshotFormat};
use crate::search::search_entries;
use crate::state::{zero_to_none, IndexProgress, IndexState};
use crate::types::IndexStatus;

/// Owns the area index.
///
/// Readers take an `Arc` to the current snapshot and never see a half-built
/// map: a full rebuild builds off to the side and swaps the `Arc` in one step.
/// Incremental inserts copy-on-write the snapshot under a short write lock.
pub struct AreaIndex {
    store: SharedDocumentStore,
    cache: IndexCache,
    data: RwLock<Arc<AreaIndexData>>,
    state: AtomicU8,
    progress: IndexProgress,
    last_error: Mutex<Option<String>>,
    /// Inserts that landed while a rebuild was scanning, re-applied on swap.
    /// `Some` exactly while a rebuild is in flight.
    pending_inserts: Mutex<Option<Vec<AreaIndexEntry>>>,
    rebuild_lane: tokio::sync::Mutex<()>,
    persist_lane: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for AreaIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AreaIndex")
            .field("state", &self.state())
            .field("entries", &self.data.read().len())
            .finish()
    }
}

impl AreaIndex {
    /// Creates an empty, uninitialized index. Call [`AreaIndex::initialize`]
    /// before serving queries.
    pub fn new(store: SharedDocumentStore) -> Self {
        Self {
            cache: IndexCache::new(store.clone()),
            store,
            data: RwLock::new(Arc::new(AreaIndexData::new())),
            state: AtomicU8::new(IndexState::Uninitialized as u8),
            progress: IndexProgress::default(),
            last_error: Mutex::new(None),
            pending_inserts: Mutex::new(None),
            rebuild_lane: tokio::sync::Mutex::new(()),
            persist_lane: tokio::sync::Mutex::new(()),
        }
    }

    /// Creates the index and brings it to `Ready`.
    pub async fn open(store: SharedDocumentStore) -> IndexResult<Arc<Self>> {
        let index = Arc::new(Self::new(store));
        index.initialize().await?;
        Ok(index)
    }

    /// Loads the cached snapshot, falling back to a full rebuild on a miss.
    pub async fn initialize(&self) -> IndexResult<()> {
        let started = Instant::now();
        IndexState::Loading.store(&self.state);

        if let Some(loaded) = self.cache.load().await {
            let entries = loaded.data.len();
            *self.data.write() = Arc::new(loaded.data);
            self.progress.record_cache_load();
            IndexState::Ready.store(&self.state);
            tracing::info!(
                "area index init cache_loaded=true format={} entries={} skipped={} elapsed_ms={}",
                loaded.format.as_str(),
                entries,
                loaded.skipped,
                started.elapsed().as_millis()
            );
            if loaded.format != SnapshotFormat::Current {
                if let Err(error) = self.persist().await {
                    tracing::warn!("failed to migrate area index cache: {error}");
                }
            }
            return Ok(());
        }

        tracing::info!("area index init cache_loaded=false, rebuilding");
        self.rebuild().await?;
        Ok(())
    }

    /// Rescans all area documents, swaps in the result and persists it.
    ///
    /// Rebuilds run one at a time. On failure the previous snapshot stays live,
    /// and so it does when the returned future is dropped mid-scan.
    pub async fn rebuild(&self) -> IndexResult<usize> {
        let _lane = self.rebuild_lane.lock().await;
        IndexState::Rebuilding.store(&self.state);
        *self.pending_inserts.lock() = Some(Vec::new());
        let mut guard = RebuildGuard {
            index: self,
            finished: false,
        };

        let outcome = match rebuild_index(self.store.as_ref())
            .instrument(tracing::info_span!("area_index_rebuild"))
            .await
        {
            Ok(outcome) => outcome,
            Err(error) => {
                *self.pending_inserts.lock() = None;
                *self.last_error.lock() = Some(error.to_string());
                IndexState::Ready.store(&self.state);
                guard.finished = true;
                tracing::warn!("area index rebuild failed: {error}");
                return Err(error);
            }
        };

        let mut fresh = outcome.data;
        let count = {
            let mut pending = self.pending_inserts.lock();
            for entry in pending.take().unwrap_or_default() {
                fresh.upsert(entry);
            }
            let count = fresh.len();
            *self.data.write() = Arc::new(fresh);
            count
        };
        self.progress.record_rebuild(outcome.skipped);
        *self.last_error.lock() = None;
        IndexState::Ready.store(&self.state);
        guard.finished = true;

        self.persist().await?;
        Ok(count)
    }

    /// Adds or replaces one entry without a rescan, then persists the snapshot.
    pub async fn incremental_insert(&self, entry: AreaIndexEntry) -> IndexResult<()> {
        let updating = self
            .state
            .compare_exchange(
                IndexState::Ready as u8,
                IndexState::Updating as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        {
            let mut pending = self.pending_inserts.lock();
            if let Some(pending) = pending.as_mut() {
                pending.push(entry.clone());
            }
            let mut data = self.data.write();
            Arc::make_mut(&mut *data).upsert(entry);
        }
        self.progress.record_incremental();

        if updating {
            let _ = self.state.compare_exchange(
                IndexState::Updating as u8,
                IndexState::Ready as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }

        self.persist().await
    }

    /// Writes the latest snapshot. Serialized so an older snapshot can never
    /// land after a newer one.
    async fn persist(&self) -> IndexResult<()> {
        let _lane = self.persist_lane.lock().await;
        let snapshot = self.snapshot();
        if let Err(error) = self.cache.save(&snapshot).await {
            *self.last_error.lock() = Some(error.to_string());
            return Err(error);
        }
        Ok(())
    }

    /// The current snapshot. Stays valid (and unchanged) across later swaps.
    pub fn snapshot(&self) -> Arc<AreaIndexData> {
        self.data.read().clone()
    }

    pub fn find_by_id(&self, id: &str) -> Option<AreaIndexEntry> {
        self.snapshot().get(id).cloned()
    }

    /// Exact match on the normalized name key.
    pub fn find_by_normalized_name(&self, name_key: &str) -> Option<String> {
        self.snapshot().id_for_name_key(name_key).map(str::to_string)
    }

    pub fn search(&self, term: &str) -> Vec<AreaIndexEntry> {
        search_entries(&self.snapshot(), term, None)
    }

    pub fn search_limited(&self, term: &str, limit: usize) -> Vec<AreaIndexEntry> {
        search_entries(&self.snapshot(), term, Some(limit))
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    pub fn state(&self) -> IndexState {
        IndexState::load(&self.state)
    }

    pub fn store(&self) -> &SharedDocumentStore {
        &self.store
    }

    pub fn status(&self) -> IndexStatus {
        IndexStatus {
            state: self.state().as_str().to_string(),
            indexed_entries: self.len(),
            rebuild_count: self.progress.rebuild_count.load(Ordering::Relaxed),
            incremental_count: self.progress.incremental_count.load(Ordering::Relaxed),
            skipped_documents: self.progress.skipped_documents.load(Ordering::Relaxed),
            last_rebuild_at: zero_to_none(self.progress.last_rebuild_at.load(Ordering::Relaxed)),
            loaded_from_cache_at: zero_to_none(
                self.progress.loaded_from_cache_at.load(Ordering::Relaxed),
            ),
            last_error: self.last_error.lock().clone(),
        }
    }
}

/// Puts the index back to `Ready` when a rebuild is dropped before it
/// finishes, so later inserts neither stall nor pile up in the pending buffer.
struct RebuildGuard<'a> {
    index: &'a AreaIndex,
    finished: bool,
}

impl Drop for RebuildGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Pending inserts were already applied to the live snapshot.
        *self.index.pending_inserts.lock() = None;
        *self.index.last_error.lock() = Some("rebuild cancelled".to_string());
        let _ = self.index.state.compare_exchange(
            IndexState::Rebuilding as u8,
            IndexState::Ready as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        tracing::warn!("area index rebuild cancelled, keeping previous snapshot");
    }
}
