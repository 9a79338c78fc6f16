//! Status reporting types.

use serde::Serialize;

/// Index status information.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStatus {
    /// Current lifecycle state of the index.
    pub state: String,
    /// Number of entries in the live snapshot.
    pub indexed_entries: usize,
    /// Full rebuilds completed since startup.
    pub rebuild_count: u64,
    /// Incremental inserts applied since startup.
    pub incremental_count: u64,
    /// Documents skipped by the last rebuild.
    pub skipped_documents: u64,
    /// Unix timestamp of the last completed rebuild.
    pub last_rebuild_at: Option<u64>,
    /// Unix timestamp of the startup cache load, if the cache was used.
    pub loaded_from_cache_at: Option<u64>,
    /// Last rebuild or persist error, cleared by the next successful rebuild.
    pub last_error: Option<String>,
}
