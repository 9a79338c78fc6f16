//! Area index over the document store.
//!
//! This crate keeps a searchable in-memory index of every area:
//! - Full rebuilds from the `area-info` namespace, swapped in atomically
//! - Incremental inserts when an area is saved
//! - A persisted snapshot so a restart does not need a full scan
//! - A debounced filesystem watcher that rebuilds on external edits

pub mod areas;
pub mod builder;
pub mod config;
pub mod data;
pub mod debounce;
pub mod entry;
pub mod error;
pub mod manager;
pub mod persistence;
pub mod search;
pub mod state;
pub mod types;
pub mod watcher;

pub use areas::{create_area, generate_area_id, index_area_document, AreaDraft};
pub use builder::{rebuild_index, RebuildOutcome};
pub use config::IndexConfig;
pub use data::AreaIndexData;
pub use entry::{entry_from_area_document, normalize_name_key, AreaIndexEntry};
pub use error::{IndexError, IndexResult};
pub use manager::AreaIndex;
pub use persistence::{
    IndexCache, LoadedSnapshot, SnapshotFormat, INDEX_CACHE_ID, INDEX_CACHE_VERSION,
};
pub use state::IndexState;
pub use types::IndexStatus;
pub use watcher::AreaIndexWatcher;
