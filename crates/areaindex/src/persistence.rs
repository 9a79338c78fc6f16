//! Index cache - snapshot read/write through the document store.
//!
//! The snapshot lives in the `area-index-cache` namespace so it gets the same
//! atomic replace as every other document. Older deployments wrote two other
//! encodings; both still load and are normalized on the way in. Writes always
//! use the current encoding.

use docstore::{write_document, DocumentKey, DocumentKind, SharedDocumentStore};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::AreaIndexData;
use crate::entry::AreaIndexEntry;
use crate::error::IndexResult;
use crate::state::unix_now_secs;

/// Cache format version - increment when changing the current encoding.
pub const INDEX_CACHE_VERSION: u32 = 2;

/// Document id of the snapshot inside `area-index-cache`.
pub const INDEX_CACHE_ID: &str = "areaIndex";

/// Every snapshot encoding that has been written to disk.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotEncoding {
    /// `{ "version": 2, "savedAt": .., "entries": [entry, ..] }`
    Current(CurrentSnapshot),
    /// Bare list of entries, oldest format.
    EntryList(Vec<Value>),
    /// `{ "<id>": { "title": .., "description": .. }, .. }` as written by the
    /// watcher-driven rebuild.
    TitleMap(Map<String, Value>),
}

/// Which encoding a loaded snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Current,
    EntryList,
    TitleMap,
}

impl SnapshotFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::EntryList => "entry list",
            Self::TitleMap => "title map",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentSnapshot {
    version: u32,
    #[serde(default)]
    saved_at: u64,
    entries: Vec<Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRef<'a> {
    version: u32,
    saved_at: u64,
    entries: &'a [AreaIndexEntry],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyListEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    player_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct LegacyTitledArea {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// A snapshot decoded from the cache.
#[derive(Debug)]
pub struct LoadedSnapshot {
    pub data: AreaIndexData,
    pub format: SnapshotFormat,
    /// Entries dropped because their shape was invalid.
    pub skipped: usize,
}

/// Durable snapshot of the area index.
#[derive(Clone)]
pub struct IndexCache {
    store: SharedDocumentStore,
    key: DocumentKey,
}

impl std::fmt::Debug for IndexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexCache").field("key", &self.key).finish()
    }
}

impl IndexCache {
    pub fn new(store: SharedDocumentStore) -> Self {
        Self {
            store,
            key: DocumentKey::new(DocumentKind::AreaIndexCache, INDEX_CACHE_ID),
        }
    }

    /// Loads the snapshot. Anything missing, unrecognized, from another
    /// version, or empty comes back as `None` so the caller rebuilds.
    pub async fn load(&self) -> Option<LoadedSnapshot> {
        let value = match self.store.read(&self.key).await {
            Ok(value) => value,
            Err(error) if error.is_not_found() => {
                tracing::debug!("no area index cache at {}", self.key);
                return None;
            }
            Err(error) => {
                tracing::warn!("area index cache read failed for {}: {}", self.key, error);
                return None;
            }
        };

        let loaded = decode_snapshot(value)?;
        if loaded.data.is_empty() {
            tracing::debug!("area index cache is empty, ignoring");
            return None;
        }
        tracing::debug!(
            "loaded area index cache ({} entries, {} format, {} skipped)",
            loaded.data.len(),
            loaded.format.as_str(),
            loaded.skipped
        );
        Some(loaded)
    }

    /// Writes `data` in the current encoding.
    pub async fn save(&self, data: &AreaIndexData) -> IndexResult<()> {
        let snapshot = SnapshotRef {
            version: INDEX_CACHE_VERSION,
            saved_at: unix_now_secs(),
            entries: data.entries(),
        };
        write_document(self.store.as_ref(), &self.key, &snapshot).await?;
        tracing::debug!("wrote area index cache ({} entries)", data.len());
        Ok(())
    }
}

/// Decodes any known encoding and normalizes it. Entries with a bad shape are
/// skipped one by one; an unrecognized document yields `None`.
fn decode_snapshot(value: Value) -> Option<LoadedSnapshot> {
    let _span = tracing::info_span!("cache_decode").entered();
    let encoding = match serde_json::from_value::<SnapshotEncoding>(value) {
        Ok(encoding) => encoding,
        Err(error) => {
            tracing::warn!("area index cache has an unknown format: {error}");
            return None;
        }
    };

    let (format, candidates): (SnapshotFormat, Vec<Option<AreaIndexEntry>>) = match encoding {
        SnapshotEncoding::Current(snapshot) => {
            if snapshot.version != INDEX_CACHE_VERSION {
                tracing::debug!(
                    "cache version mismatch: {} != {}",
                    snapshot.version,
                    INDEX_CACHE_VERSION
                );
                return None;
            }
            tracing::trace!("cache saved_at={}", snapshot.saved_at);
            (
                SnapshotFormat::Current,
                snapshot.entries.into_iter().map(current_entry).collect(),
            )
        }
        SnapshotEncoding::EntryList(entries) => (
            SnapshotFormat::EntryList,
            entries.into_iter().map(legacy_list_entry).collect(),
        ),
        SnapshotEncoding::TitleMap(areas) => (
            SnapshotFormat::TitleMap,
            areas
                .into_iter()
                .map(|(id, area)| titled_entry(id, area))
                .collect(),
        ),
    };

    let total = candidates.len();
    let data = AreaIndexData::from_entries(candidates.into_iter().flatten());
    let skipped = total - data.len();
    Some(LoadedSnapshot {
        data,
        format,
        skipped,
    })
}

fn current_entry(value: Value) -> Option<AreaIndexEntry> {
    serde_json::from_value::<AreaIndexEntry>(value)
        .ok()
        .filter(|entry| !entry.id.is_empty() && !entry.name.is_empty())
}

fn legacy_list_entry(value: Value) -> Option<AreaIndexEntry> {
    let entry: LegacyListEntry = serde_json::from_value(value).ok()?;
    let id = entry.id.filter(|id| !id.is_empty())?;
    let name = entry.name.filter(|name| !name.is_empty())?;
    Some(AreaIndexEntry {
        id,
        name,
        description: entry.description.unwrap_or_default(),
        player_count: entry.player_count.unwrap_or(0),
    })
}

fn titled_entry(id: String, value: Value) -> Option<AreaIndexEntry> {
    if id.is_empty() {
        return None;
    }
    let area: LegacyTitledArea = serde_json::from_value(value).ok()?;
    let name = area.title.filter(|title| !title.is_empty())?;
    Some(AreaIndexEntry::new(
        id,
        name,
        area.description.unwrap_or_default(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use docstore::{DocumentStore, FileDocumentStore, MemoryDocumentStore};
    use serde_json::json;

    use crate::builder::rebuild_index;

    fn cache_key() -> DocumentKey {
        DocumentKey::new(DocumentKind::AreaIndexCache, INDEX_CACHE_ID)
    }

    async fn cache_with(raw: Value) -> IndexCache {
        let store = Arc::new(MemoryDocumentStore::new());
        store.write(&cache_key(), &raw).await.expect("seed cache");
        IndexCache::new(store)
    }

    #[tokio::test]
    async fn save_then_load_matches_rebuild() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(FileDocumentStore::new(dir.path().to_path_buf()));
        for (id, name) in [("a", "bluecastle"), ("b", "forest"), ("c", "Plaza")] {
            store
                .write(
                    &DocumentKey::new(DocumentKind::AreaInfo, id),
                    &json!({ "name": name, "description": format!("{name} desc") }),
                )
                .await
                .expect("write area");
        }

        let built = rebuild_index(store.as_ref()).await.expect("rebuild").data;
        let cache = IndexCache::new(store.clone());
        cache.save(&built).await.expect("save");

        let loaded = cache.load().await.expect("cache hit");
        assert_eq!(loaded.format, SnapshotFormat::Current);
        assert!(loaded.data.same_entries(&built));
        assert!(dir
            .path()
            .join("area-index-cache")
            .join("areaIndex.json")
            .is_file());
    }

    #[tokio::test]
    async fn legacy_title_map_is_normalized() {
        let cache = cache_with(json!({ "abc123": { "title": "Foo" } })).await;
        let loaded = cache.load().await.expect("cache hit");
        assert_eq!(loaded.format, SnapshotFormat::TitleMap);
        assert_eq!(
            loaded.data.entries(),
            &[AreaIndexEntry {
                id: "abc123".to_string(),
                name: "Foo".to_string(),
                description: String::new(),
                player_count: 0,
            }]
        );
    }

    #[tokio::test]
    async fn legacy_title_map_skips_untitled_areas() {
        let cache = cache_with(json!({
            "a1": { "areaId": "a1", "title": "Plaza", "description": "busy", "tags": [] },
            "a2": { "areaId": "a2", "title": null, "editors": [] },
            "a3": "not an object",
        }))
        .await;
        let loaded = cache.load().await.expect("cache hit");
        assert_eq!(loaded.data.len(), 1);
        assert_eq!(loaded.skipped, 2);
        assert_eq!(loaded.data.get("a1").expect("a1").description, "busy");
    }

    #[tokio::test]
    async fn legacy_entry_list_is_accepted() {
        let cache = cache_with(json!([
            { "name": "central cinema", "description": "watch movies", "id": "57b1", "playerCount": 0 },
            { "name": "no id here" },
            { "id": "x", "name": "" },
            42,
            { "id": "b2", "name": "Beach" },
        ]))
        .await;
        let loaded = cache.load().await.expect("cache hit");
        assert_eq!(loaded.format, SnapshotFormat::EntryList);
        assert_eq!(loaded.data.len(), 2);
        assert_eq!(loaded.skipped, 3);
        assert_eq!(loaded.data.id_for_name_key("centralcinema"), Some("57b1"));
        assert_eq!(loaded.data.get("b2").expect("b2").description, "");
    }

    #[tokio::test]
    async fn unrecognized_or_empty_snapshots_are_misses() {
        for raw in [
            json!("just a string"),
            json!(12),
            json!([]),
            json!({}),
            json!({ "version": 1, "savedAt": 0, "entries": [{ "id": "a", "name": "x" }] }),
        ] {
            let cache = cache_with(raw.clone()).await;
            assert!(cache.load().await.is_none(), "{raw} should not load");
        }
    }

    #[tokio::test]
    async fn unreadable_cache_file_is_a_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(FileDocumentStore::new(dir.path().to_path_buf()));
        let ns = store
            .ensure_namespace(DocumentKind::AreaIndexCache, None)
            .await
            .expect("namespace");
        std::fs::write(ns.join("areaIndex.json"), b"[{\"id\": \"a\"").expect("write");
        let cache = IndexCache::new(store);
        assert!(cache.load().await.is_none());
    }

    #[tokio::test]
    async fn missing_cache_is_a_miss() {
        let cache = IndexCache::new(Arc::new(MemoryDocumentStore::new()));
        assert!(cache.load().await.is_none());
    }

    #[tokio::test]
    async fn save_rewrites_legacy_in_current_format() {
        let store = Arc::new(MemoryDocumentStore::new());
        store
            .write(&cache_key(), &json!({ "abc123": { "title": "Foo" } }))
            .await
            .expect("seed");
        let cache = IndexCache::new(store.clone());
        let loaded = cache.load().await.expect("cache hit");
        cache.save(&loaded.data).await.expect("save");

        let raw = store.read(&cache_key()).await.expect("read");
        assert_eq!(raw["version"], INDEX_CACHE_VERSION);
        assert_eq!(
            raw["entries"],
            json!([{ "id": "abc123", "name": "Foo", "description": "", "playerCount": 0 }])
        );
    }
}
