use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio_stream::wrappers::ReadDirStream;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::kind::{DocumentKind, WritePolicy};
use crate::storage::{validate_key, validate_scope, DocumentKey, DocumentStore, KeyStream};

const DOCUMENT_SUFFIX: &str = ".json";
const TEMP_SUFFIX: &str = ".tmp";

/// Documents as pretty-printed JSON files under `<root>/<namespace>[/<parent>]/<id>.json`.
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    root: PathBuf,
}

impl FileDocumentStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the documents of `kind` (under `parent` when scoped).
    pub fn namespace_dir(&self, kind: DocumentKind, parent: Option<&str>) -> StoreResult<PathBuf> {
        validate_scope(kind, parent)?;
        let mut path = self.root.join(kind.namespace());
        if let Some(parent) = parent {
            validate_key(parent)?;
            path.push(parent);
        }
        Ok(path)
    }

    pub fn document_path(&self, key: &DocumentKey) -> StoreResult<PathBuf> {
        validate_key(&key.id)?;
        let mut path = self.namespace_dir(key.kind, key.parent.as_deref())?;
        path.push(format!("{}{DOCUMENT_SUFFIX}", key.id));
        Ok(path)
    }

    /// Creates the namespace directory if needed. Idempotent.
    pub async fn ensure_namespace(
        &self,
        kind: DocumentKind,
        parent: Option<&str>,
    ) -> StoreResult<PathBuf> {
        let dir = self.namespace_dir(kind, parent)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|error| StoreError::io(&dir, error))?;
        Ok(dir)
    }

    /// Removes temp files left behind by writes that never reached the rename,
    /// e.g. after a crash. Returns how many were removed.
    pub async fn sweep_temp_files(
        &self,
        kind: DocumentKind,
        parent: Option<&str>,
    ) -> StoreResult<usize> {
        let dir = self.namespace_dir(kind, parent)?;
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(error) => return Err(StoreError::io(&dir, error)),
        };
        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|error| StoreError::io(&dir, error))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if is_temp_file(name) {
                let path = entry.path();
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(error) => {
                        tracing::warn!("failed to remove temp file {}: {error}", path.display())
                    }
                }
            }
        }
        if removed > 0 {
            tracing::info!("removed {removed} stale temp files from {}", dir.display());
        }
        Ok(removed)
    }

    async fn ensure_parent_dir(path: &Path) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| StoreError::io(parent, error))?;
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn read(&self, key: &DocumentKey) -> StoreResult<Value> {
        let path = self.document_path(key)?;
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(key.clone()))
            }
            Err(error) => return Err(StoreError::io(&path, error)),
        };
        serde_json::from_slice(&bytes).map_err(|error| StoreError::corrupt(key, error))
    }

    async fn write(&self, key: &DocumentKey, document: &Value) -> StoreResult<()> {
        let path = self.document_path(key)?;
        Self::ensure_parent_dir(&path).await?;
        let serialized = serde_json::to_vec_pretty(document)
            .map_err(|error| StoreError::Serialization(format!("{key}: {error}")))?;
        match key.kind.write_policy() {
            WritePolicy::Atomic => write_atomic(&path, &serialized).await,
            WritePolicy::Direct => tokio::fs::write(&path, serialized)
                .await
                .map_err(|error| StoreError::io(&path, error)),
        }
    }

    async fn exists(&self, key: &DocumentKey) -> StoreResult<bool> {
        let path = self.document_path(key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|error| StoreError::io(&path, error))
    }

    async fn remove(&self, key: &DocumentKey) -> StoreResult<()> {
        let path = self.document_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.clone()))
            }
            Err(error) => Err(StoreError::io(&path, error)),
        }
    }

    async fn list_keys(&self, kind: DocumentKind, parent: Option<&str>) -> StoreResult<KeyStream> {
        let dir = self.namespace_dir(kind, parent)?;
        let entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(futures_util::stream::empty().boxed())
            }
            Err(error) => return Err(StoreError::io(&dir, error)),
        };

        let stream = ReadDirStream::new(entries)
            .map_err(move |error| StoreError::io(&dir, error))
            .try_filter_map(|entry| async move {
                let name = entry.file_name();
                Ok::<_, StoreError>(name.to_str().and_then(document_id).map(str::to_string))
            });
        Ok(stream.boxed())
    }
}

/// Writes `bytes` next to `path` under a unique temp name, flushes, then renames
/// over `path`. On failure the temp file is removed and `path` is untouched.
async fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let tmp_path = temp_path_for(path);
    let result = async {
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|error| StoreError::io(&tmp_path, error))?;
        file.write_all(bytes)
            .await
            .map_err(|error| StoreError::io(&tmp_path, error))?;
        file.sync_all()
            .await
            .map_err(|error| StoreError::io(&tmp_path, error))?;
        drop(file);
        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|error| StoreError::io(path, error))
    }
    .await;

    if result.is_err() {
        let _ = tokio::fs::remove_file(&tmp_path).await;
    }
    result
}

/// `.<file name>.<unique>.tmp` in the same directory, so the rename never
/// crosses a filesystem boundary and concurrent writers never share a temp file.
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(
        ".{file_name}.{}{TEMP_SUFFIX}",
        Uuid::new_v4().simple()
    ))
}

fn is_temp_file(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
}

/// Maps a directory entry name to a document id, skipping temp and foreign files.
fn document_id(name: &str) -> Option<&str> {
    if name.starts_with('.') {
        return None;
    }
    name.strip_suffix(DOCUMENT_SUFFIX).filter(|id| !id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::collect_keys;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_and_reads_json() {
        let dir = tempdir().expect("tempdir");
        let store = FileDocumentStore::new(dir.path().to_path_buf());
        let key = DocumentKey::new(DocumentKind::Account, "abc");
        let value = serde_json::json!({ "hello": "world" });
        store.write(&key, &value).await.expect("write");
        let loaded = store.read(&key).await.expect("read");
        assert_eq!(value, loaded);
        assert!(dir.path().join("account").join("abc.json").is_file());
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let dir = tempdir().expect("tempdir");
        let store = FileDocumentStore::new(dir.path().to_path_buf());
        let key = DocumentKey::new(DocumentKind::AreaInfo, "missing");
        let err = store.read(&key).await.expect_err("missing");
        assert!(err.is_not_found());
        assert!(!store.exists(&key).await.expect("exists"));
    }

    #[tokio::test]
    async fn unparsable_document_is_corrupt() {
        let dir = tempdir().expect("tempdir");
        let store = FileDocumentStore::new(dir.path().to_path_buf());
        let ns = store
            .ensure_namespace(DocumentKind::AreaInfo, None)
            .await
            .expect("namespace");
        std::fs::write(ns.join("broken.json"), b"{ not json").expect("write");
        let key = DocumentKey::new(DocumentKind::AreaInfo, "broken");
        match store.read(&key).await {
            Err(StoreError::Corrupt { key: reported, .. }) => assert_eq!(reported, key),
            other => panic!("expected corrupt, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_key_rejected() {
        let dir = tempdir().expect("tempdir");
        let store = FileDocumentStore::new(dir.path().to_path_buf());
        let value = serde_json::json!({ "ok": true });
        let err = store
            .write(&DocumentKey::new(DocumentKind::Account, ".."), &value)
            .await
            .expect_err("invalid key");
        match err {
            StoreError::InvalidKey(_) => {}
            _ => panic!("expected invalid key"),
        }
    }

    #[tokio::test]
    async fn interrupted_write_leaves_committed_document() {
        let dir = tempdir().expect("tempdir");
        let store = FileDocumentStore::new(dir.path().to_path_buf());
        let key = DocumentKey::new(DocumentKind::Account, "acct");
        let committed = serde_json::json!({ "coins": 10 });
        store.write(&key, &committed).await.expect("write");

        // What a crash between temp write and rename leaves behind.
        let path = store.document_path(&key).expect("path");
        std::fs::write(temp_path_for(&path), b"{ \"coins\": 9").expect("partial temp");

        assert_eq!(store.read(&key).await.expect("read"), committed);
        let ids = collect_keys(
            store
                .list_keys(DocumentKind::Account, None)
                .await
                .expect("list"),
        )
        .await
        .expect("collect");
        assert_eq!(ids, vec!["acct".to_string()]);

        let removed = store
            .sweep_temp_files(DocumentKind::Account, None)
            .await
            .expect("sweep");
        assert_eq!(removed, 1);
        assert_eq!(store.read(&key).await.expect("read"), committed);
    }

    #[tokio::test]
    async fn atomic_write_leaves_no_temp_files() {
        let dir = tempdir().expect("tempdir");
        let store = FileDocumentStore::new(dir.path().to_path_buf());
        let key = DocumentKey::new(DocumentKind::AreaInfo, "a1");
        for n in 0..3 {
            store
                .write(&key, &serde_json::json!({ "name": format!("v{n}") }))
                .await
                .expect("write");
        }
        let names: Vec<_> = std::fs::read_dir(dir.path().join("area-info"))
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("a1.json")]);
    }

    #[tokio::test]
    async fn direct_policy_kind_overwrites_in_place() {
        let dir = tempdir().expect("tempdir");
        let store = FileDocumentStore::new(dir.path().to_path_buf());
        let key = DocumentKey::new(DocumentKind::AreaList, "arealist");
        store
            .write(&key, &serde_json::json!({ "visited": ["a"] }))
            .await
            .expect("first write");
        store
            .write(&key, &serde_json::json!({ "visited": ["a", "b"] }))
            .await
            .expect("second write");
        assert_eq!(
            store.read(&key).await.expect("read"),
            serde_json::json!({ "visited": ["a", "b"] })
        );
    }

    #[tokio::test]
    async fn missing_namespace_lists_empty() {
        let dir = tempdir().expect("tempdir");
        let store = FileDocumentStore::new(dir.path().to_path_buf());
        let ids = collect_keys(
            store
                .list_keys(DocumentKind::ThingDef, None)
                .await
                .expect("list"),
        )
        .await
        .expect("collect");
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn scoped_documents_live_under_parent() {
        let dir = tempdir().expect("tempdir");
        let store = FileDocumentStore::new(dir.path().to_path_buf());
        let key = DocumentKey::scoped(DocumentKind::Placement, "area1", "p1");
        store
            .write(&key, &serde_json::json!({ "Id": "p1" }))
            .await
            .expect("write");
        assert!(dir
            .path()
            .join("placement")
            .join("area1")
            .join("p1.json")
            .is_file());

        let mut ids = collect_keys(
            store
                .list_keys(DocumentKind::Placement, Some("area1"))
                .await
                .expect("list"),
        )
        .await
        .expect("collect");
        ids.sort();
        assert_eq!(ids, vec!["p1".to_string()]);
        assert!(store.list_keys(DocumentKind::Placement, None).await.is_err());
    }

    #[tokio::test]
    async fn remove_deletes_and_reports_missing() {
        let dir = tempdir().expect("tempdir");
        let store = FileDocumentStore::new(dir.path().to_path_buf());
        let key = DocumentKey::new(DocumentKind::ThingInfo, "t1");
        store
            .write(&key, &serde_json::json!({}))
            .await
            .expect("write");
        store.remove(&key).await.expect("remove");
        assert!(store.remove(&key).await.expect_err("gone").is_not_found());
    }

    #[test]
    fn document_ids_skip_foreign_files() {
        assert_eq!(document_id("abc.json"), Some("abc"));
        assert_eq!(document_id(".abc.json.123.tmp"), None);
        assert_eq!(document_id("notes.txt"), None);
        assert_eq!(document_id(".json"), None);
    }
}
