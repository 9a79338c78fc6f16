//! Area creation: write the `area-info` document, then index it.

use docstore::{write_document, DocumentKey, DocumentKind, DocumentStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entry::{entry_from_area_document, AreaIndexEntry};
use crate::error::{IndexError, IndexResult};
use crate::manager::AreaIndex;

const AREA_ID_LEN: usize = 24;

/// Input for a new or updated area.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaDraft {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize)]
struct AreaInfoDocument<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

/// A fresh 24 character lowercase hex id.
pub fn generate_area_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(AREA_ID_LEN);
    id
}

/// Saves the area document and adds it to the live index.
///
/// The document is committed before the index sees it, so a crash in between
/// is repaired by the next rebuild. Returns the area id.
pub async fn create_area(
    store: &dyn DocumentStore,
    index: &AreaIndex,
    draft: AreaDraft,
) -> IndexResult<String> {
    let id = match draft.id.filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => generate_area_id(),
    };
    if draft.name.is_empty() {
        return Err(IndexError::InvalidArea {
            id,
            reason: "missing name field".to_string(),
        });
    }

    let key = DocumentKey::new(DocumentKind::AreaInfo, id.as_str());
    key.validate()?;
    let document = AreaInfoDocument {
        name: &draft.name,
        description: draft.description.as_deref(),
    };
    write_document(store, &key, &document).await?;

    let entry = AreaIndexEntry::new(
        id.as_str(),
        draft.name,
        draft.description.unwrap_or_default(),
    );
    index.incremental_insert(entry).await?;
    tracing::info!("created area {id}");
    Ok(id)
}

/// Indexes an area document that was written by some other path.
pub async fn index_area_document(index: &AreaIndex, id: &str, document: &Value) -> IndexResult<()> {
    let entry = entry_from_area_document(id, document)?;
    index.incremental_insert(entry).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use docstore::{read_document, FileDocumentStore};
    use serde_json::json;

    #[test]
    fn generated_ids_are_24_hex() {
        let id = generate_area_id();
        assert_eq!(id.len(), 24);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(id, generate_area_id());
    }

    #[tokio::test]
    async fn created_area_is_stored_and_indexed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(FileDocumentStore::new(dir.path().to_path_buf()));
        let index = AreaIndex::open(store.clone()).await.expect("open");

        let id = create_area(
            store.as_ref(),
            &index,
            AreaDraft {
                id: None,
                name: "Blue Castle".to_string(),
                description: Some("moat".to_string()),
            },
        )
        .await
        .expect("create");

        assert_eq!(index.find_by_normalized_name("bluecastle"), Some(id.clone()));
        let stored: Value = read_document(
            store.as_ref(),
            &DocumentKey::new(DocumentKind::AreaInfo, id.as_str()),
        )
        .await
        .expect("read");
        assert_eq!(stored, json!({ "name": "Blue Castle", "description": "moat" }));

        // The rebuilt index agrees with the incrementally updated one.
        let incremental = index.snapshot();
        index.rebuild().await.expect("rebuild");
        assert!(incremental.same_entries(&index.snapshot()));
    }

    #[tokio::test]
    async fn saving_an_existing_id_replaces_the_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(FileDocumentStore::new(dir.path().to_path_buf()));
        let index = AreaIndex::open(store.clone()).await.expect("open");

        let draft = |name: &str| AreaDraft {
            id: Some("abc".to_string()),
            name: name.to_string(),
            description: None,
        };
        create_area(store.as_ref(), &index, draft("Forest")).await.expect("first");
        create_area(store.as_ref(), &index, draft("Dark Forest")).await.expect("second");

        assert_eq!(index.len(), 1);
        assert_eq!(index.find_by_id("abc").expect("entry").name, "Dark Forest");
        assert!(index.find_by_normalized_name("forest").is_none());
    }

    #[tokio::test]
    async fn nameless_drafts_and_bad_ids_are_rejected() {
        let store = Arc::new(docstore::MemoryDocumentStore::new());
        let index = AreaIndex::open(store.clone()).await.expect("open");

        let nameless = AreaDraft::default();
        assert!(matches!(
            create_area(store.as_ref(), &index, nameless).await,
            Err(IndexError::InvalidArea { .. })
        ));

        let traversal = AreaDraft {
            id: Some("../escape".to_string()),
            name: "x".to_string(),
            description: None,
        };
        assert!(create_area(store.as_ref(), &index, traversal).await.is_err());
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn hidden_ids_are_rejected_before_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(FileDocumentStore::new(dir.path().to_path_buf()));
        let index = AreaIndex::open(store.clone()).await.expect("open");

        let hidden = AreaDraft {
            id: Some(".plaza".to_string()),
            name: "Plaza".to_string(),
            description: None,
        };
        assert!(matches!(
            create_area(store.as_ref(), &index, hidden).await,
            Err(IndexError::Store(docstore::StoreError::InvalidKey(_)))
        ));
        assert!(!dir.path().join("area-info").join(".plaza.json").exists());

        let incremental = index.snapshot();
        index.rebuild().await.expect("rebuild");
        assert!(incremental.same_entries(&index.snapshot()));
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn foreign_documents_can_be_indexed() {
        let store = Arc::new(docstore::MemoryDocumentStore::new());
        let index = AreaIndex::open(store).await.expect("open");
        index_area_document(&index, "x1", &json!({ "name": "Plaza" }))
            .await
            .expect("index");
        assert!(index_area_document(&index, "x2", &json!({ "title": "Plaza" }))
            .await
            .is_err());
        assert_eq!(index.len(), 1);
    }
}
