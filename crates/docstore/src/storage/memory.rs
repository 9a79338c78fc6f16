//! In-process document store.

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::StreamExt;
use parking_lot::RwLock;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::kind::DocumentKind;
use crate::storage::{validate_key, validate_scope, DocumentKey, DocumentStore, KeyStream};

/// Keeps documents in a map. Writes are trivially atomic; listing order is
/// unspecified, same as the file store.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<DocumentKey, Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn read(&self, key: &DocumentKey) -> StoreResult<Value> {
        key.validate()?;
        self.documents
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn write(&self, key: &DocumentKey, document: &Value) -> StoreResult<()> {
        key.validate()?;
        self.documents.write().insert(key.clone(), document.clone());
        Ok(())
    }

    async fn exists(&self, key: &DocumentKey) -> StoreResult<bool> {
        key.validate()?;
        Ok(self.documents.read().contains_key(key))
    }

    async fn remove(&self, key: &DocumentKey) -> StoreResult<()> {
        key.validate()?;
        self.documents
            .write()
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn list_keys(&self, kind: DocumentKind, parent: Option<&str>) -> StoreResult<KeyStream> {
        validate_scope(kind, parent)?;
        if let Some(parent) = parent {
            validate_key(parent)?;
        }
        let ids: Vec<StoreResult<String>> = self
            .documents
            .read()
            .keys()
            .filter(|key| key.kind == kind && key.parent.as_deref() == parent)
            .map(|key| Ok(key.id.clone()))
            .collect();
        Ok(futures_util::stream::iter(ids).boxed())
    }
}
