//! Document storage primitives.
//!
//! A document is one JSON value addressed by `(kind, parent?, id)`. The store
//! treats documents as opaque; interpreting their shape is up to callers.

pub mod file;
pub mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::TryStreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::kind::DocumentKind;

/// Lazy sequence of document ids in listing order. No sort order is defined.
pub type KeyStream = BoxStream<'static, StoreResult<String>>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fails with `NotFound` when absent and `Corrupt` when the bytes do not parse.
    async fn read(&self, key: &DocumentKey) -> StoreResult<Value>;
    /// Replaces the document following the kind's [`crate::WritePolicy`].
    async fn write(&self, key: &DocumentKey, document: &Value) -> StoreResult<()>;
    async fn exists(&self, key: &DocumentKey) -> StoreResult<bool>;
    async fn remove(&self, key: &DocumentKey) -> StoreResult<()>;
    /// Ids stored under `kind` (and `parent` for scoped kinds).
    async fn list_keys(&self, kind: DocumentKind, parent: Option<&str>) -> StoreResult<KeyStream>;
}

pub type SharedDocumentStore = Arc<dyn DocumentStore>;

/// Address of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub kind: DocumentKind,
    pub parent: Option<String>,
    pub id: String,
}

impl DocumentKey {
    pub fn new(kind: DocumentKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            parent: None,
            id: id.into(),
        }
    }

    /// Key for a kind that lives under a parent id, e.g. a placement in an area.
    pub fn scoped(kind: DocumentKind, parent: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind,
            parent: Some(parent.into()),
            id: id.into(),
        }
    }

    /// Checks every path segment and that the parent matches the kind's scoping.
    pub fn validate(&self) -> StoreResult<()> {
        validate_scope(self.kind, self.parent.as_deref())?;
        if let Some(parent) = &self.parent {
            validate_key(parent)?;
        }
        validate_key(&self.id)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(f, "{}/{}/{}", self.kind, parent, self.id),
            None => write!(f, "{}/{}", self.kind, self.id),
        }
    }
}

pub(crate) fn validate_scope(kind: DocumentKind, parent: Option<&str>) -> StoreResult<()> {
    match (kind.is_scoped(), parent) {
        (true, None) => Err(StoreError::InvalidKey(format!(
            "{kind} documents require a parent id"
        ))),
        (false, Some(parent)) => Err(StoreError::InvalidKey(format!(
            "{kind} documents are not scoped, got parent {parent}"
        ))),
        _ => Ok(()),
    }
}

/// Keys become file names. A leading `.` is reserved for temp files, which
/// listings skip, so such a key could be written but never enumerated.
pub(crate) fn validate_key(key: &str) -> StoreResult<()> {
    if key.is_empty() || key.starts_with('.') {
        return Err(StoreError::InvalidKey(format!("invalid storage key {key:?}")));
    }
    if key.contains('/') || key.contains('\\') || key.contains('\0') {
        return Err(StoreError::InvalidKey(format!("invalid storage key {key:?}")));
    }
    Ok(())
}

/// Reads a document and decodes it into `T`. A shape mismatch is `Corrupt`.
pub async fn read_document<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    key: &DocumentKey,
) -> StoreResult<T> {
    let value = store.read(key).await?;
    serde_json::from_value(value).map_err(|error| StoreError::corrupt(key, error))
}

pub async fn write_document<T: Serialize + ?Sized>(
    store: &dyn DocumentStore,
    key: &DocumentKey,
    document: &T,
) -> StoreResult<()> {
    let value = serde_json::to_value(document)
        .map_err(|error| StoreError::Serialization(format!("{key}: {error}")))?;
    store.write(key, &value).await
}

/// Drains a key stream. Only for callers that need the whole listing at once.
pub async fn collect_keys(keys: KeyStream) -> StoreResult<Vec<String>> {
    keys.try_collect().await
}
