use std::path::PathBuf;

use crate::storage::DocumentKey;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("document not found: {0}")]
    NotFound(DocumentKey),

    #[error("corrupt document {key}: {reason}")]
    Corrupt { key: DocumentKey, reason: String },

    #[error("storage IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(key: &DocumentKey, reason: impl ToString) -> Self {
        Self::Corrupt {
            key: key.clone(),
            reason: reason.to_string(),
        }
    }

    /// Returns true for a missing document, the one error callers routinely
    /// recover from by substituting a default.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
