use docstore::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid area {id}: {reason}")]
    InvalidArea { id: String, reason: String },

    #[error("watcher error: {0}")]
    Watcher(String),
}

pub type IndexResult<T> = std::result::Result<T, IndexError>;
