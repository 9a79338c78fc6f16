//! Keyed JSON document storage.
//!
//! This crate provides the persistence primitives the rest of the server
//! builds on:
//! - Documents addressed by kind, optional parent id, and id
//! - Atomic replace (temp file + rename) per kind write policy
//! - Per-resource write serialization for read-modify-write cycles

pub mod error;
pub mod kind;
pub mod serializer;
pub mod storage;
pub mod update;

// Re-export main types
pub use error::{StoreError, StoreResult};
pub use kind::{DocumentKind, WritePolicy};
pub use serializer::WriteSerializer;
pub use storage::file::FileDocumentStore;
pub use storage::memory::MemoryDocumentStore;
pub use storage::{
    collect_keys, read_document, write_document, DocumentKey, DocumentStore, KeyStream,
    SharedDocumentStore,
};
pub use update::{resource_key_for_account, update_account, update_document};
