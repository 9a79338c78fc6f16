//! Full index rebuild from the `area-info` namespace.

use std::time::Instant;

use docstore::{DocumentKey, DocumentKind, DocumentStore, StoreError};
use futures_util::TryStreamExt;

use crate::data::AreaIndexData;
use crate::entry::entry_from_area_document;
use crate::error::IndexResult;

const PROGRESS_LOG_INTERVAL: usize = 1000;

/// Result of a full scan.
#[derive(Debug)]
pub struct RebuildOutcome {
    pub data: AreaIndexData,
    /// Documents that failed to read or validate and were left out.
    pub skipped: usize,
}

/// Scans every area document and builds a fresh index.
///
/// A document that cannot be read or does not have the area shape is logged
/// and skipped. Only a failure to list the namespace aborts the rebuild.
pub async fn rebuild_index(store: &dyn DocumentStore) -> IndexResult<RebuildOutcome> {
    let started = Instant::now();
    let mut ids = store.list_keys(DocumentKind::AreaInfo, None).await?;
    let mut data = AreaIndexData::new();
    let mut scanned = 0usize;
    let mut skipped = 0usize;

    while let Some(id) = ids.try_next().await? {
        if scanned > 0 && scanned % PROGRESS_LOG_INTERVAL == 0 {
            tracing::info!("indexed {scanned} area documents...");
        }
        scanned += 1;

        let key = DocumentKey::new(DocumentKind::AreaInfo, id.as_str());
        let document = match store.read(&key).await {
            Ok(document) => document,
            // Deleted between listing and read.
            Err(StoreError::NotFound(_)) => continue,
            Err(error) => {
                skipped += 1;
                tracing::warn!("skipping {key}: {error}");
                continue;
            }
        };

        match entry_from_area_document(&id, &document) {
            Ok(entry) => {
                data.upsert(entry);
            }
            Err(error) => {
                skipped += 1;
                tracing::warn!("skipping {key}: {error}");
            }
        }
    }

    tracing::info!(
        "area index rebuilt entries={} scanned={} skipped={} elapsed_ms={}",
        data.len(),
        scanned,
        skipped,
        started.elapsed().as_millis()
    );
    Ok(RebuildOutcome { data, skipped })
}
