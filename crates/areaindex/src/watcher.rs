//! Rebuilds the index when area documents change on disk.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};

use crate::debounce::debounce;
use crate::error::{IndexError, IndexResult};
use crate::manager::AreaIndex;

/// Watches the `area-info` directory. Dropping the handle stops watching and
/// discards any pending window; a rebuild already running completes.
pub struct AreaIndexWatcher {
    _watcher: RecommendedWatcher,
    stop: watch::Sender<bool>,
    dir: PathBuf,
}

impl std::fmt::Debug for AreaIndexWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AreaIndexWatcher")
            .field("dir", &self.dir)
            .finish()
    }
}

impl AreaIndexWatcher {
    /// Starts watching `dir`, creating it if needed.
    pub async fn start(
        index: Arc<AreaIndex>,
        dir: PathBuf,
        window: Duration,
    ) -> IndexResult<Self> {
        tokio::fs::create_dir_all(&dir).await.map_err(|error| {
            IndexError::Watcher(format!("failed to create {}: {error}", dir.display()))
        })?;

        let (tx, rx) = mpsc::unbounded_channel::<PathBuf>();
        let mut watcher =
            recommended_watcher(move |event_result: notify::Result<Event>| match event_result {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        return;
                    }
                    for path in event.paths {
                        if is_area_document(&path) {
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(error) => tracing::warn!("area watcher error: {error}"),
            })
            .map_err(|error| {
                IndexError::Watcher(format!(
                    "failed to create watcher for {}: {error}",
                    dir.display()
                ))
            })?;

        watcher
            .watch(&dir, RecursiveMode::Recursive)
            .map_err(|error| {
                IndexError::Watcher(format!("failed to watch {}: {error}", dir.display()))
            })?;

        let (stop, stop_rx) = watch::channel(false);
        tokio::spawn(debounce(rx, window, stop_rx, move || {
            let index = index.clone();
            async move {
                tracing::debug!("area documents changed, rebuilding index");
                if let Err(error) = index.rebuild().await {
                    tracing::warn!("area index rebuild after change failed: {error}");
                }
            }
        }));

        tracing::info!(
            "watching {} for area changes (debounce {}ms)",
            dir.display(),
            window.as_millis()
        );
        Ok(Self {
            _watcher: watcher,
            stop,
            dir,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for AreaIndexWatcher {
    fn drop(&mut self) {
        let _ = self.stop.send(true);
    }
}

/// Committed `*.json` documents only. Temp files from atomic writes are
/// hidden, so they are skipped here too.
fn is_area_document(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    !name.starts_with('.') && name.ends_with(".json")
}
