//! Watches the diary file for changes made outside this store (another process, an editor).
//!
//! The watcher only reports; reloading or not is up to the caller. Compare the reported
//! checksum with [crate::DiaryStore::checksum] to tell our own saves from foreign ones.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use notify_debouncer_mini::notify::{self, RecommendedWatcher, Watcher};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};

use crate::store::{checksum_file, StoreError};

/// Keeps the watch alive. Dropping it stops watching.
pub struct DiaryWatcher {
    path: PathBuf,
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl DiaryWatcher {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Calls `on_change` with the file's new CRC-32 whenever the diary at `path` changes (debounced).
///
/// The parent directory is watched rather than the file, since saves replace the
/// file by renaming a temp file over it.
pub fn watch_diary(
    path: &Path,
    on_change: impl Fn(Result<u32, StoreError>) + Send + 'static,
) -> Result<DiaryWatcher, WatchError> {
    if !path.is_file() {
        return Err(WatchError::NotAFile(path.to_path_buf()));
    }
    let path = path.canonicalize().map_err(WatchError::Canonicalize)?;
    let dir = path
        .parent()
        .ok_or_else(|| WatchError::NotAFile(path.clone()))?
        .to_path_buf();
    let target = path.clone();

    let debounce = Duration::from_millis(400);
    let mut debouncer = new_debouncer(debounce, move |res: DebounceEventResult| match res {
        Ok(events) => {
            if events.iter().any(|e| e.path == target) {
                on_change(checksum_file(&target));
            }
        }
        Err(e) => warn!("diary watcher error: {}", e),
    })
    .map_err(|e| WatchError::Notify(e.to_string()))?;

    debouncer
        .watcher()
        .watch(&dir, notify::RecursiveMode::NonRecursive)
        .map_err(|e| WatchError::Watch(e.to_string()))?;

    Ok(DiaryWatcher {
        path,
        _debouncer: debouncer,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("not a file: {0}")]
    NotAFile(PathBuf),
    #[error("failed to resolve path: {0}")]
    Canonicalize(std::io::Error),
    #[error("watcher init: {0}")]
    Notify(String),
    #[error("watch failed: {0}")]
    Watch(String),
}
