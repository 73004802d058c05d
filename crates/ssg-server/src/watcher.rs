//! Polling change detection for live rebuilds.
//!
//! A [`ChangeWatcher`] snapshots the metadata of every file below its root
//! and compares it against the previous snapshot. File contents are never
//! read: an edit that keeps size, permissions and modification time is not
//! noticed.

use std::collections::HashMap;
use std::fs::Permissions;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use ssg_static::Cancellation;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use walkdir::WalkDir;

/// Errors that end a watch.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("walking {path:?} failed: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("reading metadata of {path:?} failed: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("change watcher crashed: {0}")]
    Crashed(String),

    #[error("change watcher stopped without a result")]
    Closed,

    #[error("watch cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FileState {
    modified: Option<SystemTime>,
    len: u64,
    permissions: Permissions,
}

/// Detects changes below a directory by comparing metadata snapshots.
#[derive(Debug)]
pub struct ChangeWatcher {
    root: PathBuf,
    snapshot: HashMap<PathBuf, FileState>,
}

impl ChangeWatcher {
    /// Create a watcher with an empty baseline, so the first poll of a
    /// non-empty directory reports a change.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            snapshot: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Take a new snapshot and report whether it differs from the last one.
    ///
    /// The new snapshot replaces the old one either way.
    pub fn poll(&mut self) -> Result<bool, WatchError> {
        let next = self.take_snapshot()?;

        let changed = next.len() != self.snapshot.len()
            || next
                .iter()
                .any(|(path, state)| self.snapshot.get(path) != Some(state));

        self.snapshot = next;
        Ok(changed)
    }

    fn take_snapshot(&self) -> Result<HashMap<PathBuf, FileState>, WatchError> {
        let mut snapshot = HashMap::new();

        for entry in WalkDir::new(&self.root) {
            let entry = entry.map_err(|source| WatchError::Walk {
                path: self.root.clone(),
                source,
            })?;
            if entry.file_type().is_dir() {
                continue;
            }

            let metadata = entry.metadata().map_err(|source| WatchError::Metadata {
                path: entry.path().to_path_buf(),
                source: source.into(),
            })?;
            snapshot.insert(
                entry.into_path(),
                FileState {
                    modified: metadata.modified().ok(),
                    len: metadata.len(),
                    permissions: metadata.permissions(),
                },
            );
        }

        Ok(snapshot)
    }

    /// Poll every `interval` until `cancel` fires.
    ///
    /// Every tick yields one result. The watch ends after the first error;
    /// cancellation yields a final [`WatchError::Cancelled`] and a panicking
    /// poll a final [`WatchError::Crashed`].
    pub fn watch(
        mut self,
        cancel: Cancellation,
        interval: Duration,
    ) -> mpsc::Receiver<Result<bool, WatchError>> {
        let (tx, rx) = mpsc::channel(1);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        let _ = tx.send(Err(WatchError::Cancelled)).await;
                        return;
                    }
                    _ = ticker.tick() => {}
                }

                let polled = tokio::task::spawn_blocking(move || {
                    let changed = self.poll();
                    (self, changed)
                })
                .await;
                let (watcher, changed) = match polled {
                    Ok(polled) => polled,
                    Err(err) => {
                        tracing::error!(error = %err, "Change watcher panicked");
                        let _ = tx.send(Err(WatchError::Crashed(err.to_string()))).await;
                        return;
                    }
                };
                self = watcher;

                let failed = changed.is_err();
                if tx.send(changed).await.is_err() || failed {
                    return;
                }
            }
        });

        rx
    }
}
