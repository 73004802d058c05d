//! Rebuild loop driven by change watchers.

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ssg_static::Cancellation;
use tokio::sync::mpsc;

use crate::watcher::{ChangeWatcher, WatchError};

/// Rebuilds the site whenever one of its watched directories changes.
///
/// Each cycle waits for one poll result from every watcher, so the effective
/// check interval is that of the slowest watcher. The first cycle always
/// reports a change and triggers the initial build.
#[derive(Debug)]
pub struct LiveRebuildLoop {
    roots: Vec<PathBuf>,
    interval: Duration,
}

impl LiveRebuildLoop {
    pub fn new(interval: Duration) -> Self {
        Self {
            roots: Vec::new(),
            interval,
        }
    }

    /// Add a directory to watch.
    pub fn watch(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Run until a watcher fails or `cancel` fires.
    ///
    /// Failed rebuilds are logged and watching continues. Always returns an
    /// error; [`WatchError::Cancelled`] marks a regular shutdown.
    pub async fn run<F, E>(self, cancel: &Cancellation, rebuild: F) -> Result<(), WatchError>
    where
        F: Fn() -> Result<(), E> + Send + Sync + 'static,
        E: Display + Send + 'static,
    {
        let rebuild = Arc::new(rebuild);
        let mut watchers: Vec<_> = self
            .roots
            .into_iter()
            .map(|root| {
                tracing::info!(path = %root.display(), "Watching for changes");
                ChangeWatcher::new(root).watch(cancel.child(), self.interval)
            })
            .collect();

        loop {
            if !next_cycle(&mut watchers).await? {
                continue;
            }

            tracing::info!("Change detected, rebuilding");
            let rebuild = Arc::clone(&rebuild);
            match tokio::task::spawn_blocking(move || rebuild()).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::warn!(error = %err, "Rebuild failed"),
                Err(err) => tracing::warn!(error = %err, "Rebuild panicked"),
            }
        }
    }
}

type Results = mpsc::Receiver<Result<bool, WatchError>>;

/// Wait for one result from every watcher and report whether any changed.
///
/// A watcher that goes away without a final result yields
/// [`WatchError::Closed`], never a cancellation.
async fn next_cycle(watchers: &mut [Results]) -> Result<bool, WatchError> {
    let mut changed = false;
    for watcher in watchers {
        match watcher.recv().await {
            Some(Ok(watcher_changed)) => changed |= watcher_changed,
            Some(Err(err)) => return Err(err),
            None => return Err(WatchError::Closed),
        }
    }
    Ok(changed)
}
