//! Live rebuild and preview server for ssg.
//!
//! Watches source directories by polling their metadata, rebuilds the site on
//! change and serves the generated files over HTTP.

pub mod livereload;
pub mod server;
pub mod watcher;

pub use livereload::LiveRebuildLoop;
pub use server::{PreviewServer, PreviewServerConfig, ServerError, NOT_FOUND_PAGE};
pub use watcher::{ChangeWatcher, WatchError};
