//! Live rebuild command.

use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use ssg_server::{LiveRebuildLoop, PreviewServer, PreviewServerConfig, WatchError};
use ssg_static::Cancellation;

use crate::config::Settings;

/// Options of the livereload command.
#[derive(Debug, Clone)]
pub struct Options {
    pub check_interval: Duration,
    pub host: String,
    pub port: u16,
    pub open: bool,
}

/// Serve the output directory and rebuild the site whenever its sources
/// change, until interrupted.
pub async fn run(settings: Settings, options: Options) -> Result<()> {
    fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!("Failed to create output dir {}", settings.output_dir.display())
    })?;

    let cancel = Cancellation::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, shutting down");
            }
            cancel.cancel();
        }
    });

    let server = PreviewServer::new(PreviewServerConfig {
        root: settings.output_dir.clone(),
        port: options.port,
        host: options.host,
        open: options.open,
    });
    let mut server = tokio::spawn({
        let cancel = cancel.clone();
        server.start(async move { cancel.cancelled().await })
    });

    let mut live = LiveRebuildLoop::new(options.check_interval).watch(&settings.content_dir);
    if let Some(static_dir) = &settings.static_dir {
        live = live.watch(static_dir);
    }
    if let Some(templates_dir) = &settings.templates_dir {
        live = live.watch(templates_dir);
    }

    let build_cancel = cancel.clone();
    let watching = live.run(&cancel, move || {
        // Fresh builder, so every rebuild starts from a clean state.
        settings.builder().run(&build_cancel).map(|_| ())
    });
    tokio::pin!(watching);

    tokio::select! {
        watched = &mut watching => {
            cancel.cancel();
            server
                .await
                .context("Server task failed")?
                .context("Preview server failed")?;
            match watched {
                Ok(()) | Err(WatchError::Cancelled) => Ok(()),
                Err(err) => Err(err).context("Watching for changes failed"),
            }
        }
        served = &mut server => {
            cancel.cancel();
            served
                .context("Server task failed")?
                .context("Preview server failed")?;
            Ok(())
        }
    }
}
