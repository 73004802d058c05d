//! Preview server command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use ssg_server::{PreviewServer, PreviewServerConfig};

/// Run the serve command.
pub async fn run(dir: PathBuf, host: String, port: u16) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!(
            "Directory not found: {}. Run 'ssg build' first.",
            dir.display()
        );
    }

    let config = PreviewServerConfig {
        root: dir,
        port,
        host,
        open: false,
    };

    PreviewServer::new(config)
        .start(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("Preview server failed")?;

    Ok(())
}
