//! Static site build command.

use std::fs;

use anyhow::{Context, Result};
use ssg_static::Cancellation;

use crate::config::Settings;

/// Run the build command.
pub async fn run(settings: Settings) -> Result<()> {
    tracing::info!(
        content = %settings.content_dir.display(),
        output = %settings.output_dir.display(),
        "Building static site..."
    );

    fs::create_dir_all(&settings.output_dir).with_context(|| {
        format!("Failed to create output dir {}", settings.output_dir.display())
    })?;

    let builder = settings.builder();
    let report = tokio::task::spawn_blocking(move || builder.run(&Cancellation::new()))
        .await
        .context("Build task failed")?
        .context("Generator failed")?;

    tracing::info!(
        "Built {} pages, {} section lists and {} feeds, copied {} files in {}ms",
        report.pages,
        report.sections,
        report.feeds,
        report.copied,
        report.elapsed.as_millis()
    );
    tracing::info!("Output: {}", settings.output_dir.display());

    Ok(())
}
