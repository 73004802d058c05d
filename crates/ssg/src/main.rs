//! ssg CLI - a static site generator for markdown sites.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

use config::{ConfigFile, Overrides, Settings};

#[derive(Parser)]
#[command(name = "ssg")]
#[command(about = "An opinionated static site generator. Flags override config file settings.")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to site.toml config file
    #[arg(short, long, global = true, default_value = "site.toml")]
    config: PathBuf,

    /// Folder containing markdown pages and related files of any type
    #[arg(long, global = true)]
    content: Option<PathBuf>,

    /// Folder containing static files (js, css, ...)
    #[arg(long = "static", global = true)]
    static_dir: Option<PathBuf>,

    /// Output folder
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site (default)
    Build,

    /// Serve the site and rebuild it on every change
    Livereload {
        /// Milliseconds to wait between checks for changed files
        #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1..))]
        check_interval_ms: u64,

        /// Host to listen on
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "7777")]
        port: u16,

        /// Open browser on start
        #[arg(long)]
        open: bool,
    },

    /// Serve the built site
    Serve {
        /// Host to listen on
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "7777")]
        port: u16,
    },

    /// Create a config file and starter content
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            content: self.content.clone(),
            static_dir: self.static_dir.clone(),
            output: self.output.clone(),
        }
    }

    fn load_config(&self) -> Result<ConfigFile> {
        let mut config = ConfigFile::load(&self.config)?;
        config.apply(self.overrides());
        Ok(config)
    }

    fn settings(&self) -> Result<Settings> {
        self.load_config()?
            .validate()
            .with_context(|| format!("Bad config {}", self.config.display()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG takes precedence over --verbose
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    fmt().with_env_filter(filter).with_target(false).init();

    match &cli.command {
        None | Some(Commands::Build) => {
            commands::build::run(cli.settings()?).await?;
        }
        Some(Commands::Livereload {
            check_interval_ms,
            host,
            port,
            open,
        }) => {
            let options = commands::livereload::Options {
                check_interval: Duration::from_millis(*check_interval_ms),
                host: host.clone(),
                port: *port,
                open: *open,
            };
            commands::livereload::run(cli.settings()?, options).await?;
        }
        Some(Commands::Serve { host, port }) => {
            let dir = cli.load_config()?.output_dir()?;
            commands::serve::run(dir, host.clone(), *port).await?;
        }
        Some(Commands::Init { yes }) => {
            commands::init::run(Path::new("."), *yes).await?;
        }
    }

    Ok(())
}
