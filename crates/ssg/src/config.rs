//! Site configuration (site.toml).

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use ssg_content::Slugifier;
use ssg_static::{default_workers, BuildConfig, FileStorage, MarkdownRenderer, Site, StaticBuilder};

/// Configuration file structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub markdown: MarkdownSection,
    #[serde(default)]
    pub build: BuildSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SiteSection {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PathsSection {
    pub content: Option<PathBuf>,
    pub output: Option<PathBuf>,
    #[serde(rename = "static")]
    pub static_dir: Option<PathBuf>,
    pub templates: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MarkdownSection {
    #[serde(default)]
    pub unsafe_html: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BuildSection {
    pub workers: Option<usize>,
}

/// Path flags that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub content: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl ConfigFile {
    /// Load and parse the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(content) = overrides.content {
            self.paths.content = Some(content);
        }
        if let Some(static_dir) = overrides.static_dir {
            self.paths.static_dir = Some(static_dir);
        }
        if let Some(output) = overrides.output {
            self.paths.output = Some(output);
        }
    }

    /// The configured output directory.
    pub fn output_dir(&self) -> Result<PathBuf> {
        match &self.paths.output {
            Some(output) if !is_blank(output) => Ok(output.clone()),
            _ => bail!("output dir is unset"),
        }
    }

    /// Check the configuration and resolve defaults.
    pub fn validate(self) -> Result<Settings> {
        if self.site.author.trim().is_empty() {
            bail!("author is unset");
        }

        let content_dir = match &self.paths.content {
            Some(content) if !is_blank(content) => content.clone(),
            _ => bail!("content dir is unset"),
        };
        if !content_dir.is_dir() {
            bail!("bad content dir {:?}: not a directory", content_dir);
        }

        let output_dir = self.output_dir()?;

        let workers = match self.build.workers {
            Some(0) => bail!("workers must be at least 1"),
            Some(workers) => workers,
            None => default_workers(),
        };

        Ok(Settings {
            site: Site::new(self.site.author, self.site.title, &self.site.base_url),
            content_dir,
            output_dir,
            static_dir: self.paths.static_dir.filter(|dir| !is_blank(dir)),
            templates_dir: self.paths.templates.filter(|dir| !is_blank(dir)),
            unsafe_html: self.markdown.unsafe_html,
            workers,
        })
    }
}

fn is_blank(path: &Path) -> bool {
    path.to_string_lossy().trim().is_empty()
}

/// Validated settings of a site.
#[derive(Debug, Clone)]
pub struct Settings {
    pub site: Site,
    pub content_dir: PathBuf,
    pub output_dir: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub templates_dir: Option<PathBuf>,
    pub unsafe_html: bool,
    pub workers: usize,
}

impl Settings {
    /// A builder writing the site to the output directory.
    pub fn builder(&self) -> StaticBuilder {
        let slugifier = Slugifier::default();
        let renderer = MarkdownRenderer::new(
            self.site.clone(),
            self.templates_dir.as_deref(),
            slugifier.clone(),
        )
        .with_unsafe_html(self.unsafe_html);

        let config = BuildConfig {
            content_dir: self.content_dir.clone(),
            static_dir: self.static_dir.clone(),
            site: self.site.clone(),
            workers: self.workers,
        };

        StaticBuilder::new(
            config,
            Arc::new(renderer),
            Arc::new(FileStorage::new(&self.output_dir)),
        )
        .with_slugifier(slugifier)
    }
}
