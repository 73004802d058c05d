//! Static site builder.
//!
//! A build runs in strictly sequential phases: the content tree is scanned,
//! assets and static files are copied, section list pages and feeds are
//! rendered and finally every page is rendered. Work within a phase is spread
//! over a bounded number of worker threads with [`distribute`]. The first
//! error aborts the build.

use std::fmt;
use std::fs::File;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ssg_content::{
    menu, title_case, Asset, ContentError, ContentTree, Directory, MenuEntry, Page, Slugifier,
    Tree,
};
use walkdir::WalkDir;

use crate::assets::BUILTIN_ASSETS;
use crate::distribute::{distribute, Cancellation, DistributeError};
use crate::feed::{Channel, Feed, FeedError, Item};
use crate::render::{RenderError, Renderer, FEED_FILENAME};
use crate::storage::{Storage, StorageError};
use crate::templates::Site;

/// Configuration for building a static site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Content directory with markdown pages and assets.
    pub content_dir: PathBuf,

    /// Directory of static files copied as they are. The built-in static
    /// files are used when unset.
    pub static_dir: Option<PathBuf>,

    /// Site metadata used for feeds.
    pub site: Site,

    /// Number of worker threads per phase.
    pub workers: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("content"),
            static_dir: None,
            site: Site::default(),
            workers: default_workers(),
        }
    }
}

/// Number of workers matching the available parallelism.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Result of a build operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Number of rendered pages
    pub pages: usize,

    /// Number of rendered section list pages
    pub sections: usize,

    /// Number of written feeds
    pub feeds: usize,

    /// Number of copied assets and static files
    pub copied: usize,

    pub elapsed: Duration,
}

/// States of a single build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    TreeBuilt,
    StaticCopied,
    SectionsRendered,
    PagesRendered,
    Done,
    Failed,
}

impl Phase {
    /// The work that leads into this phase.
    pub fn activity(self) -> &'static str {
        match self {
            Phase::TreeBuilt => "building the content tree",
            Phase::StaticCopied => "copying static files",
            Phase::SectionsRendered => "rendering sections",
            Phase::PagesRendered => "rendering pages",
            Phase::Init | Phase::Done | Phase::Failed => "build",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "init",
            Phase::TreeBuilt => "tree-built",
            Phase::StaticCopied => "static-copied",
            Phase::SectionsRendered => "sections-rendered",
            Phase::PagesRendered => "pages-rendered",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("{} failed: {source}", .phase.activity())]
    Phase {
        phase: Phase,
        #[source]
        source: Box<BuildError>,
    },

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("copying {path:?} failed: {source}")]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("listing static files failed: {0}")]
    StaticWalk(#[from] walkdir::Error),

    #[error("rendering {path:?} failed: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: RenderError,
    },

    #[error("building feed {path:?} failed: {source}")]
    Feed {
        path: PathBuf,
        #[source]
        source: FeedError,
    },

    #[error(transparent)]
    Store(#[from] StorageError),

    #[error(transparent)]
    Distribute(#[from] DistributeError),
}

impl BuildError {
    /// The phase a build failed in, if known.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            BuildError::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Static site builder.
pub struct StaticBuilder {
    config: BuildConfig,
    renderer: Arc<dyn Renderer>,
    storage: Arc<dyn Storage>,
    slugifier: Slugifier,
}

impl StaticBuilder {
    /// Create a new static builder.
    pub fn new(config: BuildConfig, renderer: Arc<dyn Renderer>, storage: Arc<dyn Storage>) -> Self {
        Self {
            config,
            renderer,
            storage,
            slugifier: Slugifier::default(),
        }
    }

    /// Use `slugifier` for page filenames and links.
    pub fn with_slugifier(mut self, slugifier: Slugifier) -> Self {
        self.slugifier = slugifier;
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the static site.
    ///
    /// Every run is a full rebuild. On error the output holds whatever was
    /// written before the failure and must not be published.
    pub fn run(&self, cancel: &Cancellation) -> Result<BuildReport, BuildError> {
        let started = Instant::now();
        let cancel = cancel.child();
        tracing::debug!(phase = %Phase::Init, content = %self.config.content_dir.display(), "Starting build");

        let result = self.run_phases(&cancel);
        if let Err(err) = &result {
            cancel.cancel();
            tracing::debug!(phase = %Phase::Failed, error = %err, "Build failed");
        }
        let mut report = result?;
        report.elapsed = started.elapsed();

        tracing::info!(
            phase = %Phase::Done,
            pages = report.pages,
            sections = report.sections,
            feeds = report.feeds,
            copied = report.copied,
            duration_ms = report.elapsed.as_millis() as u64,
            "Build complete"
        );
        Ok(report)
    }

    fn run_phases(&self, cancel: &Cancellation) -> Result<BuildReport, BuildError> {
        let tree = step(Phase::TreeBuilt, || {
            ContentTree::build(&self.config.content_dir).map_err(BuildError::from)
        })?;
        let site_menu = menu(tree.root());

        let copied = step(Phase::StaticCopied, || self.copy_phase(cancel, &tree))?;
        let (sections, feeds) = step(Phase::SectionsRendered, || {
            self.section_phase(cancel, &tree, &site_menu)
        })?;
        let pages = step(Phase::PagesRendered, || {
            self.page_phase(cancel, &tree, &site_menu)
        })?;

        Ok(BuildReport {
            pages,
            sections,
            feeds,
            copied,
            elapsed: Duration::ZERO,
        })
    }

    /// Copy assets of the content tree and static files side by side.
    fn copy_phase(&self, cancel: &Cancellation, tree: &ContentTree) -> Result<usize, BuildError> {
        let cancel = cancel.child();
        let guarded = |work: &dyn Fn() -> Result<usize, BuildError>| {
            let result = work();
            if result.is_err() {
                cancel.cancel();
            }
            result
        };

        let (assets, statics) = thread::scope(|scope| {
            let statics = scope.spawn(|| guarded(&|| self.copy_static_files(&cancel)));
            let assets = guarded(&|| self.copy_assets(&cancel, tree));
            (assets, statics.join())
        });
        let statics = statics.unwrap_or_else(|panic| std::panic::resume_unwind(panic));

        // A failure on one side cancels the other, report the cause.
        match (assets, statics) {
            (Ok(assets), Ok(statics)) => Ok(assets + statics),
            (Err(BuildError::Distribute(DistributeError::Cancelled)), Err(err))
            | (Err(err), _)
            | (_, Err(err)) => Err(err),
        }
    }

    fn copy_assets(&self, cancel: &Cancellation, tree: &ContentTree) -> Result<usize, BuildError> {
        let assets = tree.assets();

        distribute(
            cancel,
            |feeder| {
                for asset in &assets {
                    feeder.send(*asset)?;
                }
                Ok(())
            },
            |_, asset: &Asset| self.copy_file(&tree.source_path(asset), asset.path()),
            self.config.workers,
        )?;

        Ok(assets.len())
    }

    fn copy_static_files(&self, cancel: &Cancellation) -> Result<usize, BuildError> {
        let Some(static_dir) = &self.config.static_dir else {
            for asset in BUILTIN_ASSETS {
                let mut content = asset.content;
                self.storage.store(Path::new(asset.path), &mut content)?;
            }
            return Ok(BUILTIN_ASSETS.len());
        };

        let copied = AtomicUsize::new(0);
        distribute::<_, BuildError, _, _>(
            cancel,
            |feeder| {
                for entry in WalkDir::new(static_dir).sort_by_file_name() {
                    let entry = entry?;
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    let relative = entry
                        .path()
                        .strip_prefix(static_dir)
                        .unwrap_or(entry.path())
                        .to_path_buf();
                    feeder.send((entry.into_path(), relative))?;
                }
                Ok(())
            },
            |_, (source, relative): (PathBuf, PathBuf)| {
                self.copy_file(&source, &relative)?;
                copied.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            self.config.workers,
        )?;

        Ok(copied.into_inner())
    }

    fn copy_file(&self, source: &Path, destination: &Path) -> Result<(), BuildError> {
        let mut file = File::open(source).map_err(|err| BuildError::Copy {
            path: source.to_path_buf(),
            source: err,
        })?;
        let bytes = self.storage.store(destination, &mut file)?;
        tracing::debug!(path = %destination.display(), bytes, "Copied file");
        Ok(())
    }

    /// Render list pages and feeds of every section.
    fn section_phase(
        &self,
        cancel: &Cancellation,
        tree: &ContentTree,
        site_menu: &[MenuEntry],
    ) -> Result<(usize, usize), BuildError> {
        let sections: Vec<&Directory> = tree
            .directories()
            .into_iter()
            .filter(|dir| dir.is_section())
            .collect();
        let feeds = AtomicUsize::new(0);

        distribute::<_, BuildError, _, _>(
            cancel,
            |feeder| {
                for dir in &sections {
                    feeder.send(*dir)?;
                }
                Ok(())
            },
            |_, dir: &Directory| {
                self.render_section_list(dir, site_menu)?;
                if !dir.is_root() {
                    self.write_feed(dir)?;
                    feeds.fetch_add(1, Ordering::Relaxed);
                }
                Ok(())
            },
            self.config.workers,
        )?;

        Ok((sections.len(), feeds.into_inner()))
    }

    fn render_section_list(&self, dir: &Directory, site_menu: &[MenuEntry]) -> Result<(), BuildError> {
        let mut out = Vec::with_capacity(8192);
        self.renderer
            .render_section_list(&mut out, dir, site_menu)
            .map_err(|source| BuildError::Render {
                path: dir.path().to_path_buf(),
                source,
            })?;

        self.store(&dir.path().join("index.html"), &out)
    }

    /// Write the feed of `dir`. Items follow the scan order of its pages.
    fn write_feed(&self, dir: &Directory) -> Result<(), BuildError> {
        let site = &self.config.site;
        let mut items = Vec::new();

        for page in dir.pages().filter(|page| !page.is_hidden()) {
            let mut description = Vec::new();
            self.renderer
                .render_feed_item(&mut description, page)
                .map_err(|source| BuildError::Render {
                    path: page.path().to_path_buf(),
                    source,
                })?;

            let author = &page.frontmatter().author;
            items.push(Item {
                title: page.title().to_string(),
                link: self.page_link(page),
                author: if author.is_empty() {
                    site.author.clone()
                } else {
                    author.clone()
                },
                description: String::from_utf8_lossy(&description).into_owned(),
                published: page.created_at(),
            });
        }

        let feed = Feed {
            channel: Channel {
                title: title_case(dir.name()),
                link: site.abs_link(&dir.path().join("index.html").to_string_lossy()),
                description: format!("List of {}", dir.name()),
                author: site.author.clone(),
            },
            items,
        };

        let path = dir.path().join(FEED_FILENAME);
        let bytes = feed.to_bytes().map_err(|source| BuildError::Feed {
            path: path.clone(),
            source,
        })?;
        self.store(&path, &bytes)
    }

    /// Render every page of the tree.
    fn page_phase(
        &self,
        cancel: &Cancellation,
        tree: &ContentTree,
        site_menu: &[MenuEntry],
    ) -> Result<usize, BuildError> {
        let pages = tree.pages();

        distribute(
            cancel,
            |feeder| {
                for page in &pages {
                    feeder.send(*page)?;
                }
                Ok(())
            },
            |_, page: &Page| self.render_page(page, site_menu),
            self.config.workers,
        )?;

        Ok(pages.len())
    }

    fn render_page(&self, page: &Page, site_menu: &[MenuEntry]) -> Result<(), BuildError> {
        let mut out = Vec::with_capacity(8192);
        self.renderer
            .render_page(&mut out, page, site_menu)
            .map_err(|source| BuildError::Render {
                path: page.path().to_path_buf(),
                source,
            })?;

        self.store(&page.output_path(&self.slugifier), &out)
    }

    fn page_link(&self, page: &Page) -> String {
        self.config
            .site
            .abs_link(&page.output_path(&self.slugifier).to_string_lossy())
    }

    fn store(&self, destination: &Path, mut content: &[u8]) -> Result<(), BuildError> {
        let bytes = self.storage.store(destination, &mut content)?;
        tracing::debug!(path = %destination.display(), bytes, "Rendered file");
        Ok(())
    }
}

/// Run one build phase, attaching the phase to any error.
fn step<T>(phase: Phase, work: impl FnOnce() -> Result<T, BuildError>) -> Result<T, BuildError> {
    match work() {
        Ok(value) => {
            tracing::info!(%phase, "Build phase complete");
            Ok(value)
        }
        Err(source) => Err(BuildError::Phase {
            phase,
            source: Box::new(source),
        }),
    }
}
