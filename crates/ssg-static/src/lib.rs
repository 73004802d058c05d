//! Static site generation for ssg.
//!
//! Renders a content tree into HTML pages, section list pages and RSS feeds,
//! and writes them together with assets and static files to a [`Storage`].

pub mod assets;
pub mod builder;
pub mod distribute;
pub mod feed;
pub mod render;
pub mod storage;
pub mod templates;

pub use builder::{default_workers, BuildConfig, BuildError, BuildReport, Phase, StaticBuilder};
pub use distribute::{distribute, Cancellation, DistributeError, Feeder};
pub use feed::{Channel, Feed, FeedError, Item};
pub use render::{list_pages, MarkdownRenderer, RenderError, Renderer, FEED_FILENAME};
pub use storage::{sanitize, FileStorage, MemoryStorage, Storage, StorageError};
pub use templates::{Site, TemplateEngine};
