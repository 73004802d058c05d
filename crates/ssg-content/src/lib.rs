//! Content model for the ssg static site generator.
//!
//! This crate scans a content directory into a [`ContentTree`], decodes the
//! front-matter of every markdown page and derives navigation menus and URL
//! slugs from it.

pub mod frontmatter;
pub mod menu;
pub mod slug;
pub mod tree;

#[cfg(test)]
mod test_helpers;

pub use frontmatter::{FrontMatter, FrontmatterError};
pub use menu::{menu, title_case, MenuEntry};
pub use slug::Slugifier;
pub use tree::{output_path, Asset, ContentError, ContentTree, Directory, Node, Page, Tree};
