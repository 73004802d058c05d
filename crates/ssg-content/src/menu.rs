//! Navigation menu derived from one level of the content tree.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::tree::{Node, Tree, HOME_FILENAME};

/// An entry in the navigation menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    /// Display title.
    pub title: String,
    /// Path of the page file or directory, relative to the content root.
    pub path: PathBuf,
    /// Whether `path` points to a directory.
    pub is_dir: bool,
}

impl MenuEntry {
    fn is_home(&self) -> bool {
        !self.is_dir && self.path == Path::new(HOME_FILENAME)
    }

    fn rank(&self) -> u8 {
        if self.is_home() {
            0
        } else if self.is_dir {
            1
        } else {
            2
        }
    }
}

/// Build the menu for the immediate children of `tree`.
///
/// Directories appear if they directly contain a page, pages unless they are
/// hidden. The root home page comes first, then directories, then pages,
/// each group ordered by title.
pub fn menu(tree: &impl Tree) -> Vec<MenuEntry> {
    let mut entries: Vec<MenuEntry> = tree
        .children()
        .iter()
        .filter_map(|child| match child {
            Node::Directory(dir) if dir.has_pages() => Some(MenuEntry {
                title: title_case(dir.name()),
                path: dir.path().to_path_buf(),
                is_dir: true,
            }),
            Node::Page(page) if !page.is_hidden() => {
                let title = if page.path() == Path::new(HOME_FILENAME) {
                    "Home".to_string()
                } else {
                    page.title().to_string()
                };
                Some(MenuEntry {
                    title,
                    path: page.path().to_path_buf(),
                    is_dir: false,
                })
            }
            _ => None,
        })
        .collect();

    entries.sort_by(compare);
    entries
}

fn compare(a: &MenuEntry, b: &MenuEntry) -> Ordering {
    a.rank()
        .cmp(&b.rank())
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.path.cmp(&b.path))
}

/// Turn a file or directory name into a title: `my-blog` becomes `My Blog`.
pub fn title_case(name: &str) -> String {
    name.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
