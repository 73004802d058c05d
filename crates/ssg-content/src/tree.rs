//! In-memory model of a content directory.
//!
//! A [`ContentTree`] is built once per build by scanning the content root
//! and is read-only afterwards. Directories hold their entries in scan order,
//! which is sorted by file name; anything that needs a different order sorts
//! explicitly.

use std::convert::Infallible;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use walkdir::WalkDir;

use crate::frontmatter::{self, FrontMatter, FrontmatterError};
use crate::slug::Slugifier;

/// Extension of markdown pages.
pub const MARKDOWN_EXTENSION: &str = "md";

/// Filename of the page that renders to a directory's `index.html`.
pub const HOME_FILENAME: &str = "index.md";

/// Errors that can occur while building a content tree.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("content directory not found: {0}")]
    MissingRoot(PathBuf),

    #[error("listing {path:?} failed: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("reading {path:?} failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?}: front-matter parsing failed: {source}")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },
}

/// Operations shared by every node of a content tree.
pub trait Tree {
    /// Child nodes in scan order. Empty for pages and assets.
    fn children(&self) -> &[Node];

    /// Path relative to the content root. The root itself has an empty path.
    fn path(&self) -> &Path;

    /// Display name.
    fn name(&self) -> &str;
}

/// A node of the content tree.
#[derive(Debug, Clone)]
pub enum Node {
    Directory(Directory),
    Page(Page),
    Asset(Asset),
}

impl Node {
    /// Call `visit` for this node and then, depth-first, for every descendant.
    ///
    /// Stops at the first error returned by `visit`.
    pub fn walk<'a, E, F>(&'a self, visit: &mut F) -> Result<(), E>
    where
        F: FnMut(&'a Node) -> Result<(), E>,
    {
        visit(self)?;
        for child in self.children() {
            child.walk(visit)?;
        }
        Ok(())
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Node::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    pub fn as_page(&self) -> Option<&Page> {
        match self {
            Node::Page(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_asset(&self) -> Option<&Asset> {
        match self {
            Node::Asset(asset) => Some(asset),
            _ => None,
        }
    }
}

impl Tree for Node {
    fn children(&self) -> &[Node] {
        match self {
            Node::Directory(dir) => dir.children(),
            Node::Page(page) => page.children(),
            Node::Asset(asset) => asset.children(),
        }
    }

    fn path(&self) -> &Path {
        match self {
            Node::Directory(dir) => dir.path(),
            Node::Page(page) => page.path(),
            Node::Asset(asset) => asset.path(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Node::Directory(dir) => dir.name(),
            Node::Page(page) => page.name(),
            Node::Asset(asset) => asset.name(),
        }
    }
}

/// A directory and everything found inside it.
#[derive(Debug, Clone)]
pub struct Directory {
    path: PathBuf,
    name: String,
    children: Vec<Node>,
}

impl Directory {
    /// Whether this is the content root.
    pub fn is_root(&self) -> bool {
        self.path.as_os_str().is_empty()
    }

    /// Pages that are immediate children of this directory.
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.children.iter().filter_map(Node::as_page)
    }

    /// Whether at least one immediate child is a page.
    pub fn has_pages(&self) -> bool {
        self.pages().next().is_some()
    }

    /// The child page rendered to this directory's `index.html`, if any.
    pub fn home_page(&self) -> Option<&Page> {
        self.pages().find(|page| page.is_home())
    }

    /// A section gets a generated list page and feed: it has pages of its
    /// own but no home page.
    pub fn is_section(&self) -> bool {
        self.has_pages() && self.home_page().is_none()
    }
}

impl Tree for Directory {
    fn children(&self) -> &[Node] {
        &self.children
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A markdown page with its decoded front-matter.
#[derive(Debug, Clone)]
pub struct Page {
    path: PathBuf,
    frontmatter: FrontMatter,
    body: String,
}

impl Page {
    /// Create a page from already parsed parts.
    pub fn new(path: impl Into<PathBuf>, frontmatter: FrontMatter, body: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            frontmatter,
            body: body.into(),
        }
    }

    pub fn frontmatter(&self) -> &FrontMatter {
        &self.frontmatter
    }

    /// Markdown content following the front-matter.
    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn title(&self) -> &str {
        &self.frontmatter.title
    }

    pub fn is_hidden(&self) -> bool {
        self.frontmatter.hidden
    }

    pub fn created_at(&self) -> Option<NaiveDate> {
        self.frontmatter.created_at
    }

    /// Whether the page is its directory's home page.
    pub fn is_home(&self) -> bool {
        self.path.file_name().is_some_and(|name| name == HOME_FILENAME)
    }

    /// Directory of the page, relative to the content root.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    /// Output path of the rendered page, relative to the output root.
    ///
    /// Home pages render to `index.html`, every other page to its slugified
    /// title, both next to the source file.
    pub fn output_path(&self, slugifier: &Slugifier) -> PathBuf {
        output_path(&self.path, self.title(), slugifier)
    }
}

impl Tree for Page {
    fn children(&self) -> &[Node] {
        &[]
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// Pages are named by their front-matter title, not their filename.
    fn name(&self) -> &str {
        self.title()
    }
}

/// Any file that is not a markdown page. Copied verbatim.
#[derive(Debug, Clone)]
pub struct Asset {
    path: PathBuf,
    name: String,
}

impl Tree for Asset {
    fn children(&self) -> &[Node] {
        &[]
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Output path for the page at `path` titled `title`.
///
/// Menu entries only carry a page's path and title, so links to pages are
/// derived here rather than from a [`Page`].
pub fn output_path(path: &Path, title: &str, slugifier: &Slugifier) -> PathBuf {
    let dir = path.parent().unwrap_or(Path::new(""));
    if path.file_name().is_some_and(|name| name == HOME_FILENAME) {
        dir.join("index.html")
    } else {
        dir.join(format!("{}.html", slugifier.slugify(title)))
    }
}

/// Snapshot of a content directory.
#[derive(Debug, Clone)]
pub struct ContentTree {
    source: PathBuf,
    root: Node,
}

impl ContentTree {
    /// Scan `source` and build the tree.
    ///
    /// Any unreadable entry or bad front-matter aborts the scan; no partial
    /// tree is returned.
    pub fn build(source: impl Into<PathBuf>) -> Result<Self, ContentError> {
        let source = source.into();
        if !source.is_dir() {
            return Err(ContentError::MissingRoot(source));
        }

        let name = source
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_default();

        let root = scan_directory(&source, Path::new(""), name)?;
        tracing::debug!(source = %source.display(), "Built content tree");

        Ok(Self {
            source,
            root: Node::Directory(root),
        })
    }

    /// The root node, always a directory.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Directory the tree was scanned from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Location of a node's file on disk.
    pub fn source_path(&self, node: &impl Tree) -> PathBuf {
        self.source.join(node.path())
    }

    /// Visit every node depth-first, starting at the root.
    pub fn walk<'a, E, F>(&'a self, mut visit: F) -> Result<(), E>
    where
        F: FnMut(&'a Node) -> Result<(), E>,
    {
        self.root.walk(&mut visit)
    }

    /// All directories, including the root, in walk order.
    pub fn directories(&self) -> Vec<&Directory> {
        self.collect(Node::as_directory)
    }

    /// All pages anywhere in the tree, in walk order.
    pub fn pages(&self) -> Vec<&Page> {
        self.collect(Node::as_page)
    }

    /// All non-markdown files, in walk order.
    pub fn assets(&self) -> Vec<&Asset> {
        self.collect(Node::as_asset)
    }

    fn collect<'a, T>(&'a self, pick: impl Fn(&'a Node) -> Option<T>) -> Vec<T> {
        let mut found = Vec::new();
        self.walk(|node| {
            found.extend(pick(node));
            Ok::<(), Infallible>(())
        })
        .unwrap_or_else(|never| match never {});
        found
    }
}

fn scan_directory(source: &Path, relative: &Path, name: String) -> Result<Directory, ContentError> {
    let location = source.join(relative);
    let mut children = Vec::new();

    for entry in WalkDir::new(&location)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ContentError::Walk {
            path: relative.to_path_buf(),
            source,
        })?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let path = relative.join(&file_name);

        let file_type = entry.file_type();
        if file_type.is_dir() {
            children.push(Node::Directory(scan_directory(source, &path, file_name)?));
        } else if !file_type.is_file() {
            // Symlinks, FIFOs and sockets are not content.
            tracing::debug!(path = %path.display(), "Skipping non-regular file");
        } else if path.extension().is_some_and(|ext| ext == MARKDOWN_EXTENSION) {
            children.push(Node::Page(read_page(source, path)?));
        } else {
            children.push(Node::Asset(Asset {
                path,
                name: file_name,
            }));
        }
    }

    tracing::debug!(path = %relative.display(), entries = children.len(), "Scanned directory");

    Ok(Directory {
        path: relative.to_path_buf(),
        name,
        children,
    })
}

fn read_page(source: &Path, path: PathBuf) -> Result<Page, ContentError> {
    let file = match File::open(source.join(&path)) {
        Ok(file) => file,
        Err(source) => return Err(ContentError::Io { path, source }),
    };
    let mut reader = BufReader::new(file);

    let frontmatter = match frontmatter::read(&mut reader) {
        Ok(frontmatter) => frontmatter,
        Err(source) => return Err(ContentError::Frontmatter { path, source }),
    };

    let mut body = String::new();
    if let Err(source) = reader.read_to_string(&mut body) {
        return Err(ContentError::Io { path, source });
    }

    Ok(Page {
        path,
        frontmatter,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_fixture;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn paths<T: Tree>(nodes: &[&T]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| n.path().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn builds_tree_from_fixture() {
        let content = write_fixture();

        let tree = ContentTree::build(content.path()).unwrap();

        assert_eq!(paths(&tree.directories()), vec!["", "blog", "files"]);
        assert_eq!(
            paths(&tree.pages()),
            vec!["about.md", "blog/first.md", "blog/second.md", "index.md"]
        );
        assert_eq!(paths(&tree.assets()), vec!["files/random.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn skips_symlinks() {
        let temp = tempdir().unwrap();
        let content = temp.path().join("content");
        let shared = temp.path().join("shared");
        fs::create_dir_all(shared.join("nested")).unwrap();
        fs::write(shared.join("nested/data.txt"), "data").unwrap();
        fs::create_dir_all(&content).unwrap();
        fs::write(content.join("notes.txt"), "notes").unwrap();
        std::os::unix::fs::symlink(&shared, content.join("shared")).unwrap();
        std::os::unix::fs::symlink(content.join("notes.txt"), content.join("link.txt")).unwrap();

        let tree = ContentTree::build(&content).unwrap();

        assert_eq!(paths(&tree.assets()), vec!["notes.txt"]);
        assert_eq!(paths(&tree.directories()), vec![""]);
    }

    #[test]
    fn pages_are_named_by_title() {
        let content = write_fixture();

        let tree = ContentTree::build(content.path()).unwrap();
        let names: Vec<_> = tree.pages().iter().map(|p| p.name().to_string()).collect();

        assert_eq!(names, vec!["About", "First Article", "Second Article", "Home"]);
    }

    #[test]
    fn keeps_page_body_after_frontmatter() {
        let content = write_fixture();

        let tree = ContentTree::build(content.path()).unwrap();
        let about = tree.pages()[0];

        assert_eq!(about.body(), "# About\n\nAll about me.\n");
    }

    #[test]
    fn walk_visits_parents_before_children() {
        let content = write_fixture();
        let tree = ContentTree::build(content.path()).unwrap();

        let mut visited = Vec::new();
        tree.walk(|node| {
            visited.push(node.path().to_string_lossy().into_owned());
            Ok::<_, Infallible>(())
        })
        .unwrap();

        assert_eq!(
            visited,
            vec![
                "",
                "about.md",
                "blog",
                "blog/first.md",
                "blog/second.md",
                "files",
                "files/random.txt",
                "index.md",
            ]
        );
    }

    #[test]
    fn walk_stops_at_first_error() {
        let content = write_fixture();
        let tree = ContentTree::build(content.path()).unwrap();

        let mut count = 0;
        let result = tree.walk(|node| {
            count += 1;
            if node.as_page().is_some() {
                return Err("stop");
            }
            Ok(())
        });

        assert_eq!(result, Err("stop"));
        assert_eq!(count, 2);
    }

    #[test]
    fn detects_sections() {
        let content = write_fixture();
        let tree = ContentTree::build(content.path()).unwrap();

        let sections: Vec<_> = tree
            .directories()
            .into_iter()
            .filter(|d| d.is_section())
            .collect();

        assert_eq!(paths(&sections), vec!["blog"]);
    }

    #[test]
    fn derives_output_paths() {
        let content = write_fixture();
        let tree = ContentTree::build(content.path()).unwrap();
        let slugifier = Slugifier::default();

        let outputs: Vec<_> = tree
            .pages()
            .iter()
            .map(|p| p.output_path(&slugifier).to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            outputs,
            vec![
                "about.html",
                "blog/first-article.html",
                "blog/second-article.html",
                "index.html",
            ]
        );
    }

    #[test]
    fn aborts_on_bad_frontmatter() {
        let content = write_fixture();
        fs::write(content.path().join("blog/broken.md"), "# no front-matter\n").unwrap();

        let err = ContentTree::build(content.path()).unwrap_err();

        assert!(matches!(
            err,
            ContentError::Frontmatter {
                source: FrontmatterError::NoFrontMatter,
                ..
            }
        ));
        assert!(err.to_string().contains("broken.md"));
    }

    #[test]
    fn errors_on_missing_root() {
        let temp = tempdir().unwrap();

        let result = ContentTree::build(temp.path().join("missing"));

        assert!(matches!(result, Err(ContentError::MissingRoot(_))));
    }
}
