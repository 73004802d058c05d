//! Shared fixtures for the content crate's tests.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

/// Write a page with JSON front-matter.
pub fn write_page(root: &Path, path: &str, frontmatter: &str, body: &str) {
    let location = root.join(path);
    if let Some(parent) = location.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(location, format!("```json\n{frontmatter}\n```\n{body}")).unwrap();
}

/// Create the standard content fixture:
///
/// ```text
/// index.md        "Home"
/// about.md        "About"
/// blog/first.md   "First Article"  (2021-07-11)
/// blog/second.md  "Second Article" (2021-07-12)
/// files/random.txt
/// ```
pub fn write_fixture() -> TempDir {
    let temp = TempDir::new().unwrap();
    let root = temp.path();

    write_page(
        root,
        "index.md",
        r#"{"author": "John Doe", "title": "Home"}"#,
        "# Welcome\n",
    );
    write_page(
        root,
        "about.md",
        r#"{"author": "John Doe", "title": "About"}"#,
        "# About\n\nAll about me.\n",
    );
    write_page(
        root,
        "blog/first.md",
        r#"{"author": "John Doe", "title": "First Article", "created_at": "2021-07-11"}"#,
        "The first one.\n",
    );
    write_page(
        root,
        "blog/second.md",
        r#"{"author": "John Doe", "title": "Second Article", "created_at": "2021-07-12"}"#,
        "The second one.\n",
    );

    fs::create_dir_all(root.join("files")).unwrap();
    fs::write(root.join("files/random.txt"), "random bytes").unwrap();

    temp
}
