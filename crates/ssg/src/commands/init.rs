//! Scaffold a new site.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Name of the configuration file written by init.
pub const CONFIG_FILE: &str = "site.toml";

/// Starter files, relative to the site root.
const SCAFFOLD: &[(&str, &str)] = &[
    ("content/index.md", DEFAULT_INDEX),
    ("content/about.md", DEFAULT_ABOUT),
    ("content/blog/hello-world.md", DEFAULT_ARTICLE),
];

/// Run the init command in `root`.
pub async fn run(root: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing site in {}...", root.display());

    let content_dir = root.join("content");
    if content_dir.exists() && !yes {
        tracing::warn!("content/ directory already exists. Use --yes to overwrite.");
        return Ok(());
    }

    write(root, CONFIG_FILE, DEFAULT_CONFIG, yes)?;
    for (path, content) in SCAFFOLD {
        write(root, path, content, yes)?;
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'ssg livereload' to preview the site.");

    Ok(())
}

fn write(root: &Path, path: &str, content: &str, overwrite: bool) -> Result<()> {
    let target = root.join(path);
    if target.exists() && !overwrite {
        return Ok(());
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(&target, content).with_context(|| format!("Failed to write {path}"))?;
    tracing::info!("Created {path}");
    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# ssg configuration

[site]
# Author of the site (required)
author = "Jane Doe"

# Site title
title = "My Site"

# Prefix of absolute links and feed links
base_url = "http://localhost:7777"

[paths]
# Markdown pages and their files
content = "content"

# Generated site
output = "public"

# Static files copied as they are, built-in stylesheet when unset
# static = "static"

# Custom templates, built-in templates when unset
# templates = "templates"

[markdown]
# Pass raw HTML in markdown through
unsafe_html = false
"#;

const DEFAULT_INDEX: &str = r#"```yaml
title: Home
description: Welcome to my site
```
# Welcome

This site is generated by **ssg**. Pages live in `content/`, every
directory with pages but without an `index.md` gets a list page and a feed.
"#;

const DEFAULT_ABOUT: &str = r#"```yaml
title: About
```
# About

Write something about yourself.
"#;

const DEFAULT_ARTICLE: &str = r#"```yaml
title: Hello World
description: The first article
created_at: 2021-07-11
tags:
  - ssg
```
# Hello World

Articles in `content/blog/` show up on the blog's list page and in its
RSS feed at `blog/feed.rss`.
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn scaffolds_site() {
        let temp = tempdir().unwrap();

        run(temp.path(), false).await.unwrap();

        assert!(temp.path().join(CONFIG_FILE).is_file());
        assert!(temp.path().join("content/index.md").is_file());
        assert!(temp.path().join("content/blog/hello-world.md").is_file());
    }

    #[tokio::test]
    async fn keeps_existing_content_without_yes() {
        let temp = tempdir().unwrap();
        let index = temp.path().join("content/index.md");
        fs::create_dir_all(index.parent().unwrap()).unwrap();
        fs::write(&index, "mine").unwrap();

        run(temp.path(), false).await.unwrap();
        assert_eq!(fs::read_to_string(&index).unwrap(), "mine");
        assert!(!temp.path().join(CONFIG_FILE).exists());

        run(temp.path(), true).await.unwrap();
        assert_eq!(fs::read_to_string(&index).unwrap(), DEFAULT_INDEX);
    }
}
