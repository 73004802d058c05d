//! Static files shipped with the generator.
//!
//! Used by the copy phase when no static directory is configured.

/// A built-in static file.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinAsset {
    /// Path relative to the output root.
    pub path: &'static str,
    pub content: &'static [u8],
}

/// Static files written when no static directory is configured.
pub const BUILTIN_ASSETS: &[BuiltinAsset] = &[BuiltinAsset {
    path: "static/base.css",
    content: BASE_CSS.as_bytes(),
}];

// Referenced by the built-in base template.
const BASE_CSS: &str = r#"/* ssg default theme */

:root {
  --background: #fdfdfc;
  --foreground: #1f2328;
  --muted: #f3f3f1;
  --muted-foreground: #59636e;
  --primary: #0b57d0;
  --border: #d8dadd;
  --content-max-width: 46rem;
}

@media (prefers-color-scheme: dark) {
  :root {
    --background: #16181b;
    --foreground: #e6e6e3;
    --muted: #202327;
    --muted-foreground: #9da5ae;
    --primary: #8ab4f8;
    --border: #33373d;
  }
}

* {
  box-sizing: border-box;
}

body {
  margin: 0 auto;
  max-width: var(--content-max-width);
  padding: 1.5rem;
  font-family: system-ui, -apple-system, sans-serif;
  background: var(--background);
  color: var(--foreground);
  line-height: 1.6;
}

a {
  color: var(--primary);
  text-underline-offset: 3px;
}

/* Menu */
.menu ul {
  display: flex;
  flex-wrap: wrap;
  gap: 1rem;
  list-style: none;
  margin: 0 0 2rem;
  padding: 0 0 1rem;
  border-bottom: 1px solid var(--border);
}

.menu .menu-dir a {
  font-weight: 600;
}

/* Pages */
h1, h2, h3 {
  line-height: 1.25;
}

time {
  color: var(--muted-foreground);
  font-size: 0.875rem;
}

pre {
  background: var(--muted);
  border: 1px solid var(--border);
  border-radius: 0.375rem;
  padding: 1rem;
  overflow-x: auto;
}

code {
  font-family: ui-monospace, monospace;
  font-size: 0.875em;
}

table {
  border-collapse: collapse;
}

th, td {
  border: 1px solid var(--border);
  padding: 0.375rem 0.75rem;
}

.tags {
  display: flex;
  gap: 0.5rem;
  list-style: none;
  padding: 0;
}

.tags li {
  background: var(--muted);
  border-radius: 0.25rem;
  padding: 0 0.5rem;
  font-size: 0.875rem;
}

/* List pages */
.list ul {
  list-style: none;
  padding: 0;
}

.list li {
  margin-bottom: 1.25rem;
}

.list li p {
  margin: 0.25rem 0 0;
  color: var(--muted-foreground);
}

footer {
  margin-top: 3rem;
  color: var(--muted-foreground);
  font-size: 0.875rem;
}
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ships_base_stylesheet() {
        let css = BUILTIN_ASSETS
            .iter()
            .find(|asset| asset.path == "static/base.css")
            .unwrap();

        assert!(std::str::from_utf8(css.content).unwrap().contains(".menu"));
    }
}
