//! Template environment for rendering pages, list pages and feed items.

use std::path::{Component, Path};

use minijinja::Environment;
use serde::Serialize;

/// Template for content pages.
pub const PAGE_TEMPLATE: &str = "page.html";
/// Template for the generated list page of a section.
pub const LIST_TEMPLATE: &str = "list.html";
/// Template for the description of a feed item.
pub const FEED_TEMPLATE: &str = "feed.html";

/// Site-wide values available to every template as `site`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Site {
    pub author: String,
    pub title: String,
    /// Prefix of absolute links, without a trailing slash.
    pub base_url: String,
}

impl Site {
    pub fn new(author: impl Into<String>, title: impl Into<String>, base_url: &str) -> Self {
        Self {
            author: author.into(),
            title: title.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn abs_link(&self, path: &str) -> String {
        abs_link(&self.base_url, path)
    }
}

/// Template engine using minijinja.
///
/// Templates are looked up in the templates directory first, if one is
/// configured, and fall back to the built-in set.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new(site: &Site, templates_dir: Option<&Path>) -> Self {
        let mut env = Environment::new();

        match templates_dir {
            Some(dir) => {
                let from_dir = minijinja::path_loader(dir);
                env.set_loader(move |name| match from_dir(name)? {
                    Some(source) => Ok(Some(source)),
                    None => Ok(builtin(name).map(str::to_owned)),
                });
            }
            None => env.set_loader(|name| Ok(builtin(name).map(str::to_owned))),
        }

        let base_url = site.base_url.clone();
        env.add_function("abs_link", move |path: String| abs_link(&base_url, &path));
        env.add_function("replace_extension", |path: String, ext: String| {
            replace_extension(&path, &ext)
        });

        Self { env }
    }

    /// Render the template `name` with `context` into `out`.
    pub fn render<S: Serialize>(
        &self,
        name: &str,
        context: S,
        out: &mut dyn std::io::Write,
    ) -> Result<(), minijinja::Error> {
        let template = self.env.get_template(name)?;
        template.render_to_write(context, out)?;
        Ok(())
    }
}

fn builtin(name: &str) -> Option<&'static str> {
    match name {
        "base.html" => Some(BASE_TEMPLATE),
        PAGE_TEMPLATE => Some(PAGE_TEMPLATE_SOURCE),
        LIST_TEMPLATE => Some(LIST_TEMPLATE_SOURCE),
        FEED_TEMPLATE => Some(FEED_TEMPLATE_SOURCE),
        _ => None,
    }
}

/// Join `base_url` with `path` made absolute.
///
/// The path is normalized against `/`, so `..` segments cannot leave the
/// site root and trailing slashes are dropped.
pub fn abs_link(base_url: &str, path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Normal(part) => segments.push(part.to_str().unwrap_or_default()),
            Component::ParentDir => {
                segments.pop();
            }
            _ => {}
        }
    }
    format!("{}/{}", base_url.trim_end_matches('/'), segments.join("/"))
}

/// Replace the extension of `path` with `ext`, which includes the dot.
///
/// Paths without an extension are returned unchanged.
pub fn replace_extension(path: &str, ext: &str) -> String {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) => format!("{}{}", &path[..name_start + dot], ext),
        None => path.to_string(),
    }
}

const BASE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <meta name="author" content="{{ site.author }}">
  {% if description %}<meta name="description" content="{{ description }}">
  {% endif %}<title>{{ title }} - {{ site.title }}</title>
  <link rel="stylesheet" href="{{ abs_link('static/base.css') }}">
</head>
<body>
  <nav class="menu">
    <ul>
    {% for entry in menu %}
      <li class="{% if entry.is_dir %}menu-dir{% else %}menu-page{% endif %}"><a href="{{ entry.link }}">{{ entry.title }}</a></li>
    {% endfor %}
    </ul>
  </nav>
  <main>
    {% block content %}{% endblock %}
  </main>
  <footer>&copy; {{ site.author }}</footer>
</body>
</html>
"##;

const PAGE_TEMPLATE_SOURCE: &str = r##"{% extends "base.html" %}

{% block content %}
<article class="page">
  {% if created_at %}<time datetime="{{ created_at }}">{{ created_at }}</time>{% endif %}
  {{ content }}
  {% if tags %}
  <ul class="tags">
  {% for tag in tags %}<li>{{ tag }}</li>{% endfor %}
  </ul>
  {% endif %}
</article>
{% endblock %}
"##;

const LIST_TEMPLATE_SOURCE: &str = r##"{% extends "base.html" %}

{% block content %}
<section class="list">
  <h1>{{ title }}</h1>
  {% if feed_link %}<a class="feed" href="{{ feed_link }}">RSS</a>{% endif %}
  <ul>
  {% for page in pages %}
    <li>
      {% if page.created_at %}<time datetime="{{ page.created_at }}">{{ page.created_at }}</time>{% endif %}
      <a href="{{ page.link }}">{{ page.title }}</a>
      {% if page.description %}<p>{{ page.description }}</p>{% endif %}
    </li>
  {% endfor %}
  </ul>
</section>
{% endblock %}
"##;

const FEED_TEMPLATE_SOURCE: &str = r##"{% if description %}<p><em>{{ description }}</em></p>
{% endif %}{{ content }}"##;

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;
    use std::fs;
    use tempfile::tempdir;

    fn render(engine: &TemplateEngine, name: &str, ctx: minijinja::Value) -> String {
        let mut out = Vec::new();
        engine.render(name, ctx, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn builds_absolute_links() {
        assert_eq!(abs_link("https://example.org", "blog/index.html"), "https://example.org/blog/index.html");
        assert_eq!(abs_link("https://example.org/", "/about.html"), "https://example.org/about.html");
        assert_eq!(abs_link("", "../../secret/../a.html"), "/a.html");
        assert_eq!(abs_link("", "blog/"), "/blog");
        assert_eq!(abs_link("", ""), "/");
    }

    #[test]
    fn replaces_extensions() {
        assert_eq!(replace_extension("blog/first.md", ".html"), "blog/first.html");
        assert_eq!(replace_extension("archive.tar.gz", ".zip"), "archive.tar.zip");
        assert_eq!(replace_extension("v1.0/README", ".md"), "v1.0/README");
    }

    #[test]
    fn renders_builtin_page_template() {
        let site = Site::new("John Doe", "Notes", "https://example.org/");
        let engine = TemplateEngine::new(&site, None);

        let html = render(
            &engine,
            PAGE_TEMPLATE,
            context! {
                site => &site,
                title => "About",
                description => "All about me",
                content => minijinja::Value::from_safe_string("<p>Hello</p>".to_string()),
                menu => vec![context! { title => "Home", link => "https://example.org/index.html", is_dir => false }],
            },
        );

        assert!(html.contains("<title>About - Notes</title>"));
        assert!(html.contains("<p>Hello</p>"));
        assert!(html.contains("base.css"));
        assert!(html.contains(">Home</a>"));
    }

    #[test]
    fn escapes_plain_values() {
        let site = Site::new("John Doe", "Notes", "");
        let engine = TemplateEngine::new(&site, None);

        let html = render(
            &engine,
            PAGE_TEMPLATE,
            context! { site => &site, title => "<script>", content => "<b>raw</b>" },
        );

        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&lt;b&gt;raw"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn templates_directory_overrides_builtins() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join("feed.html"),
            "custom {{ title }} {{ replace_extension('a.md', '.html') }}",
        )
        .unwrap();
        let site = Site::default();
        let engine = TemplateEngine::new(&site, Some(temp.path()));

        let feed = render(&engine, FEED_TEMPLATE, context! { title => "x" });
        let page = render(
            &engine,
            PAGE_TEMPLATE,
            context! { site => &site, title => "Builtin", content => "" },
        );

        assert_eq!(feed, "custom x a.html");
        assert!(page.contains("<title>Builtin - </title>"));
    }

    #[test]
    fn reports_unknown_templates() {
        let engine = TemplateEngine::new(&Site::default(), None);
        let mut out = Vec::new();

        let err = engine.render("missing.html", context! {}, &mut out).unwrap_err();

        assert_eq!(err.kind(), minijinja::ErrorKind::TemplateNotFound);
    }
}
