//! Conversion of pages and sections into HTML.

use std::io::Write;
use std::path::Path;

use minijinja::Value;
use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd, TextMergeStream};
use serde::Serialize;
use ssg_content::{output_path, title_case, Directory, MenuEntry, Page, Slugifier, Tree};

use crate::templates::{Site, TemplateEngine, FEED_TEMPLATE, LIST_TEMPLATE, PAGE_TEMPLATE};

/// Filename of a section's feed.
pub const FEED_FILENAME: &str = "feed.rss";

/// Errors that can occur while rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("template {name:?} failed: {source}")]
    Template {
        name: &'static str,
        #[source]
        source: minijinja::Error,
    },
}

/// Turns pages and sections into bytes.
pub trait Renderer: Send + Sync {
    /// Render a content page, with the site menu for navigation.
    fn render_page(
        &self,
        out: &mut dyn Write,
        page: &Page,
        menu: &[MenuEntry],
    ) -> Result<(), RenderError>;

    /// Render the description of a page's feed item.
    fn render_feed_item(&self, out: &mut dyn Write, page: &Page) -> Result<(), RenderError>;

    /// Render the list page of a section.
    fn render_section_list(
        &self,
        out: &mut dyn Write,
        dir: &Directory,
        menu: &[MenuEntry],
    ) -> Result<(), RenderError>;
}

#[derive(Debug, Serialize)]
struct MenuLink<'a> {
    title: &'a str,
    link: String,
    is_dir: bool,
}

#[derive(Debug, Serialize)]
struct PageSummary<'a> {
    title: &'a str,
    description: &'a str,
    author: &'a str,
    created_at: Option<String>,
    tags: &'a [String],
    link: String,
}

/// Renders markdown pages through the site's templates.
pub struct MarkdownRenderer {
    site: Site,
    templates: TemplateEngine,
    slugifier: Slugifier,
    unsafe_html: bool,
}

impl MarkdownRenderer {
    pub fn new(site: Site, templates_dir: Option<&Path>, slugifier: Slugifier) -> Self {
        let templates = TemplateEngine::new(&site, templates_dir);
        Self {
            site,
            templates,
            slugifier,
            unsafe_html: false,
        }
    }

    /// Pass raw HTML contained in markdown through instead of escaping it.
    pub fn with_unsafe_html(mut self, unsafe_html: bool) -> Self {
        self.unsafe_html = unsafe_html;
        self
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Render markdown to HTML.
    pub fn markdown_to_html(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS;

        let unsafe_html = self.unsafe_html;
        let mut in_code_block = false;
        let events = TextMergeStream::new(Parser::new_ext(markdown, options));
        let parser = events.map(move |event| match event {
            Event::Html(raw) | Event::InlineHtml(raw) if !unsafe_html => Event::Text(raw),
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                Event::Start(Tag::CodeBlock(kind))
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                Event::End(TagEnd::CodeBlock)
            }
            Event::Text(text) if !in_code_block => match replace_shortcodes(&text) {
                Some(replaced) => Event::Text(replaced.into()),
                None => Event::Text(text),
            },
            event => event,
        });

        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);
        html_output
    }

    /// Absolute link to the rendered page at `path` titled `title`.
    pub fn page_link(&self, path: &Path, title: &str) -> String {
        let output = output_path(path, title, &self.slugifier);
        self.site.abs_link(&output.to_string_lossy())
    }

    fn menu_links<'a>(&self, menu: &'a [MenuEntry]) -> Vec<MenuLink<'a>> {
        menu.iter()
            .map(|entry| {
                let link = if entry.is_dir {
                    self.site
                        .abs_link(&entry.path.join("index.html").to_string_lossy())
                } else {
                    self.page_link(&entry.path, &entry.title)
                };
                MenuLink {
                    title: &entry.title,
                    link,
                    is_dir: entry.is_dir,
                }
            })
            .collect()
    }

    fn summary<'a>(&self, page: &'a Page) -> PageSummary<'a> {
        let frontmatter = page.frontmatter();
        PageSummary {
            title: page.title(),
            description: &frontmatter.description,
            author: &frontmatter.author,
            created_at: page.created_at().map(|date| date.to_string()),
            tags: &frontmatter.tags,
            link: self.page_link(page.path(), page.title()),
        }
    }

    fn render<S: Serialize>(
        &self,
        name: &'static str,
        context: S,
        out: &mut dyn Write,
    ) -> Result<(), RenderError> {
        self.templates
            .render(name, context, out)
            .map_err(|source| RenderError::Template { name, source })
    }
}

/// Replace emoji shortcodes such as `:rocket:` in `text`.
///
/// Returns `None` when nothing was replaced. Unknown shortcodes stay as
/// they are.
fn replace_shortcodes(text: &str) -> Option<String> {
    if !text.contains(':') {
        return None;
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut replaced = false;
    while let Some(start) = rest.find(':') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let emoji = after.find(':').and_then(|end| {
            let code = &after[..end];
            let valid = !code.is_empty()
                && code
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-'));
            valid
                .then(|| emojis::get_by_shortcode(code))
                .flatten()
                .map(|emoji| (emoji, end))
        });
        match emoji {
            Some((emoji, end)) => {
                out.push_str(emoji.as_str());
                rest = &after[end + 1..];
                replaced = true;
            }
            None => {
                out.push(':');
                rest = after;
            }
        }
    }
    out.push_str(rest);

    replaced.then_some(out)
}

/// Non-hidden pages of `dir`, newest first.
///
/// Pages without a creation date go last; the sort is stable, so pages with
/// equal dates keep their scan order.
pub fn list_pages(dir: &Directory) -> Vec<&Page> {
    let mut pages: Vec<&Page> = dir.pages().filter(|page| !page.is_hidden()).collect();
    pages.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
    pages
}

impl Renderer for MarkdownRenderer {
    fn render_page(
        &self,
        out: &mut dyn Write,
        page: &Page,
        menu: &[MenuEntry],
    ) -> Result<(), RenderError> {
        let summary = self.summary(page);
        let content = Value::from_safe_string(self.markdown_to_html(page.body()));

        self.render(
            PAGE_TEMPLATE,
            minijinja::context! {
                site => &self.site,
                title => summary.title,
                description => summary.description,
                author => summary.author,
                created_at => summary.created_at,
                tags => summary.tags,
                link => summary.link,
                content => content,
                menu => self.menu_links(menu),
            },
            out,
        )
    }

    fn render_feed_item(&self, out: &mut dyn Write, page: &Page) -> Result<(), RenderError> {
        let content = Value::from_safe_string(self.markdown_to_html(page.body()));

        self.render(
            FEED_TEMPLATE,
            minijinja::context! {
                site => &self.site,
                title => page.title(),
                description => &page.frontmatter().description,
                content => content,
            },
            out,
        )
    }

    fn render_section_list(
        &self,
        out: &mut dyn Write,
        dir: &Directory,
        menu: &[MenuEntry],
    ) -> Result<(), RenderError> {
        let pages: Vec<PageSummary<'_>> = list_pages(dir)
            .into_iter()
            .map(|page| self.summary(page))
            .collect();
        let feed_link = (!dir.is_root())
            .then(|| self.site.abs_link(&dir.path().join(FEED_FILENAME).to_string_lossy()));

        self.render(
            LIST_TEMPLATE,
            minijinja::context! {
                site => &self.site,
                title => title_case(dir.name()),
                description => format!("List of {}", dir.name()),
                dir => dir.path().to_string_lossy(),
                pages => pages,
                feed_link => feed_link,
                menu => self.menu_links(menu),
            },
            out,
        )
    }
}
