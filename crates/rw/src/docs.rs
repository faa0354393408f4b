//! Markdown documentation site.
//!
//! Three routes over a directory of markdown files:
//!
//! - `/`: index page listing every document
//! - `/docs/**`: one page per markdown file (`guide/index.md` -> `/docs/guide`)
//! - `/sitemap.xml`: sitemap of every page
//!
//! The directory scan is the site's global data, so it runs once per build.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pulldown_cmark::{Options, Parser, html};
use rw_config::Config;
use rw_site::path::path_to_file_path;
use rw_site::{BoxError, BulkData, RenderContext, Route, Site, SiteBuilder};

/// URL prefix of documentation pages.
const DOCS_PREFIX: &str = "/docs";

/// Settings the site is built from.
#[derive(Debug, Clone)]
pub(crate) struct DocsSettings {
    pub name: String,
    pub base_url: Option<String>,
    pub source_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl DocsSettings {
    pub(crate) fn from_config(config: &Config) -> Self {
        Self {
            name: config.site.name.clone(),
            base_url: config.site.base_url.clone(),
            source_dir: config.docs_resolved.source_dir.clone(),
            out_dir: config.build_resolved.out_dir.clone(),
        }
    }
}

/// A discovered markdown document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DocPage {
    /// Route path (e.g. `/docs/guide/setup`).
    pub url_path: String,
    pub title: String,
    pub source: PathBuf,
}

/// Global data: settings plus every discovered document, sorted by path.
#[derive(Debug)]
pub(crate) struct Docs {
    pub settings: Arc<DocsSettings>,
    pub pages: Vec<DocPage>,
}

/// Content of one documentation page.
#[derive(Debug)]
pub(crate) struct DocContent {
    title: String,
    markdown: String,
}

/// Assemble the documentation site.
pub(crate) fn docs_site(settings: DocsSettings) -> Site<Docs> {
    let out_dir = settings.out_dir.clone();
    let settings = Arc::new(settings);

    SiteBuilder::new(move || {
        let settings = Arc::clone(&settings);
        async move {
            let source_dir = settings.source_dir.clone();
            let pages = tokio::task::spawn_blocking(move || scan_docs(&source_dir)).await??;
            tracing::info!(pages = pages.len(), source_dir = %settings.source_dir.display(), "Scanned documents");
            Ok::<_, BoxError>(Docs { settings, pages })
        }
    })
    .route(Route::page("/", |cx: RenderContext<Docs, ()>| async move {
        Ok(render_index(&cx.global_data))
    }))
    .route(Route::bulk(
        "/docs/**",
        |docs: Arc<Docs>| async move { load_pages(&docs).await },
        |cx: RenderContext<Docs, DocContent>| async move {
            Ok(render_doc(
                &cx.global_data.settings.name,
                &cx.data.title,
                &cx.data.markdown,
            ))
        },
    ))
    .route(Route::page("/sitemap.xml", |cx: RenderContext<Docs, ()>| async move {
        Ok(render_sitemap(&cx.global_data))
    }))
    .out_dir(out_dir)
    .build()
}

/// Read every discovered page's markdown.
async fn load_pages(docs: &Docs) -> Result<BulkData<DocContent>, BoxError> {
    let mut pages = BulkData::new();
    for page in &docs.pages {
        let markdown = tokio::fs::read_to_string(&page.source).await?;
        pages.insert(
            page.url_path.clone(),
            DocContent {
                title: page.title.clone(),
                markdown,
            },
        );
    }
    Ok(pages)
}

/// Walk `source_dir` for markdown files.
///
/// Hidden files and directories are skipped. A missing source directory
/// yields no pages. When two files map to the same path (`guide.md` and
/// `guide/index.md`) the first in source path order is kept.
pub(crate) fn scan_docs(source_dir: &Path) -> std::io::Result<Vec<DocPage>> {
    let mut pages = Vec::new();
    if source_dir.is_dir() {
        scan_directory(source_dir, source_dir, &mut pages)?;
    }

    pages.sort_by(|a, b| a.url_path.cmp(&b.url_path).then_with(|| a.source.cmp(&b.source)));
    pages.dedup_by(|dup, kept| {
        let same = dup.url_path == kept.url_path;
        if same {
            tracing::warn!(
                path = %dup.url_path,
                kept = %kept.source.display(),
                ignored = %dup.source.display(),
                "Two documents map to the same path"
            );
        }
        same
    });
    Ok(pages)
}

fn scan_directory(root: &Path, dir: &Path, pages: &mut Vec<DocPage>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }

        let path = entry.path();
        if entry.file_type()?.is_dir() {
            scan_directory(root, &path, pages)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let content = std::fs::read_to_string(&path)?;
            pages.push(DocPage {
                url_path: url_path_for(relative),
                title: extract_title(&content).unwrap_or_else(|| file_stem(&path)),
                source: path,
            });
        }
    }
    Ok(())
}

/// Route path of a markdown file relative to the source directory.
///
/// `index.md` maps to its directory; the root `index.md` maps to `/docs`.
/// Dots in the last segment become dashes (`release-1.2.md` ->
/// `/docs/release-1-2`), since a dot there marks an output extension.
fn url_path_for(relative: &Path) -> String {
    let without_ext = relative.with_extension("");
    let mut segments: Vec<String> = without_ext
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.last().is_some_and(|s| s == "index") {
        segments.pop();
    }
    if let Some(last) = segments.last_mut() {
        *last = last.replace('.', "-");
    }

    if segments.is_empty() {
        DOCS_PREFIX.to_owned()
    } else {
        format!("{DOCS_PREFIX}/{}", segments.join("/"))
    }
}

/// First level-one ATX heading of a markdown document.
fn extract_title(markdown: &str) -> Option<String> {
    markdown
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_owned)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn render_index(docs: &Docs) -> String {
    let mut body = format!("<h1>{}</h1>\n", escape_html(&docs.settings.name));
    if docs.pages.is_empty() {
        body.push_str("<p>No documents found.</p>\n");
    } else {
        body.push_str("<ul>\n");
        for page in &docs.pages {
            body.push_str(&format!(
                "<li><a href=\"{}\">{}</a></li>\n",
                escape_html(&path_to_file_path(&page.url_path)),
                escape_html(&page.title)
            ));
        }
        body.push_str("</ul>\n");
    }
    layout(&docs.settings.name, &docs.settings.name, &body)
}

fn render_doc(site_name: &str, title: &str, markdown: &str) -> String {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;

    let mut body = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut body, Parser::new_ext(markdown, options));
    layout(site_name, title, &body)
}

fn render_sitemap(docs: &Docs) -> String {
    let base = docs
        .settings
        .base_url
        .as_deref()
        .unwrap_or_default()
        .trim_end_matches('/');

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    let paths = std::iter::once(Cow::Borrowed("/"))
        .chain(docs.pages.iter().map(|p| path_to_file_path(&p.url_path)));
    for path in paths {
        xml.push_str(&format!(
            "  <url><loc>{}</loc></url>\n",
            escape_html(&format!("{base}{path}"))
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

fn layout(site_name: &str, title: &str, body: &str) -> String {
    let site_name = escape_html(site_name);
    let title = escape_html(title);
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title} | {site_name}</title>\n\
         </head>\n\
         <body>\n\
         <header><a href=\"/\">{site_name}</a></header>\n\
         <main>\n{body}</main>\n\
         </body>\n\
         </html>\n"
    )
}

/// Escape HTML special characters.
fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}
