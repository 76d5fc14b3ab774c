//! Markdown conversion in both directions.
//!
//! - [`extract_page`] turns a fetched product/review page into compact
//!   Markdown plus title and summary metadata (scrape side).
//! - [`render_html`] turns the generated review back into HTML (presentation side).

mod cleanup;
mod render;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use reviewgen_shared::{ReviewError, Result};

pub use render::{render_html, render_html_document};

/// Appended when content is cut to fit the synthesis context.
pub const TRUNCATION_MARKER: &str = "\n\n[... content truncated ...]";

/// Tags whose subtree never contributes review evidence.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "form", "button", "iframe",
    "noscript", "svg", "template",
];

/// Content containers, most specific first.
const CONTENT_SELECTORS: &[&str] = &[
    "[itemprop=\"reviewBody\"]",
    "article",
    "#productDescription",
    ".product-description",
    ".review-content",
    "[role=\"main\"]",
    "main",
    "#content",
    ".content",
];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Options for page extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Final page URL, used to resolve relative links.
    pub source_url: String,
    /// Truncate the Markdown body to this many characters.
    pub max_chars: Option<usize>,
}

/// Result of extracting a page.
#[derive(Debug, Clone)]
pub struct ExtractedPage {
    /// `<title>`, `og:title` or the first `<h1>`.
    pub title: Option<String>,
    /// `<meta name="description">` or `og:description`.
    pub summary: Option<String>,
    /// Cleaned Markdown body. Empty when the page had no readable content.
    pub markdown: String,
    /// Approximate word count of the body before truncation.
    pub word_count: usize,
    /// Whether `markdown` was cut at `max_chars`.
    pub truncated: bool,
}

impl ExtractedPage {
    /// The body, or `None` if nothing readable was extracted.
    pub fn content(&self) -> Option<&str> {
        let body = self.markdown.trim();
        (!body.is_empty()).then_some(body)
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Extract metadata and Markdown content from an HTML page.
///
/// 1. Read title and summary from the document head
/// 2. Pick the main content container
/// 3. Pre-process tables (spec sheets) into Markdown tables
/// 4. Convert HTML → Markdown via `htmd`
/// 5. Run the cleanup passes and truncate
#[instrument(skip(html), fields(url = %opts.source_url))]
pub fn extract_page(html: &str, opts: &ExtractOptions) -> Result<ExtractedPage> {
    let doc = Html::parse_document(html);

    let title = page_title(&doc);
    let summary = page_summary(&doc);

    let content_html = preprocess_tables(&content_html(&doc, html));

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();
    let raw_markdown = converter
        .convert(&content_html)
        .map_err(|e| ReviewError::parse(format!("htmd conversion failed: {e}")))?;

    let base_url = Url::parse(&opts.source_url).ok();
    let cleaned = cleanup::run_pipeline(&raw_markdown, base_url.as_ref());
    let cleaned = if cleaned.trim().is_empty() {
        String::new()
    } else {
        cleaned
    };

    let word_count = cleaned.split_whitespace().count();
    let (markdown, truncated) = match opts.max_chars {
        Some(max) => truncate_chars(&cleaned, max),
        None => (cleaned, false),
    };

    debug!(
        title = title.as_deref().unwrap_or(""),
        word_count,
        truncated,
        "page extracted"
    );

    Ok(ExtractedPage {
        title,
        summary,
        markdown,
        word_count,
        truncated,
    })
}

/// Cut `text` to at most `max_chars` characters on a char boundary,
/// appending [`TRUNCATION_MARKER`] when anything was removed.
pub fn truncate_chars(text: &str, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        None => (text.to_string(), false),
        Some((byte_idx, _)) => {
            let head = text[..byte_idx].trim_end();
            (format!("{head}{TRUNCATION_MARKER}"), true)
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

fn page_title(doc: &Html) -> Option<String> {
    first_text(doc, "title")
        .or_else(|| meta_content(doc, "meta[property=\"og:title\"]"))
        .or_else(|| first_text(doc, "h1"))
}

fn page_summary(doc: &Html) -> Option<String> {
    meta_content(doc, "meta[name=\"description\"]")
        .or_else(|| meta_content(doc, "meta[property=\"og:description\"]"))
}

fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .map(|el| collapse_spaces(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn meta_content(doc: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_spaces)
        .find(|text| !text.is_empty())
}

fn collapse_spaces(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
    WS_RE.replace_all(text.trim(), " ").to_string()
}

// ---------------------------------------------------------------------------
// Content selection
// ---------------------------------------------------------------------------

/// Inner HTML of the first non-empty content container, else `<body>`,
/// else the input.
fn content_html(doc: &Html, raw: &str) -> String {
    for sel_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(sel_str) else {
            continue;
        };
        if let Some(el) = doc
            .select(&selector)
            .find(|el| !el.text().collect::<String>().trim().is_empty())
        {
            return el.inner_html();
        }
    }

    static BODY: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("body").expect("valid selector"));
    match doc.select(&BODY).next() {
        Some(body) => body.inner_html(),
        None => raw.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Replace `<table>` elements with Markdown tables before htmd runs,
/// since htmd 0.1 drops table structure.
fn preprocess_tables(html: &str) -> String {
    static TABLE: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("table").expect("valid selector"));

    let doc = Html::parse_fragment(html);
    let mut result = html.to_string();

    for table in doc.select(&TABLE) {
        let markdown = table_to_markdown(&table);
        result = result.replacen(&table.html(), &markdown, 1);
    }

    result
}

/// Render one table. The first row is the header; `th`-only first columns
/// (typical of spec sheets) are kept as regular cells.
fn table_to_markdown(table: &ElementRef) -> String {
    static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").expect("valid selector"));
    static CELL: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("th, td").expect("valid selector"));

    let mut rows: Vec<Vec<String>> = table
        .select(&ROW)
        .map(|tr| {
            tr.select(&CELL)
                .map(|cell| collapse_spaces(&cell.text().collect::<String>()).replace('|', "\\|"))
                .collect::<Vec<_>>()
        })
        .filter(|cells| !cells.is_empty())
        .collect();

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return String::new();
    }
    for row in &mut rows {
        row.resize(width, String::new());
    }

    let line = |cells: &[String]| format!("| {} |\n", cells.join(" | "));
    let mut md = String::from("\n\n");
    md.push_str(&line(&rows[0]));
    md.push_str(&line(&vec!["---".to_string(); width]));
    for row in &rows[1..] {
        md.push_str(&line(row));
    }
    md.push('\n');
    md
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
