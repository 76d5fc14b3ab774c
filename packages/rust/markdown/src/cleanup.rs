//! Cleanup passes applied to Markdown extracted from product pages.
//!
//! Each pass is a function `&str -> String` applied in sequence. The goal is
//! compact, readable evidence for the review writer: no images, no shop
//! chrome, no stray markup, absolute links.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Run the full cleanup pipeline on raw Markdown text.
pub(crate) fn run_pipeline(md: &str, base_url: Option<&Url>) -> String {
    let mut result = md.to_string();

    result = drop_images(&result);
    result = drop_boilerplate_lines(&result);
    result = strip_leftover_html(&result);
    result = resolve_links(&result, base_url);
    result = normalize_headings(&result);
    result = normalize_whitespace(&result);
    result = collapse_blank_lines(&result);
    result = ensure_trailing_newline(&result);

    result
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// Remove Markdown images, including linked images `[![alt](src)](href)`.
fn drop_images(md: &str) -> String {
    static LINKED_IMG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\[!\[[^\]]*\]\([^)]*\)\]\([^)]*\)").expect("valid regex")
    });
    static IMG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("valid regex"));

    let without_linked = LINKED_IMG_RE.replace_all(md, "");
    IMG_RE.replace_all(&without_linked, "").to_string()
}

// ---------------------------------------------------------------------------
// Shop and consent chrome
// ---------------------------------------------------------------------------

/// Drop short lines that are only storefront or consent-banner controls.
fn drop_boilerplate_lines(md: &str) -> String {
    static BOILERPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r"(?i)^\s*[-*]?\s*\[?(add to (cart|basket|wishlist)|buy now|share( this)?|tweet|pin it|accept( all)?( cookies)?|reject all|manage (cookies|preferences)|sign in|log in|subscribe|skip to (main )?content|back to top)\]?(\([^)]*\))?\s*$",
        )
        .expect("valid regex")
    });

    md.lines()
        .filter(|line| !BOILERPLATE_RE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Leftover HTML
// ---------------------------------------------------------------------------

/// Remove container tags that survived conversion, keeping their text.
/// Fenced code blocks are left untouched.
fn strip_leftover_html(md: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|details|summary|picture|source|button|form|label|input)(?:\s[^>]*)?/?>").expect("valid regex")
    });

    let mut lines = Vec::new();
    let mut in_code_block = false;

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_code_block = !in_code_block;
            lines.push(line.to_string());
        } else if in_code_block {
            lines.push(line.to_string());
        } else {
            lines.push(HTML_TAG_RE.replace_all(line, "").to_string());
        }
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Resolve relative link targets against the page URL.
fn resolve_links(md: &str, base_url: Option<&Url>) -> String {
    let Some(base) = base_url else {
        return md.to_string();
    };

    static LINK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex"));

    LINK_RE
        .replace_all(md, |caps: &regex::Captures| {
            let text = &caps[1];
            let href = &caps[2];

            let keep = href.starts_with("http://")
                || href.starts_with("https://")
                || href.starts_with('#')
                || href.starts_with("mailto:");
            if keep {
                return format!("[{text}]({href})");
            }

            match base.join(href) {
                Ok(resolved) => format!("[{text}]({resolved})"),
                Err(_) => format!("[{text}]({href})"),
            }
        })
        .to_string()
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// Keep at most one H1; later H1s become H2.
fn normalize_headings(md: &str) -> String {
    let mut seen_h1 = false;

    md.lines()
        .map(|line| {
            if let Some(text) = line.strip_prefix("# ") {
                if seen_h1 {
                    return format!("## {}", text.trim());
                }
                seen_h1 = true;
            }
            line.to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

fn normalize_whitespace(md: &str) -> String {
    md.lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse runs of blank lines into a single blank line.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md.trim_start_matches('\n'), "\n\n").to_string()
}

fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_end_matches('\n');
    format!("{trimmed}\n")
}
