//! Structured result types exchanged between the pipeline and its capabilities.
//!
//! All of these are plain data: created during one review run and dropped
//! with it. `validate()` is the schema check applied at the capability
//! boundary; anything that fails it is treated as a failed attempt/source.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ReviewError, Result};

// ---------------------------------------------------------------------------
// ProductSource / SearchResults
// ---------------------------------------------------------------------------

/// A discovered reference about the product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSource {
    /// Title of the source.
    pub title: String,
    /// Link to the source. Unique key within one run.
    pub url: String,
    /// Short summary, if the search capability provided one.
    #[serde(default)]
    pub summary: Option<String>,
}

impl ProductSource {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Check required fields: non-blank title and an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        require_title(&self.title, &self.url)?;
        require_web_url(&self.url)
    }
}

/// Ordered search results, in the order the search capability ranked them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(alias = "product_sources")]
    pub sources: Vec<ProductSource>,
}

impl SearchResults {
    pub fn new(sources: Vec<ProductSource>) -> Self {
        Self { sources }
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Validate every source. One bad source invalidates the whole result.
    pub fn validate(&self) -> Result<()> {
        for (i, source) in self.sources.iter().enumerate() {
            source
                .validate()
                .map_err(|e| ReviewError::validation(format!("source #{}: {e}", i + 1)))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScrapedContent
// ---------------------------------------------------------------------------

/// Extracted body and metadata from one source URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedContent {
    pub title: String,
    /// URL as reported by the scrape capability (may differ from the request).
    pub url: String,
    #[serde(default)]
    pub summary: Option<String>,
    /// Page body in Markdown. `None` when extraction yielded nothing.
    #[serde(default)]
    pub content: Option<String>,
}

impl ScrapedContent {
    /// Same required-field rules as [`ProductSource::validate`].
    /// A missing `content` is a valid terminal state.
    pub fn validate(&self) -> Result<()> {
        require_title(&self.title, &self.url)?;
        require_web_url(&self.url)
    }
}

// ---------------------------------------------------------------------------
// SynthesisRequest
// ---------------------------------------------------------------------------

/// Input handed to the synthesis capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub product_name: String,
    pub sources: Vec<ScrapedContent>,
}

impl SynthesisRequest {
    /// Serialize to the pretty JSON document the synthesis capability reads.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ReviewError::parse(format!("failed to serialize synthesis request: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_title(title: &str, url: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(ReviewError::validation(format!("missing title for {url}")));
    }
    Ok(())
}

fn require_web_url(raw: &str) -> Result<()> {
    let url = Url::parse(raw)
        .map_err(|e| ReviewError::validation(format!("invalid url '{raw}': {e}")))?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(()),
        other => Err(ReviewError::validation(format!(
            "unsupported url '{raw}' (scheme {other})"
        ))),
    }
}
