//! Presentation of review results: failure classification, the empty-output
//! notice and file output.

use std::fmt;
use std::path::Path;

use reviewgen_markdown::render_html_document;
use reviewgen_shared::{Result, ReviewError};

/// Shown when a run finished without producing any visible text.
pub(crate) const NOTHING_GENERATED: &str = "No review was generated. This might be due to API rate limits \
or the product not being found. Please try again or try a different product.";

/// Shown when the product name is blank.
pub(crate) const EMPTY_PRODUCT: &str = "Please enter a product name.";

/// Whether the accumulated review has nothing worth showing.
pub(crate) fn is_blank(review: &str) -> bool {
    review.trim().is_empty()
}

// ---------------------------------------------------------------------------
// Failure classification
// ---------------------------------------------------------------------------

/// Broad failure classes shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCategory {
    Authentication,
    RateLimit,
    Connectivity,
    Unclassified,
}

impl ErrorCategory {
    /// Classify from the lowercase error text. Checks run in order, so an
    /// auth failure that mentions a timeout is still an auth failure.
    pub(crate) fn classify(detail: &str) -> Self {
        let lower = detail.to_lowercase();
        let any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

        if any(&["api_key", "api key", "authentication", "401", "403"]) {
            Self::Authentication
        } else if any(&[
            "rate limit",
            "rate_limit",
            "rate-limit",
            "ratelimit",
            "too many requests",
            "quota",
            "429",
        ]) {
            Self::RateLimit
        } else if any(&["connection", "timeout", "timed out", "dns"]) {
            Self::Connectivity
        } else {
            Self::Unclassified
        }
    }

    pub(crate) fn headline(self) -> &'static str {
        match self {
            Self::Authentication => {
                "API key error: your API key appears to be invalid or doesn't have access. \
                 Check the key and try again."
            }
            Self::RateLimit => {
                "Rate limit/quota error: you've exceeded your API rate limit or quota. \
                 Wait and try again, or check your account billing."
            }
            Self::Connectivity => {
                "Connection error: could not reach the API. Check your internet connection and try again."
            }
            Self::Unclassified => "Error: review generation failed.",
        }
    }
}

/// A user-facing failure: headline plus the raw technical detail.
#[derive(Debug)]
pub(crate) struct FailureReport {
    pub category: ErrorCategory,
    pub detail: String,
}

impl FailureReport {
    pub(crate) fn new(detail: impl fmt::Display) -> Self {
        let detail = detail.to_string();
        Self {
            category: ErrorCategory::classify(&detail),
            detail,
        }
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.category.headline())?;
        writeln!(f)?;
        write!(f, "Technical details: {}", self.detail)
    }
}

// ---------------------------------------------------------------------------
// File output
// ---------------------------------------------------------------------------

/// Write the raw Markdown review.
pub(crate) fn write_markdown(path: &Path, review: &str) -> Result<()> {
    write_file(path, review)
}

/// Write the review rendered as a standalone HTML page.
pub(crate) fn write_html(path: &Path, product_name: &str, review: &str) -> Result<()> {
    let title = format!("{product_name} review");
    write_file(path, &render_html_document(&title, review))
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ReviewError::io(parent, e))?;
    }
    std::fs::write(path, contents).map_err(|e| ReviewError::io(path, e))
}
