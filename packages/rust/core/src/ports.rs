//! Capability ports the review pipeline depends on.
//!
//! Each port is one async operation. Production implementations live in
//! `reviewgen-web` (search, scrape) and `reviewgen-llm` (synthesis); tests
//! plug in deterministic stand-ins.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use reviewgen_shared::{Result, ScrapedContent, SearchResults};

/// Finds sources about a product.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Run one search for `query`. Any error counts as a failed attempt.
    async fn search(&self, query: &str) -> Result<SearchResults>;
}

/// Extracts content from a single source URL.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Scrape `url`. Any error drops that source from the run.
    async fn scrape(&self, url: &str) -> Result<ScrapedContent>;
}

/// One incremental event emitted by the synthesis capability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisEvent {
    /// Text payload, if this event carries any.
    pub content: Option<String>,
    /// Set on the final event of a completion (`stop`, `length`, ...).
    pub finish_reason: Option<String>,
}

impl SynthesisEvent {
    /// An event carrying a text delta.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: None,
        }
    }

    /// A control event with no text (role announcement, finish marker).
    pub fn control(finish_reason: Option<String>) -> Self {
        Self {
            content: None,
            finish_reason,
        }
    }

    /// The text payload, only when present and non-empty.
    pub fn into_text(self) -> Option<String> {
        self.content.filter(|text| !text.is_empty())
    }
}

/// Lazily produced synthesis events. Dropping it stops production.
pub type SynthesisEvents = Pin<Box<dyn Stream<Item = Result<SynthesisEvent>> + Send>>;

/// Turns a serialized [`SynthesisRequest`](reviewgen_shared::SynthesisRequest)
/// into a streamed review.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Start a streaming synthesis for the JSON-encoded request.
    async fn synthesize(&self, request: &str) -> Result<SynthesisEvents>;
}
