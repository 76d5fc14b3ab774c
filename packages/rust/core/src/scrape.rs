//! Scrape stage: one attempt per unique source URL, failures dropped.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, instrument, warn};

use reviewgen_shared::{ProductSource, ScrapedContent};

use crate::pipeline::ReviewProgress;
use crate::ports::Scraper;

// ---------------------------------------------------------------------------
// ScrapedContentCache
// ---------------------------------------------------------------------------

/// Run-local map from URL to scraped content, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ScrapedContentCache {
    index: HashMap<String, usize>,
    entries: Vec<ScrapedContent>,
}

impl ScrapedContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.index.contains_key(url)
    }

    pub fn get(&self, url: &str) -> Option<&ScrapedContent> {
        self.index.get(url).map(|&i| &self.entries[i])
    }

    /// Insert keyed by `content.url`. Returns `false` when the key already
    /// existed; the value is replaced but keeps its original position.
    pub fn insert(&mut self, content: ScrapedContent) -> bool {
        match self.index.get(&content.url) {
            Some(&i) => {
                self.entries[i] = content;
                false
            }
            None => {
                self.index.insert(content.url.clone(), self.entries.len());
                self.entries.push(content);
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|c| c.url.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &ScrapedContent> {
        self.entries.iter()
    }

    pub fn into_values(self) -> Vec<ScrapedContent> {
        self.entries
    }
}

// ---------------------------------------------------------------------------
// scrape_all
// ---------------------------------------------------------------------------

/// Scrape every unique source URL in input order.
///
/// A URL is requested at most once per run. Successful responses are keyed
/// by the URL the response reports. Failed or invalid responses are logged
/// and skipped, so the returned cache may be empty.
#[instrument(skip_all, fields(sources = sources.len()))]
pub async fn scrape_all(
    scraper: &dyn Scraper,
    sources: &[ProductSource],
    progress: &dyn ReviewProgress,
) -> ScrapedContentCache {
    let mut cache = ScrapedContentCache::new();
    let mut attempted: HashSet<&str> = HashSet::new();
    let total = sources.len();

    for (i, source) in sources.iter().enumerate() {
        let url = source.url.as_str();

        if cache.contains(url) || !attempted.insert(url) {
            debug!(url, "already scraped in this run, skipping");
            continue;
        }

        let content = match scraper.scrape(url).await {
            Ok(content) => content,
            Err(e) => {
                warn!(url, error = %e, "failed to scrape source");
                progress.source_failed(url, &e.to_string());
                continue;
            }
        };

        if let Err(e) = content.validate() {
            warn!(url, error = %e, "scrape returned invalid content");
            progress.source_failed(url, &e.to_string());
            continue;
        }

        if content.url != url {
            debug!(requested = url, reported = %content.url, "scraper reported a different url");
        }

        let reported = content.url.clone();
        if !cache.insert(content) {
            warn!(url = %reported, "scraped content merged into an existing entry");
        }

        info!(url = %reported, "scraped content");
        progress.source_scraped(&reported, i + 1, total);
    }

    info!(scraped = cache.len(), requested = attempted.len(), "scrape stage complete");
    cache
}
