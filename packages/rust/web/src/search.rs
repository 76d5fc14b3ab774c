//! DuckDuckGo HTML search.

use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use reviewgen_core::Searcher;
use reviewgen_shared::{
    ProductSource, Result, ReviewError, ScrapeConfig, SearchConfig, SearchResults,
};

use crate::client::{build_client, error_for_status};

static RESULT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result").expect("valid selector"));
static RESULT_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result__a").expect("valid selector"));
static RESULT_SNIPPET: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result__snippet").expect("valid selector"));

/// [`Searcher`] backed by the DuckDuckGo HTML endpoint.
#[derive(Debug, Clone)]
pub struct WebSearcher {
    client: Client,
    endpoint: Url,
    region: String,
    max_results: usize,
}

impl WebSearcher {
    pub fn new(search: &SearchConfig, scrape: &ScrapeConfig) -> Result<Self> {
        let endpoint = Url::parse(&search.endpoint).map_err(|e| {
            ReviewError::config(format!("invalid search endpoint '{}': {e}", search.endpoint))
        })?;

        Ok(Self {
            client: build_client(scrape, false)?,
            endpoint,
            region: search.region.clone(),
            max_results: search.max_results,
        })
    }
}

#[async_trait]
impl Searcher for WebSearcher {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn search(&self, query: &str) -> Result<SearchResults> {
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("q", query), ("kl", self.region.as_str())])
            .send()
            .await
            .map_err(|e| ReviewError::Network(format!("{}: {e}", self.endpoint)))?;

        let response = error_for_status("search", response).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ReviewError::Network(format!("{}: failed to read body: {e}", self.endpoint)))?;

        let sources = parse_results(&body, &self.endpoint, self.max_results);
        info!(sources = sources.len(), "search page parsed");

        Ok(SearchResults::new(sources))
    }
}

// ---------------------------------------------------------------------------
// Result page parsing
// ---------------------------------------------------------------------------

/// Extract organic results in page order, at most `max_results`.
fn parse_results(html: &str, endpoint: &Url, max_results: usize) -> Vec<ProductSource> {
    let doc = Html::parse_document(html);

    doc.select(&RESULT)
        .filter(|el| !is_ad(el))
        .filter_map(|el| parse_result(&el, endpoint))
        .take(max_results)
        .collect()
}

fn parse_result(el: &ElementRef, endpoint: &Url) -> Option<ProductSource> {
    let link = el.select(&RESULT_LINK).next()?;
    let href = link.value().attr("href")?;

    let Some(url) = unwrap_redirect(href, endpoint) else {
        debug!(href, "skipping result with unusable link");
        return None;
    };

    let title = squash(&link.text().collect::<String>());
    if title.is_empty() {
        return None;
    }

    let mut source = ProductSource::new(title, url);
    if let Some(snippet) = el.select(&RESULT_SNIPPET).next() {
        let text = squash(&snippet.text().collect::<String>());
        if !text.is_empty() {
            source = source.with_summary(text);
        }
    }
    Some(source)
}

fn is_ad(el: &ElementRef) -> bool {
    el.value()
        .classes()
        .any(|class| class == "result--ad" || class == "result--ads")
}

/// Resolve a result href to the target page, unwrapping `/l/?uddg=` redirect
/// links. Only absolute http(s) targets are kept.
fn unwrap_redirect(href: &str, endpoint: &Url) -> Option<String> {
    let resolved = endpoint.join(href).ok()?;

    let target = if resolved.path() == "/l/" {
        let (_, encoded) = resolved.query_pairs().find(|(key, _)| key == "uddg")?;
        Url::parse(&encoded).ok()?
    } else {
        resolved
    };

    match target.scheme() {
        "http" | "https" if target.host_str().is_some() => Some(target.to_string()),
        _ => None,
    }
}

fn squash(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
