//! Single-page scraping into Markdown evidence.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};
use url::Url;

use reviewgen_core::Scraper;
use reviewgen_markdown::{ExtractOptions, extract_page};
use reviewgen_shared::{Result, ReviewError, ScrapeConfig, ScrapedContent};

use crate::client::{build_client, error_for_status, is_blocked_target};

/// [`Scraper`] that fetches a page over HTTP and extracts its main content.
#[derive(Debug, Clone)]
pub struct PageScraper {
    client: Client,
    max_content_chars: usize,
    allow_private_hosts: bool,
}

impl PageScraper {
    /// Scraper that refuses loopback and private-network targets, including
    /// redirect hops.
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        Self::build(config, false)
    }

    /// Scraper that also reaches loopback and private-network targets (local
    /// mirrors, tests).
    pub fn allowing_private_hosts(config: &ScrapeConfig) -> Result<Self> {
        Self::build(config, true)
    }

    fn build(config: &ScrapeConfig, allow_private_hosts: bool) -> Result<Self> {
        Ok(Self {
            client: build_client(config, !allow_private_hosts)?,
            max_content_chars: config.max_content_chars,
            allow_private_hosts,
        })
    }

    fn check_target(&self, url: &Url) -> Result<()> {
        if !self.allow_private_hosts && is_blocked_target(url) {
            return Err(ReviewError::validation(format!(
                "refusing to scrape non-public address: {url}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Scraper for PageScraper {
    #[instrument(skip(self))]
    async fn scrape(&self, url: &str) -> Result<ScrapedContent> {
        let requested = Url::parse(url)
            .map_err(|e| ReviewError::validation(format!("invalid url '{url}': {e}")))?;
        self.check_target(&requested)?;

        let response = self
            .client
            .get(requested)
            .send()
            .await
            .map_err(|e| send_error(url, &e))?;

        let final_url = response.url().clone();
        self.check_target(&final_url)?;

        let response = error_for_status(final_url.as_str(), response).await?;

        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_html(content_type) {
                return Err(ReviewError::validation(format!(
                    "{final_url}: unsupported content type '{content_type}'"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| ReviewError::Network(format!("{final_url}: failed to read body: {e}")))?;

        let page = extract_page(
            &body,
            &ExtractOptions {
                source_url: final_url.to_string(),
                max_chars: Some(self.max_content_chars),
            },
        )?;

        if final_url.as_str() != url {
            debug!(requested = url, %final_url, "followed redirect");
        }

        Ok(ScrapedContent {
            title: page.title.clone().unwrap_or_else(|| final_url.to_string()),
            url: final_url.to_string(),
            summary: page.summary.clone(),
            content: page.content().map(str::to_string),
        })
    }
}

/// Refused redirects are a validation failure, everything else is network.
fn send_error(url: &str, e: &reqwest::Error) -> ReviewError {
    if e.is_redirect() {
        let reason = std::error::Error::source(e)
            .map(ToString::to_string)
            .unwrap_or_else(|| e.to_string());
        ReviewError::validation(format!("{url}: {reason}"))
    } else {
        ReviewError::Network(format!("{url}: {e}"))
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}
