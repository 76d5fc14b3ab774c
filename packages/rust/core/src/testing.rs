//! Deterministic capability stand-ins for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;

use reviewgen_shared::{
    ProductSource, Result, ReviewError, ScrapedContent, SearchResults, SynthesisRequest,
};

use crate::ports::{Scraper, Searcher, SynthesisEvent, SynthesisEvents, Synthesizer};

pub(crate) fn source(url: &str) -> ProductSource {
    ProductSource::new(format!("Source {url}"), url)
}

pub(crate) fn results(urls: &[&str]) -> SearchResults {
    SearchResults::new(urls.iter().map(|u| source(u)).collect())
}

pub(crate) fn page(url: &str) -> ScrapedContent {
    ScrapedContent {
        title: format!("Page {url}"),
        url: url.to_string(),
        summary: None,
        content: Some(format!("content of {url}")),
    }
}

// ---------------------------------------------------------------------------
// Searcher
// ---------------------------------------------------------------------------

/// Replays scripted responses in order; errors once the script runs out.
pub(crate) struct ScriptedSearcher {
    script: Mutex<VecDeque<Result<SearchResults>>>,
    pub(crate) queries: Mutex<Vec<String>>,
}

impl ScriptedSearcher {
    pub(crate) fn new(script: Vec<Result<SearchResults>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Fails `failures` times, then returns `then`.
    pub(crate) fn failing_then(failures: usize, then: SearchResults) -> Self {
        let mut script: Vec<Result<SearchResults>> = (0..failures)
            .map(|i| Err(ReviewError::Network(format!("search attempt {i} refused"))))
            .collect();
        script.push(Ok(then));
        Self::new(script)
    }

    pub(crate) fn always_failing() -> Self {
        Self::new(Vec::new())
    }

    pub(crate) fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl Searcher for ScriptedSearcher {
    async fn search(&self, query: &str) -> Result<SearchResults> {
        self.queries.lock().unwrap().push(query.to_string());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ReviewError::Network("search backend unavailable".into())))
    }
}

// ---------------------------------------------------------------------------
// Scraper
// ---------------------------------------------------------------------------

/// Serves canned pages by request URL; unknown URLs fail.
#[derive(Default)]
pub(crate) struct MapScraper {
    pages: HashMap<String, ScrapedContent>,
    pub(crate) requested: Mutex<Vec<String>>,
}

impl MapScraper {
    pub(crate) fn with_page(mut self, request_url: &str, content: ScrapedContent) -> Self {
        self.pages.insert(request_url.to_string(), content);
        self
    }

    pub(crate) fn calls_for(&self, url: &str) -> usize {
        self.requested
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.requested.lock().unwrap().len()
    }
}

#[async_trait]
impl Scraper for MapScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedContent> {
        self.requested.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| ReviewError::Network(format!("{url}: connection reset")))
    }
}

// ---------------------------------------------------------------------------
// Synthesizer
// ---------------------------------------------------------------------------

/// Streams scripted events and records every request it receives.
pub(crate) struct ScriptedSynthesizer {
    events: Vec<Result<SynthesisEvent>>,
    fail_on_start: bool,
    pub(crate) requests: Mutex<Vec<SynthesisRequest>>,
    /// Number of events the consumer actually pulled.
    pub(crate) pulled: Arc<AtomicUsize>,
}

impl ScriptedSynthesizer {
    pub(crate) fn new(events: Vec<Result<SynthesisEvent>>) -> Self {
        Self {
            events,
            fail_on_start: false,
            requests: Mutex::new(Vec::new()),
            pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn texts(chunks: &[&str]) -> Self {
        Self::new(chunks.iter().map(|c| Ok(SynthesisEvent::text(*c))).collect())
    }

    pub(crate) fn failing_on_start() -> Self {
        Self {
            fail_on_start: true,
            ..Self::new(Vec::new())
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn last_request(&self) -> Option<SynthesisRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub(crate) fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Synthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, request: &str) -> Result<SynthesisEvents> {
        let parsed: SynthesisRequest = serde_json::from_str(request)
            .map_err(|e| ReviewError::parse(format!("bad synthesis request: {e}")))?;
        self.requests.lock().unwrap().push(parsed);

        if self.fail_on_start {
            return Err(ReviewError::http("chat completions", 401, "invalid api_key"));
        }

        let events: Vec<Result<SynthesisEvent>> = self
            .events
            .iter()
            .map(|e| match e {
                Ok(event) => Ok(event.clone()),
                Err(err) => Err(ReviewError::Synthesis(err.to_string())),
            })
            .collect();

        let pulled = Arc::clone(&self.pulled);
        let stream = futures::stream::iter(events).map(move |event| {
            pulled.fetch_add(1, Ordering::SeqCst);
            event
        });

        Ok(Box::pin(stream))
    }
}
