//! End-to-end review pipeline: product name → search → scrape → synthesize → chunks.

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use reviewgen_shared::{DEFAULT_QUERY_SUFFIX, ProductSource, Result, SearchConfig, SynthesisRequest};

use crate::ports::{Scraper, Searcher, Synthesizer};
use crate::scrape::{self, ScrapedContentCache};
use crate::search::{self, SearchOutcome};

/// Default number of search attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Lazily produced review text. Dropping it abandons the run.
pub type ReviewStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// The single chunk emitted when search finds nothing.
pub fn not_found_message(product_name: &str) -> String {
    format!("Sorry, could not find any information about the product: {product_name}")
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Tunables for one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Sequential search attempts before giving up.
    pub max_attempts: u32,
    /// Appended to the product name to form the search query.
    pub query_suffix: String,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            query_suffix: DEFAULT_QUERY_SUFFIX.to_string(),
        }
    }
}

impl From<&SearchConfig> for PipelineOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            query_suffix: config.query_suffix.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ReviewProgress: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after a source was scraped successfully.
    fn source_scraped(&self, url: &str, current: usize, total: usize);
    /// Called when a source was dropped.
    fn source_failed(&self, url: &str, error: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ReviewProgress for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn source_scraped(&self, _url: &str, _current: usize, _total: usize) {}
    fn source_failed(&self, _url: &str, _error: &str) {}
}

// ---------------------------------------------------------------------------
// ReviewPipeline
// ---------------------------------------------------------------------------

/// Coordinates the search, scrape and synthesis capabilities.
///
/// The pipeline holds no per-run state; every [`run`](Self::run) builds its
/// own cache, so one instance can serve concurrent runs.
#[derive(Clone)]
pub struct ReviewPipeline {
    searcher: Arc<dyn Searcher>,
    scraper: Arc<dyn Scraper>,
    synthesizer: Arc<dyn Synthesizer>,
    progress: Arc<dyn ReviewProgress>,
    options: PipelineOptions,
}

impl ReviewPipeline {
    pub fn new(
        searcher: Arc<dyn Searcher>,
        scraper: Arc<dyn Scraper>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            searcher,
            scraper,
            synthesizer,
            progress: Arc::new(SilentProgress),
            options: PipelineOptions::default(),
        }
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ReviewProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Search stage on its own (see [`search::get_search_results`]).
    pub async fn get_search_results(&self, product_name: &str) -> SearchOutcome {
        let query = search::build_query(product_name, &self.options.query_suffix);
        search::get_search_results(self.searcher.as_ref(), &query, self.options.max_attempts).await
    }

    /// Scrape stage on its own (see [`scrape::scrape_all`]).
    pub async fn scrape_all(&self, sources: &[ProductSource]) -> ScrapedContentCache {
        scrape::scrape_all(self.scraper.as_ref(), sources, self.progress.as_ref()).await
    }

    /// Generate a review for `product_name` as a stream of text chunks.
    ///
    /// Nothing happens until the stream is first polled. Each capability call
    /// is made only when the consumer asks for the next chunk, and dropping
    /// the stream stops the run. Search and scrape failures are absorbed;
    /// synthesis failures end the stream with an error item.
    pub fn run(&self, product_name: &str) -> ReviewStream {
        let pipeline = self.clone();
        let product_name = product_name.to_string();
        let run_id = Uuid::now_v7();
        let span = info_span!("review_run", %run_id, product = %product_name);

        let stream = async_stream::try_stream! {
            info!(parent: &span, "generating product review");

            pipeline.progress.phase("Searching for sources");
            let found = pipeline
                .get_search_results(&product_name)
                .instrument(span.clone())
                .await
                .into_sources();

            if let Some(results) = found {
                pipeline.progress.phase("Scraping sources");
                let cache = pipeline
                    .scrape_all(&results.sources)
                    .instrument(span.clone())
                    .await;

                pipeline.progress.phase("Writing review");
                let request = SynthesisRequest {
                    product_name: product_name.clone(),
                    sources: cache.into_values(),
                };
                info!(parent: &span, sources = request.sources.len(), "starting synthesis");

                let payload = request.to_json()?;
                let mut events = pipeline
                    .synthesizer
                    .synthesize(&payload)
                    .instrument(span.clone())
                    .await?;

                let mut chunks = 0usize;
                while let Some(event) = events.next().await {
                    if let Some(text) = event?.into_text() {
                        chunks += 1;
                        yield text;
                    }
                }
                info!(parent: &span, chunks, "review stream complete");
            } else {
                info!(parent: &span, "no sources found, ending run");
                yield not_found_message(&product_name);
            }
        };

        Box::pin(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::SynthesisEvent;
    use crate::testing::{MapScraper, ScriptedSearcher, ScriptedSynthesizer, page, results};
    use futures::TryStreamExt;
    use reviewgen_shared::ReviewError;
    use std::sync::Mutex;

    fn pipeline(
        searcher: &Arc<ScriptedSearcher>,
        scraper: &Arc<MapScraper>,
        synthesizer: &Arc<ScriptedSynthesizer>,
    ) -> ReviewPipeline {
        ReviewPipeline::new(searcher.clone(), scraper.clone(), synthesizer.clone())
    }

    async fn collect(stream: ReviewStream) -> Vec<String> {
        stream.try_collect().await.expect("stream should succeed")
    }

    #[tokio::test]
    async fn two_sources_stream_in_order() {
        let searcher = Arc::new(ScriptedSearcher::failing_then(
            0,
            results(&["https://a.example.com", "https://b.example.com"]),
        ));
        let scraper = Arc::new(
            MapScraper::default()
                .with_page("https://a.example.com", page("https://a.example.com"))
                .with_page("https://b.example.com", page("https://b.example.com")),
        );
        let synthesizer = Arc::new(ScriptedSynthesizer::texts(&["# Review", "\n\nGreat widget."]));

        let chunks = collect(pipeline(&searcher, &scraper, &synthesizer).run("Widget X")).await;

        assert_eq!(chunks, vec!["# Review", "\n\nGreat widget."]);
        let request = synthesizer.last_request().unwrap();
        assert_eq!(request.product_name, "Widget X");
        assert_eq!(request.sources.len(), 2);
        assert_eq!(request.sources[0].url, "https://a.example.com");
    }

    #[tokio::test]
    async fn search_exhaustion_yields_single_message() {
        let searcher = Arc::new(ScriptedSearcher::always_failing());
        let scraper = Arc::new(MapScraper::default());
        let synthesizer = Arc::new(ScriptedSynthesizer::texts(&["unused"]));

        let chunks = collect(pipeline(&searcher, &scraper, &synthesizer).run("Widget X")).await;

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("Widget X"));
        assert_eq!(searcher.calls(), 3);
        assert_eq!(scraper.total_calls(), 0);
        assert_eq!(synthesizer.calls(), 0);
    }

    #[tokio::test]
    async fn empty_search_results_yield_single_message() {
        let searcher = Arc::new(ScriptedSearcher::failing_then(0, results(&[])));
        let scraper = Arc::new(MapScraper::default());
        let synthesizer = Arc::new(ScriptedSynthesizer::texts(&["unused"]));

        let chunks = collect(pipeline(&searcher, &scraper, &synthesizer).run("Widget X")).await;

        assert_eq!(chunks, vec![not_found_message("Widget X")]);
        assert_eq!(searcher.calls(), 1);
        assert_eq!(synthesizer.calls(), 0);
    }

    #[tokio::test]
    async fn duplicate_and_failing_sources() {
        let searcher = Arc::new(ScriptedSearcher::failing_then(
            0,
            results(&["https://a.example.com", "https://a.example.com", "https://b.example.com"]),
        ));
        let scraper = Arc::new(
            MapScraper::default().with_page("https://a.example.com", page("https://a.example.com")),
        );
        let synthesizer = Arc::new(ScriptedSynthesizer::texts(&["ok"]));

        collect(pipeline(&searcher, &scraper, &synthesizer).run("Widget X")).await;

        assert_eq!(scraper.calls_for("https://a.example.com"), 1);
        assert_eq!(scraper.calls_for("https://b.example.com"), 1);
        let request = synthesizer.last_request().unwrap();
        assert_eq!(request.sources.len(), 1);
        assert_eq!(request.sources[0].url, "https://a.example.com");
    }

    #[tokio::test]
    async fn partial_scrape_failures_still_synthesize() {
        let urls = [
            "https://a.example.com",
            "https://b.example.com",
            "https://c.example.com",
            "https://d.example.com",
            "https://e.example.com",
        ];
        let searcher = Arc::new(ScriptedSearcher::failing_then(0, results(&urls)));
        let scraper = Arc::new(
            MapScraper::default()
                .with_page(urls[1], page(urls[1]))
                .with_page(urls[3], page(urls[3])),
        );
        let synthesizer = Arc::new(ScriptedSynthesizer::texts(&["ok"]));

        collect(pipeline(&searcher, &scraper, &synthesizer).run("Widget X")).await;

        let request = synthesizer.last_request().unwrap();
        let got: Vec<&str> = request.sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(got, vec![urls[1], urls[3]]);
    }

    #[tokio::test]
    async fn all_scrapes_failing_still_synthesizes_with_no_sources() {
        let searcher = Arc::new(ScriptedSearcher::failing_then(0, results(&["https://a.example.com"])));
        let scraper = Arc::new(MapScraper::default());
        let synthesizer = Arc::new(ScriptedSynthesizer::texts(&["From general knowledge."]));

        let chunks = collect(pipeline(&searcher, &scraper, &synthesizer).run("Widget X")).await;

        assert_eq!(chunks, vec!["From general knowledge."]);
        assert_eq!(synthesizer.calls(), 1);
        assert!(synthesizer.last_request().unwrap().sources.is_empty());
    }

    #[tokio::test]
    async fn only_non_empty_text_payloads_are_forwarded() {
        let searcher = Arc::new(ScriptedSearcher::failing_then(0, results(&["https://a.example.com"])));
        let scraper = Arc::new(MapScraper::default());
        let synthesizer = Arc::new(ScriptedSynthesizer::new(vec![
            Ok(SynthesisEvent::control(None)),
            Ok(SynthesisEvent::text("A")),
            Ok(SynthesisEvent::text("")),
            Ok(SynthesisEvent::text("B")),
            Ok(SynthesisEvent::text("A")),
            Ok(SynthesisEvent::control(Some("stop".into()))),
        ]));

        let chunks = collect(pipeline(&searcher, &scraper, &synthesizer).run("Widget X")).await;

        assert_eq!(chunks, vec!["A", "B", "A"]);
    }

    #[tokio::test]
    async fn search_retries_then_synthesizes() {
        let searcher = Arc::new(ScriptedSearcher::failing_then(2, results(&["https://a.example.com"])));
        let scraper = Arc::new(
            MapScraper::default().with_page("https://a.example.com", page("https://a.example.com")),
        );
        let synthesizer = Arc::new(ScriptedSynthesizer::texts(&["done"]));

        let chunks = collect(pipeline(&searcher, &scraper, &synthesizer).run("Widget X")).await;

        assert_eq!(chunks, vec!["done"]);
        assert_eq!(searcher.calls(), 3);
        let queries = searcher.queries.lock().unwrap().clone();
        assert!(queries.iter().all(|q| q == "Widget X review specifications features pros cons"));
    }

    #[tokio::test]
    async fn synthesis_start_failure_propagates() {
        let searcher = Arc::new(ScriptedSearcher::failing_then(0, results(&["https://a.example.com"])));
        let scraper = Arc::new(MapScraper::default());
        let synthesizer = Arc::new(ScriptedSynthesizer::failing_on_start());

        let result: Result<Vec<String>> =
            pipeline(&searcher, &scraper, &synthesizer).run("Widget X").try_collect().await;

        let err = result.unwrap_err();
        assert!(matches!(err, ReviewError::Http { status: 401, .. }));
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_delivered_chunks() {
        let searcher = Arc::new(ScriptedSearcher::failing_then(0, results(&["https://a.example.com"])));
        let scraper = Arc::new(MapScraper::default());
        let synthesizer = Arc::new(ScriptedSynthesizer::new(vec![
            Ok(SynthesisEvent::text("first")),
            Err(ReviewError::Network("connection reset".into())),
            Ok(SynthesisEvent::text("never")),
        ]));

        let mut stream = pipeline(&searcher, &scraper, &synthesizer).run("Widget X");
        let mut delivered = Vec::new();
        let mut failure = None;
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => delivered.push(chunk),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        assert_eq!(delivered, vec!["first"]);
        assert!(failure.unwrap().to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn abandoning_the_stream_stops_pulling_events() {
        let searcher = Arc::new(ScriptedSearcher::failing_then(0, results(&["https://a.example.com"])));
        let scraper = Arc::new(MapScraper::default());
        let synthesizer = Arc::new(ScriptedSynthesizer::texts(&["1", "2", "3", "4", "5"]));

        let mut stream = pipeline(&searcher, &scraper, &synthesizer).run("Widget X");
        let first = stream.next().await.unwrap().unwrap();
        drop(stream);

        assert_eq!(first, "1");
        assert_eq!(synthesizer.pulled(), 1);
    }

    #[tokio::test]
    async fn run_is_lazy_until_polled() {
        let searcher = Arc::new(ScriptedSearcher::failing_then(0, results(&["https://a.example.com"])));
        let scraper = Arc::new(MapScraper::default());
        let synthesizer = Arc::new(ScriptedSynthesizer::texts(&["x"]));

        let stream = pipeline(&searcher, &scraper, &synthesizer).run("Widget X");
        assert_eq!(searcher.calls(), 0);
        drop(stream);
        assert_eq!(searcher.calls(), 0);
    }

    #[tokio::test]
    async fn each_run_starts_fresh() {
        let searcher = Arc::new(ScriptedSearcher::new(vec![
            Ok(results(&["https://a.example.com"])),
            Ok(results(&["https://a.example.com"])),
        ]));
        let scraper = Arc::new(
            MapScraper::default().with_page("https://a.example.com", page("https://a.example.com")),
        );
        let synthesizer = Arc::new(ScriptedSynthesizer::texts(&["x"]));
        let pipeline = pipeline(&searcher, &scraper, &synthesizer);

        collect(pipeline.run("Widget X")).await;
        collect(pipeline.run("Widget X")).await;

        assert_eq!(searcher.calls(), 2);
        assert_eq!(scraper.calls_for("https://a.example.com"), 2);
        assert_eq!(synthesizer.calls(), 2);
    }

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
        failed: Mutex<Vec<String>>,
    }

    impl ReviewProgress for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn source_scraped(&self, _url: &str, _current: usize, _total: usize) {}
        fn source_failed(&self, url: &str, _error: &str) {
            self.failed.lock().unwrap().push(url.to_string());
        }
    }

    #[tokio::test]
    async fn progress_reports_phases_and_failures() {
        let searcher = Arc::new(ScriptedSearcher::failing_then(0, results(&["https://a.example.com"])));
        let scraper = Arc::new(MapScraper::default());
        let synthesizer = Arc::new(ScriptedSynthesizer::texts(&["x"]));
        let progress = Arc::new(RecordingProgress::default());

        let pipeline = pipeline(&searcher, &scraper, &synthesizer).with_progress(progress.clone());
        collect(pipeline.run("Widget X")).await;

        assert_eq!(
            *progress.phases.lock().unwrap(),
            vec!["Searching for sources", "Scraping sources", "Writing review"]
        );
        assert_eq!(*progress.failed.lock().unwrap(), vec!["https://a.example.com"]);
    }

    #[tokio::test]
    async fn options_control_attempts_and_query() {
        let searcher = Arc::new(ScriptedSearcher::always_failing());
        let scraper = Arc::new(MapScraper::default());
        let synthesizer = Arc::new(ScriptedSynthesizer::texts(&["x"]));
        let options = PipelineOptions {
            max_attempts: 5,
            query_suffix: "specs".into(),
        };

        let pipeline = pipeline(&searcher, &scraper, &synthesizer).with_options(options);
        assert_eq!(pipeline.get_search_results("Widget X").await, SearchOutcome::NotFound);

        assert_eq!(searcher.calls(), 5);
        assert_eq!(searcher.queries.lock().unwrap()[0], "Widget X specs");
    }
}
