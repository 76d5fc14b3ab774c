//! Search stage: bounded, sequential retries against the search capability.

use tracing::{error, info, instrument, warn};

use reviewgen_shared::SearchResults;

use crate::ports::Searcher;

/// Outcome of the search stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// A response passed validation. May still hold zero sources.
    Found(SearchResults),
    /// Every attempt failed.
    NotFound,
}

impl SearchOutcome {
    /// Sources to scrape, or `None` when the run should stop with the
    /// "no information found" message. An empty result counts as not found.
    pub fn into_sources(self) -> Option<SearchResults> {
        match self {
            Self::Found(results) if !results.is_empty() => Some(results),
            _ => None,
        }
    }
}

/// Build the research query for a product.
pub fn build_query(product_name: &str, suffix: &str) -> String {
    let suffix = suffix.trim();
    if suffix.is_empty() {
        product_name.trim().to_string()
    } else {
        format!("{} {suffix}", product_name.trim())
    }
}

/// Query the search capability up to `max_attempts` times.
///
/// Attempts run one after another with no delay. An error or a response that
/// fails validation is logged and retried; the first valid response wins.
#[instrument(skip(searcher), fields(query = %query))]
pub async fn get_search_results(
    searcher: &dyn Searcher,
    query: &str,
    max_attempts: u32,
) -> SearchOutcome {
    for attempt in 1..=max_attempts {
        match searcher.search(query).await {
            Ok(results) => match results.validate() {
                Ok(()) => {
                    info!(attempt, sources = results.len(), "search succeeded");
                    return SearchOutcome::Found(results);
                }
                Err(e) => {
                    warn!(attempt, max_attempts, error = %e, "search attempt returned invalid results");
                }
            },
            Err(e) => {
                warn!(attempt, max_attempts, error = %e, "search attempt failed");
            }
        }
    }

    error!(max_attempts, "failed to get search results after all attempts");
    SearchOutcome::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedSearcher, results};
    use reviewgen_shared::{ProductSource, ReviewError};

    #[test]
    fn query_appends_suffix() {
        assert_eq!(
            build_query("Widget X", "review specifications features pros cons"),
            "Widget X review specifications features pros cons"
        );
        assert_eq!(build_query("  Widget X ", ""), "Widget X");
    }

    #[tokio::test]
    async fn first_success_returns_immediately() {
        let searcher = ScriptedSearcher::failing_then(0, results(&["https://a.example.com"]));
        let outcome = get_search_results(&searcher, "q", 3).await;
        assert!(matches!(outcome, SearchOutcome::Found(ref r) if r.len() == 1));
        assert_eq!(searcher.calls(), 1);
    }

    #[tokio::test]
    async fn succeeds_on_attempt_after_failures() {
        for k in 0..3u32 {
            let searcher =
                ScriptedSearcher::failing_then(k as usize, results(&["https://a.example.com"]));
            let outcome = get_search_results(&searcher, "q", 3).await;
            assert!(matches!(outcome, SearchOutcome::Found(_)), "k={k}");
            assert_eq!(searcher.calls(), k as usize + 1, "k={k}");
        }
    }

    #[tokio::test]
    async fn exhaustion_returns_not_found() {
        let searcher = ScriptedSearcher::always_failing();
        let outcome = get_search_results(&searcher, "q", 3).await;
        assert_eq!(outcome, SearchOutcome::NotFound);
        assert_eq!(searcher.calls(), 3);
    }

    #[tokio::test]
    async fn invalid_shape_counts_as_failed_attempt() {
        let malformed = SearchResults::new(vec![ProductSource::new("", "https://a.example.com")]);
        let searcher = ScriptedSearcher::new(vec![
            Ok(malformed),
            Err(ReviewError::parse("unexpected html")),
            Ok(results(&["https://b.example.com"])),
        ]);
        let outcome = get_search_results(&searcher, "q", 3).await;
        match outcome {
            SearchOutcome::Found(r) => assert_eq!(r.sources[0].url, "https://b.example.com"),
            SearchOutcome::NotFound => panic!("expected Found"),
        }
        assert_eq!(searcher.calls(), 3);
    }

    #[tokio::test]
    async fn every_attempt_uses_the_same_query() {
        let searcher = ScriptedSearcher::always_failing();
        get_search_results(&searcher, "Widget X review", 2).await;
        let queries = searcher.queries.lock().unwrap().clone();
        assert_eq!(queries, vec!["Widget X review", "Widget X review"]);
    }

    #[test]
    fn empty_found_is_treated_as_not_found() {
        assert!(SearchOutcome::Found(SearchResults::default()).into_sources().is_none());
        assert!(SearchOutcome::NotFound.into_sources().is_none());
        assert!(
            SearchOutcome::Found(results(&["https://a.example.com"]))
                .into_sources()
                .is_some()
        );
    }
}
