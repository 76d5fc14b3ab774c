//! Review-generation pipeline for reviewgen.
//!
//! This crate defines the capability ports (search, scrape, synthesize) and
//! the pipeline that coordinates them into a streamed product review.

pub mod pipeline;
pub mod ports;
pub mod scrape;
pub mod search;

#[cfg(test)]
mod testing;

pub use pipeline::{
    DEFAULT_MAX_ATTEMPTS, PipelineOptions, ReviewPipeline, ReviewProgress, ReviewStream,
    SilentProgress, not_found_message,
};
pub use ports::{Scraper, Searcher, SynthesisEvent, SynthesisEvents, Synthesizer};
pub use scrape::{ScrapedContentCache, scrape_all};
pub use search::{SearchOutcome, build_query, get_search_results};
