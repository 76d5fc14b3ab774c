//! Shared types, error model, and configuration for reviewgen.
//!
//! This crate is the foundation depended on by all other reviewgen crates.
//! It provides:
//! - [`ReviewError`]: the unified error type
//! - Capability result shapes: [`ProductSource`], [`SearchResults`], [`ScrapedContent`], [`SynthesisRequest`]
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_QUERY_SUFFIX, DEFAULT_SEARCH_ENDPOINT, LlmConfig, ScrapeConfig,
    SearchConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
    parse_config,
};
pub use error::{Result, ReviewError};
pub use types::{ProductSource, ScrapedContent, SearchResults, SynthesisRequest};
