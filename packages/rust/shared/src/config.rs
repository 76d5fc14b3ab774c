//! Application configuration for reviewgen.
//!
//! User config lives at `~/.reviewgen/reviewgen.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ReviewError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "reviewgen.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".reviewgen";

/// Research-intent suffix appended to the product name for search.
pub const DEFAULT_QUERY_SUFFIX: &str = "review specifications features pros cons";

/// Default DuckDuckGo HTML endpoint.
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

// ---------------------------------------------------------------------------
// Config structs (matching reviewgen.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model provider settings.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Search stage settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Scrape stage settings.
    #[serde(default)]
    pub scrape: ScrapeConfig,
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider name: openai, gemini, claude or grok.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model ID. Falls back to the provider's default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Override for the provider's OpenAI-compatible base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Sampling temperature for the review writer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            api_key_env: None,
            base_url: None,
            temperature: None,
        }
    }
}

fn default_provider() -> String {
    "openai".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// How many sequential search attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Maximum sources kept from one results page.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Text appended to the product name to form the query.
    #[serde(default = "default_query_suffix")]
    pub query_suffix: String,

    /// DuckDuckGo region code (`kl` parameter).
    #[serde(default = "default_region")]
    pub region: String,

    /// Search endpoint URL.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_results: default_max_results(),
            query_suffix: default_query_suffix(),
            region: default_region(),
            endpoint: default_search_endpoint(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_max_results() -> usize {
    7
}
fn default_query_suffix() -> String {
    DEFAULT_QUERY_SUFFIX.into()
}
fn default_region() -> String {
    "wt-wt".into()
}
fn default_search_endpoint() -> String {
    DEFAULT_SEARCH_ENDPOINT.into()
}

/// `[scrape]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Scraped Markdown longer than this is truncated before synthesis.
    #[serde(default = "default_max_content_chars")]
    pub max_content_chars: usize,

    /// User-Agent header sent with search and scrape requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_content_chars: default_max_content_chars(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_content_chars() -> usize {
    12_000
}
fn default_user_agent() -> String {
    concat!("reviewgen/", env!("CARGO_PKG_VERSION")).into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.reviewgen/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| ReviewError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.reviewgen/reviewgen.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ReviewError::io(path, e))?;
    parse_config(&content)
        .map_err(|e| ReviewError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Parse and sanity-check a TOML config document.
pub fn parse_config(content: &str) -> Result<AppConfig> {
    let config: AppConfig =
        toml::from_str(content).map_err(|e| ReviewError::config(e.to_string()))?;

    if config.search.max_attempts == 0 {
        return Err(ReviewError::config("search.max_attempts must be at least 1"));
    }

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ReviewError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ReviewError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ReviewError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
