//! Provider selection and model configuration.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use reviewgen_shared::{LlmConfig, Result, ReviewError};

/// Supported language-model providers. All are reached through their
/// OpenAI-compatible chat completion endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Gemini,
    Claude,
    Grok,
}

impl Provider {
    pub const ALL: [Provider; 4] = [Self::OpenAi, Self::Gemini, Self::Claude, Self::Grok];

    pub fn name(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
            Self::Claude => "claude",
            Self::Grok => "grok",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o",
            Self::Gemini => "gemini-2.0-flash",
            Self::Claude => "claude-3-5-sonnet-20241022",
            Self::Grok => "grok-beta",
        }
    }

    /// Environment variable the API key is read from by default.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
            Self::Claude => "ANTHROPIC_API_KEY",
            Self::Grok => "XAI_API_KEY",
        }
    }

    pub fn base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            Self::Claude => "https://api.anthropic.com/v1",
            Self::Grok => "https://api.x.ai/v1",
        }
    }
}

impl FromStr for Provider {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "gemini" | "google" => Ok(Self::Gemini),
            "claude" | "anthropic" => Ok(Self::Claude),
            "grok" | "xai" => Ok(Self::Grok),
            _ => Err(ReviewError::config(format!("unsupported provider: {s}"))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Fully resolved model settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub provider: Provider,
    pub model: String,
    pub api_key_env: String,
    pub base_url: String,
    pub temperature: Option<f32>,
}

impl ModelConfig {
    /// Resolve `[llm]` settings, filling provider defaults.
    ///
    /// An explicitly blank model name is rejected rather than defaulted.
    pub fn resolve(config: &LlmConfig) -> Result<Self> {
        let provider: Provider = config.provider.parse()?;

        let model = match &config.model {
            Some(model) if model.trim().is_empty() => {
                return Err(ReviewError::config("model name must be provided"));
            }
            Some(model) => model.trim().to_string(),
            None => provider.default_model().to_string(),
        };

        let resolved = Self {
            provider,
            model,
            api_key_env: config
                .api_key_env
                .clone()
                .unwrap_or_else(|| provider.api_key_env().to_string()),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| provider.base_url().to_string())
                .trim_end_matches('/')
                .to_string(),
            temperature: config.temperature,
        };

        debug!(provider = %resolved.provider, model = %resolved.model, "model resolved");
        Ok(resolved)
    }

    /// Read the API key from the process environment.
    pub fn api_key(&self) -> Result<String> {
        self.api_key_from(|name| std::env::var(name).ok())
    }

    /// Read the API key through `lookup`. Missing or blank keys are a
    /// configuration error naming the variable.
    pub fn api_key_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<String> {
        match lookup(&self.api_key_env) {
            Some(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(ReviewError::config(format!(
                "missing API key for {}: set {}",
                self.provider, self.api_key_env
            ))),
        }
    }
}
