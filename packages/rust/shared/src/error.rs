//! Error types for reviewgen.
//!
//! Library crates use [`ReviewError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all reviewgen operations.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// Configuration loading or validation error (model, provider, API key).
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport-level failure talking to a remote service.
    #[error("connection error: {0}")]
    Network(String),

    /// A remote service answered with a non-success status.
    #[error("HTTP {status} from {service}: {body}")]
    Http {
        service: String,
        status: u16,
        body: String,
    },

    /// HTML, JSON or event-stream parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// A capability response did not match its expected shape.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The synthesis capability failed before or while streaming.
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ReviewError>;

impl ReviewError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create an HTTP status error for the named service.
    pub fn http(service: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            service: service.into(),
            status,
            body: body.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ReviewError::config("model name must be provided");
        assert_eq!(err.to_string(), "config error: model name must be provided");

        let err = ReviewError::validation("source url is not absolute");
        assert!(err.to_string().contains("not absolute"));
    }

    #[test]
    fn http_error_carries_status_in_message() {
        let err = ReviewError::http("chat completions", 429, "Rate limit reached");
        let text = err.to_string();
        assert!(text.contains("429"));
        assert!(text.contains("Rate limit reached"));
    }
}
