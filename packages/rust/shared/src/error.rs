//! Error types for joincensus.
//!
//! Library crates use [`JoincensusError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all joincensus operations.
#[derive(Debug, thiserror::Error)]
pub enum JoincensusError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the search endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// Response payload did not decode into the expected schema.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Repository fetch (clone subprocess) error.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (malformed identifier, invalid flag value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, JoincensusError>;

impl JoincensusError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a decode error from any displayable message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
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
        let err = JoincensusError::config("working_dir is empty");
        assert_eq!(err.to_string(), "config error: working_dir is empty");

        let err = JoincensusError::validation("identifier 'abc' has no owner");
        assert!(err.to_string().contains("has no owner"));

        let err = JoincensusError::Fetch("git exited with status 128".into());
        assert_eq!(err.to_string(), "fetch error: git exited with status 128");
    }
}
