//! Error types for Kiln.
//!
//! Library crates use [`KilnError`] via `thiserror`.
//! The server binary wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Kiln operations.
#[derive(Debug, thiserror::Error)]
pub enum KilnError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Recipe file parsing or lookup error.
    #[error("recipe error: {message}")]
    Recipe { message: String },

    /// Build pipeline stage failure (clone, checkout, build step, harvest).
    #[error("build error: {0}")]
    Build(String),

    /// Documentation extraction error (malformed archive, missing metadata).
    #[error("docs error: {0}")]
    Docs(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, KilnError>;

impl KilnError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a recipe error from any displayable message.
    pub fn recipe(msg: impl Into<String>) -> Self {
        Self::Recipe {
            message: msg.into(),
        }
    }

    /// Create a build error from any displayable message.
    pub fn build(msg: impl Into<String>) -> Self {
        Self::Build(msg.into())
    }

    /// Create a docs error from any displayable message.
    pub fn docs(msg: impl Into<String>) -> Self {
        Self::Docs(msg.into())
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
        let err = KilnError::config("missing repo root");
        assert_eq!(err.to_string(), "config error: missing repo root");

        let err = KilnError::build("clone exited with status 128");
        assert!(err.to_string().contains("status 128"));
    }
}
