//! Error types for docsweep.
//!
//! Library crates use [`DocsweepError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Every variant carries owned strings so per-page error lists can be
//! cloned into aggregated crawl results.

/// Top-level error type for all docsweep operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocsweepError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network, filesystem, or transport error while fetching a page.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// No pipeline accepts the declared MIME type. Non-fatal; the page is
    /// skipped with the error recorded.
    #[error("unsupported content type: {0}")]
    UnsupportedContent(String),

    /// A pipeline stage failed.
    #[error("stage {stage} failed: {message}")]
    Stage { stage: String, message: String },

    /// The dispatch machinery was misused (e.g. a continuation invoked twice).
    #[error("dispatch error: {0}")]
    Dispatch(String),

    /// A malformed include/exclude pattern, caught at construction time.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// The chunk budget cannot fit a single atomic unit with its decoration.
    #[error("chunk budget of {budget} bytes cannot fit a minimal unit of {required} bytes")]
    MinimumChunkSize { required: usize, budget: usize },

    /// Structural parsing of page content failed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path}: {message}")]
    Io { path: String, message: String },

    /// The operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocsweepError>;

impl DocsweepError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a fetch error from any displayable message.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a stage error naming the failing stage.
    pub fn stage(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a pattern error naming the offending pattern.
    pub fn invalid_pattern(pattern: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            message: source.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DocsweepError::config("missing seed URL");
        assert_eq!(err.to_string(), "config error: missing seed URL");

        let err = DocsweepError::stage("html-extract", "no content container");
        assert_eq!(
            err.to_string(),
            "stage html-extract failed: no content container"
        );

        let err = DocsweepError::MinimumChunkSize {
            required: 120,
            budget: 64,
        };
        assert!(err.to_string().contains("64 bytes"));
        assert!(err.to_string().contains("120 bytes"));
    }

    #[test]
    fn errors_are_cloneable() {
        let err = DocsweepError::fetch("connection refused");
        let copy = err.clone();
        assert_eq!(err, copy);
    }
}
