//! Error types for LeadScout.
//!
//! Library crates use [`LeadScoutError`] via `thiserror`.
//! The CLI app wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-item failures never surface here: a source adapter that loses an
//! upstream call returns an empty batch and logs the cause, and a malformed
//! record degrades to a best-effort row instead of erroring. Only export-sink
//! rejections and total-pipeline failures propagate.

use std::path::PathBuf;

/// Top-level error type for all LeadScout operations.
#[derive(Debug, thiserror::Error)]
pub enum LeadScoutError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during a search or export call.
    #[error("network error: {0}")]
    Network(String),

    /// HTML or API-response parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Chat-model request or response error.
    #[error("llm error: {0}")]
    Llm(String),

    /// An export sink (tabular delivery or spreadsheet) rejected the write.
    #[error("export sink '{sink}' failed: {message}")]
    ExportSink { sink: String, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, LeadScoutError>;

impl LeadScoutError {
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

    /// Create an export-sink error naming the failed sink.
    pub fn sink(sink: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ExportSink {
            sink: sink.into(),
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
