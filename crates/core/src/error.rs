//! Error types for syndic operations.
//!
//! This module defines the main error type [`SyndicError`] which represents
//! every failure the pipeline can observe, and the nested [`DecodeError`]
//! raised by the decoder set.
//!
//! Most of these never reach a caller: the orchestrator converts anything that
//! happens while processing a single article into a teaser fallback. Only
//! [`SyndicError::ListUnavailable`] and [`SyndicError::EmptyList`] abort a feed.
//!
//! # Example
//!
//! ```rust
//! use syndic_core::{Result, SyndicError};
//!
//! fn first_item(items: &[String]) -> Result<&String> {
//!     items.first().ok_or(SyndicError::EmptyList { source_name: "demo".into() })
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for syndic operations.
///
/// # Example
///
/// ```rust
/// use syndic_core::SyndicError;
///
/// let err = SyndicError::Timeout { timeout: 30 };
/// assert!(err.is_item_local());
/// ```
#[derive(Error, Debug)]
pub enum SyndicError {
    /// HTTP request errors from reqwest.
    ///
    /// Network errors, DNS failures, connection resets and body read failures.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Request or renderer wait exceeded its deadline.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// A detail payload could not be decoded.
    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// An embed descriptor could not be decoded.
    ///
    /// The sanitizer drops the offending element and keeps going, so this only
    /// surfaces from [`crate::sanitize::parse_embed_descriptor`].
    #[error("Malformed embed descriptor: {0}")]
    EmbedDescriptor(String),

    /// The initial article list could not be obtained.
    ///
    /// This is fatal: the whole feed generation is aborted.
    #[error("Article list unavailable: {0}")]
    ListUnavailable(String),

    /// The article list was fetched but held no entries.
    #[error("Article list for {source_name} is empty")]
    EmptyList { source_name: String },

    /// Headless renderer failures (navigation, selector wait, closed session).
    #[error("Renderer error: {0}")]
    Renderer(String),

    /// Invalid configuration values or files.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File read and write errors.
    #[error("I/O error: {0}")]
    WriteError(#[from] std::io::Error),
}

impl SyndicError {
    /// Returns true when the error only affects the item being processed.
    ///
    /// Everything except a missing or empty article list is item-local and
    /// results in the teaser being kept.
    pub fn is_item_local(&self) -> bool {
        !matches!(self, SyndicError::ListUnavailable(_) | SyndicError::EmptyList { .. })
    }
}

/// Errors raised while decoding a classified payload.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// No `NAME.FIELD = '...';` statement was found.
    #[error("no literal assignment found")]
    MissingAssignment,

    /// An escape sequence inside a quoted literal is invalid.
    #[error("malformed escape at offset {offset}: {reason}")]
    MalformedEscape { offset: usize, reason: String },

    /// A JSON document or JSON string failed to parse.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON value parsed, but is not a document tree.
    #[error("not a document tree: {0}")]
    NotADocument(String),
}

/// Result type alias for SyndicError.
pub type Result<T> = std::result::Result<T, SyndicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SyndicError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_http_status_error() {
        let err = SyndicError::HttpStatus { status: 403, url: "https://example.com/a".into() };
        assert!(err.to_string().contains("403"));
        assert!(err.to_string().contains("https://example.com/a"));
    }

    #[test]
    fn test_decode_error_wraps() {
        let err: SyndicError = DecodeError::MalformedEscape { offset: 7, reason: "bad hex".into() }.into();
        assert!(err.to_string().contains("offset 7"));
        assert!(err.is_item_local());
    }

    #[test]
    fn test_list_errors_are_fatal() {
        assert!(!SyndicError::ListUnavailable("down".into()).is_item_local());
        assert!(!SyndicError::EmptyList { source_name: "infoq".into() }.is_item_local());
        assert!(SyndicError::Timeout { timeout: 30 }.is_item_local());
    }
}
