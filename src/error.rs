// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Error types for scriptfetch
//!
//! Two kinds of failure flow through the crate. Transport-level conditions
//! (timeouts, refused connections, TLS, redirect limits, cancellation) are
//! normalized into an [`ErrorResult`](crate::http::ErrorResult) that scripts
//! branch on. Caller mistakes (bad URL, malformed headers, reused abort
//! controllers) propagate as `Err` so they surface as rejections.

use thiserror::Error;

/// Result type alias for scriptfetch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for scriptfetch
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP engine failure not covered by a more specific variant
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Request description rejected before any I/O
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Connection could not be established
    #[error("Connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    /// Timeout error
    #[error("Operation timed out: {operation}")]
    Timeout {
        operation: String,
        duration_ms: Option<u64>,
        url: Option<String>,
    },

    /// More redirect hops than allowed
    #[error("Redirect limit exceeded")]
    TooManyRedirects {
        max_redirects: u32,
        redirect_chain: Vec<String>,
    },

    /// A redirect pointed back at a location already visited
    #[error("Redirect loop detected")]
    RedirectLoop { location: String },

    /// Redirect response that cannot be followed
    #[error("Invalid redirect: {0}")]
    Redirect(String),

    /// Response body could not be decoded
    #[error("Failed to decode response body: {0}")]
    Decode(String),

    /// Request cancelled through its abort controller
    #[error("Request aborted")]
    Aborted,

    /// JavaScript execution failed
    #[error("JavaScript error: {message}")]
    JavaScript { message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new JavaScript error
    pub fn js<S: Into<String>>(msg: S) -> Self {
        Error::JavaScript {
            message: msg.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Error::InvalidRequest(msg.into())
    }

    /// Create a timeout error with URL
    pub fn timeout_with_url(
        operation: impl Into<String>,
        duration_ms: Option<u64>,
        url: impl Into<String>,
    ) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration_ms,
            url: Some(url.into()),
        }
    }

    /// Classify an error raised by the reqwest engine
    pub fn from_transport(err: reqwest::Error, url: &str, connect_timeout_ms: Option<u64>) -> Self {
        if err.is_timeout() {
            Error::timeout_with_url("request", connect_timeout_ms, url)
        } else if err.is_connect() {
            Error::Connect {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else {
            Error::Http(err)
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this error is the caller's fault rather than a runtime condition
    ///
    /// Caller errors propagate out of `send`; everything else becomes an
    /// `ErrorResult`.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::Url(_) | Error::InvalidRequest(_) | Error::Serialization(_) | Error::Config(_)
        )
    }

    /// Check if this is a cancellation
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Check if this is a redirect failure
    pub fn is_redirect(&self) -> bool {
        matches!(
            self,
            Error::TooManyRedirects { .. } | Error::RedirectLoop { .. } | Error::Redirect(_)
        )
    }

    /// Text handed to scripts as `reasonPhrase` of an error result
    pub fn reason_phrase(&self) -> String {
        match self {
            Error::Timeout {
                operation,
                duration_ms: Some(ms),
                url: Some(url),
            } => format!("Operation timed out after {}ms: {} {}", ms, operation, url),
            Error::Timeout { url: Some(url), .. } => format!("Operation timed out: {}", url),
            other => other.to_string(),
        }
    }

    /// Get URL if available
    pub fn url(&self) -> Option<&str> {
        match self {
            Error::Connect { url, .. } => Some(url),
            Error::Timeout { url: Some(u), .. } => Some(u),
            Error::RedirectLoop { location } => Some(location),
            _ => None,
        }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}
