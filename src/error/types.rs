//! Error type definitions
//!
//! Defines the main error types used throughout the scraper. The taxonomy
//! mirrors how failures are handled at runtime:
//!
//! - [`Error::TokenNotFound`]: bootstrap could not observe a bearer token in time
//! - [`Error::TokenExpired`]: an authenticated call was rejected for a stale credential
//! - [`Error::ExtractionEmpty`]: a listing page yielded no records (pagination stop signal)
//! - everything else: "other" failures, recorded per item and never retried

use thiserror::Error;

/// Main error type for the scraper
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// No bearer token was observed within the wait budget
    #[error("Auth token not found within {waited_ms}ms")]
    TokenNotFound { waited_ms: u64 },

    /// The API rejected the bearer token as unauthenticated
    #[error("Token expired: {detail}")]
    TokenExpired { detail: String },

    /// The session manager could not recover a token and gave up
    #[error("Session failed: {0}")]
    SessionFailed(String),

    /// Browser automation errors
    #[error("Browser error: {0}")]
    Browser(String),

    /// Chrome DevTools protocol errors
    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    /// A page or bounded wait timed out
    #[error("Timed out: {operation}")]
    Timeout { operation: String },

    /// Non-authentication API failures (business errors, unexpected status)
    #[error("API error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// A page produced zero extractable records
    #[error("No records extracted from {source_url}")]
    ExtractionEmpty { source_url: String },

    /// Persistence errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Network/HTTP client errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a token-expired error
    pub fn token_expired(detail: impl Into<String>) -> Self {
        Self::TokenExpired {
            detail: detail.into(),
        }
    }

    /// Create a session failure error
    pub fn session_failed(msg: impl Into<String>) -> Self {
        Self::SessionFailed(msg.into())
    }

    /// Create a browser error
    pub fn browser(msg: impl Into<String>) -> Self {
        Self::Browser(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create an API error
    pub fn api(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an extraction-empty signal
    pub fn extraction_empty(source_url: impl Into<String>) -> Self {
        Self::ExtractionEmpty {
            source_url: source_url.into(),
        }
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this failure means the credential is stale and a refresh may help
    pub fn is_token_expired(&self) -> bool {
        matches!(self, Self::TokenExpired { .. })
    }

    /// Whether this failure must abort the whole run rather than a single item
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TokenNotFound { .. } | Self::SessionFailed(_))
    }

    /// Whether this is the pagination stop signal
    pub fn is_extraction_empty(&self) -> bool {
        matches!(self, Self::ExtractionEmpty { .. })
    }
}
