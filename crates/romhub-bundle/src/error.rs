//! Error types for bundle fetching and parsing.

use std::time::Duration;

/// Transport-level failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// URL could not be parsed or uses an unsupported scheme.
    #[error("invalid bundle url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connection, DNS or body read failure.
    #[error("network error: {message}")]
    Network { message: String },

    /// Server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// Rate limit exceeded.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Request did not finish in time.
    #[error("request timed out after {after:?}")]
    Timeout { after: Option<Duration> },

    /// Fetch was abandoned before completion.
    #[error("fetch cancelled")]
    Cancelled,

    /// A newer bundle was published while this fetch was in flight.
    #[error("fetch of {url} superseded by a newer bundle")]
    Superseded { url: String },
}

impl FetchError {
    /// Whether the error is transient and the request may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } | Self::RateLimited { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::InvalidUrl { .. } | Self::Cancelled | Self::Superseded { .. } => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { after: None }
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Manifest does not conform to the expected schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Body is not valid JSON.
    #[error("invalid JSON: {message}")]
    InvalidJson { message: String },

    /// Document root is not a JSON object.
    #[error("manifest root must be a JSON object")]
    NotAnObject,

    /// A required top-level field is absent.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A required top-level field has the wrong JSON type.
    #[error("field {field} must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    /// The manifest uses a scheme version this parser does not understand.
    ///
    /// Wide enough for any JSON integer (`i64` or `u64`).
    #[error("unsupported scheme version: {0}")]
    SchemaVersionUnsupported(i128),

    /// A single ROM entry could not be read.
    #[error("malformed ROM entry at index {index}: {reason}")]
    MalformedRomEntry { index: usize, reason: String },
}

/// Any failure of a bundle refresh.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BundleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl BundleError {
    /// Whether retrying the same fetch could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_retryable(),
            Self::Parse(_) => false,
        }
    }
}

/// Result type for bundle operations.
pub type BundleResult<T> = Result<T, BundleError>;
