//! Transport seam: how the manager obtains manifest text for a URL.
//!
//! The manager never interprets HTTP; anything that can turn a URL into text
//! (or a [`FetchError`]) can back it.

use async_trait::async_trait;

use crate::error::FetchError;

mod http;

pub use http::{HttpTransport, USER_AGENT_VALUE};

/// Retrieves the raw document body for a URL.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Stands in when the real transport could not be built; every fetch fails
/// with the construction error.
#[derive(Debug, Clone)]
pub(crate) struct UnavailableTransport {
    error: FetchError,
}

impl UnavailableTransport {
    pub(crate) fn new(error: FetchError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl Transport for UnavailableTransport {
    async fn fetch_text(&self, _url: &str) -> Result<String, FetchError> {
        Err(self.error.clone())
    }
}
