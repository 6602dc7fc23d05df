//! HTTP transport: URL checks, status mapping, retry.
//!
//! This is the only place that knows about status codes.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER, USER_AGENT};
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::config::TransportConfig;
use crate::error::FetchError;

use super::Transport;

/// User agent for manifest requests.
pub const USER_AGENT_VALUE: &str = concat!("romhub-bundle/", env!("CARGO_PKG_VERSION"));

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl HttpTransport {
    pub fn new(config: TransportConfig) -> Result<Self, FetchError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(default_headers)
            .build()
            .map_err(|e| FetchError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Wrap an existing client (its own timeout and headers apply).
    pub fn with_client(client: reqwest::Client, config: TransportConfig) -> Self {
        Self { client, config }
    }

    pub fn from_env() -> Result<Self, FetchError> {
        Self::new(TransportConfig::from_env())
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn request(&self, url: Url) -> Result<String, FetchError> {
        let mut retries = 0;
        let max_retries = self.config.max_retries;

        loop {
            match self.request_once(url.clone()).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && retries < max_retries => {
                    retries += 1;
                    let backoff = backoff_for(&e, retries);

                    warn!(
                        url = %url,
                        error = %e,
                        retry = retries,
                        max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        "retrying bundle request"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once(&self, url: Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| with_timeout(e.into(), self.config.timeout()))?;
        let status = response.status();

        if status.is_success() {
            return response.text().await.map_err(|e| match FetchError::from(e) {
                FetchError::Network { message } => FetchError::Network {
                    message: format!("failed to read response body: {}", message),
                },
                other => with_timeout(other, self.config.timeout()),
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(FetchError::RateLimited { retry_after });
        }

        Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let url = parse_bundle_url(url)?;
        debug!(url = %url, "fetching bundle manifest");
        self.request(url).await
    }
}

/// Accept only absolute http(s) URLs.
pub(crate) fn parse_bundle_url(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim()).map_err(|e| FetchError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(FetchError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme: {}", other),
        }),
    }
}

fn with_timeout(err: FetchError, timeout: Duration) -> FetchError {
    match err {
        FetchError::Timeout { after: None } => FetchError::Timeout {
            after: Some(timeout),
        },
        other => other,
    }
}

/// Honor `Retry-After` (capped, ±10% jitter); otherwise full-jitter exponential.
fn backoff_for(err: &FetchError, attempt: u32) -> Duration {
    match err {
        FetchError::RateLimited {
            retry_after: Some(retry_after),
        } => {
            let base_ms = (*retry_after).min(MAX_BACKOFF).as_millis() as u64;
            let jitter_factor: f64 = rand::thread_rng().gen_range(0.9_f64..=1.1_f64);
            let jittered_ms = ((base_ms as f64) * jitter_factor).round() as u64;
            Duration::from_millis(jittered_ms.max(100))
        }
        _ => {
            let base = Duration::from_secs(1u64 << attempt.min(5)).min(MAX_BACKOFF);
            let jittered_ms = rand::thread_rng().gen_range(0..=base.as_millis() as u64);
            Duration::from_millis(jittered_ms.max(10))
        }
    }
}
