//! Bundle manager: owns the current bundle and drives refreshes.
//!
//! The current bundle only ever changes through a single write-locked swap
//! after a complete, successful parse. Failures are recorded but never touch
//! the published bundle.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::bundle::Bundle;
use crate::config::TransportConfig;
use crate::error::{BundleError, BundleResult, FetchError};
use crate::manifest::parse_bundle_report;
use crate::transport::{HttpTransport, Transport, UnavailableTransport};

static DEFAULT: OnceLock<BundleManager> = OnceLock::new();

/// Observable manager state.
#[derive(Debug, Clone, Default)]
pub struct BundleStatus {
    /// Last successfully parsed bundle.
    pub current: Option<Arc<Bundle>>,

    /// URL the current bundle was fetched from.
    pub source_url: Option<String>,

    /// When the current bundle was published.
    pub loaded_at: Option<DateTime<Utc>>,

    /// Most recent failure newer than the current bundle.
    pub last_error: Option<BundleError>,

    /// Whether a fetch is in flight.
    pub fetching: bool,
}

impl BundleStatus {
    /// A bundle is shown but the latest refresh failed.
    pub fn is_stale(&self) -> bool {
        self.current.is_some() && self.last_error.is_some()
    }
}

#[derive(Debug, Default)]
struct ManagerState {
    current: Option<Arc<Bundle>>,
    source_url: Option<String>,
    loaded_at: Option<DateTime<Utc>>,
    last_error: Option<BundleError>,
    /// Ticket of the fetch that produced `current`.
    published_ticket: u64,
    /// Ticket of the fetch that produced `last_error`.
    error_ticket: u64,
}

/// Process-wide owner of the current [`Bundle`].
pub struct BundleManager {
    transport: Arc<dyn Transport>,
    state: RwLock<ManagerState>,
    next_ticket: AtomicU64,
    in_flight: AtomicUsize,
}

impl std::fmt::Debug for BundleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleManager")
            .field("state", &*self.read_state())
            .field("in_flight", &self.in_flight.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl BundleManager {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_transport(Arc::new(transport))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            state: RwLock::new(ManagerState::default()),
            next_ticket: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// The process-wide manager, created on first use.
    ///
    /// Uses an [`HttpTransport`] configured from the environment unless
    /// [`BundleManager::install_default`] ran first. If the HTTP client cannot
    /// be built, every fetch through the default manager fails with that error.
    pub fn get_default() -> &'static BundleManager {
        DEFAULT.get_or_init(|| {
            let transport: Arc<dyn Transport> =
                match HttpTransport::new(TransportConfig::from_env()) {
                    Ok(transport) => Arc::new(transport),
                    Err(e) => {
                        error!(error = %e, "HTTP transport unavailable, bundle fetches will fail");
                        Arc::new(UnavailableTransport::new(e))
                    }
                };
            BundleManager::with_transport(transport)
        })
    }

    /// Install the process-wide manager.
    ///
    /// Returns the manager back if a default already exists.
    pub fn install_default(
        manager: BundleManager,
    ) -> Result<&'static BundleManager, BundleManager> {
        DEFAULT.set(manager)?;
        Ok(Self::get_default())
    }

    /// Last successfully parsed bundle, if any.
    pub fn current_bundle(&self) -> Option<Arc<Bundle>> {
        self.read_state().current.clone()
    }

    /// Snapshot of current bundle, last error and fetch activity.
    pub fn status(&self) -> BundleStatus {
        let state = self.read_state();
        BundleStatus {
            current: state.current.clone(),
            source_url: state.source_url.clone(),
            loaded_at: state.loaded_at,
            last_error: state.last_error.clone(),
            fetching: self.in_flight.load(Ordering::SeqCst) > 0,
        }
    }

    /// Fetch, parse and publish the bundle at `url`.
    ///
    /// On any failure the current bundle is left untouched. Dropping the
    /// returned future cancels the fetch with the same guarantee. If a fetch
    /// started later has already published, the parsed bundle is discarded
    /// and [`FetchError::Superseded`] is returned.
    pub async fn fetch_bundle(&self, url: &str) -> BundleResult<Arc<Bundle>> {
        self.refresh(url, None).await
    }

    /// Like [`BundleManager::fetch_bundle`], bounding the transport call.
    pub async fn fetch_bundle_with_timeout(
        &self,
        url: &str,
        timeout: Duration,
    ) -> BundleResult<Arc<Bundle>> {
        self.refresh(url, Some(timeout)).await
    }

    async fn refresh(&self, url: &str, timeout: Option<Duration>) -> BundleResult<Arc<Bundle>> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight::enter(&self.in_flight);
        debug!(url, ticket, "fetching bundle");

        let fetched = match timeout {
            None => self.transport.fetch_text(url).await,
            Some(after) => tokio::time::timeout(after, self.transport.fetch_text(url))
                .await
                .unwrap_or(Err(FetchError::Timeout { after: Some(after) })),
        };

        let outcome = fetched
            .map_err(BundleError::from)
            .and_then(|body| parse_bundle_report(&body).map_err(BundleError::from));

        match outcome {
            Ok(report) => {
                let bundle = Arc::new(report.bundle);
                if self.publish(ticket, url, Arc::clone(&bundle), report.skipped.len()) {
                    Ok(bundle)
                } else {
                    Err(FetchError::Superseded {
                        url: url.to_string(),
                    }
                    .into())
                }
            }
            Err(e) => {
                warn!(url, ticket, error = %e, "bundle fetch failed");
                self.record_failure(ticket, e.clone());
                Err(e)
            }
        }
    }

    /// Replace the current bundle unless a later fetch already published.
    /// Only successes gate successes; a newer failure does not block this.
    fn publish(&self, ticket: u64, url: &str, bundle: Arc<Bundle>, skipped: usize) -> bool {
        let mut state = self.write_state();
        if ticket <= state.published_ticket {
            debug!(
                url,
                ticket,
                published = state.published_ticket,
                "discarding bundle superseded by a newer fetch"
            );
            return false;
        }

        info!(
            url,
            provider = bundle.provider_name(),
            roms = bundle.roms().len(),
            skipped,
            "bundle published"
        );
        state.current = Some(bundle);
        state.source_url = Some(url.to_string());
        state.loaded_at = Some(Utc::now());
        state.published_ticket = ticket;
        if ticket > state.error_ticket {
            state.last_error = None;
        }
        true
    }

    /// Keep the error only if it is newer than every settled result.
    fn record_failure(&self, ticket: u64, error: BundleError) {
        let mut state = self.write_state();
        if ticket > state.published_ticket && ticket > state.error_ticket {
            state.last_error = Some(error);
            state.error_ticket = ticket;
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ManagerState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ManagerState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Counts a fetch as in flight until dropped (including on cancellation).
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
