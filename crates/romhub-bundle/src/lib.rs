//! ROM provider bundles: fetch, parse and query.
//!
//! A bundle is a JSON manifest published by a ROM-distribution provider. It
//! names the provider, a public URL, the manifest scheme version and the ROMs
//! on offer together with the device codenames each ROM supports.
//!
//! - [`BundleManager`] fetches a manifest through a [`Transport`], parses it and
//!   publishes the result as the current bundle
//! - [`Bundle`] answers device-support and ROM-catalog queries
//! - [`parse_bundle`] is the pure text-to-bundle step, usable without a network
//!
//! # Quick Start
//!
//! ```no_run
//! use romhub_bundle::BundleManager;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let manager = BundleManager::get_default();
//! let bundle = manager.fetch_bundle("https://roms.example/bundle.json").await?;
//!
//! if bundle.is_device_supported("mako") {
//!     println!("{} ships: {:?}", bundle.provider_name(), bundle.supported_roms());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Failure handling
//!
//! A failed fetch or parse never replaces the current bundle. The error is
//! returned to the caller and kept in [`BundleStatus::last_error`] so a UI can
//! show "stale data" distinctly from "nothing loaded".
//!
//! # Configuration
//!
//! Only the default HTTP transport reads the environment:
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `ROMHUB_BUNDLE_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `ROMHUB_BUNDLE_MAX_RETRIES` | Max retries for transient failures (default: 2) |

pub mod bundle;
pub mod config;
pub mod error;
pub mod manager;
pub mod manifest;
pub mod rom;
pub mod transport;

pub use bundle::{Bundle, BundleBuilder};
pub use config::TransportConfig;
pub use error::{BundleError, BundleResult, FetchError, ParseError};
pub use manager::{BundleManager, BundleStatus};
pub use manifest::{parse_bundle, parse_bundle_report, ParseReport, SUPPORTED_SCHEME_VERSIONS};
pub use rom::BundleRom;
pub use transport::{HttpTransport, Transport, USER_AGENT_VALUE};
