//! Manifest wire format and parsing.
//!
//! A manifest is a JSON document:
//!
//! ```json
//! {
//!   "provider_name": "XDA-Developers",
//!   "public_url": "https://xda.example/roms",
//!   "scheme_version": 1,
//!   "roms": [
//!     { "name": "OmniROM", "supported_devices": ["mako", "find5"] }
//!   ]
//! }
//! ```
//!
//! Parsing is a pure function of the input text. A ROM entry that cannot be
//! read is skipped with a warning; every other schema violation fails the
//! whole parse.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::bundle::{Bundle, BundleBuilder};
use crate::error::ParseError;
use crate::rom::BundleRom;

/// Scheme versions this parser understands.
pub const SUPPORTED_SCHEME_VERSIONS: &[u32] = &[1];

const PROVIDER_NAME: &str = "provider_name";
const PUBLIC_URL: &str = "public_url";
const SCHEME_VERSION: &str = "scheme_version";
const ROMS: &str = "roms";

/// Result of parsing a manifest, including entries that were dropped.
#[derive(Debug, Clone)]
pub struct ParseReport {
    /// The parsed bundle.
    pub bundle: Bundle,

    /// One `MalformedRomEntry` per skipped ROM entry, in manifest order.
    pub skipped: Vec<ParseError>,
}

/// Wire form of a ROM entry.
#[derive(Debug, Deserialize)]
struct RomEntry {
    name: String,

    #[serde(default)]
    supported_devices: Vec<String>,
}

/// Parse manifest text into a [`Bundle`].
pub fn parse_bundle(data: &str) -> Result<Bundle, ParseError> {
    parse_bundle_report(data).map(|report| report.bundle)
}

/// Parse manifest text, also reporting skipped ROM entries.
pub fn parse_bundle_report(data: &str) -> Result<ParseReport, ParseError> {
    let document: Value = serde_json::from_str(data).map_err(|e| ParseError::InvalidJson {
        message: e.to_string(),
    })?;
    let root = document.as_object().ok_or(ParseError::NotAnObject)?;

    let provider_name = required_str(root, PROVIDER_NAME)?;
    let public_url = required_str(root, PUBLIC_URL)?;
    let scheme_version = read_scheme_version(required(root, SCHEME_VERSION)?)?;
    let entries = required(root, ROMS)?
        .as_array()
        .ok_or(ParseError::InvalidField {
            field: ROMS,
            expected: "an array",
        })?;

    // Reject unknown schemes before looking at entries whose shape may differ.
    let scheme_version = u32::try_from(scheme_version)
        .ok()
        .filter(|v| SUPPORTED_SCHEME_VERSIONS.contains(v))
        .ok_or(ParseError::SchemaVersionUnsupported(scheme_version))?;

    let mut builder =
        BundleBuilder::new(provider_name, public_url, i64::from(scheme_version));
    let mut skipped = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        match parse_rom(entry) {
            Ok(rom) => {
                builder.push_rom(rom);
            }
            Err(reason) => {
                warn!(index, reason = %reason, "skipping malformed ROM entry");
                skipped.push(ParseError::MalformedRomEntry { index, reason });
            }
        }
    }

    let bundle = builder.build()?;
    debug!(
        provider = bundle.provider_name(),
        roms = bundle.roms().len(),
        skipped = skipped.len(),
        "parsed bundle manifest"
    );

    Ok(ParseReport { bundle, skipped })
}

fn required<'a>(
    root: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, ParseError> {
    match root.get(field) {
        Some(Value::Null) | None => Err(ParseError::MissingField(field)),
        Some(value) => Ok(value),
    }
}

fn required_str<'a>(
    root: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ParseError> {
    required(root, field)?
        .as_str()
        .ok_or(ParseError::InvalidField {
            field,
            expected: "a string",
        })
}

/// Any JSON integer, signed or not; floats and other types are rejected.
fn read_scheme_version(value: &Value) -> Result<i128, ParseError> {
    value
        .as_i64()
        .map(i128::from)
        .or_else(|| value.as_u64().map(i128::from))
        .ok_or(ParseError::InvalidField {
            field: SCHEME_VERSION,
            expected: "an integer",
        })
}

fn parse_rom(entry: &Value) -> Result<BundleRom, String> {
    let raw = RomEntry::deserialize(entry).map_err(|e| e.to_string())?;

    let mut rom = BundleRom::new(raw.name);
    for device in raw.supported_devices {
        rom.add_supported_device(device);
    }
    Ok(rom)
}
