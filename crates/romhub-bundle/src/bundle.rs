//! Parsed representation of one provider's manifest.

use std::fmt;

use crate::error::ParseError;
use crate::manifest::SUPPORTED_SCHEME_VERSIONS;
use crate::rom::BundleRom;

/// All information provided by a downloaded bundle.
///
/// A `Bundle` is only created through [`BundleBuilder::build`], which rejects
/// unknown scheme versions. Once built it is never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    provider_name: String,
    public_url: String,
    scheme_version: u32,
    roms: Vec<BundleRom>,
}

impl Bundle {
    /// Name of the bundle provider (e.g. `XDA-Developers`).
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Version of the manifest scheme (e.g. `1`).
    pub fn scheme_version(&self) -> u32 {
        self.scheme_version
    }

    /// Public URL users can browse.
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    /// ROM entries in manifest order.
    pub fn roms(&self) -> &[BundleRom] {
        &self.roms
    }

    /// True if at least one ROM in the bundle supports the device codename.
    pub fn is_device_supported(&self, name: &str) -> bool {
        self.roms.iter().any(|rom| rom.supports(name))
    }

    /// Names of every ROM in the bundle, in manifest order.
    ///
    /// This is the provider-wide catalog; use [`Bundle::roms_for_device`] for
    /// a per-device view.
    pub fn supported_roms(&self) -> Vec<&str> {
        self.roms.iter().map(BundleRom::name).collect()
    }

    /// ROMs that support the given device codename, in manifest order.
    pub fn roms_for_device(&self, device: &str) -> Vec<&BundleRom> {
        self.roms.iter().filter(|rom| rom.supports(device)).collect()
    }

    /// First ROM with the given name.
    pub fn rom(&self, name: &str) -> Option<&BundleRom> {
        self.roms.iter().find(|rom| rom.name() == name)
    }

    /// Union of all supported device codenames, first-seen order.
    pub fn supported_devices(&self) -> Vec<&str> {
        let mut devices: Vec<&str> = Vec::new();
        for device in self.roms.iter().flat_map(|rom| rom.supported_devices()) {
            if !devices.contains(&device.as_str()) {
                devices.push(device);
            }
        }
        devices
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} (scheme v{}) <{}>",
            self.provider_name, self.scheme_version, self.public_url
        )?;
        for rom in &self.roms {
            writeln!(
                f,
                "  - {} [{}]",
                rom.name(),
                rom.supported_devices().join(", ")
            )?;
        }
        Ok(())
    }
}

/// Accumulates ROM entries before a [`Bundle`] is frozen.
#[derive(Debug, Clone)]
pub struct BundleBuilder {
    provider_name: String,
    public_url: String,
    scheme_version: i64,
    roms: Vec<BundleRom>,
}

impl BundleBuilder {
    pub fn new(
        provider_name: impl Into<String>,
        public_url: impl Into<String>,
        scheme_version: i64,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            public_url: public_url.into(),
            scheme_version,
            roms: Vec::new(),
        }
    }

    /// Append a ROM entry.
    pub fn push_rom(&mut self, rom: BundleRom) -> &mut Self {
        self.roms.push(rom);
        self
    }

    /// Append a ROM entry (by-value chaining).
    pub fn with_rom(mut self, rom: BundleRom) -> Self {
        self.roms.push(rom);
        self
    }

    /// Freeze into a [`Bundle`].
    pub fn build(self) -> Result<Bundle, ParseError> {
        let scheme_version = u32::try_from(self.scheme_version)
            .ok()
            .filter(|v| SUPPORTED_SCHEME_VERSIONS.contains(v))
            .ok_or(ParseError::SchemaVersionUnsupported(i128::from(
                self.scheme_version,
            )))?;

        Ok(Bundle {
            provider_name: self.provider_name,
            public_url: self.public_url,
            scheme_version,
            roms: self.roms,
        })
    }
}
