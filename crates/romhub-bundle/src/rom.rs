//! A single ROM entry of a bundle.

/// A ROM available in a bundle and the devices it supports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRom {
    name: String,
    supported_devices: Vec<String>,
}

impl BundleRom {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supported_devices: Vec::new(),
        }
    }

    /// ROM name as published by the provider.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a device codename (e.g. `mako`). Adding a known device is a no-op.
    pub fn add_supported_device(&mut self, device: impl Into<String>) {
        let device = device.into();
        if !self.supports(&device) {
            self.supported_devices.push(device);
        }
    }

    /// Exact, case-sensitive codename match.
    pub fn supports(&self, device: &str) -> bool {
        self.supported_devices.iter().any(|d| d == device)
    }

    /// Supported codenames in the order they were first added.
    pub fn supported_devices(&self) -> &[String] {
        &self.supported_devices
    }
}
