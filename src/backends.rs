//! Backend registration and dispatch
//!
//! A backend turns a `name[:key=value,...]` string into a
//! [`DeviceProvider`]. Which backends exist depends on the enabled features.

use std::collections::BTreeMap;

use wpspec_core::transport::{DeviceProvider, DiscoveredDevice, Transport};
use wpspec_driver::Registry;

/// Information about a backend
pub struct BackendInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Short description
    pub description: &'static str,
}

/// Backends enabled at compile time
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_backends() -> Vec<BackendInfo> {
    let mut backends = Vec::new();

    #[cfg(feature = "usb")]
    backends.push(BackendInfo {
        name: "usb",
        description: "Wasatch Photonics spectrometers over USB (pid=<0x1000|0x2000|0x4000>,timeout=<ms>,interface=<n>)",
    });

    #[cfg(feature = "dummy")]
    backends.push(BackendInfo {
        name: "dummy",
        description: "Emulated spectrometers (count=<n>,pixels=<n>,family=<name>,cooled=<yes|no>,excitation=<nm>)",
    });

    backends
}

/// Comma-separated list of backend names
pub fn backend_names_short() -> String {
    available_backends()
        .iter()
        .map(|b| b.name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parsed backend string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendParams {
    /// Backend name
    pub name: String,
    /// Options by key
    pub params: BTreeMap<String, String>,
}

impl BackendParams {
    /// Options as borrowed key/value pairs
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Split `name:key=value,key=value` into its parts
pub fn parse_backend_params(s: &str) -> Result<BackendParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = BTreeMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.trim().to_string(), value.trim().to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(BackendParams {
        name: name.to_string(),
        params,
    })
}

/// Any enabled backend behind one provider type
pub enum Backend {
    #[cfg(feature = "usb")]
    Usb(wpspec_usb::UsbProvider),
    #[cfg(feature = "dummy")]
    Dummy(wpspec_dummy::DummyProvider),
}

fn boxed<T: Transport + 'static>(
    devices: Vec<DiscoveredDevice<T>>,
) -> Vec<DiscoveredDevice<Box<dyn Transport>>> {
    devices
        .into_iter()
        .map(|d| DiscoveredDevice {
            transport: Box::new(d.transport) as Box<dyn Transport>,
            product_id: d.product_id,
        })
        .collect()
}

impl DeviceProvider for Backend {
    type Transport = Box<dyn Transport>;

    fn open_all(&mut self) -> wpspec_core::Result<Vec<DiscoveredDevice<Self::Transport>>> {
        match self {
            #[cfg(feature = "usb")]
            Backend::Usb(provider) => Ok(boxed(provider.open_all()?)),
            #[cfg(feature = "dummy")]
            Backend::Dummy(provider) => Ok(boxed(provider.open_all()?)),
        }
    }
}

/// Build the backend named by `spec`
pub fn open_backend(spec: &str) -> Result<Backend, Box<dyn std::error::Error>> {
    let params = parse_backend_params(spec)?;
    #[allow(unused_variables)]
    let pairs = params.pairs();

    match params.name.as_str() {
        #[cfg(feature = "usb")]
        "usb" => Ok(Backend::Usb(wpspec_usb::UsbProvider::new(
            wpspec_usb::parse_options(&pairs)?,
        ))),
        #[cfg(feature = "dummy")]
        "dummy" => Ok(Backend::Dummy(wpspec_dummy::parse_options(&pairs)?)),
        other => Err(unknown_backend_error(other)),
    }
}

/// Open every device on `spec` and hand the populated registry to `f`
pub fn with_registry<F>(spec: &str, f: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut Registry<Backend>) -> Result<(), Box<dyn std::error::Error>>,
{
    let mut registry = Registry::new(open_backend(spec)?);
    let count = registry.enumerate()?;
    log::info!("Opened {} spectrometer(s) on {}", count, spec);

    let result = f(&mut registry);
    registry.close_all();
    result
}

fn unknown_backend_error(name: &str) -> Box<dyn std::error::Error> {
    format!(
        "Unknown backend: {} (available: {})",
        name,
        backend_names_short()
    )
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_params() {
        let p = parse_backend_params("usb").unwrap();
        assert_eq!(p.name, "usb");
        assert!(p.params.is_empty());

        let p = parse_backend_params("dummy:count=2,pixels=512").unwrap();
        assert_eq!(p.name, "dummy");
        assert_eq!(p.pairs(), vec![("count", "2"), ("pixels", "512")]);

        assert!(parse_backend_params("dummy:count").is_err());
    }

    #[test]
    fn test_unknown_backend() {
        assert!(open_backend("serial").is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_with_registry_dummy() {
        let mut seen = 0;
        with_registry("dummy:count=3,pixels=32", |registry| {
            seen = registry.count();
            assert_eq!(registry.get(2).map(|s| s.pixels()), Some(32));
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, 3);
    }
}
