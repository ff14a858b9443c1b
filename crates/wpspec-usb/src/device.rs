//! Spectrometer USB device implementation
//!
//! [`UsbSpectrometer`] wraps a claimed nusb interface and implements the
//! core [`Transport`] trait. It performs raw transfers only; padding rules,
//! retries and protocol decoding live above it.

use std::time::Duration;

use nusb::transfer::{Buffer, Bulk, ControlIn, ControlOut, ControlType, In, Recipient};
use nusb::{Endpoint, Interface, MaybeFuture};
use wpspec_core::error::Result as CoreResult;
use wpspec_core::family::DeviceFamily;
use wpspec_core::transport::{DeviceProvider, DiscoveredDevice, Transport};

use crate::error::{Result, UsbError};
use crate::protocol::*;

/// Configuration options for opening spectrometers
#[derive(Debug, Clone)]
pub struct UsbConfig {
    /// Only open devices of this family
    pub family: Option<DeviceFamily>,
    /// Override the per-transfer control timeout
    pub timeout: Option<Duration>,
    /// Interface to claim
    pub interface: u8,
}

impl UsbConfig {
    /// Family of a VID/PID pair if this configuration would open it
    pub fn accepts(&self, vid: u16, pid: u16) -> Option<DeviceFamily> {
        if !is_supported(vid, pid) {
            return None;
        }
        let family = DeviceFamily::from_pid(pid)?;
        match self.family {
            Some(wanted) if wanted != family => None,
            _ => Some(family),
        }
    }
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            family: None,
            timeout: None,
            interface: DEFAULT_INTERFACE,
        }
    }
}

/// Parse options from key=value pairs
///
/// Supported options:
/// - `pid=0x1000|0x2000|0x4000` or `family=silicon|ingaas|arm`: open only
///   that family
/// - `timeout=MS`: control transfer timeout in milliseconds
/// - `interface=N`: USB interface number (default 0)
pub fn parse_options(options: &[(&str, &str)]) -> Result<UsbConfig> {
    let mut config = UsbConfig::default();

    for (key, value) in options {
        match *key {
            "pid" | "family" => {
                config.family = Some(DeviceFamily::parse(value).ok_or_else(|| {
                    UsbError::InvalidParameter(format!("{}: {}", key, value))
                })?);
            }
            "timeout" => {
                let ms: u64 = value
                    .parse()
                    .map_err(|_| UsbError::InvalidParameter(format!("timeout: {}", value)))?;
                if ms == 0 {
                    return Err(UsbError::InvalidParameter(format!("timeout: {}", value)));
                }
                config.timeout = Some(Duration::from_millis(ms));
            }
            "interface" => {
                config.interface = value
                    .parse()
                    .map_err(|_| UsbError::InvalidParameter(format!("interface: {}", value)))?;
            }
            _ => {
                return Err(UsbError::InvalidParameter(format!(
                    "unknown option: {}",
                    key
                )));
            }
        }
    }

    Ok(config)
}

/// Information about a connected spectrometer, gathered without opening it
#[derive(Debug, Clone)]
pub struct UsbDeviceInfo {
    /// Bus identifier
    pub bus: String,
    /// Device address on the bus
    pub address: u8,
    /// USB product ID
    pub product_id: u16,
    /// Device family
    pub family: DeviceFamily,
    /// Serial number string descriptor, if the device has one
    pub serial_number: Option<String>,
}

/// List connected spectrometers matching `config` without opening them
///
/// Returns [`UsbError::DeviceNotFound`] when nothing matches.
pub fn list_devices(config: &UsbConfig) -> Result<Vec<UsbDeviceInfo>> {
    let devices = nusb::list_devices()
        .wait()
        .map_err(|e| UsbError::OpenFailed(e.to_string()))?
        .filter_map(|d| {
            let family = config.accepts(d.vendor_id(), d.product_id())?;
            Some(UsbDeviceInfo {
                bus: d.bus_id().to_string(),
                address: d.device_address(),
                product_id: d.product_id(),
                family,
                serial_number: d.serial_number().map(str::to_string),
            })
        })
        .collect();

    require_any(devices)
}

fn require_any(devices: Vec<UsbDeviceInfo>) -> Result<Vec<UsbDeviceInfo>> {
    if devices.is_empty() {
        return Err(UsbError::DeviceNotFound);
    }
    Ok(devices)
}

/// One opened and claimed spectrometer
pub struct UsbSpectrometer {
    /// Claimed interface; `None` once released
    interface: Option<Interface>,
    /// Product ID the device enumerated with
    product_id: u16,
    /// Replaces the caller's control timeout when set
    timeout: Option<Duration>,
}

impl UsbSpectrometer {
    /// Open and claim a specific device
    pub fn open(device_info: &nusb::DeviceInfo, config: &UsbConfig) -> Result<Self> {
        log::info!(
            "Opening {} at bus {} address {}",
            product_name(device_info.product_id()),
            device_info.bus_id(),
            device_info.device_address()
        );

        let device = device_info
            .open()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?;

        let interface = device
            .claim_interface(config.interface)
            .wait()
            .map_err(|e| UsbError::ClaimFailed(e.to_string()))?;

        Ok(Self {
            interface: Some(interface),
            product_id: device_info.product_id(),
            timeout: config.timeout,
        })
    }

    /// Product ID the device enumerated with
    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    fn interface(&self) -> Result<&Interface> {
        self.interface.as_ref().ok_or(UsbError::Released)
    }

    fn control_timeout(&self, requested: Duration) -> Duration {
        self.timeout.unwrap_or(requested)
    }

    fn control_write(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize> {
        let timeout = self.control_timeout(timeout);
        self.interface()?
            .control_out(
                ControlOut {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    data,
                },
                timeout,
            )
            .wait()?;

        Ok(data.len())
    }

    fn control_read(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        len: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        let length = u16::try_from(len)
            .map_err(|_| UsbError::InvalidParameter(format!("control read length {}", len)))?;
        let timeout = self.control_timeout(timeout);
        let data = self
            .interface()?
            .control_in(
                ControlIn {
                    control_type: ControlType::Vendor,
                    recipient: Recipient::Device,
                    request,
                    value,
                    index,
                    length,
                },
                timeout,
            )
            .wait()?;

        Ok(data)
    }

    fn bulk_read(&mut self, endpoint: u8, len: usize, timeout: Duration) -> Result<Vec<u8>> {
        let mut in_ep: Endpoint<Bulk, In> = self
            .interface()?
            .endpoint(endpoint)
            .map_err(|e| UsbError::TransferFailed(e.to_string()))?;

        let max_packet_size = in_ep.max_packet_size();
        let request_len = len.div_ceil(max_packet_size) * max_packet_size;
        let mut in_buf = Buffer::new(request_len);
        in_buf.set_requested_len(request_len);

        let completion = in_ep.transfer_blocking(in_buf, timeout);
        let data = completion.into_result()?;

        let len = data.len().min(len);
        Ok(data[..len].to_vec())
    }
}

impl Transport for UsbSpectrometer {
    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> CoreResult<usize> {
        Ok(self.control_write(request, value, index, data, timeout)?)
    }

    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        len: usize,
        timeout: Duration,
    ) -> CoreResult<Vec<u8>> {
        Ok(self.control_read(request, value, index, len, timeout)?)
    }

    fn bulk_in(&mut self, endpoint: u8, len: usize, timeout: Duration) -> CoreResult<Vec<u8>> {
        Ok(self.bulk_read(endpoint, len, timeout)?)
    }

    fn release(&mut self) -> CoreResult<()> {
        if self.interface.take().is_some() {
            log::debug!("Released spectrometer 0x{:04X}", self.product_id);
        }
        Ok(())
    }
}

/// Opens every connected spectrometer
#[derive(Debug, Clone, Default)]
pub struct UsbProvider {
    config: UsbConfig,
}

impl UsbProvider {
    /// Create a provider with the given configuration
    pub fn new(config: UsbConfig) -> Self {
        Self { config }
    }
}

impl DeviceProvider for UsbProvider {
    type Transport = UsbSpectrometer;

    fn open_all(&mut self) -> CoreResult<Vec<DiscoveredDevice<UsbSpectrometer>>> {
        let candidates: Vec<_> = nusb::list_devices()
            .wait()
            .map_err(|e| UsbError::OpenFailed(e.to_string()))?
            .filter(|d| self.config.accepts(d.vendor_id(), d.product_id()).is_some())
            .collect();

        log::debug!("Found {} candidate spectrometer(s)", candidates.len());

        let mut opened = Vec::with_capacity(candidates.len());
        for device_info in &candidates {
            match UsbSpectrometer::open(device_info, &self.config) {
                Ok(transport) => opened.push(DiscoveredDevice {
                    product_id: transport.product_id(),
                    transport,
                }),
                Err(e) => log::warn!(
                    "Skipping device at bus {} address {}: {}",
                    device_info.bus_id(),
                    device_info.device_address(),
                    e
                ),
            }
        }

        Ok(opened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options_default() {
        let config = parse_options(&[]).unwrap();
        assert_eq!(config.family, None);
        assert_eq!(config.timeout, None);
        assert_eq!(config.interface, 0);
    }

    #[test]
    fn test_parse_options() {
        let config =
            parse_options(&[("pid", "0x4000"), ("timeout", "2500"), ("interface", "1")]).unwrap();
        assert_eq!(config.family, Some(DeviceFamily::Arm));
        assert_eq!(config.timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.interface, 1);

        let config = parse_options(&[("family", "ingaas")]).unwrap();
        assert_eq!(config.family, Some(DeviceFamily::InGaAs));
    }

    #[test]
    fn test_accepts() {
        let config = UsbConfig::default();
        assert_eq!(config.accepts(WASATCH_VID, 0x1000), Some(DeviceFamily::Silicon));
        assert_eq!(config.accepts(WASATCH_VID, 0x4000), Some(DeviceFamily::Arm));
        assert_eq!(config.accepts(WASATCH_VID, 0x3000), None);
        assert_eq!(config.accepts(0x0483, 0x4000), None);

        let config = parse_options(&[("family", "ingaas")]).unwrap();
        assert_eq!(config.accepts(WASATCH_VID, 0x2000), Some(DeviceFamily::InGaAs));
        assert_eq!(config.accepts(WASATCH_VID, 0x1000), None);
    }

    #[test]
    fn test_empty_listing_is_device_not_found() {
        assert!(matches!(require_any(Vec::new()), Err(UsbError::DeviceNotFound)));

        let info = UsbDeviceInfo {
            bus: "1".into(),
            address: 4,
            product_id: 0x4000,
            family: DeviceFamily::Arm,
            serial_number: None,
        };
        assert_eq!(require_any(vec![info]).unwrap().len(), 1);
    }

    #[test]
    fn test_parse_options_invalid() {
        assert!(parse_options(&[("pid", "0x3000")]).is_err());
        assert!(parse_options(&[("timeout", "0")]).is_err());
        assert!(parse_options(&[("timeout", "soon")]).is_err());
        assert!(parse_options(&[("speed", "fast")]).is_err());
    }
}
