//! wpspec-dummy - In-memory spectrometer emulator for testing
//!
//! This crate provides a [`Transport`] that answers the vendor command set
//! from memory: EEPROM pages come from an [`EepromImage`], acquisitions
//! return a configurable spectrum, and every transfer is logged so tests can
//! assert on exact wire traffic. Fault injection (failing opcodes, truncated
//! EEPROM, scripted bulk reads) covers the error paths.

mod image;

use std::collections::VecDeque;
use std::time::Duration;

use wpspec_core::eeprom::PAGE_COUNT;
use wpspec_core::error::{Error, Result};
use wpspec_core::family::DeviceFamily;
use wpspec_core::opcodes;
use wpspec_core::transport::{DeviceProvider, DiscoveredDevice, Transport};

pub use image::EepromImage;

/// Configuration for one emulated spectrometer
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// USB product ID reported at discovery
    pub product_id: u16,
    /// EEPROM contents
    pub eeprom: EepromImage,
    /// Pages that can actually be read; later pages fail
    pub readable_pages: usize,
    /// Firmware version response, least significant byte first
    pub firmware: [u8; 4],
    /// FPGA version response
    pub fpga: String,
    /// Raw detector temperature ADC value
    pub temperature_raw: u16,
    /// Pixel values returned by each acquisition; a ramp if `None`
    pub spectrum: Option<Vec<u16>>,
    /// Largest number of bytes one bulk read returns
    pub bulk_chunk: usize,
    /// Canned bulk responses, consumed before any acquired spectrum
    pub bulk_script: Vec<Vec<u8>>,
    /// Opcodes whose transfers fail
    pub failing_opcodes: Vec<u8>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            product_id: DeviceFamily::Arm.pid(),
            eeprom: EepromImage::default(),
            readable_pages: PAGE_COUNT,
            firmware: [4, 3, 2, 1],
            fpga: "026-007".to_string(),
            temperature_raw: 0x0800,
            spectrum: None,
            bulk_chunk: 512,
            bulk_script: Vec::new(),
            failing_opcodes: Vec::new(),
        }
    }
}

impl DummyConfig {
    /// Default configuration for a device of `family`
    pub fn for_family(family: DeviceFamily) -> Self {
        Self {
            product_id: family.pid(),
            ..Default::default()
        }
    }

    /// Replace the EEPROM image
    pub fn with_eeprom(mut self, eeprom: EepromImage) -> Self {
        self.eeprom = eeprom;
        self
    }
}

/// One transfer as seen by the emulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferRecord {
    /// Host-to-device control transfer
    ControlOut {
        /// bRequest
        request: u8,
        /// wValue
        value: u16,
        /// wIndex
        index: u16,
        /// Payload
        data: Vec<u8>,
    },
    /// Device-to-host control transfer
    ControlIn {
        /// bRequest
        request: u8,
        /// wValue
        value: u16,
        /// wIndex
        index: u16,
        /// Requested length
        len: usize,
    },
    /// Bulk IN read
    BulkIn {
        /// Endpoint address
        endpoint: u8,
        /// Requested length
        len: usize,
    },
    /// Device released
    Release,
}

impl TransferRecord {
    /// Request code of a control transfer
    pub fn request(&self) -> Option<u8> {
        match self {
            Self::ControlOut { request, .. } | Self::ControlIn { request, .. } => Some(*request),
            _ => None,
        }
    }
}

/// Emulated spectrometer
pub struct DummySpectrometer {
    config: DummyConfig,
    transfers: Vec<TransferRecord>,
    bulk_script: VecDeque<Vec<u8>>,
    pending: VecDeque<u8>,
    integration_time_ms: u32,
    laser_enabled: bool,
    gain: u16,
    released: bool,
}

impl DummySpectrometer {
    /// Create an emulator with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let bulk_script = config.bulk_script.iter().cloned().collect();
        Self {
            config,
            transfers: Vec::new(),
            bulk_script,
            pending: VecDeque::new(),
            integration_time_ms: 0,
            laser_enabled: false,
            gain: 0x0100,
            released: false,
        }
    }

    /// Create an emulator with the default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Every transfer seen so far, oldest first
    pub fn transfers(&self) -> &[TransferRecord] {
        &self.transfers
    }

    /// Forget the transfer log
    pub fn clear_transfers(&mut self) {
        self.transfers.clear();
    }

    /// Control writes with the given opcode, in order
    pub fn writes(&self, request: u8) -> Vec<&TransferRecord> {
        self.transfers
            .iter()
            .filter(|t| matches!(t, TransferRecord::ControlOut { request: r, .. } if *r == request))
            .collect()
    }

    /// Whether [`Transport::release`] has been called
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Integration time last written by the host
    pub fn integration_time_ms(&self) -> u32 {
        self.integration_time_ms
    }

    /// Laser state last written by the host
    pub fn laser_enabled(&self) -> bool {
        self.laser_enabled
    }

    fn check(&self, request: u8) -> Result<()> {
        if self.released {
            return Err(Error::Transfer("device released".into()));
        }
        if self.config.failing_opcodes.contains(&request) {
            return Err(Error::Transfer(format!("injected stall on 0x{:02X}", request)));
        }
        Ok(())
    }

    fn spectrum_bytes(&self) -> Vec<u8> {
        if let Some(values) = &self.config.spectrum {
            return values.iter().flat_map(|v| v.to_le_bytes()).collect();
        }

        let pixels = wpspec_core::eeprom::parse_image(self.config.eeprom.as_bytes())
            .map(|record| record.pixels())
            .unwrap_or(0);
        (0..pixels)
            .flat_map(|i| (i as u16).to_le_bytes())
            .collect()
    }

    fn control_response(&self, request: u8, value: u16, index: u16) -> Result<Vec<u8>> {
        match request {
            opcodes::SECOND_TIER if value == opcodes::SECOND_TIER_GET_EEPROM_PAGE => {
                let page = index as usize;
                if page >= self.config.readable_pages {
                    return Err(Error::Transfer(format!("EEPROM page {} unreadable", page)));
                }
                self.config
                    .eeprom
                    .page(page)
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| Error::Transfer(format!("no EEPROM page {}", page)))
            }
            opcodes::GET_FIRMWARE_VERSION => Ok(self.config.firmware.to_vec()),
            opcodes::GET_FPGA_VERSION => Ok(self.config.fpga.as_bytes().to_vec()),
            opcodes::GET_DETECTOR_TEMPERATURE => {
                Ok(self.config.temperature_raw.to_be_bytes().to_vec())
            }
            opcodes::GET_INTEGRATION_TIME => Ok(self.integration_time_ms.to_le_bytes()[..3].to_vec()),
            opcodes::GET_LASER_ENABLE => Ok(vec![self.laser_enabled as u8]),
            opcodes::GET_DETECTOR_GAIN => Ok(self.gain.to_le_bytes().to_vec()),
            _ => Err(Error::Transfer(format!("unsupported request 0x{:02X}", request))),
        }
    }
}

impl Transport for DummySpectrometer {
    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize> {
        self.transfers.push(TransferRecord::ControlOut {
            request,
            value,
            index,
            data: data.to_vec(),
        });
        self.check(request)?;

        match request {
            opcodes::ACQUIRE => {
                self.pending = self.spectrum_bytes().into();
            }
            opcodes::SET_INTEGRATION_TIME => {
                self.integration_time_ms = value as u32 | ((index as u32 & 0xFF) << 16);
            }
            opcodes::SET_LASER_ENABLE => {
                self.laser_enabled = value != 0;
            }
            opcodes::SET_DETECTOR_GAIN => {
                self.gain = value;
            }
            _ => {}
        }

        Ok(data.len())
    }

    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        len: usize,
        _timeout: Duration,
    ) -> Result<Vec<u8>> {
        self.transfers.push(TransferRecord::ControlIn {
            request,
            value,
            index,
            len,
        });
        self.check(request)?;

        let mut data = self.control_response(request, value, index)?;
        data.truncate(len);
        Ok(data)
    }

    fn bulk_in(&mut self, endpoint: u8, len: usize, _timeout: Duration) -> Result<Vec<u8>> {
        self.transfers.push(TransferRecord::BulkIn { endpoint, len });
        if self.released {
            return Err(Error::Transfer("device released".into()));
        }

        if let Some(mut canned) = self.bulk_script.pop_front() {
            canned.truncate(len);
            return Ok(canned);
        }
        if endpoint != opcodes::SPECTRUM_ENDPOINT || self.pending.is_empty() {
            return Err(Error::Timeout);
        }

        let n = len.min(self.config.bulk_chunk).min(self.pending.len());
        Ok(self.pending.drain(..n).collect())
    }

    fn release(&mut self) -> Result<()> {
        self.transfers.push(TransferRecord::Release);
        self.released = true;
        Ok(())
    }
}

/// Hands out a fixed set of emulated spectrometers
#[derive(Debug, Clone, Default)]
pub struct DummyProvider {
    configs: Vec<DummyConfig>,
}

impl DummyProvider {
    /// Provide one emulator per configuration, in order
    pub fn new(configs: Vec<DummyConfig>) -> Self {
        Self { configs }
    }
}

impl DeviceProvider for DummyProvider {
    type Transport = DummySpectrometer;

    fn open_all(&mut self) -> Result<Vec<DiscoveredDevice<DummySpectrometer>>> {
        log::debug!("Opening {} dummy spectrometer(s)", self.configs.len());
        Ok(self
            .configs
            .iter()
            .cloned()
            .map(|config| DiscoveredDevice {
                product_id: config.product_id,
                transport: DummySpectrometer::new(config),
            })
            .collect())
    }
}

/// Parse dummy backend options
///
/// Supported options:
/// - `count=N`: number of emulated devices (default 1)
/// - `pixels=N`: active pixels per device (default 1024)
/// - `family=silicon|ingaas|arm`: device family (default arm)
/// - `cooled=yes|no`: fit a TEC (default no)
/// - `excitation=NM`: laser wavelength, 0 for none (default 785)
pub fn parse_options(options: &[(&str, &str)]) -> Result<DummyProvider> {
    let mut count = 1usize;
    let mut pixels = 1024u16;
    let mut family = DeviceFamily::Arm;
    let mut cooled = false;
    let mut excitation = 785.0f32;

    for (key, value) in options {
        let invalid = || Error::out_of_range("dummy option", format!("{}={}", key, value));
        match *key {
            "count" => count = value.parse().map_err(|_| invalid())?,
            "pixels" => {
                pixels = value.parse().map_err(|_| invalid())?;
                if pixels == 0 {
                    return Err(invalid());
                }
            }
            "family" => family = DeviceFamily::parse(value).ok_or_else(invalid)?,
            "cooled" => {
                cooled = match value.to_lowercase().as_str() {
                    "yes" | "true" | "1" => true,
                    "no" | "false" | "0" => false,
                    _ => return Err(invalid()),
                }
            }
            "excitation" => excitation = value.parse().map_err(|_| invalid())?,
            _ => {
                return Err(Error::out_of_range("dummy option", key));
            }
        }
    }

    let configs = (0..count)
        .map(|i| {
            let mut eeprom = EepromImage::new(pixels)
                .serial_number(&format!("DUMMY-{:04}", i + 1))
                .excitation_nm(excitation);
            if cooled {
                eeprom = eeprom
                    .cooling(-20, 20, 10, [2048.0, -40.0, 0.0])
                    .adc_to_deg_c([-40.0, 0.025, 0.0]);
            }
            DummyConfig::for_family(family).with_eeprom(eeprom)
        })
        .collect();

    Ok(DummyProvider::new(configs))
}
