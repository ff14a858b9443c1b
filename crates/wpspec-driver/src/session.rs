//! Spectrometer session
//!
//! A [`Spectrometer`] owns one opened transport, the calibration record read
//! from it, and the acquisition state the host has pushed to the device.
//!
//! # Lifecycle
//!
//! ```text
//! Constructing ──(EEPROM + priming ok)──▶ Ready ──close()──▶ Closed
//!      │
//!      └──(any mandatory step fails)──▶ transport released, no session
//! ```
//!
//! Only [`Spectrometer::open`] ever observes `Constructing`. Once `Closed`,
//! every operation except [`close`](Spectrometer::close) fails with
//! [`Error::SessionClosed`].

use std::time::Duration;

use wpspec_core::codec;
use wpspec_core::eeprom::{self, CalibrationRecord};
use wpspec_core::error::{Capability, Error, Result};
use wpspec_core::opcodes;
use wpspec_core::wavecal;
use wpspec_core::{CommandChannel, DeviceFamily, Transport};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// EEPROM load and hardware priming in progress
    Constructing,
    /// Accepting operations
    Ready,
    /// Transport released
    Closed,
}

/// When a settor records the value it sent
///
/// The firmware never acknowledges a setting semantically, so "after" only
/// means the transfer itself completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateCommit {
    /// Record only once the transfer succeeds
    AfterTransfer,
    /// Record as soon as the transfer is attempted
    BeforeTransfer,
}

impl StateCommit {
    fn applies(self, transferred: bool) -> bool {
        match self {
            Self::AfterTransfer => transferred,
            Self::BeforeTransfer => true,
        }
    }
}

/// Integration time is tracked once the write completes
pub const INTEGRATION_TIME_COMMIT: StateCommit = StateCommit::AfterTransfer;
/// The TEC setpoint gate closes even if the write fails
pub const TEC_SETPOINT_COMMIT: StateCommit = StateCommit::BeforeTransfer;

/// Bulk timeout slack on top of twice the integration time
const BULK_TIMEOUT_SLACK_MS: u64 = 2000;

/// Bytes requested for the firmware version
const FIRMWARE_VERSION_LEN: usize = 4;
/// Bytes requested for the FPGA version
const FPGA_VERSION_LEN: usize = 7;
/// Bytes requested for the detector temperature
const TEMPERATURE_LEN: usize = 2;

/// One open spectrometer
pub struct Spectrometer<T> {
    channel: CommandChannel<T>,
    eeprom: CalibrationRecord,
    wavelengths: Vec<f64>,
    wavenumbers: Vec<f64>,
    state: State,
    integration_time_ms: u32,
    laser_enabled: bool,
    tec_setpoint_deg_c: Option<f32>,
    last_temperature_deg_c: Option<f32>,
}

impl<T: Transport> Spectrometer<T> {
    /// Bring up a session on an opened transport
    ///
    /// Reads the version strings, loads and parses the EEPROM, expands the
    /// wavelength and wavenumber axes, then pushes the calibrated gain and
    /// offset, TEC setpoint and (for compact detectors) vertical ROI. Any
    /// mandatory failure releases the transport and returns the error.
    ///
    /// The integration time is left as the firmware has it; the cached
    /// value starts at the minimum until the first
    /// [`set_integration_time_ms`](Self::set_integration_time_ms).
    pub fn open(transport: T, family: DeviceFamily) -> Result<Self> {
        let mut channel = CommandChannel::new(transport, family);
        log::info!("Initializing {} spectrometer", family);

        let firmware = read_firmware_version(&mut channel);
        let fpga = read_fpga_version(&mut channel);
        if firmware.is_empty() && fpga.is_empty() {
            log::warn!("Spectrometer did not report firmware or FPGA version");
        } else {
            log::debug!("Firmware {}, FPGA {}", firmware, fpga);
        }

        let eeprom = match eeprom::load(&mut channel) {
            Ok(record) => record,
            Err(e) => {
                release_quietly(&mut channel);
                return Err(e.into());
            }
        };

        let wavelengths = wavecal::expand_wavelengths(&eeprom.wavecal_coeffs, eeprom.pixels());
        let wavenumbers = wavecal::expand_wavenumbers(eeprom.excitation_nm, &wavelengths);

        let mut spec = Self {
            channel,
            eeprom,
            wavelengths,
            wavenumbers,
            state: State::Constructing,
            integration_time_ms: codec::MIN_INTEGRATION_TIME_MS,
            laser_enabled: false,
            tec_setpoint_deg_c: None,
            last_temperature_deg_c: None,
        };

        if let Err(e) = spec.prime() {
            log::error!("Spectrometer initialization failed: {}", e);
            release_quietly(&mut spec.channel);
            spec.state = State::Closed;
            return Err(e);
        }

        spec.state = State::Ready;
        log::info!(
            "Opened {} {} ({} pixels)",
            spec.eeprom.model(),
            spec.eeprom.serial_number(),
            spec.pixels()
        );
        Ok(spec)
    }

    /// Push calibrated defaults to the hardware
    fn prime(&mut self) -> Result<()> {
        let (gain, gain_odd) = (self.eeprom.detector_gain, self.eeprom.detector_gain_odd);
        let (offset, offset_odd) = (self.eeprom.detector_offset, self.eeprom.detector_offset_odd);
        self.prime_gain(opcodes::SET_DETECTOR_GAIN, gain)?;
        self.prime_gain(opcodes::SET_DETECTOR_GAIN_ODD, gain_odd)?;
        self.send_offset(opcodes::SET_DETECTOR_OFFSET, offset)?;
        self.send_offset(opcodes::SET_DETECTOR_OFFSET_ODD, offset_odd)?;

        self.init_tec()?;
        self.init_vertical_roi()?;
        Ok(())
    }

    fn prime_gain(&mut self, opcode: u8, value: f32) -> Result<()> {
        match codec::encode_gain(value) {
            Ok(word) => self.channel.send(opcode, word, 0, None).map(drop),
            Err(e) => {
                log::warn!("Not applying EEPROM gain for opcode 0x{:02X}: {}", opcode, e);
                Ok(())
            }
        }
    }

    fn init_tec(&mut self) -> Result<()> {
        if !self.eeprom.has_cooling {
            log::debug!("No TEC fitted, skipping TEC init");
            return Ok(());
        }

        let startup = self.eeprom.startup_temp_deg_c as f32;
        let setpoint = if self.eeprom.setpoint_in_range(startup) {
            startup
        } else {
            self.eeprom.min_temperature_deg_c as f32
        };
        log::debug!("TEC init: setpoint {} degC", setpoint);

        self.send_tec_setpoint(setpoint)?;
        self.channel
            .send(opcodes::SET_TEC_ENABLE, 1, 0, None)
            .map(drop)
    }

    fn is_compact_detector(&self) -> bool {
        let model = self.eeprom.model().to_ascii_lowercase();
        self.family() == DeviceFamily::Arm && (model.contains("sig") || model.contains("micro"))
    }

    fn init_vertical_roi(&mut self) -> Result<()> {
        if !self.is_compact_detector() {
            return Ok(());
        }

        let (start, stop) = self.eeprom.roi_vert_regions[0];
        if start >= stop {
            log::debug!("Vertical ROI region 1 is empty, leaving detector lines as-is");
            return Ok(());
        }

        log::debug!("Priming vertical ROI lines {}..{}", start, stop);
        self.channel.send(
            opcodes::SECOND_TIER,
            opcodes::SECOND_TIER_SET_DETECTOR_START_LINE,
            start,
            None,
        )?;
        self.channel.send(
            opcodes::SECOND_TIER,
            opcodes::SECOND_TIER_SET_DETECTOR_STOP_LINE,
            stop,
            None,
        )?;
        Ok(())
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.state {
            State::Closed => Err(Error::SessionClosed),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Settors
    // ========================================================================

    /// Set the integration time, clamped to `[1, 2^24 - 1]` ms
    pub fn set_integration_time_ms(&mut self, ms: u32) -> Result<()> {
        self.ensure_ready()?;
        self.send_integration_time(ms)
    }

    fn send_integration_time(&mut self, ms: u32) -> Result<()> {
        let ms = codec::clamp_integration_time(ms);
        let (lsw, msw) = codec::split_integration_time(ms);

        let result = self
            .channel
            .send(opcodes::SET_INTEGRATION_TIME, lsw, msw, None);
        if INTEGRATION_TIME_COMMIT.applies(result.is_ok()) {
            self.integration_time_ms = ms;
            log::debug!("integrationTimeMS -> {}", ms);
        }
        result.map(drop)
    }

    /// Switch the laser on or off
    pub fn set_laser_enable(&mut self, enable: bool) -> Result<()> {
        self.ensure_ready()?;
        self.channel
            .send(opcodes::SET_LASER_ENABLE, enable as u16, 0, None)?;
        self.laser_enabled = enable;
        log::debug!("laserEnable -> {}", enable);
        Ok(())
    }

    /// Set the even-pixel detector gain, in `[0, 256)`
    pub fn set_detector_gain(&mut self, value: f32) -> Result<()> {
        self.ensure_ready()?;
        self.send_gain(opcodes::SET_DETECTOR_GAIN, value)
    }

    /// Set the odd-pixel detector gain, in `[0, 256)`
    pub fn set_detector_gain_odd(&mut self, value: f32) -> Result<()> {
        self.ensure_ready()?;
        self.send_gain(opcodes::SET_DETECTOR_GAIN_ODD, value)
    }

    fn send_gain(&mut self, opcode: u8, value: f32) -> Result<()> {
        let word = codec::encode_gain(value)?;
        self.channel.send(opcode, word, 0, None)?;
        log::debug!("gain (0x{:02X}) -> 0x{:04X} ({:.2})", opcode, word, value);
        Ok(())
    }

    /// Set the even-pixel detector offset
    pub fn set_detector_offset(&mut self, value: i16) -> Result<()> {
        self.ensure_ready()?;
        self.send_offset(opcodes::SET_DETECTOR_OFFSET, value)
    }

    /// Set the odd-pixel detector offset
    pub fn set_detector_offset_odd(&mut self, value: i16) -> Result<()> {
        self.ensure_ready()?;
        self.send_offset(opcodes::SET_DETECTOR_OFFSET_ODD, value)
    }

    fn send_offset(&mut self, opcode: u8, value: i16) -> Result<()> {
        let word = codec::reinterpret_i16_bits(value);
        self.channel.send(opcode, word, 0, None)?;
        log::debug!("offset (0x{:02X}) -> 0x{:04X} ({})", opcode, word, value);
        Ok(())
    }

    /// Switch the detector TEC on or off
    ///
    /// Enabling before any setpoint was ever sent first drives the setpoint
    /// to the calibrated minimum.
    pub fn set_tec_enable(&mut self, enable: bool) -> Result<()> {
        self.ensure_ready()?;
        if !self.eeprom.has_cooling {
            return Err(Error::Unsupported(Capability::Cooling));
        }

        if enable && self.tec_setpoint_deg_c.is_none() {
            let min = self.eeprom.min_temperature_deg_c as f32;
            log::debug!("Defaulting TEC setpoint to {} degC", min);
            if let Err(e) = self.send_tec_setpoint(min) {
                log::warn!("Default TEC setpoint failed: {}", e);
            }
        }

        self.channel
            .send(opcodes::SET_TEC_ENABLE, enable as u16, 0, None)?;
        log::debug!("tecEnable -> {}", if enable { "on" } else { "off" });
        Ok(())
    }

    /// Set the detector TEC setpoint within the calibrated range
    pub fn set_detector_tec_setpoint_deg_c(&mut self, deg_c: f32) -> Result<()> {
        self.ensure_ready()?;
        self.send_tec_setpoint(deg_c)
    }

    fn send_tec_setpoint(&mut self, deg_c: f32) -> Result<()> {
        if !self.eeprom.has_cooling {
            return Err(Error::Unsupported(Capability::Cooling));
        }
        if !self.eeprom.setpoint_in_range(deg_c) {
            return Err(Error::out_of_range("TEC setpoint", deg_c));
        }

        let dac = codec::tec_setpoint_dac(&self.eeprom.deg_c_to_dac_coeffs, deg_c);
        let result = self.channel.send(opcodes::SET_TEC_SETPOINT, dac, 0, None);
        if TEC_SETPOINT_COMMIT.applies(result.is_ok()) {
            self.tec_setpoint_deg_c = Some(deg_c);
        }
        log::debug!("tecSetpoint -> {} degC (dac 0x{:03X})", deg_c, dac);
        result.map(drop)
    }

    /// Enable or disable InGaAs high-gain mode
    pub fn set_high_gain_mode(&mut self, enable: bool) -> Result<()> {
        self.ensure_ready()?;
        if !self.family().supports_high_gain() {
            return Err(Error::Unsupported(Capability::HighGain));
        }
        self.channel
            .send(opcodes::SET_HIGH_GAIN_MODE, enable as u16, 0, None)
            .map(drop)
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Firmware version as a dotted quad; empty if unavailable
    pub fn firmware_version(&mut self) -> Result<String> {
        self.ensure_ready()?;
        Ok(read_firmware_version(&mut self.channel))
    }

    /// FPGA version string; empty if unavailable
    pub fn fpga_version(&mut self) -> Result<String> {
        self.ensure_ready()?;
        Ok(read_fpga_version(&mut self.channel))
    }

    /// Raw detector temperature ADC reading
    pub fn detector_temperature_raw(&mut self) -> Result<u16> {
        self.ensure_ready()?;
        let data = self
            .channel
            .receive(opcodes::GET_DETECTOR_TEMPERATURE, 0, 0, TEMPERATURE_LEN);
        codec::decode_temperature_raw(&data).ok_or_else(|| {
            log::error!("Detector temperature: short response {:02X?}", data);
            Error::ShortResponse {
                opcode: opcodes::GET_DETECTOR_TEMPERATURE,
                expected: TEMPERATURE_LEN,
                actual: data.len(),
            }
        })
    }

    /// Detector temperature in °C via the calibrated ADC polynomial
    pub fn detector_temperature_deg_c(&mut self) -> Result<f32> {
        let raw = self.detector_temperature_raw()?;
        let deg_c = codec::adc_to_deg_c(&self.eeprom.adc_to_deg_c_coeffs, raw);
        self.last_temperature_deg_c = Some(deg_c);
        log::debug!("detectorTemperatureDegC = {:.2} (0x{:04X} raw)", deg_c, raw);
        Ok(deg_c)
    }

    /// Integration time as reported by the device
    pub fn read_integration_time_ms(&mut self) -> Result<u32> {
        self.ensure_ready()?;
        let data = self
            .channel
            .receive(opcodes::GET_INTEGRATION_TIME, 0, 0, 3);
        codec::decode_integration_time(&data).ok_or(Error::ShortResponse {
            opcode: opcodes::GET_INTEGRATION_TIME,
            expected: 3,
            actual: data.len(),
        })
    }

    /// Laser state as reported by the device
    pub fn read_laser_enabled(&mut self) -> Result<bool> {
        self.ensure_ready()?;
        let data = self.channel.receive(opcodes::GET_LASER_ENABLE, 0, 0, 1);
        data.first().map(|&b| b != 0).ok_or(Error::ShortResponse {
            opcode: opcodes::GET_LASER_ENABLE,
            expected: 1,
            actual: 0,
        })
    }

    /// Even-pixel detector gain as reported by the device
    pub fn read_detector_gain(&mut self) -> Result<f32> {
        self.ensure_ready()?;
        let data = self.channel.receive(opcodes::GET_DETECTOR_GAIN, 0, 0, 2);
        match data.as_slice() {
            [lsb, msb, ..] => Ok(codec::decode_gain(u16::from_le_bytes([*lsb, *msb]))),
            _ => Err(Error::ShortResponse {
                opcode: opcodes::GET_DETECTOR_GAIN,
                expected: 2,
                actual: data.len(),
            }),
        }
    }

    // ========================================================================
    // Acquisition
    // ========================================================================

    /// Timeout for each bulk read of a spectrum
    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_millis(2 * self.integration_time_ms as u64 + BULK_TIMEOUT_SLACK_MS)
    }

    /// Trigger an acquisition and read one spectrum
    ///
    /// Reads until `pixels * 2` bytes have arrived, asking for the remaining
    /// count each time. An empty or odd-length read aborts the acquisition
    /// and discards what arrived. Pixel 0 is replaced by pixel 1.
    pub fn get_spectrum(&mut self) -> Result<Vec<u16>> {
        self.ensure_ready()?;

        let expected = self.pixels() * 2;
        let timeout = self.bulk_timeout();

        log::debug!("Sending ACQUIRE");
        self.channel.send(opcodes::ACQUIRE, 0, 0, None)?;

        let mut raw = Vec::with_capacity(expected);
        while raw.len() < expected {
            let remaining = expected - raw.len();
            let chunk = self
                .channel
                .bulk_read(opcodes::SPECTRUM_ENDPOINT, remaining, timeout)
                .inspect_err(|e| log::error!("getSpectrum: bulk read failed: {}", e))?;

            if chunk.is_empty() {
                log::error!("getSpectrum: zero-length read, giving up");
                return Err(Error::IncompleteSpectrum {
                    received: raw.len(),
                    expected,
                });
            }
            if chunk.len() % 2 != 0 {
                log::error!("getSpectrum: read odd number of bytes ({})", chunk.len());
                return Err(Error::OddLengthRead(chunk.len()));
            }

            raw.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
            log::trace!("getSpectrum: {} of {} bytes", raw.len(), expected);
        }

        let mut spectrum: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        // first pixel is an artifact
        if spectrum.len() > 1 {
            spectrum[0] = spectrum[1];
        }

        log::debug!("getSpectrum: returning {} pixels", spectrum.len());
        Ok(spectrum)
    }

    /// Release the transport
    ///
    /// Derived axes are cleared. Closing an already closed session does
    /// nothing.
    pub fn close(&mut self) -> Result<()> {
        if self.state == State::Closed {
            return Ok(());
        }

        self.state = State::Closed;
        self.wavelengths = Vec::new();
        self.wavenumbers = Vec::new();
        self.last_temperature_deg_c = None;
        log::info!("Closing {}", self.eeprom.serial_number());
        self.channel.release()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Lifecycle state
    pub fn state(&self) -> State {
        self.state
    }

    /// Device family
    pub fn family(&self) -> DeviceFamily {
        self.channel.family()
    }

    /// Calibration record
    pub fn eeprom(&self) -> &CalibrationRecord {
        &self.eeprom
    }

    /// Spectrum length in pixels
    pub fn pixels(&self) -> usize {
        self.eeprom.pixels()
    }

    /// Model name
    pub fn model(&self) -> &str {
        self.eeprom.model()
    }

    /// Serial number
    pub fn serial_number(&self) -> &str {
        self.eeprom.serial_number()
    }

    /// Wavelength of each pixel in nm
    pub fn wavelengths(&self) -> &[f64] {
        &self.wavelengths
    }

    /// Raman shift of each pixel in 1/cm; empty without an excitation
    pub fn wavenumbers(&self) -> &[f64] {
        &self.wavenumbers
    }

    /// Integration time last sent
    pub fn integration_time_ms(&self) -> u32 {
        self.integration_time_ms
    }

    /// Laser state last sent
    pub fn laser_enabled(&self) -> bool {
        self.laser_enabled
    }

    /// TEC setpoint last requested, if any
    pub fn tec_setpoint_deg_c(&self) -> Option<f32> {
        self.tec_setpoint_deg_c
    }

    /// Last detector temperature read
    pub fn last_temperature_deg_c(&self) -> Option<f32> {
        self.last_temperature_deg_c
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        self.channel.transport()
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        self.channel.transport_mut()
    }
}

fn read_firmware_version<T: Transport>(channel: &mut CommandChannel<T>) -> String {
    let data = channel.receive(opcodes::GET_FIRMWARE_VERSION, 0, 0, FIRMWARE_VERSION_LEN);
    codec::format_firmware_version(&data)
}

fn read_fpga_version<T: Transport>(channel: &mut CommandChannel<T>) -> String {
    let data = channel.receive(opcodes::GET_FPGA_VERSION, 0, 0, FPGA_VERSION_LEN);
    codec::format_fpga_version(&data)
}

fn release_quietly<T: Transport>(channel: &mut CommandChannel<T>) {
    if let Err(e) = channel.release() {
        log::warn!("Release after failed initialization: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpspec_core::eeprom::PAGE_COUNT;
    use wpspec_dummy::{DummyConfig, DummySpectrometer, EepromImage, TransferRecord};

    fn open(config: DummyConfig) -> Spectrometer<DummySpectrometer> {
        let family = DeviceFamily::from_pid(config.product_id).unwrap();
        Spectrometer::open(DummySpectrometer::new(config), family).unwrap()
    }

    fn open_cleared(config: DummyConfig) -> Spectrometer<DummySpectrometer> {
        let mut spec = open(config);
        spec.transport_mut().clear_transfers();
        spec
    }

    fn cooled() -> DummyConfig {
        DummyConfig::default().with_eeprom(
            EepromImage::new(1024)
                .cooling(-15, 20, 10, [100.0, 10.0, 0.0])
                .adc_to_deg_c([-10.0, 0.5, 0.0]),
        )
    }

    fn out_values(spec: &Spectrometer<DummySpectrometer>, request: u8) -> Vec<(u16, u16)> {
        spec.transport()
            .writes(request)
            .into_iter()
            .map(|t| match t {
                TransferRecord::ControlOut { value, index, .. } => (*value, *index),
                _ => unreachable!(),
            })
            .collect()
    }

    #[test]
    fn test_open() {
        let spec = open(DummyConfig::default());
        assert_eq!(spec.state(), State::Ready);
        assert_eq!(spec.pixels(), 1024);
        assert_eq!(spec.wavelengths().len(), 1024);
        assert_eq!(spec.wavenumbers().len(), 1024);
        assert_eq!(spec.model(), "WP-785X");
        assert_eq!(spec.integration_time_ms(), 1);
    }

    #[test]
    fn test_open_leaves_integration_time_alone() {
        let spec = open(DummyConfig::default());
        assert!(spec.transport().writes(opcodes::SET_INTEGRATION_TIME).is_empty());
        assert_eq!(spec.transport().integration_time_ms(), 0);

        // the first write of construction is the even gain
        let first = spec
            .transport()
            .transfers()
            .iter()
            .find_map(|t| match t {
                TransferRecord::ControlOut { request, .. } => Some(*request),
                _ => None,
            });
        assert_eq!(first, Some(opcodes::SET_DETECTOR_GAIN));
    }

    #[test]
    fn test_open_survives_integration_time_stall() {
        let config = DummyConfig {
            failing_opcodes: vec![opcodes::SET_INTEGRATION_TIME],
            ..Default::default()
        };
        let mut spec = open(config);
        assert_eq!(spec.state(), State::Ready);
        assert!(spec.set_integration_time_ms(100).is_err());
        assert_eq!(spec.integration_time_ms(), 1);
    }

    #[test]
    fn test_open_pushes_gain_and_offset() {
        let config = DummyConfig::default().with_eeprom(
            EepromImage::new(1024)
                .detector_gain(1.5)
                .detector_gain_odd(2.0)
                .detector_offset(-1)
                .detector_offset_odd(7),
        );
        let spec = open(config);
        assert_eq!(out_values(&spec, opcodes::SET_DETECTOR_GAIN), vec![(0x0180, 0)]);
        assert_eq!(out_values(&spec, opcodes::SET_DETECTOR_GAIN_ODD), vec![(0x0200, 0)]);
        assert_eq!(out_values(&spec, opcodes::SET_DETECTOR_OFFSET), vec![(0xFFFF, 0)]);
        assert_eq!(out_values(&spec, opcodes::SET_DETECTOR_OFFSET_ODD), vec![(7, 0)]);
    }

    #[test]
    fn test_open_skips_invalid_eeprom_gain() {
        let config = DummyConfig::default()
            .with_eeprom(EepromImage::new(1024).detector_gain(f32::NAN));
        let spec = open(config);
        assert!(spec.transport().writes(opcodes::SET_DETECTOR_GAIN).is_empty());
        assert_eq!(spec.transport().writes(opcodes::SET_DETECTOR_GAIN_ODD).len(), 1);
    }

    #[test]
    fn test_truncated_eeprom_fails_construction() {
        let config = DummyConfig {
            readable_pages: PAGE_COUNT - 1,
            ..Default::default()
        };
        let result = Spectrometer::open(DummySpectrometer::new(config), DeviceFamily::Arm);
        assert!(matches!(result, Err(Error::Eeprom(_))));
    }

    #[test]
    fn test_failed_priming_fails_construction() {
        let config = DummyConfig {
            failing_opcodes: vec![opcodes::SET_DETECTOR_OFFSET],
            ..Default::default()
        };
        let result = Spectrometer::open(DummySpectrometer::new(config), DeviceFamily::Arm);
        assert!(matches!(result, Err(Error::Transfer(_))));
    }

    #[test]
    fn test_missing_versions_are_not_fatal() {
        let config = DummyConfig {
            failing_opcodes: vec![opcodes::GET_FIRMWARE_VERSION, opcodes::GET_FPGA_VERSION],
            ..Default::default()
        };
        let mut spec = open(config);
        assert_eq!(spec.firmware_version().unwrap(), "");
        assert_eq!(spec.fpga_version().unwrap(), "");
    }

    #[test]
    fn test_no_excitation_no_wavenumbers() {
        let config =
            DummyConfig::default().with_eeprom(EepromImage::new(16).excitation_nm(0.0));
        let spec = open(config);
        assert_eq!(spec.wavelengths().len(), 16);
        assert!(spec.wavenumbers().is_empty());
    }

    #[test]
    fn test_wavelengths_follow_wavecal() {
        let config = DummyConfig::default()
            .with_eeprom(EepromImage::new(4).wavecal([0.0, 1.0, 0.0, 0.0, 0.0]));
        let spec = open(config);
        assert_eq!(spec.wavelengths(), &[0.0, 1.0, 2.0, 3.0]);
        // zero wavelength maps to zero shift
        assert_eq!(spec.wavenumbers()[0], 0.0);
    }

    #[test]
    fn test_integration_time_clamped() {
        let mut spec = open_cleared(DummyConfig::default());

        spec.set_integration_time_ms(0).unwrap();
        assert_eq!(spec.integration_time_ms(), 1);

        spec.set_integration_time_ms(u32::MAX).unwrap();
        assert_eq!(spec.integration_time_ms(), (1 << 24) - 1);
        assert_eq!(
            out_values(&spec, opcodes::SET_INTEGRATION_TIME),
            vec![(1, 0), (0xFFFF, 0xFF)]
        );
    }

    #[test]
    fn test_integration_time_kept_on_failed_transfer() {
        let mut spec = open(DummyConfig::default());
        let config = DummyConfig {
            failing_opcodes: vec![opcodes::SET_INTEGRATION_TIME],
            ..Default::default()
        };
        spec.set_integration_time_ms(100).unwrap();
        *spec.transport_mut() = DummySpectrometer::new(config);

        assert!(spec.set_integration_time_ms(500).is_err());
        assert_eq!(spec.integration_time_ms(), 100);
    }

    #[test]
    fn test_integration_time_readback() {
        let mut spec = open(DummyConfig::default());
        spec.set_integration_time_ms(0x012345).unwrap();
        assert_eq!(spec.read_integration_time_ms().unwrap(), 0x012345);
    }

    #[test]
    fn test_gain_rejected_without_transfer() {
        let mut spec = open_cleared(DummyConfig::default());
        for bad in [-0.1, 256.0, 1000.0, f32::NAN] {
            assert!(matches!(
                spec.set_detector_gain(bad),
                Err(Error::OutOfRange { .. })
            ));
            assert!(spec.set_detector_gain_odd(bad).is_err());
        }
        assert!(spec.transport().transfers().is_empty());
    }

    #[test]
    fn test_gain_word() {
        let mut spec = open_cleared(DummyConfig::default());
        spec.set_detector_gain(1.9).unwrap();
        assert_eq!(out_values(&spec, opcodes::SET_DETECTOR_GAIN), vec![(0x01E6, 0)]);
        let back = spec.read_detector_gain().unwrap();
        assert!((back - 1.9).abs() <= 1.0 / 256.0);
    }

    #[test]
    fn test_offset_bits() {
        let mut spec = open_cleared(DummyConfig::default());
        for value in [-1i16, 0, i16::MAX, i16::MIN] {
            spec.set_detector_offset(value).unwrap();
            spec.set_detector_offset_odd(value).unwrap();
        }
        let expected = vec![(0xFFFF, 0), (0x0000, 0), (0x7FFF, 0), (0x8000, 0)];
        assert_eq!(out_values(&spec, opcodes::SET_DETECTOR_OFFSET), expected);
        assert_eq!(out_values(&spec, opcodes::SET_DETECTOR_OFFSET_ODD), expected);
    }

    #[test]
    fn test_laser() {
        let mut spec = open_cleared(DummyConfig::default());
        spec.set_laser_enable(true).unwrap();
        assert!(spec.laser_enabled());
        assert!(spec.read_laser_enabled().unwrap());
        spec.set_laser_enable(false).unwrap();
        assert!(!spec.transport().laser_enabled());
    }

    #[test]
    fn test_uncooled_tec_rejected() {
        let mut spec = open_cleared(DummyConfig::default());
        assert_eq!(
            spec.set_tec_enable(true),
            Err(Error::Unsupported(Capability::Cooling))
        );
        assert_eq!(
            spec.set_detector_tec_setpoint_deg_c(0.0),
            Err(Error::Unsupported(Capability::Cooling))
        );
        assert!(spec.transport().transfers().is_empty());
    }

    #[test]
    fn test_tec_init_uses_startup_setpoint() {
        let spec = open(cooled());
        // dac = 100 + 10 * 10
        assert_eq!(out_values(&spec, opcodes::SET_TEC_SETPOINT), vec![(200, 0)]);
        assert_eq!(out_values(&spec, opcodes::SET_TEC_ENABLE), vec![(1, 0)]);
        assert_eq!(spec.tec_setpoint_deg_c(), Some(10.0));
    }

    #[test]
    fn test_tec_init_out_of_range_startup_uses_min() {
        let config = DummyConfig::default().with_eeprom(
            EepromImage::new(1024).cooling(-15, 20, 40, [100.0, 10.0, 0.0]),
        );
        let spec = open(config);
        assert_eq!(spec.tec_setpoint_deg_c(), Some(-15.0));
        // dac = 100 - 150 clamps to 0
        assert_eq!(out_values(&spec, opcodes::SET_TEC_SETPOINT), vec![(0, 0)]);
    }

    #[test]
    fn test_tec_enable_defaults_setpoint_first() {
        // open uncooled so TEC init never touches the gate
        let mut spec = open(DummyConfig::default());
        let mut eeprom = spec.eeprom().clone();
        eeprom.has_cooling = true;
        eeprom.min_temperature_deg_c = -15;
        eeprom.max_temperature_deg_c = 20;
        eeprom.deg_c_to_dac_coeffs = [100.0, 10.0, 0.0];
        spec.eeprom = eeprom;
        spec.transport_mut().clear_transfers();

        spec.set_tec_enable(true).unwrap();

        let requests: Vec<_> = spec
            .transport()
            .transfers()
            .iter()
            .filter_map(TransferRecord::request)
            .collect();
        assert_eq!(requests, vec![opcodes::SET_TEC_SETPOINT, opcodes::SET_TEC_ENABLE]);
        assert_eq!(spec.tec_setpoint_deg_c(), Some(-15.0));

        // only the first enable defaults the setpoint
        spec.transport_mut().clear_transfers();
        spec.set_tec_enable(true).unwrap();
        assert!(spec.transport().writes(opcodes::SET_TEC_SETPOINT).is_empty());
    }

    #[test]
    fn test_tec_disable_does_not_default_setpoint() {
        let mut spec = open(DummyConfig::default());
        let mut eeprom = spec.eeprom().clone();
        eeprom.has_cooling = true;
        eeprom.min_temperature_deg_c = -15;
        eeprom.max_temperature_deg_c = 20;
        spec.eeprom = eeprom;
        spec.transport_mut().clear_transfers();

        spec.set_tec_enable(false).unwrap();

        assert!(spec.transport().writes(opcodes::SET_TEC_SETPOINT).is_empty());
        assert_eq!(out_values(&spec, opcodes::SET_TEC_ENABLE), vec![(0, 0)]);
        assert_eq!(spec.tec_setpoint_deg_c(), None);

        // a later enable still applies the default
        spec.set_tec_enable(true).unwrap();
        assert_eq!(spec.transport().writes(opcodes::SET_TEC_SETPOINT).len(), 1);
        assert_eq!(spec.tec_setpoint_deg_c(), Some(-15.0));
    }

    #[test]
    fn test_tec_setpoint_range() {
        let mut spec = open_cleared(cooled());
        assert!(matches!(
            spec.set_detector_tec_setpoint_deg_c(21.0),
            Err(Error::OutOfRange { .. })
        ));
        assert!(spec.set_detector_tec_setpoint_deg_c(-16.0).is_err());
        assert!(spec.transport().transfers().is_empty());

        spec.set_detector_tec_setpoint_deg_c(5.0).unwrap();
        assert_eq!(out_values(&spec, opcodes::SET_TEC_SETPOINT), vec![(150, 0)]);
    }

    #[test]
    fn test_tec_setpoint_gate_set_on_failed_transfer() {
        let mut spec = open(cooled());
        spec.tec_setpoint_deg_c = None;
        let config = DummyConfig {
            failing_opcodes: vec![opcodes::SET_TEC_SETPOINT],
            ..cooled()
        };
        *spec.transport_mut() = DummySpectrometer::new(config);

        assert!(spec.set_detector_tec_setpoint_deg_c(0.0).is_err());
        assert_eq!(spec.tec_setpoint_deg_c(), Some(0.0));
    }

    #[test]
    fn test_high_gain_family_gate() {
        let mut spec = open_cleared(DummyConfig::for_family(DeviceFamily::Silicon));
        assert_eq!(
            spec.set_high_gain_mode(true),
            Err(Error::Unsupported(Capability::HighGain))
        );
        assert!(spec.transport().transfers().is_empty());

        let mut spec = open_cleared(DummyConfig::for_family(DeviceFamily::InGaAs));
        spec.set_high_gain_mode(true).unwrap();
        assert_eq!(out_values(&spec, opcodes::SET_HIGH_GAIN_MODE), vec![(1, 0)]);
    }

    #[test]
    fn test_versions() {
        let config = DummyConfig {
            firmware: [4, 3, 2, 1],
            fpga: "026-\x01007".to_string(),
            ..Default::default()
        };
        let mut spec = open(config);
        assert_eq!(spec.firmware_version().unwrap(), "1.2.3.4");
        assert_eq!(spec.fpga_version().unwrap(), "026-007");
    }

    #[test]
    fn test_temperature() {
        let config = DummyConfig {
            temperature_raw: 0x0102,
            ..cooled()
        };
        let mut spec = open(config);
        assert_eq!(spec.detector_temperature_raw().unwrap(), 0x0102);
        // -10 + 0.5 * 258
        assert_eq!(spec.detector_temperature_deg_c().unwrap(), 119.0);
        assert_eq!(spec.last_temperature_deg_c(), Some(119.0));
    }

    #[test]
    fn test_temperature_failure() {
        let config = DummyConfig {
            failing_opcodes: vec![opcodes::GET_DETECTOR_TEMPERATURE],
            ..Default::default()
        };
        let mut spec = open(config);
        assert!(matches!(
            spec.detector_temperature_raw(),
            Err(Error::ShortResponse { actual: 0, .. })
        ));
        assert!(spec.detector_temperature_deg_c().is_err());
        assert_eq!(spec.last_temperature_deg_c(), None);
    }

    #[test]
    fn test_arm_temperature_request_is_padded() {
        let mut spec = open_cleared(DummyConfig::default());
        spec.detector_temperature_raw().unwrap();
        assert_eq!(
            spec.transport().transfers(),
            &[TransferRecord::ControlIn {
                request: opcodes::GET_DETECTOR_TEMPERATURE,
                value: 0,
                index: 0,
                len: 8,
            }]
        );
    }

    #[test]
    fn test_spectrum_first_pixel() {
        let config = DummyConfig {
            eeprom: EepromImage::new(4),
            spectrum: Some(vec![10, 20, 30, 40]),
            ..Default::default()
        };
        let mut spec = open(config);
        assert_eq!(spec.get_spectrum().unwrap(), vec![20, 20, 30, 40]);
    }

    #[test]
    fn test_spectrum_requests_remaining_bytes() {
        let config = DummyConfig {
            eeprom: EepromImage::new(8),
            bulk_chunk: 6,
            ..Default::default()
        };
        let mut spec = open_cleared(config);
        let spectrum = spec.get_spectrum().unwrap();
        assert_eq!(spectrum, vec![1, 1, 2, 3, 4, 5, 6, 7]);

        let reads: Vec<_> = spec
            .transport()
            .transfers()
            .iter()
            .filter_map(|t| match t {
                TransferRecord::BulkIn { endpoint, len } => Some((*endpoint, *len)),
                _ => None,
            })
            .collect();
        assert_eq!(reads, vec![(0x82, 16), (0x82, 10), (0x82, 4)]);
    }

    #[test]
    fn test_spectrum_aborts_on_empty_read() {
        let config = DummyConfig {
            eeprom: EepromImage::new(4),
            bulk_script: vec![vec![1, 0, 2, 0], vec![]],
            ..Default::default()
        };
        let mut spec = open(config);
        assert_eq!(
            spec.get_spectrum(),
            Err(Error::IncompleteSpectrum {
                received: 4,
                expected: 8
            })
        );
    }

    #[test]
    fn test_spectrum_aborts_on_odd_read() {
        let config = DummyConfig {
            eeprom: EepromImage::new(4),
            bulk_script: vec![vec![1, 0, 2]],
            ..Default::default()
        };
        let mut spec = open(config);
        assert_eq!(spec.get_spectrum(), Err(Error::OddLengthRead(3)));
    }

    #[test]
    fn test_spectrum_aborts_on_transfer_error() {
        let config = DummyConfig {
            eeprom: EepromImage::new(4),
            failing_opcodes: vec![opcodes::ACQUIRE],
            ..Default::default()
        };
        let mut spec = open(config);
        assert!(spec.get_spectrum().is_err());
    }

    #[test]
    fn test_bulk_timeout() {
        let mut spec = open(DummyConfig::default());
        spec.set_integration_time_ms(250).unwrap();
        assert_eq!(spec.bulk_timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_vertical_roi_for_compact_arm() {
        let eeprom = EepromImage::new(1024)
            .model("WP-785X-SiG")
            .vertical_roi(0, 100, 200);
        let spec = open(DummyConfig::default().with_eeprom(eeprom.clone()));
        assert_eq!(
            out_values(&spec, opcodes::SECOND_TIER),
            vec![(0x21, 100), (0x23, 200)]
        );

        // same EEPROM on an FX2 does not prime
        let spec = open(DummyConfig::for_family(DeviceFamily::Silicon).with_eeprom(eeprom));
        assert!(spec.transport().writes(opcodes::SECOND_TIER).is_empty());
    }

    #[test]
    fn test_vertical_roi_empty_region() {
        let eeprom = EepromImage::new(1024).model("micro").vertical_roi(0, 0, 0);
        let spec = open(DummyConfig::default().with_eeprom(eeprom));
        assert!(spec.transport().writes(opcodes::SECOND_TIER).is_empty());
    }

    #[test]
    fn test_close() {
        let mut spec = open(DummyConfig::default());
        spec.close().unwrap();
        assert_eq!(spec.state(), State::Closed);
        assert!(spec.transport().is_released());
        assert!(spec.wavelengths().is_empty());
        assert_eq!(spec.get_spectrum(), Err(Error::SessionClosed));
        assert_eq!(spec.set_laser_enable(true), Err(Error::SessionClosed));
        // second close is a no-op
        spec.close().unwrap();
    }
}
