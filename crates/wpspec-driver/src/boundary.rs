//! Status-code boundary
//!
//! [`Driver`] is the flat, index-addressed surface that foreign-language
//! bindings sit on. Every call reports one of a closed set of outcomes
//! ([`Status`]) and writes results into caller-owned slices; nothing
//! allocated here outlives the call.
//!
//! Scalar getters return their value directly and signal failure in-band:
//! negative status codes for counts, `-1` for the raw temperature and
//! [`TEMPERATURE_UNAVAILABLE`] for °C.

use wpspec_core::codec::TEMPERATURE_UNAVAILABLE;
use wpspec_core::error::Error;
use wpspec_core::transport::DeviceProvider;

use crate::registry::Registry;
use crate::session::Spectrometer;

/// Raw temperature returned when the detector cannot be read
pub const TEMPERATURE_RAW_UNAVAILABLE: i32 = -1;

/// Outcome of a boundary call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    /// Call succeeded
    Success = 0,
    /// Call failed
    Error = -1,
    /// No open spectrometer at that index
    InvalidSpectrometer = -2,
    /// Output buffer too small
    InsufficientStorage = -3,
    /// No excitation wavelength configured
    NoLaser = -4,
}

impl Status {
    /// Numeric code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Whether this is [`Status::Success`]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<&Error> for Status {
    fn from(e: &Error) -> Self {
        match e {
            Error::NoExcitation => Status::NoLaser,
            _ => Status::Error,
        }
    }
}

impl<T> From<wpspec_core::Result<T>> for Status {
    fn from(result: wpspec_core::Result<T>) -> Self {
        match result {
            Ok(_) => Status::Success,
            Err(e) => {
                log::debug!("boundary call failed: {}", e);
                Status::from(&e)
            }
        }
    }
}

/// Library version string
pub fn library_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Copy `s` into `buf`, zero-filling the rest
///
/// A string that does not fit is truncated and reported as
/// [`Status::InsufficientStorage`].
pub fn export_str(s: &str, buf: &mut [u8]) -> Status {
    buf.fill(0);
    let bytes = s.as_bytes();
    let n = bytes.len().min(buf.len());
    buf[..n].copy_from_slice(&bytes[..n]);
    if bytes.len() > buf.len() {
        Status::InsufficientStorage
    } else {
        Status::Success
    }
}

/// Copy `values` into `buf`
///
/// The prefix that fits is written; anything that does not fit is reported
/// as [`Status::InsufficientStorage`].
pub fn export_slice<T: Copy>(values: &[T], buf: &mut [T]) -> Status {
    let n = values.len().min(buf.len());
    buf[..n].copy_from_slice(&values[..n]);
    if values.len() > buf.len() {
        Status::InsufficientStorage
    } else {
        Status::Success
    }
}

/// Index-addressed driver surface
pub struct Driver<P: DeviceProvider> {
    registry: Registry<P>,
}

impl<P: DeviceProvider> Driver<P> {
    /// Create a driver over `provider`; nothing is opened yet
    pub fn new(provider: P) -> Self {
        Self {
            registry: Registry::new(provider),
        }
    }

    /// Borrow the registry
    pub fn registry(&self) -> &Registry<P> {
        &self.registry
    }

    /// Mutably borrow the registry
    pub fn registry_mut(&mut self) -> &mut Registry<P> {
        &mut self.registry
    }

    fn with<R>(
        &self,
        index: i32,
        f: impl FnOnce(&Spectrometer<P::Transport>) -> R,
    ) -> Result<R, Status> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.registry.get(i))
            .map(f)
            .ok_or(Status::InvalidSpectrometer)
    }

    fn with_mut<R>(
        &mut self,
        index: i32,
        f: impl FnOnce(&mut Spectrometer<P::Transport>) -> R,
    ) -> Result<R, Status> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.registry.get_mut(i))
            .map(f)
            .ok_or(Status::InvalidSpectrometer)
    }

    fn set(
        &mut self,
        index: i32,
        f: impl FnOnce(&mut Spectrometer<P::Transport>) -> wpspec_core::Result<()>,
    ) -> Status {
        self.with_mut(index, f).map_or_else(|s| s, Status::from)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Open every attached spectrometer; returns the count or a negative code
    pub fn open_all_spectrometers(&mut self) -> i32 {
        match self.registry.enumerate() {
            Ok(count) => count as i32,
            Err(e) => {
                log::error!("Enumeration failed: {}", e);
                Status::Error.code()
            }
        }
    }

    /// Number of index slots from the last enumeration
    pub fn number_of_spectrometers(&self) -> i32 {
        self.registry.count() as i32
    }

    /// Close one spectrometer
    pub fn close_spectrometer(&mut self, index: i32) -> Status {
        match usize::try_from(index) {
            Ok(i) if self.registry.close(i) => Status::Success,
            _ => Status::InvalidSpectrometer,
        }
    }

    /// Close every spectrometer
    pub fn close_all_spectrometers(&mut self) -> Status {
        self.registry.close_all();
        Status::Success
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Pixel count, or a negative status code
    pub fn pixels(&self, index: i32) -> i32 {
        self.with(index, |s| s.pixels() as i32)
            .unwrap_or_else(Status::code)
    }

    /// Model name
    pub fn model(&self, index: i32, buf: &mut [u8]) -> Status {
        self.with(index, |s| export_str(s.model(), buf))
            .unwrap_or_else(|s| s)
    }

    /// Serial number
    pub fn serial_number(&self, index: i32, buf: &mut [u8]) -> Status {
        self.with(index, |s| export_str(s.serial_number(), buf))
            .unwrap_or_else(|s| s)
    }

    /// Wavelength axis in nm
    pub fn wavelengths(&self, index: i32, buf: &mut [f64]) -> Status {
        self.with(index, |s| export_slice(s.wavelengths(), buf))
            .unwrap_or_else(|s| s)
    }

    /// Wavenumber axis in 1/cm
    pub fn wavenumbers(&self, index: i32, buf: &mut [f64]) -> Status {
        self.with(index, |s| {
            if s.eeprom().has_excitation() {
                export_slice(s.wavenumbers(), buf)
            } else {
                Status::from(&Error::NoExcitation)
            }
        })
        .unwrap_or_else(|s| s)
    }

    /// Number of EEPROM fields, or a negative status code
    pub fn eeprom_field_count(&self, index: i32) -> i32 {
        self.with(index, |s| s.eeprom().field_count() as i32)
            .unwrap_or_else(Status::code)
    }

    /// All EEPROM fields as (name, value), sorted by name
    pub fn eeprom(&self, index: i32, out: &mut [(String, String)]) -> Status {
        self.with(index, |s| {
            let fields = s.eeprom().fields();
            for (slot, (name, value)) in out.iter_mut().zip(fields) {
                *slot = (name.clone(), value.clone());
            }
            if fields.len() > out.len() {
                Status::InsufficientStorage
            } else {
                Status::Success
            }
        })
        .unwrap_or_else(|s| s)
    }

    /// One EEPROM field by case-insensitive name
    pub fn eeprom_field(&self, index: i32, name: &str, buf: &mut [u8]) -> Status {
        self.with(index, |s| match s.eeprom().field(name) {
            Some(value) => export_str(value, buf),
            None => {
                log::debug!("EEPROM field {} not found", name);
                Status::Error
            }
        })
        .unwrap_or_else(|s| s)
    }

    /// Firmware version
    pub fn firmware_version(&mut self, index: i32, buf: &mut [u8]) -> Status {
        self.with_mut(index, |s| match s.firmware_version() {
            Ok(v) => export_str(&v, buf),
            Err(e) => Status::from(&e),
        })
        .unwrap_or_else(|s| s)
    }

    /// FPGA version
    pub fn fpga_version(&mut self, index: i32, buf: &mut [u8]) -> Status {
        self.with_mut(index, |s| match s.fpga_version() {
            Ok(v) => export_str(&v, buf),
            Err(e) => Status::from(&e),
        })
        .unwrap_or_else(|s| s)
    }

    /// Detector temperature in °C, or [`TEMPERATURE_UNAVAILABLE`]
    pub fn detector_temperature_deg_c(&mut self, index: i32) -> f32 {
        self.with_mut(index, |s| s.detector_temperature_deg_c())
            .ok()
            .and_then(Result::ok)
            .unwrap_or(TEMPERATURE_UNAVAILABLE)
    }

    /// Raw detector temperature, or [`TEMPERATURE_RAW_UNAVAILABLE`]
    pub fn detector_temperature_raw(&mut self, index: i32) -> i32 {
        self.with_mut(index, |s| s.detector_temperature_raw())
            .ok()
            .and_then(Result::ok)
            .map_or(TEMPERATURE_RAW_UNAVAILABLE, i32::from)
    }

    /// Acquire one spectrum into `buf`
    pub fn spectrum(&mut self, index: i32, buf: &mut [f64]) -> Status {
        self.with_mut(index, |s| match s.get_spectrum() {
            Ok(pixels) if !pixels.is_empty() => {
                let values: Vec<f64> = pixels.into_iter().map(f64::from).collect();
                export_slice(&values, buf)
            }
            Ok(_) => Status::Error,
            Err(e) => Status::from(&e),
        })
        .unwrap_or_else(|s| s)
    }

    // ========================================================================
    // Settors
    // ========================================================================

    /// Set the integration time (clamped)
    pub fn set_integration_time_ms(&mut self, index: i32, ms: u32) -> Status {
        self.set(index, |s| s.set_integration_time_ms(ms))
    }

    /// Switch the laser
    pub fn set_laser_enable(&mut self, index: i32, enable: bool) -> Status {
        self.set(index, |s| s.set_laser_enable(enable))
    }

    /// Even-pixel gain
    pub fn set_detector_gain(&mut self, index: i32, value: f32) -> Status {
        self.set(index, |s| s.set_detector_gain(value))
    }

    /// Odd-pixel gain
    pub fn set_detector_gain_odd(&mut self, index: i32, value: f32) -> Status {
        self.set(index, |s| s.set_detector_gain_odd(value))
    }

    /// Even-pixel offset
    pub fn set_detector_offset(&mut self, index: i32, value: i16) -> Status {
        self.set(index, |s| s.set_detector_offset(value))
    }

    /// Odd-pixel offset
    pub fn set_detector_offset_odd(&mut self, index: i32, value: i16) -> Status {
        self.set(index, |s| s.set_detector_offset_odd(value))
    }

    /// Switch the TEC
    pub fn set_tec_enable(&mut self, index: i32, enable: bool) -> Status {
        self.set(index, |s| s.set_tec_enable(enable))
    }

    /// TEC setpoint in whole °C
    pub fn set_detector_tec_setpoint_deg_c(&mut self, index: i32, deg_c: i32) -> Status {
        self.set(index, |s| s.set_detector_tec_setpoint_deg_c(deg_c as f32))
    }

    /// InGaAs high-gain mode
    pub fn set_high_gain_mode(&mut self, index: i32, enable: bool) -> Status {
        self.set(index, |s| s.set_high_gain_mode(enable))
    }
}
