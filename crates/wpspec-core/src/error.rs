//! Error types for wpspec-core
//!
//! One error type covers the whole command protocol. Backends convert their
//! own errors into [`Error::Transfer`] or [`Error::Timeout`] at the
//! [`Transport`](crate::Transport) boundary.

use thiserror::Error;

/// Optional hardware capability an operation depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Thermoelectric detector cooling
    Cooling,
    /// InGaAs high-gain mode
    HighGain,
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Cooling => write!(f, "detector cooling"),
            Self::HighGain => write!(f, "high-gain mode"),
        }
    }
}

/// EEPROM decode failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EepromError {
    /// Fewer (or more) pages than the layout declares
    #[error("expected {expected} EEPROM pages, got {actual}")]
    PageCount {
        /// Pages the layout declares
        expected: usize,
        /// Pages actually supplied
        actual: usize,
    },
    /// A page came back shorter than the page size
    #[error("EEPROM page {page} is {len} bytes (expected {expected})")]
    ShortPage {
        /// Page index
        page: usize,
        /// Bytes received
        len: usize,
        /// Page size
        expected: usize,
    },
    /// `activePixelsHoriz` is zero
    #[error("EEPROM declares no active horizontal pixels")]
    NoPixels,
    /// A field lies outside the image
    #[error("EEPROM field at offset {offset} (len {len}) is out of bounds")]
    OutOfBounds {
        /// Byte offset into the concatenated image
        offset: usize,
        /// Field length
        len: usize,
    },
}

/// Core error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    // Transport errors
    /// A control or bulk transfer failed
    #[error("USB transfer failed: {0}")]
    Transfer(String),
    /// A transfer did not complete within its timeout
    #[error("USB transfer timed out")]
    Timeout,

    // Protocol errors
    /// Response shorter than the protocol requires
    #[error("short response to opcode 0x{opcode:02X}: {actual} bytes, need {expected}")]
    ShortResponse {
        /// Request opcode
        opcode: u8,
        /// Bytes required
        expected: usize,
        /// Bytes received
        actual: usize,
    },
    /// Bulk read returned an odd byte count
    #[error("bulk read returned an odd number of bytes ({0})")]
    OddLengthRead(usize),
    /// Bulk read returned nothing before the spectrum was complete
    #[error("bulk read stalled after {received} of {expected} bytes")]
    IncompleteSpectrum {
        /// Bytes accumulated before the stall
        received: usize,
        /// Bytes expected for a full spectrum
        expected: usize,
    },

    // Domain errors
    /// Caller supplied a value outside the accepted domain
    #[error("{what} out of range: {value}")]
    OutOfRange {
        /// Parameter name
        what: &'static str,
        /// Rejected value, rendered
        value: String,
    },
    /// Device family or calibration lacks a capability
    #[error("device does not support {0}")]
    Unsupported(Capability),
    /// No excitation wavelength configured, so no wavenumber axis
    #[error("no excitation wavelength configured")]
    NoExcitation,

    // Calibration errors
    /// EEPROM could not be decoded
    #[error("EEPROM: {0}")]
    Eeprom(#[from] EepromError),

    // Lifecycle errors
    /// Session was already closed
    #[error("spectrometer session is closed")]
    SessionClosed,
}

impl Error {
    /// Shorthand for [`Error::OutOfRange`]
    pub fn out_of_range(what: &'static str, value: impl core::fmt::Display) -> Self {
        Self::OutOfRange {
            what,
            value: value.to_string(),
        }
    }
}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
