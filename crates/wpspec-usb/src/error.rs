//! Error types for the USB backend

use thiserror::Error;

/// Result type for USB backend operations
pub type Result<T> = std::result::Result<T, UsbError>;

/// Errors that can occur when talking to a spectrometer over USB
#[derive(Debug, Error)]
pub enum UsbError {
    /// No matching device
    #[error("no Wasatch spectrometer found (VID:24AA)")]
    DeviceNotFound,
    /// Failed to enumerate or open a device
    #[error("failed to open spectrometer: {0}")]
    OpenFailed(String),
    /// Failed to claim the interface
    #[error("failed to claim interface: {0}")]
    ClaimFailed(String),
    /// USB transfer failed
    #[error("USB transfer failed: {0}")]
    TransferFailed(String),
    /// Transfer did not complete in time
    #[error("timeout during USB transfer")]
    Timeout,
    /// Interface was already released
    #[error("device has been released")]
    Released,
    /// Parameter parsing error
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl From<nusb::transfer::TransferError> for UsbError {
    fn from(e: nusb::transfer::TransferError) -> Self {
        match e {
            nusb::transfer::TransferError::Cancelled => UsbError::Timeout,
            other => UsbError::TransferFailed(other.to_string()),
        }
    }
}

impl From<UsbError> for wpspec_core::Error {
    fn from(e: UsbError) -> Self {
        match e {
            UsbError::Timeout => wpspec_core::Error::Timeout,
            other => wpspec_core::Error::Transfer(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_core_error() {
        assert_eq!(wpspec_core::Error::from(UsbError::Timeout), wpspec_core::Error::Timeout);
        assert!(matches!(
            wpspec_core::Error::from(UsbError::TransferFailed("stall".into())),
            wpspec_core::Error::Transfer(msg) if msg.contains("stall")
        ));
    }
}
