//! USB protocol constants for Wasatch spectrometers
//!
//! All commands are vendor control transfers addressed to the device
//! (bmRequestType 0x40 out, 0xC0 in) on interface 0. Spectra arrive on bulk
//! IN endpoint 0x82.

use wpspec_core::family::{DeviceFamily, PID_ARM, PID_INGAAS, PID_SILICON};

pub use wpspec_core::family::{SUPPORTED_PIDS, WASATCH_VID};

/// Interface claimed on open
pub const DEFAULT_INTERFACE: u8 = 0;

/// Human-readable product name for a supported product ID
pub fn product_name(pid: u16) -> &'static str {
    match pid {
        PID_SILICON => "Wasatch FX2 (silicon)",
        PID_INGAAS => "Wasatch FX2 (InGaAs)",
        PID_ARM => "Wasatch ARM",
        _ => "unknown",
    }
}

/// Whether a VID/PID pair is a spectrometer this crate drives
pub fn is_supported(vid: u16, pid: u16) -> bool {
    vid == WASATCH_VID && DeviceFamily::from_pid(pid).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_supported() {
        assert!(is_supported(0x24AA, 0x1000));
        assert!(is_supported(0x24AA, 0x2000));
        assert!(is_supported(0x24AA, 0x4000));
        assert!(!is_supported(0x24AA, 0x3000));
        assert!(!is_supported(0x0483, 0x4000));
    }

    #[test]
    fn test_product_name() {
        assert_eq!(product_name(0x4000), "Wasatch ARM");
        assert_eq!(product_name(0xFFFF), "unknown");
    }
}
