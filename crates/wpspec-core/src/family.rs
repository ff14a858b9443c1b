//! Device families
//!
//! Wasatch spectrometers share one vendor ID; the product ID selects the
//! hardware platform, which in turn decides a handful of protocol quirks.

/// Wasatch Photonics USB vendor ID
pub const WASATCH_VID: u16 = 0x24AA;

/// Product ID of FX2-based silicon detectors
pub const PID_SILICON: u16 = 0x1000;
/// Product ID of InGaAs detectors
pub const PID_INGAAS: u16 = 0x2000;
/// Product ID of ARM-based detectors
pub const PID_ARM: u16 = 0x4000;

/// All product IDs this driver opens
pub const SUPPORTED_PIDS: [u16; 3] = [PID_SILICON, PID_INGAAS, PID_ARM];

/// Minimum control payload length the ARM firmware accepts
pub const ARM_MIN_CONTROL_LEN: usize = 8;

/// Hardware platform, detected from the USB product ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceFamily {
    /// FX2 microcontroller with a silicon CCD
    Silicon,
    /// FX2 microcontroller with an InGaAs array
    InGaAs,
    /// ARM microcontroller
    Arm,
}

impl DeviceFamily {
    /// Map a product ID to its family
    pub fn from_pid(pid: u16) -> Option<Self> {
        match pid {
            PID_SILICON => Some(Self::Silicon),
            PID_INGAAS => Some(Self::InGaAs),
            PID_ARM => Some(Self::Arm),
            _ => None,
        }
    }

    /// Product ID of this family
    pub fn pid(&self) -> u16 {
        match self {
            Self::Silicon => PID_SILICON,
            Self::InGaAs => PID_INGAAS,
            Self::Arm => PID_ARM,
        }
    }

    /// Parse a family from a user-supplied name or product ID
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "silicon" | "fx2" | "si" => Some(Self::Silicon),
            "ingaas" => Some(Self::InGaAs),
            "arm" => Some(Self::Arm),
            other => {
                let hex = other.strip_prefix("0x").unwrap_or(other);
                u16::from_str_radix(hex, 16).ok().and_then(Self::from_pid)
            }
        }
    }

    /// Firmware rejects zero-length control writes and short control reads
    pub fn requires_min_control_len(&self) -> bool {
        matches!(self, Self::Arm)
    }

    /// Minimum length applied to control payloads and read requests
    pub fn min_control_len(&self) -> usize {
        if self.requires_min_control_len() {
            ARM_MIN_CONTROL_LEN
        } else {
            0
        }
    }

    /// Only InGaAs detectors have a high-gain mode
    pub fn supports_high_gain(&self) -> bool {
        matches!(self, Self::InGaAs)
    }
}

impl core::fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Silicon => write!(f, "Silicon"),
            Self::InGaAs => write!(f, "InGaAs"),
            Self::Arm => write!(f, "ARM"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pid() {
        assert_eq!(DeviceFamily::from_pid(0x1000), Some(DeviceFamily::Silicon));
        assert_eq!(DeviceFamily::from_pid(0x2000), Some(DeviceFamily::InGaAs));
        assert_eq!(DeviceFamily::from_pid(0x4000), Some(DeviceFamily::Arm));
        assert_eq!(DeviceFamily::from_pid(0x1234), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!(DeviceFamily::parse("ARM"), Some(DeviceFamily::Arm));
        assert_eq!(DeviceFamily::parse("ingaas"), Some(DeviceFamily::InGaAs));
        assert_eq!(DeviceFamily::parse("0x1000"), Some(DeviceFamily::Silicon));
        assert_eq!(DeviceFamily::parse("4000"), Some(DeviceFamily::Arm));
        assert_eq!(DeviceFamily::parse("bogus"), None);
    }

    #[test]
    fn test_quirks() {
        assert_eq!(DeviceFamily::Arm.min_control_len(), 8);
        assert_eq!(DeviceFamily::Silicon.min_control_len(), 0);
        assert!(DeviceFamily::InGaAs.supports_high_gain());
        assert!(!DeviceFamily::Arm.supports_high_gain());
    }
}
