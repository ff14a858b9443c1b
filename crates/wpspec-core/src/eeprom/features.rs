//! EEPROM feature mask

use bitflags::bitflags;

bitflags! {
    /// Optional hardware features declared in the EEPROM
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FeatureMask: u16 {
        /// Pixel order runs from red to blue
        const INVERT_X_AXIS      = 1 << 0;
        /// Detector is binned 2x2 in firmware
        const BIN_2X2            = 1 << 1;
        /// Gen 1.5 hardware (accessory connector)
        const GEN15              = 1 << 2;
        /// Cutoff filter installed
        const CUTOFF_FILTER      = 1 << 3;
        /// Even/odd pixel correction done in hardware
        const HARDWARE_EVEN_ODD  = 1 << 4;
        /// SiG laser has its own TEC
        const SIG_LASER_TEC      = 1 << 5;
        /// Laser interlock state can be read back
        const INTERLOCK_FEEDBACK = 1 << 6;
        /// Shutter fitted
        const SHUTTER            = 1 << 7;
    }
}
