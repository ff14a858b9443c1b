//! EEPROM binary layout
//!
//! The calibration EEPROM is read as [`PAGE_COUNT`] pages of [`PAGE_SIZE`]
//! bytes. Multi-byte integers and IEEE-754 floats are little-endian.
//! Strings are fixed-width, NUL-padded ASCII.
//!
//! ```text
//! page 0  identity, capability flags, startup state, default gain/offset
//! page 1  wavecal c0..c3, TEC DAC/ADC coefficients, temperature limits
//! page 2  detector name, pixel geometry, wavecal c4, ROI, linearity
//! page 3  laser power calibration, excitation, integration limits
//! page 4  user text
//! page 5  bad pixels, product configuration, subformat
//! page 6  reserved
//! page 7  reserved
//! ```

/// Bytes per EEPROM page
pub const PAGE_SIZE: usize = 64;
/// Pages in a complete image
pub const PAGE_COUNT: usize = 8;
/// Bytes in a complete image
pub const IMAGE_SIZE: usize = PAGE_SIZE * PAGE_COUNT;

/// First format revision that stores excitation as a float on page 3 and a
/// feature mask on page 0
pub const FLOAT_EXCITATION_FORMAT: u8 = 4;

/// Location of one field in the image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Page index
    pub page: usize,
    /// Byte offset within the page
    pub offset: usize,
    /// Field width in bytes
    pub len: usize,
}

impl Field {
    /// Field at `offset` bytes into `page`
    pub const fn at(page: usize, offset: usize, len: usize) -> Self {
        Self { page, offset, len }
    }

    /// Byte offset into the concatenated image
    pub const fn start(&self) -> usize {
        self.page * PAGE_SIZE + self.offset
    }

    /// One past the last byte in the concatenated image
    pub const fn end(&self) -> usize {
        self.start() + self.len
    }
}

const fn u8_at(page: usize, offset: usize) -> Field {
    Field::at(page, offset, 1)
}

const fn u16_at(page: usize, offset: usize) -> Field {
    Field::at(page, offset, 2)
}

const fn u32_at(page: usize, offset: usize) -> Field {
    Field::at(page, offset, 4)
}

// ============================================================================
// Page 0
// ============================================================================

/// Model name
pub const MODEL: Field = Field::at(0, 0, 16);
/// Serial number
pub const SERIAL_NUMBER: Field = Field::at(0, 16, 16);
/// Serial baud rate (u32)
pub const BAUD_RATE: Field = u32_at(0, 32);
/// Detector TEC fitted (bool)
pub const HAS_COOLING: Field = u8_at(0, 36);
/// Battery fitted (bool)
pub const HAS_BATTERY: Field = u8_at(0, 37);
/// Laser fitted (bool)
pub const HAS_LASER: Field = u8_at(0, 38);
/// Feature mask (u16); integer excitation in nm before format 4
pub const FEATURE_MASK: Field = u16_at(0, 39);
/// Legacy integer excitation wavelength, shares storage with the feature mask
pub const LEGACY_EXCITATION_NM: Field = FEATURE_MASK;
/// Slit width in µm (u16)
pub const SLIT_SIZE_UM: Field = u16_at(0, 41);
/// Integration time applied at startup (u16)
pub const STARTUP_INTEGRATION_TIME_MS: Field = u16_at(0, 43);
/// Detector temperature setpoint applied at startup (i16)
pub const STARTUP_TEMP_DEG_C: Field = u16_at(0, 45);
/// Trigger scheme applied at startup (u8)
pub const STARTUP_TRIGGERING_SCHEME: Field = u8_at(0, 47);
/// Default detector gain, even pixels (f32)
pub const DETECTOR_GAIN: Field = u32_at(0, 48);
/// Default detector offset, even pixels (i16)
pub const DETECTOR_OFFSET: Field = u16_at(0, 52);
/// Default detector gain, odd pixels (f32)
pub const DETECTOR_GAIN_ODD: Field = u32_at(0, 54);
/// Default detector offset, odd pixels (i16)
pub const DETECTOR_OFFSET_ODD: Field = u16_at(0, 58);
/// Layout revision (u8)
pub const FORMAT: Field = u8_at(0, 63);

// ============================================================================
// Page 1
// ============================================================================

/// Wavelength polynomial c0..c4 (f32); c4 lives on page 2
pub const WAVECAL_COEFFS: [Field; 5] = [
    u32_at(1, 0),
    u32_at(1, 4),
    u32_at(1, 8),
    u32_at(1, 12),
    u32_at(2, 21),
];
/// °C to TEC DAC polynomial (f32)
pub const DEG_C_TO_DAC_COEFFS: [Field; 3] = [u32_at(1, 16), u32_at(1, 20), u32_at(1, 24)];
/// Highest allowed TEC setpoint (i16)
pub const MAX_TEMP_DEG_C: Field = u16_at(1, 28);
/// Lowest allowed TEC setpoint (i16)
pub const MIN_TEMP_DEG_C: Field = u16_at(1, 30);
/// Temperature ADC to °C polynomial (f32)
pub const ADC_TO_DEG_C_COEFFS: [Field; 3] = [u32_at(1, 32), u32_at(1, 36), u32_at(1, 40)];
/// Thermistor resistance at 298 K (i16)
pub const TEC_R298: Field = u16_at(1, 44);
/// Thermistor beta (i16)
pub const TEC_BETA: Field = u16_at(1, 46);
/// Calibration date
pub const CALIBRATION_DATE: Field = Field::at(1, 48, 12);
/// Calibration author initials
pub const CALIBRATED_BY: Field = Field::at(1, 60, 3);

// ============================================================================
// Page 2
// ============================================================================

/// Detector part name
pub const DETECTOR_NAME: Field = Field::at(2, 0, 16);
/// Active horizontal pixels (u16)
pub const ACTIVE_PIXELS_HORIZ: Field = u16_at(2, 16);
/// Laser warm-up time in seconds (u8)
pub const LASER_WARMUP_SEC: Field = u8_at(2, 18);
/// Active vertical pixels (u16)
pub const ACTIVE_PIXELS_VERT: Field = u16_at(2, 19);
/// Physical horizontal pixels (u16)
pub const ACTUAL_PIXELS_HORIZ: Field = u16_at(2, 25);
/// Horizontal ROI start (u16)
pub const ROI_HORIZ_START: Field = u16_at(2, 27);
/// Horizontal ROI end (u16)
pub const ROI_HORIZ_END: Field = u16_at(2, 29);
/// Vertical ROI regions 1..3 as (start, end) pairs (u16)
pub const ROI_VERT_REGIONS: [(Field, Field); 3] = [
    (u16_at(2, 31), u16_at(2, 33)),
    (u16_at(2, 35), u16_at(2, 37)),
    (u16_at(2, 39), u16_at(2, 41)),
];
/// Non-linearity correction polynomial (f32)
pub const LINEARITY_COEFFS: [Field; 5] = [
    u32_at(2, 43),
    u32_at(2, 47),
    u32_at(2, 51),
    u32_at(2, 55),
    u32_at(2, 59),
];

// ============================================================================
// Page 3
// ============================================================================

/// Laser power polynomial (f32)
pub const LASER_POWER_COEFFS: [Field; 4] = [
    u32_at(3, 12),
    u32_at(3, 16),
    u32_at(3, 20),
    u32_at(3, 24),
];
/// Maximum laser power in mW (f32)
pub const MAX_LASER_POWER_MW: Field = u32_at(3, 28);
/// Minimum laser power in mW (f32)
pub const MIN_LASER_POWER_MW: Field = u32_at(3, 32);
/// Laser excitation wavelength in nm (f32)
pub const EXCITATION_NM: Field = u32_at(3, 36);
/// Minimum integration time (u32)
pub const MIN_INTEGRATION_TIME_MS: Field = u32_at(3, 40);
/// Maximum integration time (u32)
pub const MAX_INTEGRATION_TIME_MS: Field = u32_at(3, 44);
/// Average optical resolution in nm (f32)
pub const AVG_RESOLUTION: Field = u32_at(3, 48);

// ============================================================================
// Pages 4-5
// ============================================================================

/// Free-form user text
pub const USER_TEXT: Field = Field::at(4, 0, PAGE_SIZE);
/// Number of bad pixel slots
pub const BAD_PIXEL_SLOTS: usize = 15;
/// Bad pixel indices (i16 each, negative = unused)
pub const BAD_PIXELS: Field = Field::at(5, 0, BAD_PIXEL_SLOTS * 2);
/// Product configuration string
pub const PRODUCT_CONFIGURATION: Field = Field::at(5, 30, 16);
/// Layout sub-revision (u8)
pub const SUBFORMAT: Field = u8_at(5, 63);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_fit_in_pages() {
        let fields = [
            MODEL,
            SERIAL_NUMBER,
            DETECTOR_GAIN_ODD,
            DETECTOR_OFFSET_ODD,
            FORMAT,
            CALIBRATED_BY,
            LINEARITY_COEFFS[4],
            AVG_RESOLUTION,
            USER_TEXT,
            PRODUCT_CONFIGURATION,
            SUBFORMAT,
        ];
        for field in fields {
            assert!(field.offset + field.len <= PAGE_SIZE, "{:?}", field);
        }
        assert_eq!(SUBFORMAT.end(), 6 * PAGE_SIZE);
    }
}
