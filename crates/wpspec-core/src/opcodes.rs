//! Wasatch vendor command opcodes
//!
//! Every command is a vendor control transfer addressed to the device.
//! The opcode goes in `bRequest`; arguments travel in `wValue`/`wIndex`.
//! Commands that need more than one byte of opcode space use the
//! [`SECOND_TIER`] request with the sub-command in `wValue`.

// ============================================================================
// Acquisition
// ============================================================================

/// Start one acquisition; pixel data follows on the spectrum endpoint
pub const ACQUIRE: u8 = 0xAD;
/// Set integration time (24 bits: low word in wValue, high byte in wIndex)
pub const SET_INTEGRATION_TIME: u8 = 0xB2;
/// Read back integration time (3 bytes, LSB first)
pub const GET_INTEGRATION_TIME: u8 = 0xBF;

// ============================================================================
// Detector gain / offset
// ============================================================================

/// Set detector gain (even pixels), packed fixed-point
pub const SET_DETECTOR_GAIN: u8 = 0xB7;
/// Set detector gain for odd pixels
pub const SET_DETECTOR_GAIN_ODD: u8 = 0x9D;
/// Read back detector gain (2 bytes: fraction, integer)
pub const GET_DETECTOR_GAIN: u8 = 0xC5;
/// Set detector offset (even pixels), two's-complement bit pattern
pub const SET_DETECTOR_OFFSET: u8 = 0xB6;
/// Set detector offset for odd pixels
pub const SET_DETECTOR_OFFSET_ODD: u8 = 0x9C;
/// Enable/disable InGaAs high-gain mode
pub const SET_HIGH_GAIN_MODE: u8 = 0xEB;

// ============================================================================
// Laser
// ============================================================================

/// Enable/disable laser firing
pub const SET_LASER_ENABLE: u8 = 0xBE;
/// Read back laser enable (1 byte)
pub const GET_LASER_ENABLE: u8 = 0xE2;

// ============================================================================
// Detector TEC
// ============================================================================

/// Enable/disable the detector TEC
pub const SET_TEC_ENABLE: u8 = 0xD6;
/// Read raw detector temperature ADC (2 bytes, big-endian)
pub const GET_DETECTOR_TEMPERATURE: u8 = 0xD7;
/// Set the TEC setpoint as a 12-bit DAC code
pub const SET_TEC_SETPOINT: u8 = 0xD8;

// ============================================================================
// Identification
// ============================================================================

/// Microcontroller firmware version (4 bytes, reversed dotted quad)
pub const GET_FIRMWARE_VERSION: u8 = 0xC0;
/// FPGA version (ASCII)
pub const GET_FPGA_VERSION: u8 = 0xB4;

// ============================================================================
// Second-tier commands (bRequest = SECOND_TIER, sub-command in wValue)
// ============================================================================

/// Second-tier request code
pub const SECOND_TIER: u8 = 0xFF;
/// Read one EEPROM page (page index in wIndex)
pub const SECOND_TIER_GET_EEPROM_PAGE: u16 = 0x01;
/// Set first detector line of the vertical ROI (line in wIndex)
pub const SECOND_TIER_SET_DETECTOR_START_LINE: u16 = 0x21;
/// Set last detector line of the vertical ROI (line in wIndex)
pub const SECOND_TIER_SET_DETECTOR_STOP_LINE: u16 = 0x23;

// ============================================================================
// Endpoints
// ============================================================================

/// Bulk IN endpoint carrying spectrum pixel data
pub const SPECTRUM_ENDPOINT: u8 = 0x82;
