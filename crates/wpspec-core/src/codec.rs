//! Wire encodings
//!
//! Pure conversions between caller-facing values and the words the firmware
//! expects in `wValue`/`wIndex`, plus decoders for the identification
//! responses. Nothing here performs I/O.

use crate::error::{Error, Result};

/// Largest integration time the 24-bit field can carry
pub const MAX_INTEGRATION_TIME_MS: u32 = (1 << 24) - 1;
/// Smallest integration time the firmware accepts
pub const MIN_INTEGRATION_TIME_MS: u32 = 1;

/// Exclusive upper bound of the detector gain domain
pub const GAIN_LIMIT: f32 = 256.0;

/// Temperature reported at the boundary when the detector cannot be read
pub const TEMPERATURE_UNAVAILABLE: f32 = -999.0;

/// Clamp an integration time into `[1, 2^24 - 1]`
pub fn clamp_integration_time(ms: u32) -> u32 {
    ms.clamp(MIN_INTEGRATION_TIME_MS, MAX_INTEGRATION_TIME_MS)
}

/// Split a (clamped) integration time into `(wValue, wIndex)`
///
/// The low 16 bits go in `wValue`, bits 16..24 in the low byte of `wIndex`.
pub fn split_integration_time(ms: u32) -> (u16, u16) {
    let ms = clamp_integration_time(ms);
    ((ms & 0xFFFF) as u16, ((ms >> 16) & 0xFF) as u16)
}

/// Decode the 3-byte LSB-first integration time readback
pub fn decode_integration_time(data: &[u8]) -> Option<u32> {
    match data {
        [b0, b1, b2, ..] => Some(u32::from_le_bytes([*b0, *b1, *b2, 0])),
        _ => None,
    }
}

/// Pack a detector gain into the firmware's fixed-point word
///
/// The integer part goes in the high byte and the rounded fraction (in
/// 1/256ths) in the low byte. Returns `OutOfRange` for anything outside
/// `[0, 256)`, including NaN.
pub fn encode_gain(value: f32) -> Result<u16> {
    if !(0.0..GAIN_LIMIT).contains(&value) {
        return Err(Error::out_of_range("detector gain", value));
    }

    let whole = value.trunc();
    let mut msb = whole as u16;
    let mut lsb = ((value - whole) * 256.0).round() as u16;
    if lsb == 256 {
        msb += 1;
        lsb = 0;
    }
    if msb > 0xFF {
        // only reachable for values within 1/512 of the limit
        return Ok(0xFFFF);
    }
    Ok((msb << 8) | lsb)
}

/// Unpack a fixed-point gain word
pub fn decode_gain(word: u16) -> f32 {
    (word >> 8) as f32 + (word & 0xFF) as f32 / 256.0
}

/// Reinterpret the two's-complement bits of a signed offset as an unsigned
/// word, so `-1` travels as `0xFFFF` and `i16::MIN` as `0x8000`
pub fn reinterpret_i16_bits(value: i16) -> u16 {
    u16::from_ne_bytes(value.to_ne_bytes())
}

/// Evaluate a polynomial with coefficients in ascending order
pub fn polynomial(coeffs: &[f32], x: f64) -> f64 {
    coeffs
        .iter()
        .rev()
        .fold(0.0, |acc, &c| acc * x + c as f64)
}

/// Convert a TEC setpoint in °C to its 12-bit DAC code
pub fn tec_setpoint_dac(coeffs: &[f32; 3], deg_c: f32) -> u16 {
    let dac = polynomial(coeffs, deg_c as f64).round();
    (dac.clamp(0.0, u16::MAX as f64) as u16) & 0x0FFF
}

/// Convert a raw detector temperature ADC reading to °C
///
/// The ADC value is unsigned on the wire.
pub fn adc_to_deg_c(coeffs: &[f32; 3], raw: u16) -> f32 {
    polynomial(coeffs, raw as f64) as f32
}

/// Decode a raw temperature response (2 bytes, big-endian)
pub fn decode_temperature_raw(data: &[u8]) -> Option<u16> {
    match data {
        [msb, lsb, ..] => Some(u16::from_be_bytes([*msb, *lsb])),
        _ => None,
    }
}

/// Render the firmware version response as a dotted quad
///
/// The bytes arrive least significant first. Returns an empty string if
/// fewer than 4 bytes came back.
pub fn format_firmware_version(data: &[u8]) -> String {
    match data {
        [d0, d1, d2, d3, ..] => format!("{}.{}.{}.{}", d3, d2, d1, d0),
        _ => String::new(),
    }
}

/// Keep only printable ASCII from the FPGA version response
pub fn format_fpga_version(data: &[u8]) -> String {
    data.iter()
        .filter(|b| (0x20..=0x7E).contains(*b))
        .map(|&b| b as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_integration_time() {
        assert_eq!(clamp_integration_time(0), 1);
        assert_eq!(clamp_integration_time(100), 100);
        assert_eq!(clamp_integration_time(1 << 24), MAX_INTEGRATION_TIME_MS);
        assert_eq!(clamp_integration_time(u32::MAX), MAX_INTEGRATION_TIME_MS);
    }

    #[test]
    fn test_split_integration_time() {
        assert_eq!(split_integration_time(100), (100, 0));
        assert_eq!(split_integration_time(0x12_3456), (0x3456, 0x12));
        assert_eq!(split_integration_time(u32::MAX), (0xFFFF, 0xFF));
        assert_eq!(decode_integration_time(&[0x56, 0x34, 0x12]), Some(0x12_3456));
        assert_eq!(decode_integration_time(&[0x56]), None);
    }

    #[test]
    fn test_gain_round_trip() {
        let mut value = 0.0f32;
        while value < GAIN_LIMIT {
            let word = encode_gain(value).unwrap();
            assert!(
                (decode_gain(word) - value).abs() <= 1.0 / 256.0,
                "gain {} -> 0x{:04X}",
                value,
                word
            );
            value += 0.37;
        }
        assert!((decode_gain(encode_gain(255.999).unwrap()) - 255.999).abs() <= 1.0 / 256.0);
    }

    #[test]
    fn test_gain_layout() {
        assert_eq!(encode_gain(1.5).unwrap(), 0x0180);
        assert_eq!(encode_gain(0.0).unwrap(), 0x0000);
        assert_eq!(encode_gain(8.0).unwrap(), 0x0800);
    }

    #[test]
    fn test_gain_domain() {
        assert!(encode_gain(-0.01).is_err());
        assert!(encode_gain(256.0).is_err());
        assert!(encode_gain(f32::NAN).is_err());
        assert!(encode_gain(f32::INFINITY).is_err());
    }

    #[test]
    fn test_offset_bits() {
        assert_eq!(reinterpret_i16_bits(-1), 0xFFFF);
        assert_eq!(reinterpret_i16_bits(0), 0x0000);
        assert_eq!(reinterpret_i16_bits(32767), 0x7FFF);
        assert_eq!(reinterpret_i16_bits(-32768), 0x8000);
        assert_eq!(reinterpret_i16_bits(-2), 0xFFFE);
    }

    #[test]
    fn test_tec_dac() {
        let coeffs = [2000.0, -50.0, 0.0];
        assert_eq!(tec_setpoint_dac(&coeffs, 10.0), 1500);
        assert_eq!(tec_setpoint_dac(&[0.0, 1.0, 0.0], 4.6), 5);
        // masked to 12 bits
        assert_eq!(tec_setpoint_dac(&[0x1234 as f32, 0.0, 0.0], 0.0), 0x234);
        // negative codes floor at zero
        assert_eq!(tec_setpoint_dac(&[-10.0, 0.0, 0.0], 0.0), 0);
    }

    #[test]
    fn test_temperature() {
        assert_eq!(decode_temperature_raw(&[0x01, 0x02]), Some(0x0102));
        assert_eq!(decode_temperature_raw(&[0x01]), None);
        // high bit set stays unsigned
        assert_eq!(decode_temperature_raw(&[0xFF, 0xFE]), Some(0xFFFE));
        let degc = adc_to_deg_c(&[1.0, 0.5, 0.0], 10);
        assert!((degc - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_versions() {
        assert_eq!(format_firmware_version(&[4, 3, 2, 1]), "1.2.3.4");
        assert_eq!(format_firmware_version(&[4, 3, 2, 1, 9, 9, 9, 9]), "1.2.3.4");
        assert_eq!(format_firmware_version(&[1, 2, 3]), "");
        assert_eq!(format_fpga_version(b"014-007\0\x01"), "014-007");
        assert_eq!(format_fpga_version(&[]), "");
    }

    #[test]
    fn test_polynomial() {
        assert_eq!(polynomial(&[1.0, 2.0, 3.0], 2.0), 17.0);
        assert_eq!(polynomial(&[], 2.0), 0.0);
    }
}
