//! EEPROM image builder
//!
//! Writes fields at their [`layout`] offsets so tests can describe a device
//! by calibration values instead of raw bytes.

use wpspec_core::eeprom::layout::{self, Field, IMAGE_SIZE, PAGE_SIZE};

/// Calibration image under construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EepromImage {
    data: Vec<u8>,
}

impl Default for EepromImage {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EepromImage {
    /// Uncooled 785 nm unit with a linear wavecal and `pixels` active pixels
    pub fn new(pixels: u16) -> Self {
        let image = Self {
            data: vec![0; IMAGE_SIZE],
        };
        image
            .format(9)
            .model("WP-785X")
            .serial_number("DUMMY-0001")
            .detector_name("S11511")
            .pixels(pixels)
            .wavecal([700.0, 0.1, 0.0, 0.0, 0.0])
            .excitation_nm(785.0)
            .startup_integration_time_ms(100)
            .detector_gain(1.9)
            .detector_offset(0)
            .detector_gain_odd(1.9)
            .detector_offset_odd(0)
            .integration_limits(1, 60_000)
            .u16(layout::ACTUAL_PIXELS_HORIZ, pixels)
            .u16(layout::ROI_HORIZ_END, pixels.saturating_sub(1))
            .bad_pixels(&[])
    }

    /// Layout revision
    pub fn format(self, format: u8) -> Self {
        self.bytes(layout::FORMAT, &[format])
    }

    /// Model name
    pub fn model(self, model: &str) -> Self {
        self.text(layout::MODEL, model)
    }

    /// Serial number
    pub fn serial_number(self, serial: &str) -> Self {
        self.text(layout::SERIAL_NUMBER, serial)
    }

    /// Detector part name
    pub fn detector_name(self, name: &str) -> Self {
        self.text(layout::DETECTOR_NAME, name)
    }

    /// Active horizontal pixels
    pub fn pixels(self, pixels: u16) -> Self {
        self.u16(layout::ACTIVE_PIXELS_HORIZ, pixels)
    }

    /// Wavelength polynomial
    pub fn wavecal(mut self, coeffs: [f32; 5]) -> Self {
        for (field, c) in layout::WAVECAL_COEFFS.iter().zip(coeffs) {
            self = self.f32(*field, c);
        }
        self
    }

    /// Excitation wavelength (float field, format 4 and later)
    pub fn excitation_nm(self, nm: f32) -> Self {
        self.f32(layout::EXCITATION_NM, nm)
    }

    /// Integration time applied at startup
    pub fn startup_integration_time_ms(self, ms: u16) -> Self {
        self.u16(layout::STARTUP_INTEGRATION_TIME_MS, ms)
    }

    /// Default even-pixel gain
    pub fn detector_gain(self, gain: f32) -> Self {
        self.f32(layout::DETECTOR_GAIN, gain)
    }

    /// Default even-pixel offset
    pub fn detector_offset(self, offset: i16) -> Self {
        self.bytes(layout::DETECTOR_OFFSET, &offset.to_le_bytes())
    }

    /// Default odd-pixel gain
    pub fn detector_gain_odd(self, gain: f32) -> Self {
        self.f32(layout::DETECTOR_GAIN_ODD, gain)
    }

    /// Default odd-pixel offset
    pub fn detector_offset_odd(self, offset: i16) -> Self {
        self.bytes(layout::DETECTOR_OFFSET_ODD, &offset.to_le_bytes())
    }

    /// Integration time limits
    pub fn integration_limits(self, min_ms: u32, max_ms: u32) -> Self {
        self.bytes(layout::MIN_INTEGRATION_TIME_MS, &min_ms.to_le_bytes())
            .bytes(layout::MAX_INTEGRATION_TIME_MS, &max_ms.to_le_bytes())
    }

    /// Fit a TEC with setpoint limits, startup setpoint and a DAC polynomial
    pub fn cooling(self, min_deg_c: i16, max_deg_c: i16, startup_deg_c: i16, dac: [f32; 3]) -> Self {
        let mut image = self
            .bytes(layout::HAS_COOLING, &[1])
            .bytes(layout::MIN_TEMP_DEG_C, &min_deg_c.to_le_bytes())
            .bytes(layout::MAX_TEMP_DEG_C, &max_deg_c.to_le_bytes())
            .bytes(layout::STARTUP_TEMP_DEG_C, &startup_deg_c.to_le_bytes());
        for (field, c) in layout::DEG_C_TO_DAC_COEFFS.iter().zip(dac) {
            image = image.f32(*field, c);
        }
        image
    }

    /// Temperature ADC → °C polynomial
    pub fn adc_to_deg_c(mut self, coeffs: [f32; 3]) -> Self {
        for (field, c) in layout::ADC_TO_DEG_C_COEFFS.iter().zip(coeffs) {
            self = self.f32(*field, c);
        }
        self
    }

    /// Vertical ROI region `region` (0-based)
    pub fn vertical_roi(self, region: usize, start: u16, stop: u16) -> Self {
        let (start_field, stop_field) = layout::ROI_VERT_REGIONS[region];
        self.u16(start_field, start).u16(stop_field, stop)
    }

    /// Bad pixel list; remaining slots are marked unused
    pub fn bad_pixels(self, pixels: &[i16]) -> Self {
        let bytes: Vec<u8> = (0..layout::BAD_PIXEL_SLOTS)
            .flat_map(|i| pixels.get(i).copied().unwrap_or(-1).to_le_bytes())
            .collect();
        self.bytes(layout::BAD_PIXELS, &bytes)
    }

    /// Raw little-endian u16 at `field`
    pub fn u16(self, field: Field, value: u16) -> Self {
        self.bytes(field, &value.to_le_bytes())
    }

    /// Raw little-endian f32 at `field`
    pub fn f32(self, field: Field, value: f32) -> Self {
        self.bytes(field, &value.to_le_bytes())
    }

    /// NUL-padded string at `field`, truncated to the field width
    pub fn text(self, field: Field, s: &str) -> Self {
        let mut padded = vec![0u8; field.len];
        let n = s.len().min(field.len);
        padded[..n].copy_from_slice(&s.as_bytes()[..n]);
        self.bytes(field, &padded)
    }

    /// Raw bytes starting at `field`
    pub fn bytes(mut self, field: Field, bytes: &[u8]) -> Self {
        let start = field.start();
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        self
    }

    /// One page of the image
    pub fn page(&self, page: usize) -> Option<&[u8]> {
        self.data.get(page * PAGE_SIZE..(page + 1) * PAGE_SIZE)
    }

    /// The whole image
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpspec_core::eeprom;

    #[test]
    fn test_default_image_parses() {
        let record = eeprom::parse_image(EepromImage::default().as_bytes()).unwrap();
        assert_eq!(record.pixels(), 1024);
        assert_eq!(record.model(), "WP-785X");
        assert_eq!(record.excitation_nm, 785.0);
        assert!(!record.has_cooling);
        assert!(record.bad_pixels.is_empty());
    }

    #[test]
    fn test_cooling() {
        let image = EepromImage::new(512).cooling(-20, 10, 15, [0.0, 1.0, 0.0]);
        let record = eeprom::parse_image(image.as_bytes()).unwrap();
        assert!(record.has_cooling);
        assert_eq!(record.min_temperature_deg_c, -20);
        assert_eq!(record.max_temperature_deg_c, 10);
        assert_eq!(record.startup_temp_deg_c, 15);
        assert_eq!(record.deg_c_to_dac_coeffs, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_long_text_is_truncated() {
        let image = EepromImage::default().model("ABCDEFGHIJKLMNOPQRSTUVWXYZ");
        let record = eeprom::parse_image(image.as_bytes()).unwrap();
        assert_eq!(record.model(), "ABCDEFGHIJKLMNOP");
    }
}
