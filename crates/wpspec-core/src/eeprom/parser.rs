//! EEPROM image decoding
//!
//! Decoding is pure: the same byte image always yields the same record or
//! the same error.

use super::layout::{self, Field, IMAGE_SIZE, PAGE_COUNT, PAGE_SIZE};
use super::{CalibrationRecord, Text};
use crate::error::EepromError;

type Result<T> = core::result::Result<T, EepromError>;

/// Bounds-checked little-endian field reader over a full image
struct Reader<'a> {
    image: &'a [u8],
}

impl<'a> Reader<'a> {
    fn bytes(&self, field: Field) -> Result<&'a [u8]> {
        self.image
            .get(field.start()..field.end())
            .ok_or(EepromError::OutOfBounds {
                offset: field.start(),
                len: field.len,
            })
    }

    fn array<const N: usize>(&self, field: Field) -> Result<[u8; N]> {
        let bytes = self.bytes(Field { len: N, ..field })?;
        bytes.try_into().map_err(|_| EepromError::OutOfBounds {
            offset: field.start(),
            len: N,
        })
    }

    fn u8(&self, field: Field) -> Result<u8> {
        Ok(self.array::<1>(field)?[0])
    }

    fn bool(&self, field: Field) -> Result<bool> {
        Ok(self.u8(field)? != 0)
    }

    fn u16(&self, field: Field) -> Result<u16> {
        self.array(field).map(u16::from_le_bytes)
    }

    fn i16(&self, field: Field) -> Result<i16> {
        self.array(field).map(i16::from_le_bytes)
    }

    fn u32(&self, field: Field) -> Result<u32> {
        self.array(field).map(u32::from_le_bytes)
    }

    fn f32(&self, field: Field) -> Result<f32> {
        self.array(field).map(f32::from_le_bytes)
    }

    fn f32s<const N: usize>(&self, fields: &[Field; N]) -> Result<[f32; N]> {
        let mut out = [0.0f32; N];
        for (slot, field) in out.iter_mut().zip(fields) {
            *slot = self.f32(*field)?;
        }
        Ok(out)
    }

    /// NUL-terminated string, non-printable bytes dropped
    fn text<const N: usize>(&self, field: Field) -> Result<Text<N>> {
        let mut s = Text::<N>::new();
        for &b in self.bytes(field)?.iter().take_while(|&&b| b != 0) {
            if (0x20..=0x7E).contains(&b) && s.push(b as char).is_err() {
                break;
            }
        }
        Ok(s)
    }
}

/// Decode a list of raw pages
///
/// Exactly [`PAGE_COUNT`] pages are required, each at least [`PAGE_SIZE`]
/// bytes; bytes past the page size are ignored.
pub fn parse_pages<P: AsRef<[u8]>>(pages: &[P]) -> Result<CalibrationRecord> {
    if pages.len() != PAGE_COUNT {
        return Err(EepromError::PageCount {
            expected: PAGE_COUNT,
            actual: pages.len(),
        });
    }

    let mut image = Vec::with_capacity(IMAGE_SIZE);
    for (page, data) in pages.iter().enumerate() {
        let data = data.as_ref();
        if data.len() < PAGE_SIZE {
            return Err(EepromError::ShortPage {
                page,
                len: data.len(),
                expected: PAGE_SIZE,
            });
        }
        image.extend_from_slice(&data[..PAGE_SIZE]);
    }

    parse_image(&image)
}

/// Decode a concatenated image of exactly [`IMAGE_SIZE`] bytes
pub fn parse_image(image: &[u8]) -> Result<CalibrationRecord> {
    if image.len() % PAGE_SIZE != 0 {
        return Err(EepromError::ShortPage {
            page: image.len() / PAGE_SIZE,
            len: image.len() % PAGE_SIZE,
            expected: PAGE_SIZE,
        });
    }
    if image.len() != IMAGE_SIZE {
        return Err(EepromError::PageCount {
            expected: PAGE_COUNT,
            actual: image.len() / PAGE_SIZE,
        });
    }

    let r = Reader { image };

    let format = r.u8(layout::FORMAT)?;
    let (feature_mask, excitation_nm) = if format >= layout::FLOAT_EXCITATION_FORMAT {
        (r.u16(layout::FEATURE_MASK)?, r.f32(layout::EXCITATION_NM)?)
    } else {
        (0, r.u16(layout::LEGACY_EXCITATION_NM)? as f32)
    };

    let active_pixels_horiz = r.u16(layout::ACTIVE_PIXELS_HORIZ)?;
    if active_pixels_horiz == 0 {
        return Err(EepromError::NoPixels);
    }

    let mut roi_vert_regions = [(0u16, 0u16); 3];
    for (slot, (start, end)) in roi_vert_regions.iter_mut().zip(&layout::ROI_VERT_REGIONS) {
        *slot = (r.u16(*start)?, r.u16(*end)?);
    }

    let mut bad_pixels = heapless::Vec::new();
    for chunk in r.bytes(layout::BAD_PIXELS)?.chunks_exact(2) {
        let pixel = i16::from_le_bytes([chunk[0], chunk[1]]);
        if pixel >= 0 && !bad_pixels.contains(&(pixel as u16)) {
            // capacity equals the slot count
            let _ = bad_pixels.push(pixel as u16);
        }
    }
    bad_pixels.sort_unstable();

    let mut record = CalibrationRecord {
        format,
        subformat: r.u8(layout::SUBFORMAT)?,

        model: r.text(layout::MODEL)?,
        serial_number: r.text(layout::SERIAL_NUMBER)?,
        baud_rate: r.u32(layout::BAUD_RATE)?,
        has_cooling: r.bool(layout::HAS_COOLING)?,
        has_battery: r.bool(layout::HAS_BATTERY)?,
        has_laser: r.bool(layout::HAS_LASER)?,
        feature_mask,
        slit_size_um: r.u16(layout::SLIT_SIZE_UM)?,
        startup_integration_time_ms: r.u16(layout::STARTUP_INTEGRATION_TIME_MS)?,
        startup_temp_deg_c: r.i16(layout::STARTUP_TEMP_DEG_C)?,
        startup_triggering_scheme: r.u8(layout::STARTUP_TRIGGERING_SCHEME)?,
        detector_gain: r.f32(layout::DETECTOR_GAIN)?,
        detector_offset: r.i16(layout::DETECTOR_OFFSET)?,
        detector_gain_odd: r.f32(layout::DETECTOR_GAIN_ODD)?,
        detector_offset_odd: r.i16(layout::DETECTOR_OFFSET_ODD)?,

        wavecal_coeffs: r.f32s(&layout::WAVECAL_COEFFS)?,
        deg_c_to_dac_coeffs: r.f32s(&layout::DEG_C_TO_DAC_COEFFS)?,
        max_temperature_deg_c: r.i16(layout::MAX_TEMP_DEG_C)?,
        min_temperature_deg_c: r.i16(layout::MIN_TEMP_DEG_C)?,
        adc_to_deg_c_coeffs: r.f32s(&layout::ADC_TO_DEG_C_COEFFS)?,
        tec_r298: r.i16(layout::TEC_R298)?,
        tec_beta: r.i16(layout::TEC_BETA)?,
        calibration_date: r.text(layout::CALIBRATION_DATE)?,
        calibrated_by: r.text(layout::CALIBRATED_BY)?,

        detector_name: r.text(layout::DETECTOR_NAME)?,
        active_pixels_horiz,
        laser_warmup_sec: r.u8(layout::LASER_WARMUP_SEC)?,
        active_pixels_vert: r.u16(layout::ACTIVE_PIXELS_VERT)?,
        actual_pixels_horiz: r.u16(layout::ACTUAL_PIXELS_HORIZ)?,
        roi_horiz_start: r.u16(layout::ROI_HORIZ_START)?,
        roi_horiz_end: r.u16(layout::ROI_HORIZ_END)?,
        roi_vert_regions,
        linearity_coeffs: r.f32s(&layout::LINEARITY_COEFFS)?,

        laser_power_coeffs: r.f32s(&layout::LASER_POWER_COEFFS)?,
        max_laser_power_mw: r.f32(layout::MAX_LASER_POWER_MW)?,
        min_laser_power_mw: r.f32(layout::MIN_LASER_POWER_MW)?,
        excitation_nm,
        min_integration_time_ms: r.u32(layout::MIN_INTEGRATION_TIME_MS)?,
        max_integration_time_ms: r.u32(layout::MAX_INTEGRATION_TIME_MS)?,
        avg_resolution: r.f32(layout::AVG_RESOLUTION)?,

        user_text: r.text(layout::USER_TEXT)?,
        bad_pixels,
        product_configuration: r.text(layout::PRODUCT_CONFIGURATION)?,

        fields: Default::default(),
    };
    record.fields = record.render_fields();

    Ok(record)
}
