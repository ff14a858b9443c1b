//! Calibration store
//!
//! Every spectrometer carries its calibration in an on-board EEPROM, read as
//! a fixed number of fixed-size pages. [`load`] pulls the pages through a
//! [`PageSource`] (normally the [`CommandChannel`]) and decodes them into a
//! [`CalibrationRecord`].
//!
//! Besides typed fields, the record carries a sorted name → string table of
//! every decoded value for introspection. Names are the camelCase field
//! names (`activePixelsHoriz`, `wavecalCoeffs0`, ...) and lookups are
//! case-insensitive.

mod features;
pub mod layout;
mod parser;

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::Serialize;

use crate::channel::CommandChannel;
use crate::error::EepromError;
use crate::opcodes;
use crate::transport::Transport;

pub use features::FeatureMask;
pub use layout::{PAGE_COUNT, PAGE_SIZE};
pub use parser::{parse_image, parse_pages};

/// Fixed-capacity EEPROM string
pub type Text<const N: usize> = heapless::String<N>;

/// Decoded EEPROM contents
///
/// Immutable once loaded. Construct with [`load`], [`parse_pages`] or
/// [`parse_image`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationRecord {
    /// Layout revision
    pub format: u8,
    /// Layout sub-revision
    pub subformat: u8,

    // Identity and capabilities
    /// Model name
    pub model: Text<16>,
    /// Serial number
    pub serial_number: Text<16>,
    /// Serial baud rate
    pub baud_rate: u32,
    /// Detector TEC fitted
    pub has_cooling: bool,
    /// Battery fitted
    pub has_battery: bool,
    /// Laser fitted
    pub has_laser: bool,
    /// Raw feature mask, see [`features`](Self::features)
    pub feature_mask: u16,
    /// Slit width in µm
    pub slit_size_um: u16,

    // Startup state
    /// Integration time applied at startup
    pub startup_integration_time_ms: u16,
    /// TEC setpoint applied at startup
    pub startup_temp_deg_c: i16,
    /// Trigger scheme applied at startup
    pub startup_triggering_scheme: u8,
    /// Default gain, even pixels
    pub detector_gain: f32,
    /// Default offset, even pixels
    pub detector_offset: i16,
    /// Default gain, odd pixels
    pub detector_gain_odd: f32,
    /// Default offset, odd pixels
    pub detector_offset_odd: i16,

    // Wavelength and temperature calibration
    /// Pixel → nm polynomial, ascending order
    pub wavecal_coeffs: [f32; 5],
    /// °C → TEC DAC polynomial
    pub deg_c_to_dac_coeffs: [f32; 3],
    /// Highest allowed TEC setpoint
    pub max_temperature_deg_c: i16,
    /// Lowest allowed TEC setpoint
    pub min_temperature_deg_c: i16,
    /// Temperature ADC → °C polynomial
    pub adc_to_deg_c_coeffs: [f32; 3],
    /// Thermistor resistance at 298 K
    pub tec_r298: i16,
    /// Thermistor beta
    pub tec_beta: i16,
    /// Calibration date
    pub calibration_date: Text<12>,
    /// Calibration author
    pub calibrated_by: Text<3>,

    // Detector geometry
    /// Detector part name
    pub detector_name: Text<16>,
    /// Active horizontal pixels (spectrum length)
    pub active_pixels_horiz: u16,
    /// Laser warm-up time in seconds
    pub laser_warmup_sec: u8,
    /// Active vertical pixels
    pub active_pixels_vert: u16,
    /// Physical horizontal pixels
    pub actual_pixels_horiz: u16,
    /// Horizontal ROI start
    pub roi_horiz_start: u16,
    /// Horizontal ROI end
    pub roi_horiz_end: u16,
    /// Vertical ROI regions as (start line, stop line)
    pub roi_vert_regions: [(u16, u16); 3],
    /// Non-linearity correction polynomial
    pub linearity_coeffs: [f32; 5],

    // Laser
    /// mW polynomial over laser drive percentage
    pub laser_power_coeffs: [f32; 4],
    /// Maximum laser power in mW
    pub max_laser_power_mw: f32,
    /// Minimum laser power in mW
    pub min_laser_power_mw: f32,
    /// Excitation wavelength in nm; zero or negative when there is no laser
    pub excitation_nm: f32,
    /// Minimum integration time
    pub min_integration_time_ms: u32,
    /// Maximum integration time
    pub max_integration_time_ms: u32,
    /// Average optical resolution in nm
    pub avg_resolution: f32,

    // Free-form
    /// User text
    pub user_text: Text<64>,
    /// Bad pixel indices, ascending
    pub bad_pixels: heapless::Vec<u16, { layout::BAD_PIXEL_SLOTS }>,
    /// Product configuration string
    pub product_configuration: Text<16>,

    #[serde(skip)]
    fields: BTreeMap<String, String>,
}

impl CalibrationRecord {
    /// Spectrum length in pixels
    pub fn pixels(&self) -> usize {
        self.active_pixels_horiz as usize
    }

    /// Model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Serial number
    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// Decoded feature mask (unknown bits dropped)
    pub fn features(&self) -> FeatureMask {
        FeatureMask::from_bits_truncate(self.feature_mask)
    }

    /// Whether a wavenumber axis can be computed
    pub fn has_excitation(&self) -> bool {
        self.excitation_nm > 0.0
    }

    /// Whether `deg_c` is an allowed TEC setpoint
    pub fn setpoint_in_range(&self, deg_c: f32) -> bool {
        (self.min_temperature_deg_c as f32..=self.max_temperature_deg_c as f32).contains(&deg_c)
    }

    /// All decoded fields as name → string, sorted by name
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Number of introspection fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Look up a field by name, ignoring case
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn render_fields(&self) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        let mut put = |name: &str, value: String| {
            fields.insert(name.to_string(), value);
        };
        let floats = |values: &[f32]| values.iter().map(|v| v.to_string()).collect::<Vec<_>>();

        put("format", self.format.to_string());
        put("subformat", self.subformat.to_string());

        put("model", self.model.to_string());
        put("serialNumber", self.serial_number.to_string());
        put("baudRate", self.baud_rate.to_string());
        put("hasCooling", self.has_cooling.to_string());
        put("hasBattery", self.has_battery.to_string());
        put("hasLaser", self.has_laser.to_string());
        put("featureMask", format!("0x{:04X}", self.feature_mask));
        put("slitSizeUM", self.slit_size_um.to_string());

        put(
            "startupIntegrationTimeMS",
            self.startup_integration_time_ms.to_string(),
        );
        put("startupTempDegC", self.startup_temp_deg_c.to_string());
        put(
            "startupTriggeringScheme",
            self.startup_triggering_scheme.to_string(),
        );
        put("detectorGain", self.detector_gain.to_string());
        put("detectorOffset", self.detector_offset.to_string());
        put("detectorGainOdd", self.detector_gain_odd.to_string());
        put("detectorOffsetOdd", self.detector_offset_odd.to_string());

        for (i, v) in floats(&self.wavecal_coeffs).into_iter().enumerate() {
            put(&format!("wavecalCoeffs{}", i), v);
        }
        for (i, v) in floats(&self.deg_c_to_dac_coeffs).into_iter().enumerate() {
            put(&format!("degCToDACCoeffs{}", i), v);
        }
        put("maxTemperatureDegC", self.max_temperature_deg_c.to_string());
        put("minTemperatureDegC", self.min_temperature_deg_c.to_string());
        for (i, v) in floats(&self.adc_to_deg_c_coeffs).into_iter().enumerate() {
            put(&format!("adcToDegCCoeffs{}", i), v);
        }
        put("tecR298", self.tec_r298.to_string());
        put("tecBeta", self.tec_beta.to_string());
        put("calibrationDate", self.calibration_date.to_string());
        put("calibrationBy", self.calibrated_by.to_string());

        put("detectorName", self.detector_name.to_string());
        put("activePixelsHoriz", self.active_pixels_horiz.to_string());
        put("laserWarmupSec", self.laser_warmup_sec.to_string());
        put("activePixelsVert", self.active_pixels_vert.to_string());
        put("actualPixelsHoriz", self.actual_pixels_horiz.to_string());
        put("roiHorizStart", self.roi_horiz_start.to_string());
        put("roiHorizEnd", self.roi_horiz_end.to_string());
        for (i, (start, end)) in self.roi_vert_regions.iter().enumerate() {
            put(&format!("roiVertRegion{}Start", i + 1), start.to_string());
            put(&format!("roiVertRegion{}End", i + 1), end.to_string());
        }
        for (i, v) in floats(&self.linearity_coeffs).into_iter().enumerate() {
            put(&format!("linearityCoeffs{}", i), v);
        }

        for (i, v) in floats(&self.laser_power_coeffs).into_iter().enumerate() {
            put(&format!("laserPowerCoeffs{}", i), v);
        }
        put("maxLaserPowerMW", self.max_laser_power_mw.to_string());
        put("minLaserPowerMW", self.min_laser_power_mw.to_string());
        put("excitationNM", self.excitation_nm.to_string());
        put(
            "minIntegrationTimeMS",
            self.min_integration_time_ms.to_string(),
        );
        put(
            "maxIntegrationTimeMS",
            self.max_integration_time_ms.to_string(),
        );
        put("avgResolution", self.avg_resolution.to_string());

        put("userText", self.user_text.to_string());
        put(
            "badPixels",
            self.bad_pixels
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(","),
        );
        put(
            "productConfiguration",
            self.product_configuration.to_string(),
        );

        fields
    }
}

/// Anything that can hand out raw EEPROM pages
///
/// An empty or short page means the read failed.
pub trait PageSource {
    /// Read one page
    fn read_page(&mut self, page: usize) -> Vec<u8>;
}

impl<T: Transport> PageSource for CommandChannel<T> {
    fn read_page(&mut self, page: usize) -> Vec<u8> {
        self.receive(
            opcodes::SECOND_TIER,
            opcodes::SECOND_TIER_GET_EEPROM_PAGE,
            page as u16,
            PAGE_SIZE,
        )
    }
}

/// Read every page from `source` and decode the record
pub fn load<S: PageSource + ?Sized>(
    source: &mut S,
) -> core::result::Result<CalibrationRecord, EepromError> {
    let mut pages = Vec::with_capacity(PAGE_COUNT);
    for page in 0..PAGE_COUNT {
        let data = source.read_page(page);
        log::debug!("EEPROM page {}: {}", page, to_hex(&data));
        pages.push(data);
    }

    let record = parse_pages(&pages).inspect_err(|e| log::error!("unable to parse EEPROM: {}", e))?;

    log::debug!(
        "EEPROM: {} {} ({} pixels, format {})",
        record.model,
        record.serial_number,
        record.active_pixels_horiz,
        record.format
    );
    Ok(record)
}

fn to_hex(data: &[u8]) -> String {
    let mut s = String::with_capacity(data.len() * 3);
    for (i, b) in data.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        let _ = write!(s, "{:02X}", b);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pages(Vec<Vec<u8>>);

    impl PageSource for Pages {
        fn read_page(&mut self, page: usize) -> Vec<u8> {
            self.0.get(page).cloned().unwrap_or_default()
        }
    }

    fn image() -> Vec<u8> {
        let mut image = vec![0u8; layout::IMAGE_SIZE];
        let put = |image: &mut Vec<u8>, field: layout::Field, bytes: &[u8]| {
            image[field.start()..field.start() + bytes.len()].copy_from_slice(bytes);
        };
        put(&mut image, layout::FORMAT, &[9]);
        put(&mut image, layout::MODEL, b"WP-785X-ILP");
        put(&mut image, layout::HAS_COOLING, &[1]);
        put(&mut image, layout::FEATURE_MASK, &0x0009u16.to_le_bytes());
        put(&mut image, layout::ACTIVE_PIXELS_HORIZ, &512u16.to_le_bytes());
        put(&mut image, layout::MIN_TEMP_DEG_C, &(-15i16).to_le_bytes());
        put(&mut image, layout::MAX_TEMP_DEG_C, &20i16.to_le_bytes());
        image
    }

    fn paged(image: &[u8]) -> Pages {
        Pages(image.chunks(PAGE_SIZE).map(|p| p.to_vec()).collect())
    }

    #[test]
    fn test_load() {
        let record = load(&mut paged(&image())).unwrap();
        assert_eq!(record.pixels(), 512);
        assert_eq!(record.model(), "WP-785X-ILP");
        assert!(record.has_cooling);
        assert_eq!(
            record.features(),
            FeatureMask::INVERT_X_AXIS | FeatureMask::CUTOFF_FILTER
        );
    }

    #[test]
    fn test_load_truncated() {
        let image = image();
        let mut source = paged(&image[..3 * PAGE_SIZE]);
        assert!(matches!(
            load(&mut source),
            Err(EepromError::ShortPage { page: 3, len: 0, .. })
        ));
    }

    #[test]
    fn test_field_lookup_ignores_case() {
        let record = load(&mut paged(&image())).unwrap();
        assert_eq!(record.field("activePixelsHoriz"), Some("512"));
        assert_eq!(record.field("ACTIVEPIXELSHORIZ"), Some("512"));
        assert_eq!(record.field("model"), Some("WP-785X-ILP"));
        assert_eq!(record.field("featureMask"), Some("0x0009"));
        assert_eq!(record.field("hasCooling"), Some("true"));
        assert_eq!(record.field("nonexistent"), None);
    }

    #[test]
    fn test_field_table_is_stable() {
        let a = load(&mut paged(&image())).unwrap();
        let b = load(&mut paged(&image())).unwrap();
        assert_eq!(a.field_count(), b.field_count());
        assert_eq!(a.field_count(), a.fields().len());
        assert!(a.fields().contains_key("wavecalCoeffs4"));
        assert!(a.fields().contains_key("roiVertRegion3End"));
        // sorted by name
        let names: Vec<_> = a.fields().keys().cloned().collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_setpoint_range() {
        let record = load(&mut paged(&image())).unwrap();
        assert!(record.setpoint_in_range(-15.0));
        assert!(record.setpoint_in_range(20.0));
        assert!(!record.setpoint_in_range(20.5));
        assert!(!record.setpoint_in_range(-16.0));
    }
}
