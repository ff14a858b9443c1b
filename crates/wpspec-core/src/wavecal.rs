//! Wavelength and wavenumber axis expansion

use crate::codec::polynomial;

/// Nanometers per centimeter
const NM_PER_CM: f64 = 1e7;

/// Expand the wavelength calibration into one value (nm) per pixel
pub fn expand_wavelengths(coeffs: &[f32; 5], pixels: usize) -> Vec<f64> {
    (0..pixels).map(|i| polynomial(coeffs, i as f64)).collect()
}

/// Expand Raman shift (1/cm) for each wavelength relative to the laser
///
/// Returns an empty axis when no excitation is configured. Pixels whose
/// wavelength is zero map to zero rather than infinity.
pub fn expand_wavenumbers(excitation_nm: f32, wavelengths: &[f64]) -> Vec<f64> {
    if excitation_nm <= 0.0 {
        return Vec::new();
    }

    let laser_cm = NM_PER_CM / excitation_nm as f64;
    wavelengths
        .iter()
        .map(|&nm| {
            if nm == 0.0 {
                0.0
            } else {
                laser_cm - NM_PER_CM / nm
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_wavecal() {
        let wl = expand_wavelengths(&[0.0, 1.0, 0.0, 0.0, 0.0], 4);
        assert_eq!(wl, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_quartic_term() {
        let wl = expand_wavelengths(&[500.0, 0.0, 0.0, 0.0, 1.0], 3);
        assert_eq!(wl, vec![500.0, 501.0, 516.0]);
    }

    #[test]
    fn test_no_excitation() {
        let wl = expand_wavelengths(&[785.0, 1.0, 0.0, 0.0, 0.0], 8);
        assert!(expand_wavenumbers(0.0, &wl).is_empty());
        assert!(expand_wavenumbers(-1.0, &wl).is_empty());
    }

    #[test]
    fn test_wavenumbers() {
        let wn = expand_wavenumbers(785.0, &[0.0, 785.0, 800.0]);
        assert_eq!(wn.len(), 3);
        assert_eq!(wn[0], 0.0);
        assert!(wn[1].abs() < 1e-6);
        let expected = 1e7 / 785.0 - 1e7 / 800.0;
        assert!((wn[2] - expected).abs() < 1e-6);
    }
}
