//! Acquire command implementation

use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use wpspec_core::Transport;
use wpspec_driver::Spectrometer;

/// Acquisition options
#[derive(Debug, Clone, Default)]
pub struct AcquireOptions<'a> {
    /// Integration time to set before the first scan
    pub integration_time_ms: Option<u32>,
    /// Fire the laser for the duration of the acquisition
    pub laser: bool,
    /// Number of scans to average (at least one)
    pub scans: u32,
    /// CSV destination; stdout when `None`
    pub output: Option<&'a Path>,
}

/// Run the acquire command
pub fn run_acquire<T: Transport>(
    spec: &mut Spectrometer<T>,
    options: &AcquireOptions<'_>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(ms) = options.integration_time_ms {
        spec.set_integration_time_ms(ms)?;
    }
    println!(
        "Acquiring {} scan(s) at {} ms from {} {}",
        options.scans.max(1),
        spec.integration_time_ms(),
        spec.model(),
        spec.serial_number()
    );

    if options.laser {
        spec.set_laser_enable(true)?;
    }
    let averaged = average_scans(spec, options.scans.max(1));
    if options.laser {
        if let Err(e) = spec.set_laser_enable(false) {
            log::error!("Failed to switch the laser off: {}", e);
        }
    }
    let averaged = averaged?;

    match options.output {
        Some(path) => {
            let mut file = File::create(path)?;
            write_csv(&mut file, spec.wavelengths(), spec.wavenumbers(), &averaged)?;
            println!("Wrote {} pixels to {:?}", averaged.len(), path);
        }
        None => write_csv(
            &mut io::stdout().lock(),
            spec.wavelengths(),
            spec.wavenumbers(),
            &averaged,
        )?,
    }

    Ok(())
}

/// Acquire `scans` spectra and return their per-pixel mean
pub fn average_scans<T: Transport>(
    spec: &mut Spectrometer<T>,
    scans: u32,
) -> Result<Vec<f64>, Box<dyn std::error::Error>> {
    let pb = ProgressBar::new(scans as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} scans ({eta})")?
            .progress_chars("#>-"),
    );

    let mut sum = vec![0.0f64; spec.pixels()];
    for _ in 0..scans {
        let spectrum = spec.get_spectrum()?;
        for (acc, value) in sum.iter_mut().zip(&spectrum) {
            *acc += f64::from(*value);
        }
        pb.inc(1);
    }
    pb.finish_with_message("Acquisition complete");

    let n = f64::from(scans.max(1));
    Ok(sum.into_iter().map(|v| v / n).collect())
}

/// Write `pixel,wavelength[,wavenumber],intensity` rows
///
/// The wavenumber column is present only when `wavenumbers` is non-empty.
pub fn write_csv<W: Write>(
    out: &mut W,
    wavelengths: &[f64],
    wavenumbers: &[f64],
    intensities: &[f64],
) -> io::Result<()> {
    let raman = !wavenumbers.is_empty();
    if raman {
        writeln!(out, "pixel,wavelength_nm,wavenumber_cm1,intensity")?;
    } else {
        writeln!(out, "pixel,wavelength_nm,intensity")?;
    }

    for (pixel, intensity) in intensities.iter().enumerate() {
        let nm = wavelengths.get(pixel).copied().unwrap_or(0.0);
        if raman {
            let cm1 = wavenumbers.get(pixel).copied().unwrap_or(0.0);
            writeln!(out, "{},{:.4},{:.4},{:.2}", pixel, nm, cm1, intensity)?;
        } else {
            writeln!(out, "{},{:.4},{:.2}", pixel, nm, intensity)?;
        }
    }
    Ok(())
}
