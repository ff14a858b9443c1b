//! Info command implementation

use wpspec_core::Transport;
use wpspec_driver::Spectrometer;

/// Print identity, versions and live readings
pub fn cmd_info<T: Transport>(spec: &mut Spectrometer<T>) -> Result<(), Box<dyn std::error::Error>> {
    let firmware = spec.firmware_version()?;
    let fpga = spec.fpga_version()?;

    println!("Model:            {}", spec.model());
    println!("Serial number:    {}", spec.serial_number());
    println!("Family:           {}", spec.family());
    println!("Detector:         {}", spec.eeprom().detector_name);
    println!("Pixels:           {}", spec.pixels());
    println!("Firmware:         {}", firmware);
    println!("FPGA:             {}", fpga);

    if let (Some(first), Some(last)) = (spec.wavelengths().first(), spec.wavelengths().last()) {
        println!("Wavelength range: {:.2} - {:.2} nm", first, last);
    }
    if spec.eeprom().has_excitation() {
        println!("Excitation:       {:.3} nm", spec.eeprom().excitation_nm);
    }

    match spec.read_integration_time_ms() {
        Ok(ms) => println!("Integration time: {} ms", ms),
        Err(e) => {
            log::debug!("Integration time readback failed: {}", e);
            println!("Integration time: {} ms (cached)", spec.integration_time_ms());
        }
    }

    if spec.eeprom().has_laser {
        match spec.read_laser_enabled() {
            Ok(on) => println!("Laser:            {}", if on { "on" } else { "off" }),
            Err(e) => log::warn!("Laser state unavailable: {}", e),
        }
    }

    if spec.eeprom().has_cooling {
        match spec.detector_temperature_deg_c() {
            Ok(deg_c) => println!("Detector temp:    {:.1} °C", deg_c),
            Err(e) => log::warn!("Detector temperature unavailable: {}", e),
        }
        if let Some(setpoint) = spec.tec_setpoint_deg_c() {
            println!("TEC setpoint:     {} °C", setpoint);
        }
    }

    Ok(())
}
