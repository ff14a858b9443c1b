//! TEC and laser commands

use wpspec_core::Transport;
use wpspec_driver::Spectrometer;

/// Apply a TEC setpoint and/or enable state, then report the temperature
pub fn cmd_tec<T: Transport>(
    spec: &mut Spectrometer<T>,
    setpoint: Option<i32>,
    enable: Option<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    if !spec.eeprom().has_cooling {
        return Err(format!("{} has no TEC", spec.serial_number()).into());
    }

    if let Some(deg_c) = setpoint {
        spec.set_detector_tec_setpoint_deg_c(deg_c as f32)?;
        println!("TEC setpoint: {} °C", deg_c);
    }
    if let Some(on) = enable {
        spec.set_tec_enable(on)?;
        println!("TEC: {}", if on { "on" } else { "off" });
    }

    let deg_c = spec.detector_temperature_deg_c()?;
    println!("Detector temperature: {:.1} °C", deg_c);
    Ok(())
}

/// Switch the laser
pub fn cmd_laser<T: Transport>(
    spec: &mut Spectrometer<T>,
    on: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    spec.set_laser_enable(on)?;
    println!("Laser: {}", if on { "on" } else { "off" });
    Ok(())
}
