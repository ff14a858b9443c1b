//! EEPROM command implementation

use wpspec_core::Transport;
use wpspec_driver::Spectrometer;

/// Print the decoded calibration record
///
/// With `field`, prints that one value. With `as_toml`, dumps the typed
/// record instead of the string table.
pub fn cmd_eeprom<T: Transport>(
    spec: &Spectrometer<T>,
    field: Option<&str>,
    as_toml: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let record = spec.eeprom();

    if let Some(name) = field {
        let value = record
            .field(name)
            .ok_or_else(|| format!("No EEPROM field named '{}'", name))?;
        println!("{}", value);
        return Ok(());
    }

    if as_toml {
        print!("{}", toml::to_string(record)?);
        return Ok(());
    }

    let width = record.fields().keys().map(String::len).max().unwrap_or(0);
    for (name, value) in record.fields() {
        println!("{:>width$}: {}", name, value, width = width);
    }
    Ok(())
}
