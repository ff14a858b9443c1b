//! List commands implementation

use wpspec_core::DeviceProvider;
use wpspec_driver::Registry;

use crate::backends;

/// List all compiled-in backends
pub fn list_backends() {
    println!("Supported backends:");
    println!();
    for backend in backends::available_backends() {
        println!("  {:<8} - {}", backend.name, backend.description);
    }
}

/// List the spectrometers on a backend
///
/// The usb backend is listed from descriptors alone, so devices another
/// process holds still show up. Other backends open every device and list
/// the sessions.
pub fn list_devices(spec: &str) -> Result<(), Box<dyn std::error::Error>> {
    #[allow(unused_variables)]
    let params = backends::parse_backend_params(spec)?;

    #[cfg(feature = "usb")]
    if params.name == "usb" {
        let config = wpspec_usb::parse_options(&params.pairs())?;
        return match wpspec_usb::list_devices(&config) {
            Ok(devices) => {
                print_usb_devices(&devices);
                Ok(())
            }
            Err(wpspec_usb::UsbError::DeviceNotFound) => {
                println!("No spectrometers found");
                Ok(())
            }
            Err(e) => Err(e.into()),
        };
    }

    backends::with_registry(spec, |registry| {
        list_spectrometers(registry);
        Ok(())
    })
}

#[cfg(feature = "usb")]
fn print_usb_devices(devices: &[wpspec_usb::UsbDeviceInfo]) {
    println!(
        "{:>5}  {:<8} {:<8} {:<8} {:<16}",
        "Index", "Family", "PID", "Bus:Addr", "Serial"
    );
    println!("{}", "-".repeat(50));

    for (index, device) in devices.iter().enumerate() {
        println!(
            "{:>5}  {:<8} {:<8} {:<8} {:<16}",
            index,
            device.family.to_string(),
            format!("0x{:04X}", device.product_id),
            format!("{}:{}", device.bus, device.address),
            device.serial_number.as_deref().unwrap_or("-")
        );
    }
}

/// List every spectrometer the registry opened
fn list_spectrometers<P: DeviceProvider>(registry: &Registry<P>) {
    if registry.open_count() == 0 {
        println!("No spectrometers found");
        return;
    }

    println!(
        "{:>5}  {:<8} {:<16} {:<16} {:>6}",
        "Index", "Family", "Model", "Serial", "Pixels"
    );
    println!("{}", "-".repeat(56));

    for (index, spec) in registry.iter() {
        println!(
            "{:>5}  {:<8} {:<16} {:<16} {:>6}",
            index,
            spec.family().to_string(),
            spec.model(),
            spec.serial_number(),
            spec.pixels()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "dummy")]
    #[test]
    fn test_list_dummy_devices() {
        assert!(list_devices("dummy:count=2").is_ok());
    }

    #[test]
    fn test_list_unknown_backend() {
        assert!(list_devices("serial").is_err());
        assert!(list_devices("dummy:count").is_err());
    }
}
