//! wpspec - Command-line driver for Wasatch Photonics USB spectrometers
//!
//! # Architecture
//!
//! The binary is a thin layer over three library crates:
//! - **wpspec-core**: protocol vocabulary, EEPROM decoding, wire codecs and
//!   the `Transport` trait
//! - **wpspec-usb** / **wpspec-dummy**: transports for real hardware and for
//!   an in-memory emulator
//! - **wpspec-driver**: per-device sessions and the index-addressed registry
//!
//! Every command opens all spectrometers on the chosen backend, works on the
//! one selected by `--index`, and closes everything on exit.

mod backends;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, DeviceArgs};
use commands::acquire::AcquireOptions;
use wpspec_core::Transport;
use wpspec_driver::Spectrometer;

type DynError = Box<dyn std::error::Error>;

fn main() -> Result<(), DynError> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let result = match cli.command {
        Commands::List { backend } => commands::list_devices(&backend),
        Commands::ListBackends => {
            commands::list_backends();
            Ok(())
        }
        Commands::Info { device } => with_spectrometer(&device, commands::info::cmd_info),
        Commands::Eeprom {
            device,
            field,
            toml,
        } => with_spectrometer(&device, |spec| {
            commands::eeprom::cmd_eeprom(spec, field.as_deref(), toml)
        }),
        Commands::Acquire {
            device,
            integration_time,
            laser,
            scans,
            output,
        } => {
            let options = AcquireOptions {
                integration_time_ms: integration_time,
                laser,
                scans,
                output: output.as_deref(),
            };
            with_spectrometer(&device, |spec| {
                commands::acquire::run_acquire(spec, &options)
            })
        }
        Commands::Tec {
            device,
            setpoint,
            enable,
        } => with_spectrometer(&device, |spec| {
            commands::control::cmd_tec(spec, setpoint, enable)
        }),
        Commands::Laser { device, state } => with_spectrometer(&device, |spec| {
            commands::control::cmd_laser(spec, state)
        }),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Open the backend and run `f` on the spectrometer at `device.index`
fn with_spectrometer<F>(device: &DeviceArgs, f: F) -> Result<(), DynError>
where
    F: FnOnce(&mut Spectrometer<Box<dyn Transport>>) -> Result<(), DynError>,
{
    backends::with_registry(&device.backend, |registry| {
        let count = registry.count();
        let spec = registry
            .get_mut(device.index)
            .ok_or_else(|| no_spectrometer_error(device.index, count))?;
        f(spec)
    })
}

fn no_spectrometer_error(index: usize, count: usize) -> DynError {
    format!(
        "No spectrometer at index {} ({} found; try `wpspec list`)",
        index, count
    )
    .into()
}
