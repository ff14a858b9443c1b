//! CLI argument parsing

use crate::backends;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse "on"/"off" style switches
fn parse_switch(s: &str) -> Result<bool, String> {
    match s.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(format!("Expected on or off, got '{}'", s)),
    }
}

/// Generate dynamic help text for the backend argument
fn backend_help() -> String {
    format!(
        "Backend to use, with options as name:key=value,... [available: {}]",
        backends::backend_names_short()
    )
}

#[derive(Parser)]
#[command(name = "wpspec")]
#[command(author, version, about = "Wasatch Photonics spectrometer driver", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Device selection shared across commands
#[derive(clap::Args, Debug, Clone)]
pub struct DeviceArgs {
    #[arg(short, long, default_value = "usb", help = backend_help())]
    pub backend: String,

    /// Spectrometer index, in discovery order
    #[arg(short, long, default_value_t = 0)]
    pub index: usize,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List attached spectrometers
    List {
        #[arg(short, long, default_value = "usb", help = backend_help())]
        backend: String,
    },

    /// List compiled-in backends
    ListBackends,

    /// Show identity, versions and temperature
    Info {
        #[command(flatten)]
        device: DeviceArgs,
    },

    /// Show the calibration EEPROM
    Eeprom {
        #[command(flatten)]
        device: DeviceArgs,

        /// Print a single field (case-insensitive)
        #[arg(short, long, conflicts_with = "toml")]
        field: Option<String>,

        /// Dump the decoded record as TOML
        #[arg(long)]
        toml: bool,
    },

    /// Acquire spectra
    Acquire {
        #[command(flatten)]
        device: DeviceArgs,

        /// Integration time in milliseconds
        #[arg(short = 't', long)]
        integration_time: Option<u32>,

        /// Fire the laser during acquisition
        #[arg(long)]
        laser: bool,

        /// Number of scans to average
        #[arg(short = 'n', long, default_value_t = 1)]
        scans: u32,

        /// CSV output file (stdout if not given)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Control the detector TEC
    Tec {
        #[command(flatten)]
        device: DeviceArgs,

        /// Setpoint in °C
        #[arg(short, long, allow_negative_numbers = true)]
        setpoint: Option<i32>,

        /// Switch the TEC on or off
        #[arg(short, long, value_parser = parse_switch)]
        enable: Option<bool>,
    },

    /// Switch the laser
    Laser {
        #[command(flatten)]
        device: DeviceArgs,

        /// on or off
        #[arg(value_parser = parse_switch)]
        state: bool,
    },
}
