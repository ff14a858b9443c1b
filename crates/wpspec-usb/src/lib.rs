//! wpspec-usb - nusb transport for Wasatch Photonics spectrometers
//!
//! This crate finds spectrometers by vendor and product ID, claims their
//! interface and implements the core [`Transport`](wpspec_core::Transport)
//! trait over nusb. Supported devices:
//! - 0x1000: FX2 with a silicon detector
//! - 0x2000: FX2 with an InGaAs detector
//! - 0x4000: ARM
//!
//! # Example
//!
//! ```no_run
//! use wpspec_core::DeviceProvider;
//! use wpspec_usb::{parse_options, UsbProvider};
//!
//! let config = parse_options(&[("timeout", "2000")])?;
//! let devices = UsbProvider::new(config).open_all()?;
//! println!("{} spectrometer(s) opened", devices.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Configuration Options
//!
//! - `pid=0x4000` or `family=arm`: open only one family
//! - `timeout=MS`: control transfer timeout
//! - `interface=N`: interface number to claim

mod device;
mod error;
mod protocol;

pub use device::{list_devices, parse_options, UsbConfig, UsbDeviceInfo, UsbProvider, UsbSpectrometer};
pub use error::{Result, UsbError};
pub use protocol::{is_supported, product_name, SUPPORTED_PIDS, WASATCH_VID};
