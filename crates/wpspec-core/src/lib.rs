//! wpspec-core - Core library for Wasatch Photonics USB spectrometers
//!
//! This crate holds everything about talking to a spectrometer that does not
//! depend on a particular USB stack:
//!
//! - the vendor command vocabulary ([`opcodes`]) and device families
//! - the [`Transport`] trait that USB backends implement
//! - the [`CommandChannel`], which applies per-family padding and timeout
//!   rules on top of a transport
//! - the EEPROM calibration record and its page parser ([`eeprom`])
//! - the fixed-point and bit-pattern encodings used on the wire ([`codec`])
//! - wavelength and wavenumber axis expansion ([`wavecal`])
//!
//! # Example
//!
//! ```ignore
//! use wpspec_core::{eeprom, CommandChannel, DeviceFamily};
//!
//! fn dump<T: wpspec_core::Transport>(transport: T) -> wpspec_core::Result<()> {
//!     let mut channel = CommandChannel::new(transport, DeviceFamily::Arm);
//!     let record = eeprom::load(&mut channel)?;
//!     for (name, value) in record.fields() {
//!         println!("{:>32}: {}", name, value);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod channel;
pub mod codec;
pub mod eeprom;
pub mod error;
pub mod family;
pub mod opcodes;
pub mod transport;
pub mod wavecal;

pub use channel::CommandChannel;
pub use eeprom::CalibrationRecord;
pub use error::{Capability, EepromError, Error, Result};
pub use family::DeviceFamily;
pub use transport::{DeviceProvider, DiscoveredDevice, Transport};
