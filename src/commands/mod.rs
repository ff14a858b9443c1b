//! CLI command implementations
//!
//! Each command works on one open [`Spectrometer`](wpspec_driver::Spectrometer)
//! and is generic over its transport, so the same code drives USB hardware
//! and the emulator.

pub mod acquire;
pub mod control;
pub mod eeprom;
pub mod info;
mod list;

pub use list::{list_backends, list_devices};
