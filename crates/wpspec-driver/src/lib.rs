//! wpspec-driver - Spectrometer sessions and the index-addressed driver
//!
//! Three layers sit on top of a [`Transport`](wpspec_core::Transport):
//!
//! - [`Spectrometer`]: one open device. Loads the EEPROM, primes the
//!   detector from it, caches the last commanded state and acquires spectra.
//! - [`Registry`]: opens every device a [`DeviceProvider`](wpspec_core::DeviceProvider)
//!   offers and hands out stable zero-based indices.
//! - [`Driver`]: the flat boundary that reports a [`Status`] code for every
//!   call and writes into caller-owned buffers.
//!
//! # Example
//!
//! ```ignore
//! use wpspec_driver::{Driver, Status};
//!
//! let mut driver = Driver::new(provider);
//! if driver.open_all_spectrometers() > 0 {
//!     driver.set_integration_time_ms(0, 100);
//!     let mut spectrum = vec![0.0; driver.pixels(0) as usize];
//!     assert_eq!(driver.spectrum(0, &mut spectrum), Status::Success);
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod boundary;
mod registry;
mod session;

pub use boundary::{
    export_slice, export_str, library_version, Driver, Status, TEMPERATURE_RAW_UNAVAILABLE,
};
pub use registry::Registry;
pub use session::{
    Spectrometer, State, StateCommit, INTEGRATION_TIME_COMMIT, TEC_SETPOINT_COMMIT,
};
