//! Transport trait definitions
//!
//! A [`Transport`] is an already-opened, already-claimed device handle that
//! can perform vendor control transfers and bulk IN reads. Descriptor
//! matching and interface claiming live in the backend crates; everything
//! above this trait is backend-agnostic.
//!
//! All transfers are synchronous and block for at most their timeout.

use std::time::Duration;

use crate::error::Result;

/// Raw device I/O
///
/// Implementations must not pad, split or retry transfers; those protocol
/// rules belong to [`CommandChannel`](crate::CommandChannel).
pub trait Transport {
    /// Host-to-device vendor control transfer
    ///
    /// Returns the number of payload bytes sent.
    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize>;

    /// Device-to-host vendor control transfer
    ///
    /// The device may return fewer than `len` bytes.
    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        len: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>>;

    /// Bulk IN read of up to `len` bytes
    ///
    /// How the transfer is chunked on the bus is up to the backend; the
    /// returned buffer holds whatever arrived, never more than `len` bytes.
    fn bulk_in(&mut self, endpoint: u8, len: usize, timeout: Duration) -> Result<Vec<u8>>;

    /// Release the claimed interface and close the device
    ///
    /// After this call the transport must not be used again.
    fn release(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn control_out(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize> {
        (**self).control_out(request, value, index, data, timeout)
    }

    fn control_in(
        &mut self,
        request: u8,
        value: u16,
        index: u16,
        len: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>> {
        (**self).control_in(request, value, index, len, timeout)
    }

    fn bulk_in(&mut self, endpoint: u8, len: usize, timeout: Duration) -> Result<Vec<u8>> {
        (**self).bulk_in(endpoint, len, timeout)
    }

    fn release(&mut self) -> Result<()> {
        (**self).release()
    }
}

/// A device found and opened during enumeration
pub struct DiscoveredDevice<T> {
    /// Opened transport
    pub transport: T,
    /// USB product ID, used to pick the device family
    pub product_id: u16,
}

/// Source of opened devices for a registry
///
/// `open_all` discovers every supported device and opens it, in a stable
/// discovery order. Devices that fail to open are skipped (and logged) by
/// the implementation.
pub trait DeviceProvider {
    /// Transport type handed out for each device
    type Transport: Transport;

    /// Discover and open all supported devices
    fn open_all(&mut self) -> Result<Vec<DiscoveredDevice<Self::Transport>>>;
}
