//! Command channel
//!
//! The command channel is the pair of control-transfer primitives every
//! spectrometer operation is built from:
//!
//! - [`send`](CommandChannel::send): host-to-device, opcode + two 16-bit words
//!   + optional payload
//! - [`receive`](CommandChannel::receive): device-to-host, returns whatever
//!   bytes arrived (empty means "unavailable")
//!
//! The ARM firmware rejects zero-length control writes and short read
//! requests, so for that family an absent payload becomes an 8-byte zero
//! buffer and read lengths are floored to 8 bytes.

use std::time::Duration;

use crate::error::Result;
use crate::family::DeviceFamily;
use crate::transport::Transport;

/// Timeout for every control transfer
pub const CONTROL_TIMEOUT: Duration = Duration::from_millis(1000);

/// Control-transfer primitives bound to one device
pub struct CommandChannel<T> {
    transport: T,
    family: DeviceFamily,
    timeout: Duration,
}

impl<T: Transport> CommandChannel<T> {
    /// Wrap a transport using the default control timeout
    pub fn new(transport: T, family: DeviceFamily) -> Self {
        Self::with_timeout(transport, family, CONTROL_TIMEOUT)
    }

    /// Wrap a transport with an explicit control timeout
    pub fn with_timeout(transport: T, family: DeviceFamily, timeout: Duration) -> Self {
        Self {
            transport,
            family,
            timeout,
        }
    }

    /// Device family this channel applies quirks for
    pub fn family(&self) -> DeviceFamily {
        self.family
    }

    /// Send a host-to-device command
    ///
    /// Returns the number of payload bytes the transport reports sent.
    pub fn send(
        &mut self,
        opcode: u8,
        value: u16,
        index: u16,
        payload: Option<&[u8]>,
    ) -> Result<usize> {
        let padding = [0u8; crate::family::ARM_MIN_CONTROL_LEN];
        let data = match payload {
            Some(data) => data,
            None if self.family.requires_min_control_len() => &padding[..],
            None => &[],
        };

        log::debug!(
            "send(opcode 0x{:02X}, value 0x{:04X}, index 0x{:04X}, len {}, timeout {}ms)",
            opcode,
            value,
            index,
            data.len(),
            self.timeout.as_millis()
        );

        self.transport
            .control_out(opcode, value, index, data, self.timeout)
            .inspect_err(|e| log::warn!("send(opcode 0x{:02X}) failed: {}", opcode, e))
    }

    /// Request `len` bytes from the device
    ///
    /// Failures are reported as an empty buffer, never as zeros. Callers must
    /// check the returned length before indexing; the device may send fewer
    /// bytes than asked for.
    pub fn receive(&mut self, opcode: u8, value: u16, index: u16, len: usize) -> Vec<u8> {
        let len = len.max(self.family.min_control_len());

        log::debug!(
            "receive(opcode 0x{:02X}, value 0x{:04X}, index 0x{:04X}, len {}, timeout {}ms)",
            opcode,
            value,
            index,
            len,
            self.timeout.as_millis()
        );

        match self
            .transport
            .control_in(opcode, value, index, len, self.timeout)
        {
            Ok(data) => data,
            Err(e) => {
                log::warn!("receive(opcode 0x{:02X}) failed: {}", opcode, e);
                Vec::new()
            }
        }
    }

    /// Bulk IN read, passed straight through to the transport
    pub fn bulk_read(&mut self, endpoint: u8, len: usize, timeout: Duration) -> Result<Vec<u8>> {
        log::trace!(
            "bulk_read(endpoint 0x{:02X}, len {}, timeout {}ms)",
            endpoint,
            len,
            timeout.as_millis()
        );
        self.transport.bulk_in(endpoint, len, timeout)
    }

    /// Release the underlying device
    pub fn release(&mut self) -> Result<()> {
        self.transport.release()
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
