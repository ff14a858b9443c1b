//! Device registry
//!
//! The [`Registry`] asks a [`DeviceProvider`] for every attached device,
//! brings up one [`Spectrometer`] per device and hands out zero-based
//! indices in discovery order. Closing one session leaves an empty slot
//! behind so the other indices keep their meaning until the next
//! enumeration.

use wpspec_core::error::Result;
use wpspec_core::transport::DeviceProvider;
use wpspec_core::DeviceFamily;

use crate::session::Spectrometer;

/// Owner of all open sessions
pub struct Registry<P: DeviceProvider> {
    provider: P,
    sessions: Vec<Option<Spectrometer<P::Transport>>>,
}

impl<P: DeviceProvider> Registry<P> {
    /// Create an empty registry over `provider`
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            sessions: Vec::new(),
        }
    }

    /// Close everything, then open every attached device
    ///
    /// Devices with an unknown product ID or that fail initialization are
    /// skipped. Returns the number of sessions opened.
    pub fn enumerate(&mut self) -> Result<usize> {
        self.close_all();

        for device in self.provider.open_all()? {
            let mut transport = device.transport;
            let Some(family) = DeviceFamily::from_pid(device.product_id) else {
                log::warn!("Skipping unsupported product 0x{:04X}", device.product_id);
                if let Err(e) = wpspec_core::Transport::release(&mut transport) {
                    log::warn!("Release failed: {}", e);
                }
                continue;
            };

            match Spectrometer::open(transport, family) {
                Ok(spec) => {
                    log::info!(
                        "Spectrometer {}: {} {}",
                        self.sessions.len(),
                        spec.model(),
                        spec.serial_number()
                    );
                    self.sessions.push(Some(spec));
                }
                Err(e) => log::warn!("Skipping {} spectrometer: {}", family, e),
            }
        }

        Ok(self.sessions.len())
    }

    /// Number of index slots from the last enumeration, closed ones included
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of sessions still open
    pub fn open_count(&self) -> usize {
        self.sessions.iter().flatten().count()
    }

    /// Look up an open session
    pub fn get(&self, index: usize) -> Option<&Spectrometer<P::Transport>> {
        self.sessions.get(index)?.as_ref()
    }

    /// Look up an open session mutably
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Spectrometer<P::Transport>> {
        self.sessions.get_mut(index)?.as_mut()
    }

    /// Open sessions with their indices
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Spectrometer<P::Transport>)> {
        self.sessions
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
    }

    /// Close one session, leaving its slot empty
    ///
    /// Returns `false` if no session is open at `index`.
    pub fn close(&mut self, index: usize) -> bool {
        let Some(mut spec) = self.sessions.get_mut(index).and_then(Option::take) else {
            return false;
        };
        if let Err(e) = spec.close() {
            log::warn!("Closing spectrometer {}: {}", index, e);
        }
        true
    }

    /// Close every session and forget all indices
    pub fn close_all(&mut self) {
        for index in 0..self.sessions.len() {
            self.close(index);
        }
        self.sessions.clear();
    }
}

impl<P: DeviceProvider> Drop for Registry<P> {
    fn drop(&mut self) {
        self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpspec_core::eeprom::PAGE_COUNT;
    use wpspec_dummy::{DummyConfig, DummyProvider, EepromImage};

    fn serial(n: usize) -> DummyConfig {
        DummyConfig::default()
            .with_eeprom(EepromImage::new(64).serial_number(&format!("SN-{}", n)))
    }

    #[test]
    fn test_enumerate_assigns_indices_in_order() {
        let mut registry = Registry::new(DummyProvider::new(vec![serial(0), serial(1), serial(2)]));
        assert_eq!(registry.enumerate().unwrap(), 3);
        for i in 0..3 {
            assert_eq!(registry.get(i).unwrap().serial_number(), format!("SN-{}", i));
        }
        assert!(registry.get(3).is_none());
    }

    #[test]
    fn test_close_keeps_other_indices() {
        let mut registry = Registry::new(DummyProvider::new(vec![serial(0), serial(1), serial(2)]));
        registry.enumerate().unwrap();

        assert!(registry.close(1));
        assert!(registry.get(1).is_none());
        assert_eq!(registry.get(0).unwrap().serial_number(), "SN-0");
        assert_eq!(registry.get(2).unwrap().serial_number(), "SN-2");
        assert_eq!(registry.count(), 3);
        assert_eq!(registry.open_count(), 2);

        // already closed
        assert!(!registry.close(1));
        assert!(!registry.close(99));
    }

    #[test]
    fn test_failed_device_is_skipped() {
        let broken = DummyConfig {
            readable_pages: PAGE_COUNT - 2,
            ..serial(1)
        };
        let unknown = DummyConfig {
            product_id: 0x3000,
            ..serial(9)
        };
        let mut registry = Registry::new(DummyProvider::new(vec![
            serial(0),
            broken,
            unknown,
            serial(2),
        ]));
        assert_eq!(registry.enumerate().unwrap(), 2);
        assert_eq!(registry.get(0).unwrap().serial_number(), "SN-0");
        assert_eq!(registry.get(1).unwrap().serial_number(), "SN-2");
    }

    #[test]
    fn test_close_all() {
        let mut registry = Registry::new(DummyProvider::new(vec![serial(0), serial(1)]));
        registry.enumerate().unwrap();
        registry.close_all();
        assert_eq!(registry.count(), 0);
        assert!(registry.get(0).is_none());
    }

    #[test]
    fn test_reenumerate() {
        let mut registry = Registry::new(DummyProvider::new(vec![serial(0), serial(1)]));
        registry.enumerate().unwrap();
        registry.close(0);
        assert_eq!(registry.enumerate().unwrap(), 2);
        assert!(registry.get(0).is_some());
        let indices: Vec<_> = registry.iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 1]);
    }
}
