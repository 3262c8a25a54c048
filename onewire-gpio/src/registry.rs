use crate::bus::OneWireBus;
use crate::port::GpioPort;
use embedded_hal::delay::DelayNs;

/// Conflicts and limits reported by the [`OneWireRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryError<E> {
    /// Pin setup failed in the underlying GPIO capability.
    Gpio(E),
    /// An addressless and a ROM-bound handle were requested for the same
    /// pin. The registry never lets the two coexist ambiguously; the
    /// request yields no handle.
    Conflict {
        /// The contested pin.
        pin: u8,
    },
    /// The fixed-capacity entry table is full.
    Capacity,
}

impl<E> From<E> for RegistryError<E> {
    fn from(other: E) -> Self {
        Self::Gpio(other)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
struct Entry {
    pin: u8,
    /// 0 = addressless bus entry.
    rom: u64,
}

/// Owner of the GPIO port, the delay provider and the per-pin bookkeeping.
///
/// Exactly one logical bus exists per pin for the registry's lifetime,
/// created lazily on first access and never destroyed. The registry
/// enforces uniqueness of the logical object, not mutual exclusion: handles
/// borrow the registry mutably, so concurrent access is ruled out at
/// compile time within one owner.
///
/// `N` is the entry capacity (buses plus bound devices).
pub struct OneWireRegistry<G, D, const N: usize> {
    gpio: G,
    delay: D,
    entries: heapless::Vec<Entry, N>,
}

impl<G: GpioPort, D: DelayNs, const N: usize> OneWireRegistry<G, D, N> {
    /// Takes ownership of the port and delay provider.
    pub fn new(gpio: G, delay: D) -> Self {
        Self {
            gpio,
            delay,
            entries: heapless::Vec::new(),
        }
    }

    /// Returns the addressless bus for `pin`, creating it on first access.
    ///
    /// # Errors
    /// [`RegistryError::Conflict`] if the pin already carries a ROM-bound
    /// handle, [`RegistryError::Capacity`] if the table is full.
    pub fn bus(&mut self, pin: u8) -> Result<OneWireBus<'_, G, D>, RegistryError<G::Error>> {
        self.entry(pin, 0)?;
        Ok(OneWireBus::new(&mut self.gpio, &mut self.delay, pin, 0))
    }

    /// Returns the handle bound to `(pin, rom)`, creating it on first
    /// access. Multiple bound handles may share one pin.
    ///
    /// # Errors
    /// [`RegistryError::Conflict`] if the pin already carries an
    /// addressless handle (or `rom` is 0 and the pin a bound one),
    /// [`RegistryError::Capacity`] if the table is full.
    pub fn device(
        &mut self,
        pin: u8,
        rom: u64,
    ) -> Result<OneWireBus<'_, G, D>, RegistryError<G::Error>> {
        self.entry(pin, rom)?;
        Ok(OneWireBus::new(&mut self.gpio, &mut self.delay, pin, rom))
    }

    /// Number of distinct registered handles.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&mut self, pin: u8, rom: u64) -> Result<(), RegistryError<G::Error>> {
        let wanted = Entry { pin, rom };
        if self.entries.iter().any(|e| *e == wanted) {
            return Ok(());
        }
        // Addressless and addressed handles must not coexist on one pin.
        if self
            .entries
            .iter()
            .any(|e| e.pin == pin && (e.rom == 0) != (rom == 0))
        {
            log::warn!(
                "onewire registry: pin {pin} already holds {} handle",
                if rom == 0 { "a ROM-bound" } else { "an addressless" }
            );
            return Err(RegistryError::Conflict { pin });
        }
        if !self.entries.iter().any(|e| e.pin == pin) {
            // One-time line setup: open-drain with pull-up, idling released.
            self.gpio.configure_open_drain(pin)?;
        }
        self.entries
            .push(wanted)
            .map_err(|_| RegistryError::Capacity)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{OneWireRegistry, RegistryError};
    use crate::port::{Direction, GpioPort};
    use embedded_hal_mock::eh1::delay::NoopDelay;

    /// Records configuration calls; the line itself always reads high.
    #[derive(Default)]
    struct StubPort {
        configured: Vec<u8>,
    }

    impl GpioPort for StubPort {
        type Error = core::convert::Infallible;

        fn configure_open_drain(&mut self, pin: u8) -> Result<(), Self::Error> {
            self.configured.push(pin);
            Ok(())
        }

        fn set_direction(&mut self, _pin: u8, _direction: Direction) -> Result<(), Self::Error> {
            Ok(())
        }

        fn set_level(&mut self, _pin: u8, _high: bool) -> Result<(), Self::Error> {
            Ok(())
        }

        fn level(&mut self, _pin: u8) -> Result<bool, Self::Error> {
            Ok(true)
        }
    }

    fn registry() -> OneWireRegistry<StubPort, NoopDelay, 4> {
        OneWireRegistry::new(StubPort::default(), NoopDelay::new())
    }

    #[test]
    fn bus_is_created_once_per_pin() {
        let mut reg = registry();
        assert_eq!(reg.bus(4).unwrap().pin(), 4);
        assert_eq!(reg.bus(4).unwrap().pin(), 4);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.gpio.configured, vec![4]);
    }

    #[test]
    fn distinct_roms_are_distinct_handles() {
        let mut reg = registry();
        assert_eq!(reg.device(4, 0x11).unwrap().rom(), 0x11);
        assert_eq!(reg.device(4, 0x22).unwrap().rom(), 0x22);
        assert_eq!(reg.device(4, 0x11).unwrap().rom(), 0x11);
        assert_eq!(reg.len(), 2);
        // Shared pin is configured exactly once.
        assert_eq!(reg.gpio.configured, vec![4]);
    }

    #[test]
    fn addressless_after_bound_is_a_conflict() {
        let mut reg = registry();
        reg.device(4, 0x11).unwrap();
        assert!(matches!(
            reg.bus(4),
            Err(RegistryError::Conflict { pin: 4 })
        ));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn bound_after_addressless_is_a_conflict() {
        let mut reg = registry();
        reg.bus(4).unwrap();
        assert!(matches!(
            reg.device(4, 0x11),
            Err(RegistryError::Conflict { pin: 4 })
        ));
    }

    #[test]
    fn separate_pins_do_not_interact() {
        let mut reg = registry();
        reg.bus(4).unwrap();
        reg.device(5, 0x11).unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.gpio.configured, vec![4, 5]);
    }

    #[test]
    fn capacity_is_reported() {
        let mut reg: OneWireRegistry<StubPort, NoopDelay, 2> =
            OneWireRegistry::new(StubPort::default(), NoopDelay::new());
        reg.bus(1).unwrap();
        reg.bus(2).unwrap();
        assert!(matches!(reg.bus(3), Err(RegistryError::Capacity)));
    }
}
