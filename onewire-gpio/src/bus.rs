use crate::port::{GpioPort, Line};
use embedded_hal::delay::DelayNs;
use onewire_core::{OneWire, OneWireResult};

// Reset/presence handshake, 960 µs in total regardless of outcome.
const RESET_LOW_US: u32 = 480;
const RESET_SAMPLE_US: u32 = 70;
const RESET_TAIL_US: u32 = 410;

// Every bit slot is 70 µs regardless of value, so listening devices stay
// synchronized to a constant-rate clock.
const WRITE_1_LOW_US: u32 = 6;
const WRITE_1_RELEASE_US: u32 = 64;
const WRITE_0_LOW_US: u32 = 60;
const WRITE_0_RELEASE_US: u32 = 10;
const READ_INIT_US: u32 = 6;
const READ_SAMPLE_US: u32 = 15;
const READ_TAIL_US: u32 = 49;

/// Bit-banged 1-Wire bus on one GPIO pin.
///
/// Borrows the port and delay from the [registry](crate::OneWireRegistry)
/// that created it; the pin and the optionally bound ROM identifier are
/// immutable for the handle's lifetime. All transfer state is transient,
/// held on the call stack during an operation.
pub struct OneWireBus<'a, G, D> {
    line: Line<'a, G, D>,
    rom: u64,
}

impl<'a, G: GpioPort, D: DelayNs> OneWireBus<'a, G, D> {
    pub(crate) fn new(gpio: &'a mut G, delay: &'a mut D, pin: u8, rom: u64) -> Self {
        Self {
            line: Line::new(gpio, delay, pin),
            rom,
        }
    }

    /// The physical pin of this bus.
    pub fn pin(&self) -> u8 {
        self.line.pin()
    }

    /// The bound ROM identifier; 0 for an addressless bus handle.
    pub fn rom(&self) -> u64 {
        self.rom
    }

    /// Selects this handle's target ahead of a device-specific command:
    /// match-ROM for a bound handle, skip-ROM for an addressless one.
    pub fn select(&mut self) -> OneWireResult<(), G::Error> {
        if self.rom == 0 {
            self.address(None)
        } else {
            self.address(Some(self.rom))
        }
    }
}

impl<G: GpioPort, D: DelayNs> OneWire for OneWireBus<'_, G, D> {
    type BusError = G::Error;

    fn reset(&mut self) -> OneWireResult<bool, Self::BusError> {
        self.line.drive_low()?;
        self.line.delay_us(RESET_LOW_US);
        self.line.release_to_input()?;
        self.line.delay_us(RESET_SAMPLE_US);
        // A device holding the line low here is the presence pulse.
        let presence = !self.line.sample()?;
        self.line.delay_us(RESET_TAIL_US);
        self.line.restore_output()?;
        Ok(presence)
    }

    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError> {
        self.line.drive_low()?;
        if bit {
            self.line.delay_us(WRITE_1_LOW_US);
            self.line.release()?;
            self.line.delay_us(WRITE_1_RELEASE_US);
        } else {
            self.line.delay_us(WRITE_0_LOW_US);
            self.line.release()?;
            self.line.delay_us(WRITE_0_RELEASE_US);
        }
        Ok(())
    }

    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError> {
        self.line.drive_low()?;
        self.line.delay_us(READ_INIT_US);
        // Input mode only after the init pulse; a device sending 0 holds
        // the line low through the sample point, a device sending 1 lets
        // it float back to the pull-up.
        self.line.release_to_input()?;
        self.line.delay_us(READ_SAMPLE_US);
        let bit = self.line.sample()?;
        // Wait out the remainder of the slot before going output-capable
        // again for the next one.
        self.line.delay_us(READ_TAIL_US);
        self.line.restore_output()?;
        Ok(bit)
    }
}
