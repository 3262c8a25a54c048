use embedded_hal::delay::DelayNs;

/// Direction of an open-drain pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// High-impedance; the line floats to the external pull-up unless a
    /// device pulls it low.
    Input,
    /// Output-capable. In open-drain mode the master can only pull the
    /// line low or release it; it never drives it high.
    Output,
}

/// Pin-level GPIO capability consumed by the protocol engines.
///
/// Implementations map these calls onto a vendor HAL (or a simulation).
/// Pins are identified by number; the capability covers every pin the
/// process may use, so one port object can back several buses.
pub trait GpioPort {
    /// Hardware error type.
    type Error;

    /// One-time pin setup: open-drain output with the pull-up enabled,
    /// idling high (released).
    fn configure_open_drain(&mut self, pin: u8) -> Result<(), Self::Error>;

    /// Switches the pin between input and output-capable mode.
    fn set_direction(&mut self, pin: u8, direction: Direction) -> Result<(), Self::Error>;

    /// Drives the pin low (`false`) or releases it to the pull-up (`true`).
    fn set_level(&mut self, pin: u8, high: bool) -> Result<(), Self::Error>;

    /// Samples the pin level.
    fn level(&mut self, pin: u8) -> Result<bool, Self::Error>;
}

/// One open-drain line: a pin plus borrowed port and delay access.
///
/// Both the 1-Wire timing engine and the DHT protocol drive their wire
/// through this helper; they differ only in timing constants and framing.
pub struct Line<'a, G, D> {
    gpio: &'a mut G,
    delay: &'a mut D,
    pin: u8,
}

impl<'a, G: GpioPort, D: DelayNs> Line<'a, G, D> {
    /// Wraps a pin of an already configured port.
    pub fn new(gpio: &'a mut G, delay: &'a mut D, pin: u8) -> Self {
        Self { gpio, delay, pin }
    }

    /// The pin this line drives.
    pub fn pin(&self) -> u8 {
        self.pin
    }

    /// Pulls the line low as an output.
    pub fn drive_low(&mut self) -> Result<(), G::Error> {
        self.gpio.set_direction(self.pin, Direction::Output)?;
        self.gpio.set_level(self.pin, false)
    }

    /// Releases the line to the pull-up while staying output-capable.
    pub fn release(&mut self) -> Result<(), G::Error> {
        self.gpio.set_level(self.pin, true)
    }

    /// Releases the line by switching to input mode, ready for sampling.
    pub fn release_to_input(&mut self) -> Result<(), G::Error> {
        self.gpio.set_direction(self.pin, Direction::Input)
    }

    /// Returns to released, output-capable mode after a read window.
    ///
    /// The level is raised before the direction switch so the line is never
    /// driven low in passing.
    pub fn restore_output(&mut self) -> Result<(), G::Error> {
        self.gpio.set_level(self.pin, true)?;
        self.gpio.set_direction(self.pin, Direction::Output)
    }

    /// Samples the current line level.
    pub fn sample(&mut self) -> Result<bool, G::Error> {
        self.gpio.level(self.pin)
    }

    /// Busy-waits for the given number of microseconds.
    pub fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    /// Polls at 1 µs resolution until the line reads `high`, up to
    /// `timeout_us`. Returns the elapsed time on success, `None` on
    /// timeout.
    pub fn wait_for(&mut self, high: bool, timeout_us: u32) -> Result<Option<u32>, G::Error> {
        let mut elapsed = 0;
        loop {
            if self.sample()? == high {
                return Ok(Some(elapsed));
            }
            if elapsed >= timeout_us {
                return Ok(None);
            }
            self.delay.delay_us(1);
            elapsed += 1;
        }
    }
}
