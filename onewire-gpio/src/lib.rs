#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

/*! # onewire-gpio
 *
 * Bit-banged implementation of the [`OneWire`](onewire_core::OneWire)
 * timing engine over a pin-level GPIO capability.
 *
 * The hardware side is abstracted as [`GpioPort`]: set a pin's direction,
 * drive it low or release it to the pull-up, and sample its level. Delays
 * come from [`DelayNs`](embedded_hal::delay::DelayNs). Everything here
 * busy-waits for its full microsecond budget on the calling thread; timing
 * precision is the correctness property, so nothing yields mid-slot.
 *
 * [`OneWireRegistry`] keeps the one-bus-per-pin and one-handle-per-ROM
 * bookkeeping, constructing buses lazily and reporting conflicts as values
 * instead of logging and returning nothing.
 */

mod bus;
mod port;
mod registry;

pub use bus::OneWireBus;
pub use port::{Direction, GpioPort, Line};
pub use registry::{OneWireRegistry, RegistryError};
