#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

/*! # dht-sensor
 *
 * DHT11/DHT22 single-wire protocol engine, bit-banged over the same
 * [`Line`](onewire_gpio::Line) primitives as the 1-Wire master. The DHT
 * family shares the open-drain idea but uses its own timing constants, a
 * single device per line and no ROM addressing.
 *
 * One state machine backs two APIs: a blocking read that drives the
 * transitions in a tight loop, and a non-blocking request/tick/has/get
 * surface for cooperative schedulers. A read cycle is single-flight; a
 * second request while one is in progress is rejected.
 *
 * The two sensor variants differ only in constants and payload
 * interpretation, so they are a configuration value ([`DhtKind`]), not
 * separate types.
 */

mod sensor;
mod variant;

pub use sensor::{DhtSensor, DhtState};
pub use variant::DhtKind;

/// Monotonic microsecond clock for the state machine's deadlines.
///
/// Any source is fine as long as it never runs backwards; absolute zero is
/// meaningless, only differences are used.
pub trait Monotonic {
    /// Current time in microseconds.
    fn now_us(&mut self) -> u64;
}
