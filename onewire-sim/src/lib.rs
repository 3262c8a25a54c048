//! # onewire-sim
//!
//! Deterministic, GPIO-level simulation of the single-wire protocols.
//!
//! A [`SimNet`] models a microsecond clock and a set of open-drain pins.
//! Time advances only through the handed-out [`SimDelay`] (and through
//! [`SimNet::advance_us`] between state-machine ticks), so every run is
//! reproducible to the microsecond.
//!
//! The master side talks to the net through [`SimPort`]
//! (a [`GpioPort`](onewire_gpio::GpioPort) implementation). The device side
//! is event-driven: whenever the master releases the line, the elapsed
//! low time classifies the slot (reset, write-0, write-1 or read-slot
//! start), and the pin's attached behavior reacts by scheduling pull-low
//! windows on the shared timeline:
//!
//! - [`SimNet::attach_slaves`]: a group of 1-Wire slaves with real
//!   search/match/read-ROM semantics, including open-drain AND during
//!   search passes;
//! - [`SimNet::attach_echo`]: a loop-back responder replaying written bits
//!   on read slots;
//! - [`SimNet::attach_dht`]: a scripted DHT11/DHT22 answer waveform.

mod dht;
mod net;
mod slave;

pub use dht::DhtScript;
pub use net::{SimClock, SimDelay, SimNet, SimPort};
pub use slave::Selection;
