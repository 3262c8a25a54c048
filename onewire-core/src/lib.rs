#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]
//! # onewire-core
//! Platform-independent core of a bit-banged 1-Wire master.
//!
//! This crate defines the [OneWire] trait, the contract a timing engine must
//! fulfill (reset/presence handshake plus single-bit transfers), and layers
//! the byte codec and the ROM addressing commands on top of it as provided
//! methods. The [OneWireSearch] struct implements the collision-resolving
//! device-enumeration algorithm that discovers every ROM identifier sharing
//! a bus, using nothing but the bus's open-drain AND behavior.
//!
//! Hardware access lives elsewhere; any type driving a physical (or
//! simulated) line implements [OneWire] and gets the codec, the addressing
//! layer and the search for free.

mod crc;
mod error;
mod rom;
mod search;
mod traits;

pub use crc::RomCrc;
pub use error::OneWireError;
pub use rom::Rom;
pub use search::OneWireSearch;
pub use traits::OneWire;

/// Result alias for 1-Wire operations.
pub type OneWireResult<T, E> = Result<T, OneWireError<E>>;

/// Read-ROM command: the single device on the bus replies with its 64-bit
/// ROM identifier. Valid only when exactly one device is present.
pub const ONEWIRE_READ_ROM_CMD: u8 = 0x33;

/// Match-ROM command: followed by 8 ROM bytes, selects exactly the matching
/// device; all others release the line until the next reset.
pub const ONEWIRE_MATCH_ROM_CMD: u8 = 0x55;

/// Skip-ROM command: addresses all devices at once. Only meaningful with a
/// single device or when every device is to receive the same command.
pub const ONEWIRE_SKIP_ROM_CMD: u8 = 0xcc;

/// Search-ROM command: starts one pass of the enumeration algorithm.
pub const ONEWIRE_SEARCH_CMD: u8 = 0xf0;
