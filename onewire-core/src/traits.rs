use crate::{
    ONEWIRE_MATCH_ROM_CMD, ONEWIRE_READ_ROM_CMD, ONEWIRE_SKIP_ROM_CMD, OneWireError,
    OneWireResult, crc::RomCrc,
};

/// Contract of a 1-Wire bus timing engine.
///
/// Implementors provide the three time-slot primitives: the reset/presence
/// handshake and single-bit transfers. All three are synchronous and return
/// only after the full slot budget has elapsed, leaving the line safe for
/// the next slot to begin immediately. The byte codec and the ROM
/// addressing commands are provided methods layered on top.
///
/// The bus is a shared physical resource with no internal locking; `&mut`
/// receivers make single-owner access per bus a compile-time property.
pub trait OneWire {
    /// Error type of the underlying line driver.
    type BusError;

    /// Resets the bus and samples for a presence pulse.
    ///
    /// Returns `Ok(true)` if at least one device answered. On `Ok(false)`
    /// the caller must treat the bus as empty for this cycle; no further
    /// bit operations are attempted.
    fn reset(&mut self) -> OneWireResult<bool, Self::BusError>;

    /// Transfers one bit in a write time slot.
    fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError>;

    /// Transfers one bit in a read time slot.
    fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError>;

    /// Emits a byte as 8 write slots, least significant bit first.
    ///
    /// Byte boundaries are a caller convention, not signaled on the wire.
    fn write_byte(&mut self, byte: u8) -> OneWireResult<(), Self::BusError> {
        let mut byte = byte;
        for _ in 0..8 {
            self.write_bit(byte & 0x1 == 0x1)?;
            byte >>= 1;
        }
        Ok(())
    }

    /// Accumulates a byte from 8 read slots, least significant bit first.
    fn read_byte(&mut self) -> OneWireResult<u8, Self::BusError> {
        let mut value = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                value |= 1 << i;
            }
        }
        Ok(value)
    }

    /// Addresses devices on the bus ahead of a device-specific command.
    ///
    /// `Some(rom)` issues match-ROM followed by the 8 ROM bytes, so only
    /// the matching device keeps listening. `None` issues skip-ROM, which
    /// addresses every device at once and is only meaningful on a
    /// single-device bus or for broadcast commands.
    ///
    /// # Errors
    /// [`OneWireError::NoDevicePresent`] if the reset saw no presence pulse.
    fn address(&mut self, rom: Option<u64>) -> OneWireResult<(), Self::BusError> {
        if !self.reset()? {
            return Err(OneWireError::NoDevicePresent);
        }
        if let Some(rom) = rom {
            self.write_byte(ONEWIRE_MATCH_ROM_CMD)?;
            for &b in rom.to_le_bytes().iter() {
                self.write_byte(b)?;
            }
        } else {
            self.write_byte(ONEWIRE_SKIP_ROM_CMD)?;
        }
        Ok(())
    }

    /// Reads the ROM identifier of the single device on the bus.
    ///
    /// Valid only when exactly one device is present; with several devices
    /// the open-drain AND of their replies produces garbage, which the CRC
    /// check rejects.
    ///
    /// # Errors
    /// [`OneWireError::NoDevicePresent`] without a presence pulse,
    /// [`OneWireError::InvalidCrc`] if the identifier fails its CRC.
    fn read_rom(&mut self) -> OneWireResult<u64, Self::BusError> {
        if !self.reset()? {
            return Err(OneWireError::NoDevicePresent);
        }
        self.write_byte(ONEWIRE_READ_ROM_CMD)?;
        let mut rom = [0u8; 8];
        for b in rom.iter_mut() {
            *b = self.read_byte()?;
        }
        if !RomCrc::validate(&rom) {
            return Err(OneWireError::InvalidCrc);
        }
        Ok(u64::from_le_bytes(rom))
    }
}

#[cfg(test)]
mod tests {
    use super::OneWire;
    use crate::{OneWireError, OneWireResult};
    use std::collections::VecDeque;

    /// Loop-back fixture: written bits queue up and are replayed by read
    /// slots in order.
    #[derive(Default)]
    struct Loopback {
        bits: VecDeque<bool>,
        presence: bool,
    }

    impl OneWire for Loopback {
        type BusError = core::convert::Infallible;

        fn reset(&mut self) -> OneWireResult<bool, Self::BusError> {
            self.bits.clear();
            Ok(self.presence)
        }

        fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError> {
            self.bits.push_back(bit);
            Ok(())
        }

        fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError> {
            // An idle open-drain line reads high.
            Ok(self.bits.pop_front().unwrap_or(true))
        }
    }

    #[test]
    fn byte_codec_round_trips_all_values() {
        let mut bus = Loopback::default();
        for value in 0u8..=255 {
            bus.write_byte(value).unwrap();
            assert_eq!(bus.read_byte().unwrap(), value);
        }
    }

    #[test]
    fn bytes_are_emitted_lsb_first() {
        let mut bus = Loopback::default();
        bus.write_byte(0b1000_0001).unwrap();
        let bits: Vec<bool> = bus.bits.iter().copied().collect();
        assert_eq!(
            bits,
            [true, false, false, false, false, false, false, true]
        );
    }

    #[test]
    fn address_requires_presence() {
        let mut bus = Loopback::default();
        assert_eq!(
            bus.address(None).unwrap_err(),
            OneWireError::NoDevicePresent
        );
    }

    #[test]
    fn match_rom_sends_command_then_rom_lsb_first() {
        let mut bus = Loopback {
            presence: true,
            ..Default::default()
        };
        let rom = 0x0102_0304_0506_0708u64;
        bus.address(Some(rom)).unwrap();
        // 9 bytes on the wire: 0x55 then the ROM bytes, LSB first.
        let mut seen = Vec::new();
        while !bus.bits.is_empty() {
            seen.push(bus.read_byte().unwrap());
        }
        let mut expect = vec![crate::ONEWIRE_MATCH_ROM_CMD];
        expect.extend_from_slice(&rom.to_le_bytes());
        assert_eq!(seen, expect);
    }

    #[test]
    fn skip_rom_sends_single_command_byte() {
        let mut bus = Loopback {
            presence: true,
            ..Default::default()
        };
        bus.address(None).unwrap();
        assert_eq!(bus.read_byte().unwrap(), crate::ONEWIRE_SKIP_ROM_CMD);
        assert!(bus.bits.is_empty());
    }
}
