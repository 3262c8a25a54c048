use crate::crc::RomCrc;

/// View over a 64-bit ROM identifier.
///
/// Wire layout, transmitted LSB first:
///
/// | Bits  | Field |
/// |-------|-------|
/// | 0-7   | Family code (e.g. 0x28 for DS18B20) |
/// | 8-55  | 48-bit serial number |
/// | 56-63 | CRC-8 over the previous 7 bytes |
///
/// The all-zero value means "addressless": a bus operated in skip-ROM,
/// single-device mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rom(u64);

impl Rom {
    /// Build a ROM identifier from a family code and a 48-bit serial,
    /// computing the CRC byte. Serial bits above 48 are discarded.
    pub fn new(family: u8, serial: u64) -> Self {
        let mut bytes = [0u8; 8];
        bytes[0] = family;
        bytes[1..7].copy_from_slice(&serial.to_le_bytes()[..6]);
        let mut crc = RomCrc::default();
        for &b in &bytes[..7] {
            crc.update(b);
        }
        bytes[7] = crc.value();
        Self(u64::from_le_bytes(bytes))
    }

    /// Wrap a raw 64-bit identifier without validating it.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw 64-bit value.
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Family code byte.
    pub const fn family(&self) -> u8 {
        self.0 as u8
    }

    /// 48-bit serial number.
    pub const fn serial(&self) -> u64 {
        (self.0 >> 8) & 0xffff_ffff_ffff
    }

    /// CRC byte as transmitted by the device.
    pub const fn crc(&self) -> u8 {
        (self.0 >> 56) as u8
    }

    /// True if the CRC byte matches the family and serial bytes.
    pub fn is_valid(&self) -> bool {
        RomCrc::validate(&self.0.to_le_bytes())
    }

    /// True for the all-zero, addressless identifier.
    pub const fn is_addressless(&self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Rom {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}
