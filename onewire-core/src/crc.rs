/// Incremental Dallas CRC-8 (polynomial `0b1_0001_1001`, reflected 0x8c)
/// as used for ROM identifiers and scratchpad payloads.
#[derive(Debug, Default)]
pub struct RomCrc(u8);

impl RomCrc {
    /// Current CRC value.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Update the CRC with one incoming byte.
    pub fn update(&mut self, byte: u8) {
        let mut crc = self.0 ^ byte;
        for _ in 0..8 {
            if crc & 0x1 == 0x1 {
                crc = (crc >> 1) ^ 0x8c;
            } else {
                crc >>= 1;
            }
        }
        self.0 = crc;
    }

    /// Validate a byte sequence whose last byte is the CRC of the preceding
    /// ones. Folding the CRC byte into the register leaves zero on success.
    pub fn validate(sequence: &[u8]) -> bool {
        let mut crc = RomCrc(0);
        for &byte in sequence {
            crc.update(byte);
        }
        crc.0 == 0x0
    }
}
