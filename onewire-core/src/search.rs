use crate::{ONEWIRE_SEARCH_CMD, OneWire, OneWireError, crc::RomCrc};

/// State of a device enumeration on a 1-Wire bus.
///
/// The search walks the 64-bit ROM address space as a binary tree, one
/// device per pass, using only the bus's open-drain AND behavior to detect
/// bit positions where the still-participating devices disagree. State
/// lives only for the duration of one enumeration; drop the value once
/// [next](OneWireSearch::next) returns `None`.
pub struct OneWireSearch<'a, T> {
    onewire: &'a mut T,
    last_device: bool,
    /// Bit position (1-64) of the unresolved 0-branch from the previous
    /// pass; 0 means none.
    last_discrepancy: u8,
    family: u8,
    rom: [u8; 8],
}

impl<'a, T> OneWireSearch<'a, T> {
    /// Creates a search that enumerates every device on the bus.
    pub fn new(onewire: &'a mut T) -> Self {
        Self {
            onewire,
            last_device: false,
            last_discrepancy: 0,
            family: 0,
            rom: [0; 8],
        }
    }

    /// Creates a search restricted to one family code.
    ///
    /// The first pass forces the seeded family bits (target setup), so the
    /// traversal starts inside the family's subtree and stops as soon as it
    /// leaves it.
    pub fn with_family(onewire: &'a mut T, family: u8) -> Self {
        Self {
            onewire,
            last_device: false,
            last_discrepancy: 64,
            family,
            rom: [family, 0, 0, 0, 0, 0, 0, 0],
        }
    }

    fn reset_state(&mut self) {
        self.last_device = false;
        self.last_discrepancy = 0;
        self.rom = [self.family, 0, 0, 0, 0, 0, 0, 0];
    }
}

impl<T: OneWire> OneWireSearch<'_, T> {
    /// Runs one search pass and returns the next ROM identifier, or `None`
    /// once the bus is exhausted (or was empty to begin with).
    ///
    /// One pass resolves exactly one device; call repeatedly until `None`.
    /// Discovery order is traversal order of the address tree, not sorted.
    ///
    /// | Bit | Description |
    /// |-----|-------------|
    /// | 0-7 | Family code |
    /// | 8-55 | 48-bit serial number |
    /// | 56-63 | CRC-8 (`0b1_0001_1001` poly) |
    ///
    /// # Errors
    /// [`OneWireError::SearchFault`] when a bit and its complement both read
    /// 1 mid-pass (wiring fault or noise; identifiers returned by earlier
    /// passes remain valid), [`OneWireError::InvalidCrc`] when the resolved
    /// identifier fails its CRC.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<Option<u64>, OneWireError<T::BusError>> {
        if self.last_device {
            return Ok(None);
        }
        if !self.onewire.reset()? {
            // An empty bus is not a fault: there is nothing (more) to find.
            return Ok(None);
        }
        self.onewire.write_byte(ONEWIRE_SEARCH_CMD)?;
        let mut id_bit_num: u8 = 1;
        let mut last_zero: u8 = 0;
        let mut idx: usize = 0; // Index in the ROM array
        let mut rom_mask: u8 = 1; // Mask for the current bit in the ROM byte
        loop {
            let id_bit = self.onewire.read_bit()?;
            let complement_bit = self.onewire.read_bit()?;
            let set = match (id_bit, complement_bit) {
                // No device responded for this position.
                (true, true) => {
                    if self.family != 0 {
                        // The forced family prefix matched nothing.
                        return Ok(None);
                    }
                    return Err(OneWireError::SearchFault);
                }
                // All participating devices agree; the bit value wins.
                (bit, complement) if bit != complement => bit,
                // Discrepancy: both branches are populated. Re-use the
                // previous pass's choice below its recorded discrepancy,
                // take the 1-branch exactly at it (the 0-branch is already
                // exhausted), else take the 0-branch and remember the
                // position for a later pass.
                _ => {
                    let dir = if id_bit_num < self.last_discrepancy {
                        self.rom[idx] & rom_mask > 0
                    } else {
                        id_bit_num == self.last_discrepancy
                    };
                    if !dir {
                        last_zero = id_bit_num;
                    }
                    dir
                }
            };
            if set {
                self.rom[idx] |= rom_mask;
            } else {
                self.rom[idx] &= !rom_mask;
            }
            // Writing the chosen bit drops every device whose ROM differs
            // here from the rest of this pass.
            self.onewire.write_bit(set)?;

            id_bit_num += 1;
            rom_mask <<= 1;
            if rom_mask == 0 {
                idx += 1;
                rom_mask = 1;
            }
            if id_bit_num > 64 {
                self.last_discrepancy = last_zero;
                self.last_device = self.last_discrepancy == 0;
                break;
            }
        }
        if !RomCrc::validate(&self.rom) {
            return Err(OneWireError::InvalidCrc);
        }
        if self.family != 0 && self.rom[0] != self.family {
            // Walked past the family's subtree.
            return Ok(None);
        }
        Ok(Some(u64::from_le_bytes(self.rom)))
    }

    /// Checks whether the device with the given ROM identifier is present.
    ///
    /// Resets the search state; a following [next](OneWireSearch::next)
    /// starts a fresh enumeration.
    pub fn verify(&mut self, rom: u64) -> Result<bool, OneWireError<T::BusError>> {
        self.reset_state();
        self.rom = rom.to_le_bytes();
        self.last_discrepancy = 64;
        let res = self.next()?;
        self.reset_state();
        Ok(res == Some(rom))
    }
}

#[cfg(test)]
mod tests {
    use super::OneWireSearch;
    use crate::{OneWire, OneWireError, OneWireResult, Rom};

    /// Bit-level model of a bus populated with a set of ROMs. Read slots
    /// present the open-drain AND of the participating devices' bits;
    /// written search bits drop mismatching devices from the pass.
    struct FakeBus {
        roms: Vec<u64>,
        phase: Phase,
        /// Devices stop answering once the search reaches this bit
        /// position, forcing the (1,1) fault case.
        mute_from_bit: Option<u8>,
    }

    enum Phase {
        Idle,
        Command {
            acc: u8,
            nbits: u8,
        },
        Search {
            bit: u8,
            /// 0 = true bit slot, 1 = complement slot, 2 = direction write.
            sub: u8,
            participating: Vec<bool>,
        },
    }

    impl FakeBus {
        fn new(roms: &[u64]) -> Self {
            Self {
                roms: roms.to_vec(),
                phase: Phase::Idle,
                mute_from_bit: None,
            }
        }

        fn rom_bit(rom: u64, bit: u8) -> bool {
            rom >> bit & 1 == 1
        }

        fn collect(&mut self) -> Result<Vec<u64>, OneWireError<core::convert::Infallible>> {
            let mut search = OneWireSearch::new(self);
            let mut found = Vec::new();
            while let Some(rom) = search.next()? {
                found.push(rom);
            }
            Ok(found)
        }
    }

    impl OneWire for FakeBus {
        type BusError = core::convert::Infallible;

        fn reset(&mut self) -> OneWireResult<bool, Self::BusError> {
            self.phase = Phase::Command { acc: 0, nbits: 0 };
            Ok(!self.roms.is_empty())
        }

        fn write_bit(&mut self, bit: bool) -> OneWireResult<(), Self::BusError> {
            let roms = &self.roms;
            match &mut self.phase {
                Phase::Command { acc, nbits } => {
                    if bit {
                        *acc |= 1 << *nbits;
                    }
                    *nbits += 1;
                    let complete = (*nbits == 8).then_some(*acc);
                    if let Some(cmd) = complete {
                        self.phase = if cmd == crate::ONEWIRE_SEARCH_CMD {
                            Phase::Search {
                                bit: 0,
                                sub: 0,
                                participating: vec![true; roms.len()],
                            }
                        } else {
                            Phase::Idle
                        };
                    }
                }
                Phase::Search {
                    bit: pos,
                    sub,
                    participating,
                } => {
                    assert_eq!(*sub, 2, "direction bit written out of order");
                    for (p, rom) in participating.iter_mut().zip(roms) {
                        if *p && Self::rom_bit(*rom, *pos) != bit {
                            *p = false;
                        }
                    }
                    *pos += 1;
                    *sub = 0;
                }
                Phase::Idle => {}
            }
            Ok(())
        }

        fn read_bit(&mut self) -> OneWireResult<bool, Self::BusError> {
            let roms = &self.roms;
            let mute_from = self.mute_from_bit;
            match &mut self.phase {
                Phase::Search {
                    bit,
                    sub,
                    participating,
                } => {
                    let muted = mute_from.is_some_and(|m| *bit >= m);
                    let any = |wanted: bool| {
                        !muted
                            && participating
                                .iter()
                                .zip(roms)
                                .any(|(p, rom)| *p && Self::rom_bit(*rom, *bit) == wanted)
                    };
                    let level = match *sub {
                        0 => !any(false), // some device pulls low for a 0 bit
                        1 => !any(true),  // complement slot
                        _ => panic!("read slot during direction write"),
                    };
                    *sub += 1;
                    Ok(level)
                }
                _ => Ok(true),
            }
        }
    }

    #[test]
    fn single_device_found_in_one_pass() {
        let rom = Rom::new(0x28, 0xbeef).raw();
        let mut bus = FakeBus::new(&[rom]);
        let mut search = OneWireSearch::new(&mut bus);
        assert_eq!(search.next().unwrap(), Some(rom));
        // No discrepancy was recorded, so the pass also proved completion.
        assert_eq!(search.last_discrepancy, 0);
        assert!(search.last_device);
        assert_eq!(search.next().unwrap(), None);
    }

    #[test]
    fn empty_bus_yields_nothing() {
        assert!(FakeBus::new(&[]).collect().unwrap().is_empty());
    }

    #[test]
    fn common_prefix_pair_is_fully_enumerated() {
        let a = Rom::new(0x28, 0x01).raw();
        let b = Rom::new(0x28, 0x02).raw();
        let mut found = FakeBus::new(&[a, b]).collect().unwrap();
        found.sort_unstable();
        let mut expect = vec![a, b];
        expect.sort_unstable();
        assert_eq!(found, expect);
    }

    #[test]
    fn larger_population_no_duplicates_no_omissions() {
        let roms: Vec<u64> = [0x1u64, 0x2, 0x3, 0x100, 0xf00d, 0xffff_ffff_ffff]
            .iter()
            .map(|&s| Rom::new(0x28, s).raw())
            .collect();
        let mut found = FakeBus::new(&roms).collect().unwrap();
        found.sort_unstable();
        let mut expect = roms.clone();
        expect.sort_unstable();
        assert_eq!(found, expect);
    }

    #[test]
    fn mixed_families_enumerate_together() {
        let roms = vec![
            Rom::new(0x10, 7).raw(),
            Rom::new(0x22, 7).raw(),
            Rom::new(0x28, 7).raw(),
        ];
        let mut found = FakeBus::new(&roms).collect().unwrap();
        found.sort_unstable();
        let mut expect = roms.clone();
        expect.sort_unstable();
        assert_eq!(found, expect);
    }

    #[test]
    fn family_filter_restricts_results() {
        let wanted = Rom::new(0x28, 0x55).raw();
        let other = Rom::new(0x10, 0x55).raw();
        let mut bus = FakeBus::new(&[wanted, other]);
        let mut search = OneWireSearch::with_family(&mut bus, 0x28);
        let mut found = Vec::new();
        while let Some(rom) = search.next().unwrap() {
            found.push(rom);
        }
        assert_eq!(found, vec![wanted]);
    }

    #[test]
    fn absent_family_yields_nothing() {
        let mut bus = FakeBus::new(&[Rom::new(0x10, 1).raw()]);
        let mut search = OneWireSearch::with_family(&mut bus, 0x28);
        assert_eq!(search.next().unwrap(), None);
    }

    #[test]
    fn muted_devices_abort_the_pass() {
        let mut bus = FakeBus::new(&[Rom::new(0x28, 1).raw(), Rom::new(0x28, 2).raw()]);
        bus.mute_from_bit = Some(12);
        let mut search = OneWireSearch::new(&mut bus);
        assert_eq!(search.next().unwrap_err(), OneWireError::SearchFault);
    }

    #[test]
    fn corrupted_rom_fails_crc() {
        // Valid ROM with its CRC byte clobbered.
        let rom = Rom::new(0x28, 3).raw() ^ (0xffu64 << 56);
        let mut bus = FakeBus::new(&[rom]);
        let mut search = OneWireSearch::new(&mut bus);
        assert_eq!(search.next().unwrap_err(), OneWireError::InvalidCrc);
    }

    #[test]
    fn verify_distinguishes_present_from_absent() {
        let present = Rom::new(0x28, 0xaa).raw();
        let absent = Rom::new(0x28, 0xab).raw();
        let mut bus = FakeBus::new(&[present]);
        let mut search = OneWireSearch::new(&mut bus);
        assert!(search.verify(present).unwrap());
        assert!(!search.verify(absent).unwrap());
    }
}
