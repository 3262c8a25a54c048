use onewire_core::{
    ONEWIRE_MATCH_ROM_CMD, ONEWIRE_READ_ROM_CMD, ONEWIRE_SEARCH_CMD, ONEWIRE_SKIP_ROM_CMD,
};

/// Which device(s) the last ROM command left listening on a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// No device is addressed (idle, or a match that hit nothing).
    None,
    /// Skip-ROM addressed every device at once.
    All,
    /// Exactly one device is addressed.
    One(u64),
}

/// A group of 1-Wire slave devices sharing one pin.
///
/// Reacts to classified master slots: a reset re-arms command decoding, 8
/// written bits form a ROM command, and the search/read-ROM/match phases
/// follow the wire protocol bit by bit. During a search pass the group
/// presents the open-drain AND of all still-participating devices and
/// drops the ones disagreeing with the master's written direction bit.
#[derive(Debug)]
pub(crate) struct SlaveGroup {
    pub(crate) roms: Vec<u64>,
    participating: Vec<bool>,
    phase: Phase,
    pub(crate) selection: Selection,
    /// Devices stop answering once a search reaches this bit position
    /// (fault injection for the bit/complement both-1 case).
    pub(crate) mute_from_bit: Option<u8>,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Command {
        acc: u8,
        nbits: u8,
    },
    Search {
        bit: u8,
        /// 0 = bit slot, 1 = complement slot (2 is the master's write).
        sub: u8,
    },
    ReadRom {
        bit: u8,
    },
    Match {
        acc: u64,
        nbits: u8,
    },
}

impl SlaveGroup {
    pub(crate) fn new(roms: Vec<u64>) -> Self {
        let n = roms.len();
        Self {
            roms,
            participating: vec![false; n],
            phase: Phase::Idle,
            selection: Selection::None,
            mute_from_bit: None,
        }
    }

    fn rom_bit(rom: u64, bit: u8) -> bool {
        rom >> bit & 1 == 1
    }

    /// Master reset pulse: everyone re-arms. Returns whether a presence
    /// pulse should be scheduled.
    pub(crate) fn on_reset(&mut self) -> bool {
        self.phase = Phase::Command { acc: 0, nbits: 0 };
        self.participating = vec![true; self.roms.len()];
        self.selection = Selection::None;
        !self.roms.is_empty()
    }

    /// A bit written by the master (write slot).
    pub(crate) fn on_write_bit(&mut self, bit: bool) {
        match &mut self.phase {
            Phase::Idle => {}
            Phase::Command { acc, nbits } => {
                if bit {
                    *acc |= 1 << *nbits;
                }
                *nbits += 1;
                let complete = (*nbits == 8).then_some(*acc);
                if let Some(cmd) = complete {
                    self.dispatch(cmd);
                }
            }
            Phase::Search { bit: pos, sub } => {
                debug_assert_eq!(*sub, 2, "search direction bit out of order");
                let pos_v = *pos;
                for (p, rom) in self.participating.iter_mut().zip(&self.roms) {
                    if *p && Self::rom_bit(*rom, pos_v) != bit {
                        *p = false;
                    }
                }
                *pos += 1;
                *sub = 0;
                if *pos == 64 {
                    // The surviving device is the addressed one.
                    let survivors: Vec<u64> = self
                        .participating
                        .iter()
                        .zip(&self.roms)
                        .filter(|(p, _)| **p)
                        .map(|(_, rom)| *rom)
                        .collect();
                    self.selection = match survivors[..] {
                        [rom] => Selection::One(rom),
                        _ => Selection::None,
                    };
                    self.phase = Phase::Idle;
                }
            }
            Phase::Match { acc, nbits } => {
                if bit {
                    *acc |= 1 << *nbits;
                }
                *nbits += 1;
                let complete = (*nbits == 64).then_some(*acc);
                if let Some(rom) = complete {
                    self.selection = if self.roms.contains(&rom) {
                        Selection::One(rom)
                    } else {
                        Selection::None
                    };
                    self.phase = Phase::Idle;
                }
            }
            Phase::ReadRom { .. } => {}
        }
    }

    /// A read slot: the level the group presents, `true` meaning the line
    /// is left floating high.
    pub(crate) fn on_read_slot(&mut self) -> bool {
        match &mut self.phase {
            Phase::Search { bit: pos, sub } => {
                let pos_v = *pos;
                let muted = self.mute_from_bit.is_some_and(|m| pos_v >= m);
                let any = |wanted: bool| {
                    !muted
                        && self
                            .participating
                            .iter()
                            .zip(&self.roms)
                            .any(|(p, rom)| *p && Self::rom_bit(*rom, pos_v) == wanted)
                };
                let level = match *sub {
                    0 => !any(false),
                    1 => !any(true),
                    _ => true,
                };
                *sub += 1;
                level
            }
            Phase::ReadRom { bit } => {
                let level = match self.roms.first() {
                    Some(&rom) if *bit < 64 => Self::rom_bit(rom, *bit),
                    _ => true,
                };
                *bit += 1;
                if *bit == 64 {
                    self.selection = match self.roms.first() {
                        Some(&rom) => Selection::One(rom),
                        None => Selection::None,
                    };
                    self.phase = Phase::Idle;
                }
                level
            }
            // Nothing to transmit; the pull-up wins.
            _ => true,
        }
    }

    fn dispatch(&mut self, cmd: u8) {
        self.phase = match cmd {
            ONEWIRE_SEARCH_CMD => Phase::Search { bit: 0, sub: 0 },
            ONEWIRE_READ_ROM_CMD => Phase::ReadRom { bit: 0 },
            ONEWIRE_MATCH_ROM_CMD => Phase::Match { acc: 0, nbits: 0 },
            ONEWIRE_SKIP_ROM_CMD => {
                self.selection = Selection::All;
                Phase::Idle
            }
            _ => Phase::Idle,
        };
    }
}
