use crate::dht::DhtScript;
use crate::slave::{Selection, SlaveGroup};
use dht_sensor::Monotonic;
use embedded_hal::delay::DelayNs;
use onewire_gpio::{Direction, GpioPort};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

// Slot classification thresholds, master side timings: a reset holds the
// line low for 480 µs, a write-0 for 60 µs, a write-1 and a read-slot
// init pulse for 6 µs (the two differ in how the line is released).
const RESET_LOW_MIN_US: u64 = 480;
const WRITE_ZERO_MIN_US: u64 = 15;
// A DHT start signal is at least ~1 ms.
const DHT_START_MIN_US: u64 = 800;
// Presence pulse: 20 µs after the reset release, 60 µs long.
const PRESENCE_FROM_US: u64 = 20;
const PRESENCE_TO_US: u64 = 80;
// A slave transmitting 0 holds the line low for ~30 µs from slot start.
const SLAVE_LOW_US: u64 = 30;

struct Inner {
    now: u64,
    pins: BTreeMap<u8, Pin>,
}

struct Pin {
    direction: Direction,
    out_high: bool,
    /// When the master started driving low, if it still is.
    low_since: Option<u64>,
    /// Device pull-low intervals `[start, end)` on the shared timeline.
    windows: Vec<(u64, u64)>,
    behavior: Behavior,
}

enum Behavior {
    None,
    Slaves(SlaveGroup),
    Echo(VecDeque<bool>),
    Dht(DhtScript),
}

impl Default for Pin {
    fn default() -> Self {
        Self {
            direction: Direction::Output,
            out_high: true,
            low_since: None,
            windows: Vec::new(),
            behavior: Behavior::None,
        }
    }
}

impl Inner {
    fn new() -> Self {
        Self {
            now: 0,
            pins: BTreeMap::new(),
        }
    }

    fn set_level(&mut self, pinno: u8, high: bool) {
        let now = self.now;
        let pin = self.pins.entry(pinno).or_default();
        let was_driving = pin.direction == Direction::Output && !pin.out_high;
        pin.out_high = high;
        let driving = pin.direction == Direction::Output && !high;
        if !was_driving && driving {
            pin.low_since = Some(now);
        } else if was_driving && !driving {
            let since = pin.low_since.take();
            self.release(pinno, since, false);
        }
    }

    fn set_direction(&mut self, pinno: u8, direction: Direction) {
        let now = self.now;
        let pin = self.pins.entry(pinno).or_default();
        let was_driving = pin.direction == Direction::Output && !pin.out_high;
        pin.direction = direction;
        let driving = direction == Direction::Output && !pin.out_high;
        if !was_driving && driving {
            pin.low_since = Some(now);
        } else if was_driving && !driving {
            let since = pin.low_since.take();
            self.release(pinno, since, direction == Direction::Input);
        }
    }

    fn level(&mut self, pinno: u8) -> bool {
        let now = self.now;
        let pin = self.pins.entry(pinno).or_default();
        let driven = pin.direction == Direction::Output && !pin.out_high;
        let pulled = pin.windows.iter().any(|&(s, e)| s <= now && now < e);
        !(driven || pulled)
    }

    /// The master just released the line after `since`; the elapsed low
    /// time and the release style (input switch vs output high) classify
    /// the slot, and the attached behavior reacts.
    fn release(&mut self, pinno: u8, since: Option<u64>, to_input: bool) {
        let Some(since) = since else { return };
        let now = self.now;
        let dur = now - since;
        let pin = self.pins.entry(pinno).or_default();
        match &mut pin.behavior {
            Behavior::Slaves(group) => {
                if dur >= RESET_LOW_MIN_US {
                    if group.on_reset() {
                        pin.windows
                            .push((now + PRESENCE_FROM_US, now + PRESENCE_TO_US));
                    }
                } else if to_input {
                    // Read slot: the group presents its bit from slot start.
                    if !group.on_read_slot() {
                        pin.windows.push((since, since + SLAVE_LOW_US));
                    }
                } else {
                    group.on_write_bit(dur < WRITE_ZERO_MIN_US);
                }
            }
            Behavior::Echo(queue) => {
                if dur >= RESET_LOW_MIN_US {
                    queue.clear();
                } else if to_input {
                    if let Some(bit) = queue.pop_front() {
                        if !bit {
                            pin.windows.push((since, since + SLAVE_LOW_US));
                        }
                    }
                } else {
                    queue.push_back(dur < WRITE_ZERO_MIN_US);
                }
            }
            Behavior::Dht(script) => {
                if dur >= DHT_START_MIN_US {
                    pin.windows.extend(script.windows(now));
                }
            }
            Behavior::None => {}
        }
    }
}

/// Shared simulation: one microsecond clock, many open-drain pins.
#[derive(Clone)]
pub struct SimNet {
    inner: Arc<Mutex<Inner>>,
}

impl Default for SimNet {
    fn default() -> Self {
        Self::new()
    }
}

impl SimNet {
    /// An empty net at time zero.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("sim mutex poisoned")
    }

    /// The master-side GPIO capability.
    pub fn port(&self) -> SimPort {
        SimPort(self.clone())
    }

    /// A delay provider that advances the shared clock.
    pub fn delay(&self) -> SimDelay {
        SimDelay(self.clone())
    }

    /// A monotonic view of the shared clock.
    pub fn clock(&self) -> SimClock {
        SimClock(self.clone())
    }

    /// Current simulated time.
    pub fn now_us(&self) -> u64 {
        self.lock().now
    }

    /// Lets simulated time pass without master activity (e.g. between
    /// state-machine ticks).
    pub fn advance_us(&self, us: u64) {
        self.lock().now += us;
    }

    /// Populates `pin` with a group of 1-Wire slaves.
    pub fn attach_slaves(&self, pin: u8, roms: &[u64]) {
        self.lock().pins.entry(pin).or_default().behavior =
            Behavior::Slaves(SlaveGroup::new(roms.to_vec()));
    }

    /// Makes the slave group on `pin` stop answering once a search pass
    /// reaches `bit`, so both read slots of that position float high.
    pub fn mute_search_from_bit(&self, pin: u8, bit: u8) {
        if let Behavior::Slaves(group) = &mut self.lock().pins.entry(pin).or_default().behavior {
            group.mute_from_bit = Some(bit);
        }
    }

    /// Attaches a loop-back responder: bits written to the pin replay on
    /// its read slots in order.
    pub fn attach_echo(&self, pin: u8) {
        self.lock().pins.entry(pin).or_default().behavior = Behavior::Echo(VecDeque::new());
    }

    /// Attaches a scripted DHT sensor.
    pub fn attach_dht(&self, pin: u8, script: DhtScript) {
        self.lock().pins.entry(pin).or_default().behavior = Behavior::Dht(script);
    }

    /// Which device(s) the last ROM command left listening on `pin`.
    pub fn selection(&self, pin: u8) -> Selection {
        match &self.lock().pins.entry(pin).or_default().behavior {
            Behavior::Slaves(group) => group.selection,
            _ => Selection::None,
        }
    }
}

/// [`GpioPort`] implementation backed by a [`SimNet`].
pub struct SimPort(SimNet);

impl GpioPort for SimPort {
    type Error = core::convert::Infallible;

    fn configure_open_drain(&mut self, pin: u8) -> Result<(), Self::Error> {
        // Creating the pin entry leaves it released and output-capable.
        self.0.lock().pins.entry(pin).or_default();
        Ok(())
    }

    fn set_direction(&mut self, pin: u8, direction: Direction) -> Result<(), Self::Error> {
        self.0.lock().set_direction(pin, direction);
        Ok(())
    }

    fn set_level(&mut self, pin: u8, high: bool) -> Result<(), Self::Error> {
        self.0.lock().set_level(pin, high);
        Ok(())
    }

    fn level(&mut self, pin: u8) -> Result<bool, Self::Error> {
        Ok(self.0.lock().level(pin))
    }
}

/// [`DelayNs`] implementation advancing the shared simulated clock.
pub struct SimDelay(SimNet);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.lock().now += (ns as u64).div_ceil(1_000);
    }
}

/// [`Monotonic`] implementation reading the shared simulated clock.
pub struct SimClock(SimNet);

impl Monotonic for SimClock {
    fn now_us(&mut self) -> u64 {
        self.0.lock().now
    }
}
