use crate::{DhtKind, Monotonic};
use embedded_hal::delay::DelayNs;
use onewire_gpio::{GpioPort, Line};

// The sensor must answer the released line within this window.
const PRESENCE_TIMEOUT_US: u32 = 200;
// Acknowledge handshake: nominally 80 µs low, 80 µs high.
const ACK_LOW_TIMEOUT_US: u32 = 120;
const ACK_HIGH_TIMEOUT_US: u32 = 120;
// Per bit: 50 µs start-of-transfer low, then 26-28 µs high for a 0 or
// ~70 µs for a 1.
const BIT_LOW_TIMEOUT_US: u32 = 80;
const BIT_HIGH_TIMEOUT_US: u32 = 100;
const BIT_ONE_THRESHOLD_US: u32 = 49;
// Blocking reads poll the state machine at this pace.
const POLL_STEP_US: u32 = 50;

/// Protocol phase of a [`DhtSensor`].
///
/// `Error` ends the current cycle but re-arms: the next request is always
/// accepted from `Ready`, `Error` or the initial state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhtState {
    /// Line not configured yet; left on the first request.
    Init,
    /// Idle, last cycle (if any) complete.
    Ready,
    /// Host start signal in progress (line held low).
    ResetSignal,
    /// Judging the sensor's low response to the released line.
    WaitPresence,
    /// Judging the acknowledge handshake.
    WriteCmd,
    /// Judging completeness of the 40-bit answer.
    WaitAnswer,
    /// Checksum and payload decode.
    DecodeAnswer,
    /// The cycle failed; readings are invalid until a fresh cycle decodes.
    Error,
}

/// What the line capture following the start signal observed.
///
/// The sensor's answer is a microsecond-scale waveform that cannot survive
/// a gap between `tick()` calls, so it is captured in one bounded burst
/// when the start signal ends; the later states judge the capture.
#[derive(Debug, Default, Clone, Copy)]
struct Capture {
    presence: bool,
    handshake: bool,
    bits: u8,
    raw: [u8; 5],
}

/// Bit-banged DHT11/DHT22 sensor on one GPIO pin.
///
/// One read cycle may be in flight at a time (single-flight); both the
/// blocking and the non-blocking API drive the same state machine. Owns its
/// port, delay and clock; never accessed concurrently with itself.
pub struct DhtSensor<G, D, M> {
    gpio: G,
    delay: D,
    clock: M,
    pin: u8,
    kind: DhtKind,
    state: DhtState,
    deadline_us: u64,
    capture: Capture,
    temperature: f32,
    humidity: f32,
    valid: bool,
    ready: bool,
}

impl<G: GpioPort, D: DelayNs, M: Monotonic> DhtSensor<G, D, M> {
    /// Creates a sensor on `pin`. The line is configured lazily on the
    /// first request.
    pub fn new(gpio: G, delay: D, clock: M, pin: u8, kind: DhtKind) -> Self {
        Self {
            gpio,
            delay,
            clock,
            pin,
            kind,
            state: DhtState::Init,
            deadline_us: 0,
            capture: Capture::default(),
            temperature: f32::NAN,
            humidity: f32::NAN,
            valid: false,
            ready: false,
        }
    }

    /// Current protocol phase.
    pub fn state(&self) -> DhtState {
        self.state
    }

    /// Starts a temperature read cycle. Returns `false` if a cycle is
    /// already in progress (busy).
    pub fn request_temperature(&mut self) -> bool {
        self.request()
    }

    /// Starts a humidity read cycle. Returns `false` if a cycle is already
    /// in progress (busy).
    pub fn request_humidity(&mut self) -> bool {
        self.request()
    }

    /// True once the cycle started by the last request has decoded.
    pub fn has_temperature(&self) -> bool {
        self.ready && self.valid
    }

    /// True once the cycle started by the last request has decoded.
    pub fn has_humidity(&self) -> bool {
        self.ready && self.valid
    }

    /// Last decoded temperature in °C, or NaN if no cycle has completed or
    /// the last one failed.
    pub fn get_temperature(&self) -> f32 {
        self.temperature
    }

    /// Last decoded relative humidity in %, or NaN if no cycle has
    /// completed or the last one failed.
    pub fn get_humidity(&self) -> f32 {
        self.humidity
    }

    /// Blocking temperature read: drives the state machine to completion
    /// and returns the reading, or NaN on any failure.
    pub fn read_temperature(&mut self) -> f32 {
        self.read_blocking();
        self.temperature
    }

    /// Blocking humidity read: drives the state machine to completion and
    /// returns the reading, or NaN on any failure.
    pub fn read_humidity(&mut self) -> f32 {
        self.read_blocking();
        self.humidity
    }

    /// Advances the state machine by at most one transition.
    ///
    /// Call periodically from a timer or scheduler. Does nothing while the
    /// start-signal deadline has not elapsed; the one transition that ends
    /// the start signal also captures the sensor's answer (every wait in
    /// the capture is bounded by a protocol timeout). Decoupled states then
    /// judge the capture one tick at a time, so timeouts surface in the
    /// phase they belong to.
    pub fn tick(&mut self) {
        match self.state {
            DhtState::Init | DhtState::Ready | DhtState::Error => {}
            DhtState::ResetSignal => {
                if self.clock.now_us() < self.deadline_us {
                    return;
                }
                match self.capture_answer() {
                    Ok(capture) => {
                        self.capture = capture;
                        self.state = DhtState::WaitPresence;
                    }
                    Err(_) => self.fail("gpio error during capture"),
                }
            }
            DhtState::WaitPresence => {
                if self.capture.presence {
                    self.state = DhtState::WriteCmd;
                } else {
                    self.fail("no presence response");
                }
            }
            DhtState::WriteCmd => {
                if self.capture.handshake {
                    self.state = DhtState::WaitAnswer;
                } else {
                    self.fail("acknowledge handshake timed out");
                }
            }
            DhtState::WaitAnswer => {
                if self.capture.bits == 40 {
                    self.state = DhtState::DecodeAnswer;
                } else {
                    self.fail("answer timed out");
                }
            }
            DhtState::DecodeAnswer => {
                let raw = self.capture.raw;
                if DhtKind::checksum_ok(&raw) {
                    let (humidity, temperature) = self.kind.decode(&raw);
                    self.humidity = humidity;
                    self.temperature = temperature;
                    self.valid = true;
                    self.ready = true;
                    self.state = DhtState::Ready;
                } else {
                    self.fail("checksum mismatch");
                }
            }
        }
    }

    fn request(&mut self) -> bool {
        match self.state {
            DhtState::Init => {
                if self.gpio.configure_open_drain(self.pin).is_err() {
                    self.fail("line configuration failed");
                    return false;
                }
            }
            DhtState::Ready | DhtState::Error => {}
            // Single-flight: one cycle at a time.
            _ => return false,
        }
        self.ready = false;
        let start = self.kind.start_signal_us();
        let mut line = Line::new(&mut self.gpio, &mut self.delay, self.pin);
        if line.drive_low().is_err() {
            self.fail("line drive failed");
            return false;
        }
        self.deadline_us = self.clock.now_us() + start as u64;
        self.state = DhtState::ResetSignal;
        true
    }

    fn read_blocking(&mut self) {
        if !self.request() {
            return;
        }
        loop {
            self.tick();
            match self.state {
                DhtState::Ready | DhtState::Error => return,
                _ => self.delay.delay_us(POLL_STEP_US),
            }
        }
    }

    fn fail(&mut self, reason: &str) {
        log::debug!("dht pin {}: {reason}", self.pin);
        self.state = DhtState::Error;
        self.valid = false;
        self.ready = false;
        self.temperature = f32::NAN;
        self.humidity = f32::NAN;
    }

    /// Ends the start signal and captures the sensor's whole answer.
    fn capture_answer(&mut self) -> Result<Capture, G::Error> {
        let mut capture = Capture::default();
        let mut line = Line::new(&mut self.gpio, &mut self.delay, self.pin);
        line.release_to_input()?;
        let complete = (|| -> Result<bool, G::Error> {
            if line.wait_for(false, PRESENCE_TIMEOUT_US)?.is_none() {
                return Ok(false);
            }
            capture.presence = true;
            if line.wait_for(true, ACK_LOW_TIMEOUT_US)?.is_none() {
                return Ok(false);
            }
            if line.wait_for(false, ACK_HIGH_TIMEOUT_US)?.is_none() {
                return Ok(false);
            }
            capture.handshake = true;
            for i in 0..40u8 {
                if line.wait_for(true, BIT_LOW_TIMEOUT_US)?.is_none() {
                    return Ok(false);
                }
                let Some(high_us) = line.wait_for(false, BIT_HIGH_TIMEOUT_US)? else {
                    return Ok(false);
                };
                if high_us > BIT_ONE_THRESHOLD_US {
                    capture.raw[(i / 8) as usize] |= 0x80 >> (i % 8);
                }
                capture.bits += 1;
            }
            Ok(true)
        })();
        line.restore_output()?;
        complete?;
        Ok(capture)
    }
}
