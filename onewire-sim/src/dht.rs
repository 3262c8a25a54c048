/// Scripted behavior of a simulated DHT sensor.
#[derive(Debug, Clone, Copy)]
pub enum DhtScript {
    /// Answer every start signal with this 5-byte frame (the caller is
    /// responsible for the checksum byte, valid or deliberately not).
    Respond([u8; 5]),
    /// Never answer; the master times out waiting for presence.
    Silent,
    /// Acknowledge, then stop transmitting after this many data bits; the
    /// master times out mid-answer.
    TruncateAfter([u8; 5], u8),
}

// Answer waveform constants (sensor side, nominal datasheet values).
const RESPONSE_DELAY_US: u64 = 30;
const ACK_LOW_US: u64 = 80;
const ACK_HIGH_US: u64 = 80;
const BIT_LOW_US: u64 = 50;
const BIT_HIGH_0_US: u64 = 27;
const BIT_HIGH_1_US: u64 = 70;
const TAIL_LOW_US: u64 = 50;

impl DhtScript {
    /// Pull-low windows of the sensor's answer to a start signal released
    /// at `t`.
    pub(crate) fn windows(&self, t: u64) -> Vec<(u64, u64)> {
        let (raw, nbits) = match *self {
            DhtScript::Silent => return Vec::new(),
            DhtScript::Respond(raw) => (raw, 40),
            DhtScript::TruncateAfter(raw, n) => (raw, n.min(40)),
        };
        let mut windows = Vec::with_capacity(nbits as usize + 2);
        let ack_start = t + RESPONSE_DELAY_US;
        windows.push((ack_start, ack_start + ACK_LOW_US));
        let mut cursor = ack_start + ACK_LOW_US + ACK_HIGH_US;
        for i in 0..nbits {
            windows.push((cursor, cursor + BIT_LOW_US));
            let one = raw[(i / 8) as usize] & (0x80 >> (i % 8)) != 0;
            cursor += BIT_LOW_US + if one { BIT_HIGH_1_US } else { BIT_HIGH_0_US };
        }
        if nbits == 40 {
            // Release handshake after the last bit.
            windows.push((cursor, cursor + TAIL_LOW_US));
        }
        windows
    }
}
