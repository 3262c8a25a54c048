/// Sensor variant, selecting timing and payload interpretation.
///
/// Both variants speak the same frame: a host start signal, a low/high
/// acknowledge from the sensor, 40 data bits (two payload bytes each for
/// humidity and temperature, then an additive checksum), most significant
/// bit first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DhtKind {
    /// DHT11: integral readings, 18 ms start signal.
    Dht11,
    /// DHT22 (AM2302): tenths resolution, signed temperature, 1.1 ms start
    /// signal.
    Dht22,
}

impl DhtKind {
    /// How long the host must hold the line low to start a read.
    pub(crate) const fn start_signal_us(self) -> u32 {
        match self {
            DhtKind::Dht11 => 18_000,
            DhtKind::Dht22 => 1_100,
        }
    }

    /// The protocol's own consistency check: the low 8 bits of the payload
    /// byte sum must equal the fifth byte.
    pub(crate) fn checksum_ok(raw: &[u8; 5]) -> bool {
        let sum = raw[0]
            .wrapping_add(raw[1])
            .wrapping_add(raw[2])
            .wrapping_add(raw[3]);
        sum == raw[4]
    }

    /// Decodes a checksum-valid frame into (humidity %, temperature °C).
    pub(crate) fn decode(self, raw: &[u8; 5]) -> (f32, f32) {
        match self {
            DhtKind::Dht11 => {
                let humidity = raw[0] as f32 + raw[1] as f32 / 10.0;
                let temperature = raw[2] as f32 + raw[3] as f32 / 10.0;
                (humidity, temperature)
            }
            DhtKind::Dht22 => {
                let humidity = u16::from_be_bytes([raw[0], raw[1]]) as f32 / 10.0;
                let magnitude = u16::from_be_bytes([raw[2] & 0x7f, raw[3]]) as f32 / 10.0;
                let temperature = if raw[2] & 0x80 != 0 {
                    -magnitude
                } else {
                    magnitude
                };
                (humidity, temperature)
            }
        }
    }
}
