/// 1-Wire communication error type.
///
/// Errors are reported by value and never retried at this layer; retry
/// policy belongs to the caller.
#[derive(Debug, PartialEq, Eq)]
pub enum OneWireError<E> {
    /// Encapsulates the error type of the underlying line driver.
    Other(E),
    /// No device answered the reset pulse with a presence pulse.
    NoDevicePresent,
    /// Both the bit and its complement read back as 1 during a search pass,
    /// meaning no device responded mid-pass: wiring fault or bus noise.
    /// The pass is abandoned; results from earlier passes remain valid.
    SearchFault,
    /// The CRC byte of a ROM identifier did not match its contents.
    InvalidCrc,
}

impl<E> From<E> for OneWireError<E> {
    fn from(other: E) -> Self {
        Self::Other(other)
    }
}
