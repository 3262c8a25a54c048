//! Slot-timing tests against the simulated clock: every 1-Wire slot is
//! nominally 70 µs wall time and a reset sequence is 960 µs, independent
//! of the data moved.

use onewire_core::OneWire;
use onewire_gpio::OneWireRegistry;
use onewire_sim::SimNet;

const PIN: u8 = 7;

#[test]
fn write_slots_take_seventy_microseconds() {
    let net = SimNet::new();
    let mut registry = OneWireRegistry::<_, _, 4>::new(net.port(), net.delay());
    let mut bus = registry.bus(PIN).unwrap();

    let t0 = net.now_us();
    bus.write_bit(true).unwrap();
    assert_eq!(net.now_us() - t0, 70);

    let t0 = net.now_us();
    bus.write_bit(false).unwrap();
    assert_eq!(net.now_us() - t0, 70);
}

#[test]
fn read_slots_take_seventy_microseconds() {
    let net = SimNet::new();
    net.attach_echo(PIN);
    let mut registry = OneWireRegistry::<_, _, 4>::new(net.port(), net.delay());
    let mut bus = registry.bus(PIN).unwrap();

    for bit in [false, true] {
        bus.write_bit(bit).unwrap();
        let t0 = net.now_us();
        assert_eq!(bus.read_bit().unwrap(), bit);
        assert_eq!(net.now_us() - t0, 70);
    }
}

#[test]
fn reset_takes_the_full_sequence_with_or_without_devices() {
    let net = SimNet::new();
    let mut registry = OneWireRegistry::<_, _, 4>::new(net.port(), net.delay());
    let mut bus = registry.bus(PIN).unwrap();

    // No behavior attached: the line floats high, no presence.
    let t0 = net.now_us();
    assert!(!bus.reset().unwrap());
    assert_eq!(net.now_us() - t0, 960);

    net.attach_slaves(PIN, &[0x01]);
    let t0 = net.now_us();
    assert!(bus.reset().unwrap());
    assert_eq!(net.now_us() - t0, 960);
}

#[test]
fn bytes_round_trip_through_the_wire() {
    let net = SimNet::new();
    net.attach_echo(PIN);
    let mut registry = OneWireRegistry::<_, _, 4>::new(net.port(), net.delay());
    let mut bus = registry.bus(PIN).unwrap();

    for value in 0..=255u8 {
        bus.write_byte(value).unwrap();
        assert_eq!(bus.read_byte().unwrap(), value);
    }
}

#[test]
fn reset_discards_pending_echo_bits() {
    let net = SimNet::new();
    net.attach_echo(PIN);
    let mut registry = OneWireRegistry::<_, _, 4>::new(net.port(), net.delay());
    let mut bus = registry.bus(PIN).unwrap();

    bus.write_byte(0x00).unwrap();
    bus.reset().unwrap();
    // Nothing queued anymore; idle read slots float high.
    assert_eq!(bus.read_byte().unwrap(), 0xff);
}
