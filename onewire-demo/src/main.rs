use clap::Parser;
use dht_sensor::{DhtKind, DhtSensor};
use onewire_core::{OneWire, OneWireSearch, Rom};
use onewire_gpio::OneWireRegistry;
use onewire_sim::{DhtScript, SimNet};
use rand::Rng;

/// Exercises the bit-banged 1-Wire and DHT engines against a simulated net
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// GPIO pin of the 1-Wire bus
    #[arg(short, long, default_value_t = 4)]
    pin: u8,
    /// Number of simulated 1-Wire devices
    #[arg(short = 'n', long, default_value_t = 3)]
    devices: usize,
    /// Family code of the simulated devices
    #[arg(short, long, default_value_t = 0x28)]
    family: u8,
    /// GPIO pin of the DHT sensor
    #[arg(long, default_value_t = 5)]
    dht_pin: u8,
    /// Simulate a DHT11 instead of a DHT22
    #[arg(long)]
    dht11: bool,
    /// Humidity the simulated sensor reports, percent
    #[arg(long, default_value_t = 65.2)]
    humidity: f32,
    /// Temperature the simulated sensor reports, degrees Celsius
    #[arg(long, default_value_t = 23.1)]
    temperature: f32,
}

/// Encodes a reading pair into the sensor's 5-byte answer frame.
fn dht_frame(kind: DhtKind, humidity: f32, temperature: f32) -> [u8; 5] {
    let mut raw = match kind {
        DhtKind::Dht11 => [
            humidity as u8,
            ((humidity * 10.0) as u16 % 10) as u8,
            temperature as u8,
            ((temperature * 10.0) as u16 % 10) as u8,
            0,
        ],
        DhtKind::Dht22 => {
            let hum = ((humidity * 10.0).round() as u16).to_be_bytes();
            let magnitude = (temperature.abs() * 10.0).round() as u16;
            let temp = if temperature < 0.0 {
                magnitude | 0x8000
            } else {
                magnitude
            }
            .to_be_bytes();
            [hum[0], hum[1], temp[0], temp[1], 0]
        }
    };
    raw[4] = raw[0]
        .wrapping_add(raw[1])
        .wrapping_add(raw[2])
        .wrapping_add(raw[3]);
    raw
}

fn main() {
    // Initialize the logger
    env_logger::init();
    // Parse command line arguments
    let args = Args::parse();
    let kind = if args.dht11 {
        DhtKind::Dht11
    } else {
        DhtKind::Dht22
    };

    // Populate the simulated net with random devices and a scripted sensor
    let net = SimNet::new();
    let mut rng = rand::rng();
    let roms: Vec<u64> = (0..args.devices)
        .map(|_| Rom::new(args.family, rng.random::<u64>() & 0xffff_ffff_ffff).raw())
        .collect();
    net.attach_slaves(args.pin, &roms);
    net.attach_dht(
        args.dht_pin,
        DhtScript::Respond(dht_frame(kind, args.humidity, args.temperature)),
    );

    // Enumerate the 1-Wire bus
    let mut registry = OneWireRegistry::<_, _, 16>::new(net.port(), net.delay());
    let mut bus = registry.bus(args.pin).expect("Failed to open the bus");
    let mut search = OneWireSearch::new(&mut bus);
    let mut found = Vec::new();
    while let Some(raw) = search.next().expect("Search pass failed") {
        let rom = Rom::from_raw(raw);
        log::info!(
            "Found device {:016x} (family {:02x}, serial {:012x})",
            rom.raw(),
            rom.family(),
            rom.serial()
        );
        found.push(raw);
    }
    log::info!("Enumerated {} of {} devices", found.len(), roms.len());

    // Address one device, then the whole bus
    if let Some(&rom) = found.first() {
        bus.address(Some(rom)).expect("Match ROM failed");
        log::info!("Selected device {rom:016x}");
    }
    bus.address(None).expect("Skip ROM failed");

    // Read the scripted sensor through the real protocol engine
    let mut dht = DhtSensor::new(net.port(), net.delay(), net.clock(), args.dht_pin, kind);
    let temperature = dht.read_temperature();
    let humidity = dht.read_humidity();
    log::info!(
        "DHT: {temperature:.1} degC, {humidity:.1} %RH ({} us of simulated bus time)",
        net.now_us()
    );
}
