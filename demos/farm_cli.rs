//! Small demo binary driving [`modbus_farm`] against a real serial port.
//! Not part of the library's core — a thin runnable example alongside it.

use std::time::Duration;

use clap::Parser;
use modbus_farm::{Farm, SerialTransport};

#[derive(Parser, Debug)]
#[command(about = "Poll a single holding register from a Modbus RTU station")]
struct Args {
    /// Serial device, e.g. /dev/ttyUSB0 or COM3
    port: String,
    /// Baud rate
    #[arg(long, default_value_t = 9600)]
    baud: u32,
    /// Modbus slave address (1-247)
    #[arg(long, default_value_t = 1)]
    address: u8,
    /// Register offset to poll
    #[arg(long, default_value_t = 0)]
    reg: u16,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let serial = serialport::new(&args.port, args.baud)
        .timeout(Duration::from_millis(50))
        .open()?;

    let farm = Farm::new();
    let port = farm.add_port(Box::new(SerialTransport::new(serial)))?;
    let station = farm.add_station(port, args.address)?;

    loop {
        match farm.query(station, args.reg) {
            Ok(value) => println!("reg {} = {value}", args.reg),
            Err(err) => println!("reg {} not ready: {err}", args.reg),
        }
        std::thread::sleep(Duration::from_secs(1));
    }
}
