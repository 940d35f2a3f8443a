extern crate clap;
extern crate env_logger;
extern crate linux_embedded_hal;
#[macro_use]
extern crate log;
extern crate serial;
extern crate sextant;

use std::thread;
use std::time::Duration;

use clap::{Arg, Command};
use linux_embedded_hal::I2cdev;
use serial::{BaudRate, SerialPort};

use sextant::{CycleOutcome, Gain, HeadingCalculator, Hmc5883l, Monitor};

const LINK_RETRY: Duration = Duration::from_secs(3);
const READ_TIMEOUT: Duration = Duration::from_secs(60);

fn main() {
    env_logger::init();

    let matches = Command::new("sextant")
        .about("Merges GPS sentences and compass headings into one navigation fix")
        .arg(
            Arg::new("port")
                .long("port")
                .default_value("/dev/ttyAMA0")
                .help("Serial device the GPS receiver is attached to"),
        )
        .arg(
            Arg::new("i2c")
                .long("i2c")
                .default_value("/dev/i2c-1")
                .help("I2C bus the compass is attached to"),
        )
        .arg(
            Arg::new("declination")
                .long("declination")
                .value_parser(clap::value_parser!(f32))
                .default_value("0.0")
                .help("Local magnetic declination in radians, applied when positive"),
        )
        .get_matches();

    let port_path = matches.get_one::<String>("port").unwrap();
    let i2c_path = matches.get_one::<String>("i2c").unwrap();
    let declination = *matches.get_one::<f32>("declination").unwrap();

    let link = open_link(port_path);
    let (compass, gain) = start_compass(i2c_path);
    let calculator = HeadingCalculator::new(gain, declination);

    let mut monitor = Monitor::new(link, compass, calculator);

    loop {
        match monitor.cycle() {
            Ok(CycleOutcome::Report(snapshot)) => {
                print!("{}", "\n".repeat(40));
                println!("{}", snapshot);
            }
            Ok(CycleOutcome::NoSignal) => println!("No valid GPS signal"),
            Ok(CycleOutcome::Quiet) => (),
            // A dropped or timed-out link is not fatal; the next cycle
            // simply tries again.
            Err(e) => warn!("link read failed: {}", e),
        }
    }
}

/// Open and configure the GPS serial port, retrying with a fixed delay
/// until the channel is healthy.
fn open_link(path: &str) -> serial::SystemPort {
    info!("Starting GPS...");
    loop {
        match try_open(path) {
            Ok(port) => {
                info!("GPS has been started ({}).", path);
                return port;
            }
            Err(e) => {
                warn!(
                    "GPS failed to start ({}), retrying in {} seconds.",
                    e,
                    LINK_RETRY.as_secs()
                );
                thread::sleep(LINK_RETRY);
            }
        }
    }
}

fn try_open(path: &str) -> serial::Result<serial::SystemPort> {
    let mut port = serial::open(path)?;
    port.reconfigure(&|settings| {
        settings.set_baud_rate(BaudRate::Baud115200)?;
        settings.set_char_size(serial::Bits8);
        settings.set_parity(serial::ParityNone);
        settings.set_stop_bits(serial::Stop1);
        settings.set_flow_control(serial::FlowNone);
        Ok(())
    })?;
    port.set_timeout(READ_TIMEOUT)?;
    Ok(port)
}

/// Bring up the compass, retrying until the device responds. No delay
/// between attempts; the bus either exists or it does not.
fn start_compass(path: &str) -> (Hmc5883l<I2cdev>, Gain) {
    loop {
        match I2cdev::new(path) {
            Ok(bus) => {
                let mut compass = Hmc5883l::new(bus);
                match compass.init() {
                    Ok(gain) => {
                        info!("Compass has been started ({}).", path);
                        return (compass, gain);
                    }
                    Err(e) => warn!("Compass failed to start: {}", e),
                }
            }
            Err(e) => warn!("Compass failed to start: {}", e),
        }
    }
}
