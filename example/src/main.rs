extern crate htu21d;
extern crate linux_embedded_hal as hal;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::{Read, Write, WriteRead};
use hal::Delay;
use htu21d::bus::{self, BusHandle};
use htu21d::{Error, HTU21D};
use std::env;
use std::process;
use std::thread;
use std::time::Duration;

const CYCLES: usize = 100;

/// Prints `cycles` readings, one per `interval`, stopping at the first failure.
fn report<I2C, D, E>(
    htu21d: &mut HTU21D<I2C, D>,
    cycles: usize,
    interval: Duration,
) -> Result<(), Error<E>>
where
    I2C: Read<Error = E> + Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u8>,
{
    for _ in 0..cycles {
        let measurements = htu21d.measure()?;
        println!("{:.1} {:.1}", measurements.temperature, measurements.humidity);
        thread::sleep(interval);
    }
    Ok(())
}

fn main() {
    let bus = match env::args().nth(1) {
        Some(path) => BusHandle::open(path),
        None => BusHandle::open_with(bus::DEFAULT_BUS_PATH, bus::raspberry_pi_bus_path),
    };
    let i2c_bus = match bus {
        Ok(i2c_bus) => i2c_bus,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    };
    println!("opened {}", i2c_bus.path().display());

    let mut htu21d = HTU21D::new_primary(i2c_bus, Delay);
    if let Err(e) = htu21d.init() {
        eprintln!("htu21d init failed: {}", e);
        process::exit(2);
    }

    let status = match report(&mut htu21d, CYCLES, Duration::from_secs(1)) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("htu21d read failed: {}", e);
            3
        }
    };

    let (mut i2c_bus, _) = htu21d.destroy();
    if let Err(e) = i2c_bus.close() {
        eprintln!("{}", e);
        process::exit(5);
    }
    process::exit(status);
}
