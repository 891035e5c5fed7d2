#![doc(html_root_url = "https://docs.rs/htu21d")]
#![deny(
    missing_docs, missing_debug_implementations, missing_copy_implementations, trivial_casts,
    trivial_numeric_casts, unsafe_code, unstable_features, unused_import_braces,
    unused_qualifications, unused_variables, unreachable_code, unused_comparisons, unused_imports,
    unused_must_use
)]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! A platform agnostic Rust driver for the Measurement Specialties HTU21D, based on the
//! [`embedded-hal`](https://github.com/japaric/embedded-hal) traits.
//!
//! ## The Device
//!
//! The [HTU21D(F)](https://cdn-shop.adafruit.com/datasheets/1899_HTU21D.pdf) is a digital
//! relative humidity and temperature sensor. The device has an I²C interface at the fixed
//! address `0x40`. Every measurement comes back as two data bytes followed by a CRC-8 byte.
//!
//! Measurements are triggered in "no hold" mode: the sensor NACKs reads until the
//! conversion is finished, so the driver first tries to read the result immediately and,
//! if the sensor is still busy, waits for the maximum conversion time and reads again.
//!
//! ## Usage
//!
//! ```no_run
//! # #[cfg(feature = "linux")]
//! # fn main() {
//! use htu21d::bus::BusHandle;
//! use htu21d::HTU21D;
//! use linux_embedded_hal::Delay;
//!
//! // using Linux I2C Bus #1 in this example
//! let i2c_bus = BusHandle::open("/dev/i2c-1").unwrap();
//!
//! // initialize the HTU21D using its I2C address 0x40
//! let mut htu21d = HTU21D::new_primary(i2c_bus, Delay);
//!
//! // reset the sensor and check that it came back in its default state
//! htu21d.init().unwrap();
//!
//! // measure temperature and humidity
//! let measurements = htu21d.measure().unwrap();
//!
//! println!("Relative Humidity = {}%", measurements.humidity);
//! println!("Temperature = {} deg C", measurements.temperature);
//!
//! // hand the bus back and release it
//! let (mut i2c_bus, _) = htu21d.destroy();
//! i2c_bus.close().unwrap();
//! # }
//! # #[cfg(not(feature = "linux"))]
//! # fn main() {}
//! ```
//!
//! ## Features
//!
//! - `std`: implements `std::error::Error` for [`Error`].
//! - `linux`: adds the [`bus`] module, a Linux `/dev/i2c-N` bus handle built on
//!   `linux-embedded-hal`. Implies `std`.

#[cfg(test)]
#[macro_use]
extern crate assert_float_eq;

use core::fmt;
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::{Read, Write, WriteRead};
use log::{debug, trace, warn};

macro_rules! concat_bytes {
    ($msb:expr, $lsb:expr) => {
        (($msb as u16) << 8) | ($lsb as u16)
    };
}

#[cfg(feature = "linux")]
pub mod bus;
pub mod crc;
pub mod measurement;

pub use crate::measurement::{MeasurementKind, RawSample};

/// I²C address of the HTU21D
pub const HTU21D_I2C_ADDR: u8 = 0x40;

const HTU21D_REG_TEMP_NOHOLD: u8 = 0xF3;
const HTU21D_REG_RH_NOHOLD: u8 = 0xF5;
const HTU21D_REG_WRITE_USER: u8 = 0xE6;
const HTU21D_REG_READ_USER: u8 = 0xE7;
const HTU21D_REG_SOFT_RESET: u8 = 0xFE;

/// Value of the user register after a soft reset
pub const USER_REGISTER_DEFAULT: u8 = 0x02;

/// Maximum time the sensor needs to come back from a soft reset, in milliseconds
pub const RESET_DELAY_MS: u8 = 15;

/// HTU21D errors
#[derive(Debug)]
pub enum Error<E> {
    /// I²C bus error
    I2c(E),
    /// The user register did not hold its default value after a soft reset
    NotReset(u8),
    /// The received measurement failed its CRC check
    Checksum {
        /// the bytes as received: two data bytes and the CRC byte
        data: [u8; 3],
        /// the CRC byte the data bytes should have carried
        expected: u8,
    },
}

impl<E: fmt::Display> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C bus error: {}", e),
            Error::NotReset(value) => write!(
                f,
                "device did not reset: user register is {:#04x}, expected {:#04x}",
                value, USER_REGISTER_DEFAULT
            ),
            Error::Checksum { data, expected } => write!(
                f,
                "bad CRC: received {:02x?}, expected CRC {:#04x}",
                data, expected
            ),
        }
    }
}

#[cfg(feature = "std")]
impl<E: fmt::Debug + fmt::Display> std::error::Error for Error<E> {}

/// Measurement data
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Measurements {
    /// temperature in degrees celsius
    pub temperature: f32,
    /// percent relative humidity
    pub humidity: f32,
}

/// Representation of a HTU21D
#[derive(Debug)]
pub struct HTU21D<I2C, D> {
    /// concrete I²C device implementation
    i2c: I2C,
    /// I²C device address
    address: u8,
    /// concrete Delay implementation
    delay: D,
    /// set by a successful `init`, cleared by any reset
    ready: bool,
}

impl<I2C, D, E> HTU21D<I2C, D>
where
    I2C: Read<Error = E> + Write<Error = E> + WriteRead<Error = E>,
    D: DelayMs<u8>,
{
    /// Create a new HTU21D struct using the default I²C address `0x40`
    pub fn new_primary(i2c: I2C, delay: D) -> Self {
        Self::new(i2c, HTU21D_I2C_ADDR, delay)
    }

    /// Create a new HTU21D struct using a custom I²C address
    pub fn new(i2c: I2C, address: u8, delay: D) -> Self {
        Self {
            i2c,
            address,
            delay,
            ready: false,
        }
    }

    /// The I²C address this driver talks to
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Whether the last `init` confirmed the device is in its reset state
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Initializes the HTU21D
    ///
    /// Resets the device and checks that the user register reads back its default
    /// value. Anything else means the device is in an unknown state and is reported as
    /// [`Error::NotReset`].
    pub fn init(&mut self) -> Result<(), Error<E>> {
        self.soft_reset()?;
        let user = self.read_user_register()?;
        if user != USER_REGISTER_DEFAULT {
            warn!(
                "htu21d at {:#04x}: user register {:#04x} after reset",
                self.address, user
            );
            return Err(Error::NotReset(user));
        }
        self.ready = true;
        Ok(())
    }

    /// Sends the soft reset command and waits for the device to reboot
    pub fn soft_reset(&mut self) -> Result<(), Error<E>> {
        self.ready = false;
        self.i2c
            .write(self.address, &[HTU21D_REG_SOFT_RESET])
            .map_err(Error::I2c)?;
        debug!("htu21d at {:#04x}: soft reset", self.address);
        self.delay.delay_ms(RESET_DELAY_MS);
        Ok(())
    }

    /// Reads the user register (resolution, battery status, heater)
    pub fn read_user_register(&mut self) -> Result<u8, Error<E>> {
        self.read_register(HTU21D_REG_READ_USER)
    }

    /// Writes the user register
    pub fn write_user_register(&mut self, value: u8) -> Result<(), Error<E>> {
        self.write_register(HTU21D_REG_WRITE_USER, value)
    }

    /// Measures the temperature in degrees celsius
    pub fn read_temperature(&mut self) -> Result<f32, Error<E>> {
        self.read(MeasurementKind::Temperature)
    }

    /// Measures the relative humidity in percent
    pub fn read_humidity(&mut self) -> Result<f32, Error<E>> {
        self.read(MeasurementKind::Humidity)
    }

    /// Measures temperature, then relative humidity.
    pub fn measure(&mut self) -> Result<Measurements, Error<E>> {
        let temperature = self.read_temperature()?;
        let humidity = self.read_humidity()?;
        Ok(Measurements {
            temperature,
            humidity,
        })
    }

    /// Performs one measurement of the given kind.
    ///
    /// The returned value is never clamped: the transfer function can yield slightly
    /// out of range values such as a negative humidity near 0 %RH.
    pub fn read(&mut self, kind: MeasurementKind) -> Result<f32, Error<E>> {
        let sample = self.read_sample(kind)?;
        if !sample.is_valid() {
            let expected = sample.expected_crc();
            warn!(
                "htu21d at {:#04x}: bad CRC on {:?} sample {:02x?}, expected {:#04x}",
                self.address,
                kind,
                sample.bytes(),
                expected
            );
            return Err(Error::Checksum {
                data: sample.bytes(),
                expected,
            });
        }
        Ok(kind.convert(sample.raw()))
    }

    /// Releases the I²C bus and the delay
    pub fn destroy(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn read_sample(&mut self, kind: MeasurementKind) -> Result<RawSample, Error<E>> {
        let mut data = [0; measurement::SAMPLE_LEN];
        if self
            .i2c
            .write_read(self.address, &[kind.command()], &mut data)
            .is_err()
        {
            // still converting; the sensor keeps the result for a plain read
            debug!(
                "htu21d at {:#04x}: {:?} not ready, retrying in {} ms",
                self.address,
                kind,
                kind.max_conversion_ms()
            );
            self.delay.delay_ms(kind.max_conversion_ms());
            self.i2c
                .read(self.address, &mut data)
                .map_err(Error::I2c)?;
        }
        trace!("htu21d at {:#04x}: {:?} sample {:02x?}", self.address, kind, data);
        Ok(RawSample::new(data))
    }

    fn read_register(&mut self, register: u8) -> Result<u8, Error<E>> {
        let mut data: [u8; 1] = [0];
        self.i2c
            .write_read(self.address, &[register], &mut data)
            .map_err(Error::I2c)?;
        Ok(data[0])
    }

    fn write_register(&mut self, register: u8, payload: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(self.address, &[register, payload])
            .map_err(Error::I2c)
    }
}
