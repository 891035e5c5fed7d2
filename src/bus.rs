//! Linux I²C bus handle.
//!
//! [`BusHandle`] owns an open `/dev/i2c-N` character device and exposes it through the
//! `embedded-hal` blocking I²C traits, so it can be handed straight to [`HTU21D`].
//! `WriteRead` goes out as a single `I2C_RDWR` transfer with a repeated start, which is
//! what the no-hold measurement commands need.
//!
//! [`HTU21D`]: crate::HTU21D

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use embedded_hal::blocking::i2c::{Read, Write, WriteRead};
use linux_embedded_hal::i2cdev::linux::LinuxI2CError;
use linux_embedded_hal::I2cdev;
use log::debug;

/// Bus the sensor sits on for current Raspberry Pi boards
pub const DEFAULT_BUS_PATH: &str = "/dev/i2c-1";

const BOARD_REVISION_PATH: &str = "/sys/module/bcm2708/parameters/boardrev";

/// Bus errors
#[derive(Debug)]
pub enum BusError {
    /// The bus device could not be opened
    Open {
        /// path that was tried
        path: PathBuf,
        /// underlying error
        source: LinuxI2CError,
    },
    /// `close` was called on a bus that was already closed
    Close,
    /// A transaction was attempted after the bus was closed
    Closed,
    /// An I²C transfer failed
    Io(LinuxI2CError),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::Open { path, source } => {
                write!(f, "failed to open the i2c bus {}: {}", path.display(), source)
            }
            BusError::Close => f.write_str("i2c bus already closed"),
            BusError::Closed => f.write_str("i2c bus is closed"),
            BusError::Io(e) => write!(f, "i2c transfer failed: {}", e),
        }
    }
}

impl std::error::Error for BusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BusError::Open { source, .. } => Some(source),
            BusError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// An open I²C bus
///
/// The device is released by [`close`](BusHandle::close), or on drop if the handle is
/// never closed explicitly.
pub struct BusHandle {
    dev: Option<I2cdev>,
    path: PathBuf,
}

impl fmt::Debug for BusHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusHandle")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}

impl BusHandle {
    /// Opens the bus device at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BusError> {
        let path = path.as_ref().to_path_buf();
        match I2cdev::new(&path) {
            Ok(dev) => {
                debug!("opened i2c bus {}", path.display());
                Ok(BusHandle {
                    dev: Some(dev),
                    path,
                })
            }
            Err(source) => Err(BusError::Open { path, source }),
        }
    }

    /// Opens the bus chosen by `resolver`, or `default` if the resolver has no answer
    ///
    /// ```no_run
    /// use htu21d::bus::{self, BusHandle};
    ///
    /// let bus = BusHandle::open_with(bus::DEFAULT_BUS_PATH, bus::raspberry_pi_bus_path);
    /// ```
    pub fn open_with<P, F>(default: P, resolver: F) -> Result<Self, BusError>
    where
        P: AsRef<Path>,
        F: FnOnce() -> Option<PathBuf>,
    {
        match resolver() {
            Some(path) => Self::open(path),
            None => Self::open(default),
        }
    }

    /// Path of the bus device
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the bus is still open
    pub fn is_open(&self) -> bool {
        self.dev.is_some()
    }

    /// Releases the bus device. Any later transaction fails with [`BusError::Closed`].
    pub fn close(&mut self) -> Result<(), BusError> {
        match self.dev.take() {
            Some(dev) => {
                drop(dev);
                debug!("closed i2c bus {}", self.path.display());
                Ok(())
            }
            None => Err(BusError::Close),
        }
    }

    fn device(&mut self) -> Result<&mut I2cdev, BusError> {
        self.dev.as_mut().ok_or(BusError::Closed)
    }
}

impl Write for BusHandle {
    type Error = BusError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        self.device()?.write(address, bytes).map_err(BusError::Io)
    }
}

impl Read for BusHandle {
    type Error = BusError;

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), BusError> {
        self.device()?.read(address, buffer).map_err(BusError::Io)
    }
}

impl WriteRead for BusHandle {
    type Error = BusError;

    fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), BusError> {
        self.device()?
            .write_read(address, bytes, buffer)
            .map_err(BusError::Io)
    }
}

/// Picks the bus from the Raspberry Pi board revision
///
/// Revision 2 and 3 boards wire the header to `/dev/i2c-0`, later ones to `/dev/i2c-1`.
/// Returns `None` when the revision is not exposed, e.g. on other platforms.
pub fn raspberry_pi_bus_path() -> Option<PathBuf> {
    let revision = fs::read_to_string(BOARD_REVISION_PATH).ok()?;
    bus_path_for_revision(&revision)
}

fn bus_path_for_revision(revision: &str) -> Option<PathBuf> {
    let revision = revision.trim();
    if revision.is_empty() {
        return None;
    }
    let path = match leading_number(revision) {
        Some(2) | Some(3) => "/dev/i2c-0",
        _ => "/dev/i2c-1",
    };
    Some(PathBuf::from(path))
}

/// Parses the number at the start of `text`, ignoring whatever follows it
fn leading_number(text: &str) -> Option<i64> {
    let unsigned = text.trim_start_matches(|c: char| c == '+' || c == '-');
    let sign_len = text.len() - unsigned.len();
    if sign_len > 1 {
        return None;
    }
    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    text[..sign_len + digits].parse().ok()
}
