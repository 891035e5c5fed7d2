//! Raw samples and the sensor's transfer functions.

use crate::{crc, HTU21D_REG_RH_NOHOLD, HTU21D_REG_TEMP_NOHOLD};

/// Length of a measurement response: two data bytes and a CRC byte
pub const SAMPLE_LEN: usize = 3;

/// Low bits of the data word that carry status, not measurement
const STATUS_MASK: u16 = 0x0003;

/// Status bit set in humidity samples and clear in temperature samples
const STATUS_HUMIDITY: u8 = 0x02;

/// Maximum conversion time of a 14-bit temperature measurement, in milliseconds
pub const MAX_TEMP_CONVERSION_MS: u8 = 50;

/// Maximum conversion time of a 12-bit humidity measurement, in milliseconds
pub const MAX_RH_CONVERSION_MS: u8 = 16;

/// The measurements the HTU21D can perform
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MeasurementKind {
    /// temperature in degrees celsius
    Temperature,
    /// relative humidity in percent
    Humidity,
}

impl MeasurementKind {
    /// No-hold command byte that triggers this measurement
    pub fn command(self) -> u8 {
        match self {
            MeasurementKind::Temperature => HTU21D_REG_TEMP_NOHOLD,
            MeasurementKind::Humidity => HTU21D_REG_RH_NOHOLD,
        }
    }

    /// Upper bound on the conversion time, used before the delayed re-read
    pub fn max_conversion_ms(self) -> u8 {
        match self {
            MeasurementKind::Temperature => MAX_TEMP_CONVERSION_MS,
            MeasurementKind::Humidity => MAX_RH_CONVERSION_MS,
        }
    }

    /// Applies the datasheet transfer function to a decoded count.
    ///
    /// `raw` must already have its status bits cleared, see [`decode`].
    pub fn convert(self, raw: u16) -> f32 {
        let ratio = raw as f32 / 65536.0;
        match self {
            MeasurementKind::Temperature => ratio * 175.72 - 46.85,
            MeasurementKind::Humidity => ratio * 125.0 - 6.0,
        }
    }
}

/// Combines the data bytes of a sample and clears the two status bits.
pub fn decode(msb: u8, lsb: u8) -> u16 {
    concat_bytes!(msb, lsb) & !STATUS_MASK
}

/// A measurement as received from the sensor, before validation
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RawSample([u8; SAMPLE_LEN]);

impl RawSample {
    /// Wraps the three bytes read from the sensor
    pub const fn new(data: [u8; SAMPLE_LEN]) -> Self {
        RawSample(data)
    }

    /// The bytes as received
    pub fn bytes(&self) -> [u8; SAMPLE_LEN] {
        self.0
    }

    /// Whether the CRC byte matches the data bytes
    pub fn is_valid(&self) -> bool {
        crc::checksum(&self.0)
    }

    /// The CRC byte the data bytes should have carried
    pub fn expected_crc(&self) -> u8 {
        crc::crc8(self.0[0], self.0[1])
    }

    /// The measurement count with its status bits cleared
    pub fn raw(&self) -> u16 {
        decode(self.0[0], self.0[1])
    }

    /// The two status bits of the data word
    pub fn status(&self) -> u8 {
        self.0[1] & STATUS_MASK as u8
    }

    /// Whether the status bits mark this as a humidity sample
    pub fn is_humidity(&self) -> bool {
        self.status() & STATUS_HUMIDITY != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_masks_status_bits() {
        assert_eq!(decode(0xFF, 0xFF), 0xFFFC);
        assert_eq!(decode(0x68, 0x3A), 0x6838);
        assert_eq!(decode(0x7C, 0x80), 0x7C80);
        assert_eq!(decode(0x00, 0x03), 0x0000);
    }

    #[test]
    fn temperature_bounds() {
        assert_eq!(MeasurementKind::Temperature.convert(0x0000), -46.85);
        assert_float_absolute_eq!(MeasurementKind::Temperature.convert(0xFFFC), 128.859, 0.001);
    }

    #[test]
    fn humidity_bounds() {
        assert_eq!(MeasurementKind::Humidity.convert(0x0000), -6.0);
        assert_float_absolute_eq!(MeasurementKind::Humidity.convert(0xFFFC), 118.992, 0.001);
    }

    /// Page 15 of the datasheet.
    #[test]
    fn datasheet_examples() {
        // 0x7C80 => 54.8 %RH
        assert_float_absolute_eq!(MeasurementKind::Humidity.convert(0x7C80), 54.79, 0.01);
        // 0x683A => 24.7 °C
        assert_float_absolute_eq!(
            MeasurementKind::Temperature.convert(decode(0x68, 0x3A)),
            24.69,
            0.01
        );
    }

    #[test]
    fn no_clamping_near_zero_humidity() {
        assert!(MeasurementKind::Humidity.convert(0x0100) < 0.0);
    }

    #[test]
    fn commands_and_delays() {
        assert_eq!(MeasurementKind::Temperature.command(), 0xF3);
        assert_eq!(MeasurementKind::Humidity.command(), 0xF5);
        assert!(
            MeasurementKind::Temperature.max_conversion_ms()
                > MeasurementKind::Humidity.max_conversion_ms()
        );
    }

    #[test]
    fn raw_sample_status() {
        let temperature = RawSample::new([0x68, 0x38, crc::crc8(0x68, 0x38)]);
        assert!(temperature.is_valid());
        assert!(!temperature.is_humidity());
        assert_eq!(temperature.raw(), 0x6838);

        let humidity = RawSample::new([0x7C, 0x82, crc::crc8(0x7C, 0x82)]);
        assert!(humidity.is_humidity());
        assert_eq!(humidity.status(), 0x02);
        assert_eq!(humidity.raw(), 0x7C80);
    }

    #[test]
    fn raw_sample_reports_expected_crc() {
        let sample = RawSample::new([0x7C, 0xBA, 0xB8]);
        assert!(!sample.is_valid());
        assert_eq!(sample.expected_crc(), 0xEB);
    }
}
