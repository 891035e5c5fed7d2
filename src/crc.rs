//! CRC-8 protecting each measurement.
//!
//! The sensor appends one CRC byte to the two data bytes of every measurement. The
//! generator polynomial is x⁸ + x⁵ + x⁴ + 1 (`0x131`), processed MSB first with a zero
//! initial value and no reflection.

use crc_all::Crc;

/// Generator polynomial without its implicit x⁸ term
const CRC8_POLY: u8 = 0x31;

/// `0x131` justified against bit 31, matching the payload layout in [`checksum`]
const CHECK_POLY: u32 = 0x9880_0000;

/// Returns `true` if the CRC byte of `payload` matches its two data bytes.
///
/// The payload is placed MSB-justified in a 32-bit accumulator and divided by the
/// generator polynomial; a consistent payload leaves no remainder.
pub const fn checksum(payload: &[u8; 3]) -> bool {
    let mut acc: u32 =
        (payload[0] as u32) << 24 | (payload[1] as u32) << 16 | (payload[2] as u32) << 8;
    let mut i = 0;
    while i < 24 {
        if acc & 0x8000_0000 != 0 {
            acc ^= CHECK_POLY;
        }
        acc <<= 1;
        i += 1;
    }
    acc == 0
}

/// Computes the CRC byte the sensor appends to `msb` and `lsb`.
pub fn crc8(msb: u8, lsb: u8) -> u8 {
    let mut crc = Crc::<u8>::new(CRC8_POLY, 8, 0x00, 0x00, false);
    crc.update(&[msb, lsb]);
    crc.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Page 14 of the datasheet.
    #[test]
    fn datasheet_vectors() {
        assert!(checksum(&[0x00, 0xDC, 0x79]));
        assert!(checksum(&[0x68, 0x3A, 0x7C]));
        assert!(checksum(&[0x4E, 0x85, 0x6B]));
    }

    #[test]
    fn crc8_matches_datasheet() {
        assert_eq!(crc8(0x00, 0xDC), 0x79);
        assert_eq!(crc8(0x68, 0x3A), 0x7C);
        assert_eq!(crc8(0x4E, 0x85), 0x6B);
        assert_eq!(crc8(0x7C, 0x80), 0xF5);
    }

    #[test]
    fn wrong_crc_byte_is_rejected() {
        // 0x7CBA carries 0xEB, not 0xB8
        assert!(checksum(&[0x7C, 0xBA, 0xEB]));
        assert!(!checksum(&[0x7C, 0xBA, 0xB8]));
    }

    #[test]
    fn all_zero_payload_is_consistent() {
        assert!(checksum(&[0x00, 0x00, 0x00]));
        assert!(!checksum(&[0x00, 0x00, 0x01]));
    }

    #[test]
    fn agrees_with_crc8() {
        for msb in (0..=255u8).step_by(7) {
            for lsb in (0..=255u8).step_by(5) {
                let crc = crc8(msb, lsb);
                assert!(checksum(&[msb, lsb, crc]));
                assert!(!checksum(&[msb, lsb, crc ^ 0x01]));
            }
        }
    }

    #[test]
    fn single_bit_errors_are_detected() {
        for &(msb, lsb) in &[(0x68, 0x3A), (0x4E, 0x85), (0xFF, 0xFC), (0x00, 0x00)] {
            let payload = [msb, lsb, crc8(msb, lsb)];
            for bit in 0..24 {
                let mut corrupted = payload;
                corrupted[bit / 8] ^= 1 << (bit % 8);
                assert!(!checksum(&corrupted), "bit {} of {:02x?}", bit, payload);
            }
        }
    }

    #[test]
    fn double_bit_errors_are_detected() {
        let payload = [0x68, 0x3A, 0x7C];
        for first in 0..24 {
            for second in (first + 1)..24 {
                let mut corrupted = payload;
                corrupted[first / 8] ^= 1 << (first % 8);
                corrupted[second / 8] ^= 1 << (second % 8);
                assert!(!checksum(&corrupted));
            }
        }
    }
}
