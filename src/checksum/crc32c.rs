//! CRC-32C (Castagnoli) primitives
//!
//! Thin wrappers around the `crc32c` crate that pin down the exact semantics
//! the rest of the tool relies on: the Castagnoli polynomial, little-endian
//! bit order, and a length-aware combine matching the checksums produced by
//! cloud object-store tooling.

use crate::error::{Result, S3ParcpError};

/// Compute the CRC-32C of a byte slice.
pub fn hash(data: &[u8]) -> u32 {
    ::crc32c::crc32c(data)
}

/// Combine two CRC-32C values into the CRC of the concatenation.
///
/// `combine(hash(a), hash(b), b.len())` equals `hash(a ++ b)`.
pub fn combine(crc_a: u32, crc_b: u32, len_b: u64) -> u32 {
    ::crc32c::crc32c_combine(crc_a, crc_b, len_b as usize)
}

/// Encode a checksum the way it is stored in object metadata: uppercase
/// hexadecimal without a prefix or leading zeros.
pub fn to_hex(sum: u32) -> String {
    format!("{sum:X}")
}

/// Parse a checksum from object metadata. Accepts any hex casing and does
/// not require leading zeros.
pub fn parse_hex(value: &str) -> Result<u32> {
    u32::from_str_radix(value.trim(), 16).map_err(|_| {
        S3ParcpError::config(format!(
            "checksum '{value}' is not a valid hexadecimal 32-bit unsigned integer"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_sample_bytes() {
        // Reference value for the Castagnoli polynomial.
        assert_eq!(hash(b"sample bytes"), 1168601409);
    }

    #[test]
    fn test_hash_empty() {
        assert_eq!(hash(b""), 0);
    }

    #[test]
    fn test_combine_matches_concatenation() {
        let a = b"sample ".as_slice();
        let b = b"bytes".as_slice();
        let combined = combine(hash(a), hash(b), b.len() as u64);
        assert_eq!(combined, hash(b"sample bytes"));
    }

    #[test]
    fn test_combine_with_empty_right_operand() {
        let a = hash(b"sample bytes");
        assert_eq!(combine(a, hash(b""), 0), a);
    }

    #[test]
    fn test_hex_round_trip() {
        let sum = hash(b"sample bytes");
        let hex = to_hex(sum);
        assert_eq!(hex, hex.to_uppercase());
        assert_eq!(parse_hex(&hex).unwrap(), sum);
        // Metadata written by other tools may be lowercase.
        assert_eq!(parse_hex(&hex.to_lowercase()).unwrap(), sum);
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(parse_hex("not-hex").is_err());
        assert!(parse_hex("123456789AB").is_err());
    }
}
