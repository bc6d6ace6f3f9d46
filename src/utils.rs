//! Numeric and hex string utilities shared by the ABI codec and formatters.

use crate::serialization::{self, HexError};
use ethprim::{Digest, I256, U256};

/// Left pads `value` with `fill` up to `width` characters.
pub fn pad_left(value: &str, width: usize, fill: char) -> String {
    let padding = width.saturating_sub(value.len());
    let mut result = String::with_capacity(padding + value.len());
    result.extend(std::iter::repeat(fill).take(padding));
    result.push_str(value);
    result
}

/// Right pads `value` with `fill` up to `width` characters.
pub fn pad_right(value: &str, width: usize, fill: char) -> String {
    let padding = width.saturating_sub(value.len());
    let mut result = String::with_capacity(padding + value.len());
    result.push_str(value);
    result.extend(std::iter::repeat(fill).take(padding));
    result
}

/// Encodes a string as `0x` prefixed hex, right padded with zero bytes to at
/// least `pad` bytes.
pub fn from_ascii(value: &str, pad: usize) -> String {
    let hex = serialization::encode_hex(value.as_bytes());
    format!("0x{}", pad_right(&hex, pad * 2, '0'))
}

/// Decodes hex into a string, stopping at the first NUL byte.
///
/// Invalid UTF-8 sequences are replaced with `U+FFFD`.
pub fn to_ascii(hex: &str) -> Result<String, HexError> {
    let bytes = serialization::decode_hex(hex)?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

/// Returns the 256-bit two's complement representation of a signed integer.
pub fn to_twos_complement(value: I256) -> U256 {
    U256::from_be_bytes(value.to_be_bytes())
}

/// Interprets a 256-bit word as a two's complement signed integer.
pub fn from_twos_complement(value: U256) -> I256 {
    I256::from_be_bytes(value.to_be_bytes())
}

/// Formats an unsigned integer as a 64 character hex word.
pub fn to_word(value: U256) -> String {
    serialization::encode_hex(&value.to_be_bytes())
}

/// Parses up to 64 hex characters as an unsigned integer. Shorter input is
/// treated as if it were left padded with zeros, and empty input is zero.
pub fn from_word(hex: &str) -> Result<U256, HexError> {
    if hex.len() > 64 {
        return Err(HexError::Length {
            expected: 64,
            actual: hex.len(),
        });
    }
    let mut bytes = [0; 32];
    serialization::decode_hex_into(&pad_left(hex, 64, '0'), &mut bytes)?;
    Ok(U256::from_be_bytes(bytes))
}

/// Computes the Keccak-256 digest of a UTF-8 string.
pub fn sha3(value: &str) -> Digest {
    Digest::of(value)
}

/// Converts an unsigned integer to an `f64`, rounding towards zero once the
/// value exceeds 53 bits of precision.
pub fn to_f64(value: U256) -> f64 {
    value
        .to_be_bytes()
        .iter()
        .fold(0.0, |acc, &byte| acc * 256.0 + f64::from(byte))
}
