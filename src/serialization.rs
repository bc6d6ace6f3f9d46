//! Hex and JSON serialization helpers.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Write as _;

/// Encodes bytes as lowercase hex digits without a `0x` prefix.
pub fn encode_hex(bytes: &[u8]) -> String {
    let mut buffer = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(&mut buffer, "{byte:02x}").unwrap();
    }
    buffer
}

/// Decodes hex digits into bytes. An optional `0x` prefix is accepted.
pub fn decode_hex(hex: &str) -> Result<Vec<u8>, HexError> {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    let mut bytes = vec![0; hex.len() / 2];
    decode_hex_into(hex, &mut bytes)?;
    Ok(bytes)
}

/// Decodes exactly `bytes.len() * 2` hex digits into `bytes`.
pub fn decode_hex_into(hex: &str, bytes: &mut [u8]) -> Result<(), HexError> {
    if hex.len() % 2 != 0 {
        return Err(HexError::OddLength);
    }
    if hex.len() != bytes.len() * 2 {
        return Err(HexError::Length {
            expected: bytes.len() * 2,
            actual: hex.len(),
        });
    }

    let nibble = |x: u8| -> Result<u8, HexError> {
        match x {
            b'0'..=b'9' => Ok(x - b'0'),
            b'a'..=b'f' => Ok(x - b'a' + 0xa),
            b'A'..=b'F' => Ok(x - b'A' + 0xa),
            _ => Err(HexError::Digit(x)),
        }
    };

    for (byte, chunk) in bytes.iter_mut().zip(hex.as_bytes().chunks_exact(2)) {
        *byte = (nibble(chunk[0])? << 4) + nibble(chunk[1])?;
    }

    Ok(())
}

/// An error decoding a hex string.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum HexError {
    #[error("odd number of characters in hex string")]
    OddLength,
    #[error("expected {expected} hex characters but got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("invalid hex ASCII digit {0:#04x}")]
    Digit(u8),
}

/// Serialize a `[u8]` as a `0x`-prefixed hex string.
pub mod bytes {
    use super::*;
    use std::borrow::Cow;

    #[doc(hidden)]
    pub fn encode(bytes: &[u8]) -> String {
        format!("0x{}", encode_hex(bytes))
    }

    #[doc(hidden)]
    pub fn decode<E>(hex: &str) -> Result<Vec<u8>, E>
    where
        E: de::Error,
    {
        let digits = hex
            .strip_prefix("0x")
            .ok_or_else(|| de::Error::custom("bytes missing '0x' prefix"))?;
        decode_hex(digits).map_err(de::Error::custom)
    }

    #[doc(hidden)]
    pub fn serialize<T, S>(value: T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<[u8]>,
        S: Serializer,
    {
        encode(value.as_ref()).serialize(serializer)
    }

    #[doc(hidden)]
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: From<Vec<u8>>,
        D: Deserializer<'de>,
    {
        Ok(decode(&Cow::<str>::deserialize(deserializer)?)?.into())
    }
}

/// Serialize an `Option<Vec<u8>>` as an optional `0x`-prefixed hex string.
pub mod option_bytes {
    use super::*;
    use std::borrow::Cow;

    #[doc(hidden)]
    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<[u8]>,
        S: Serializer,
    {
        value
            .as_ref()
            .map(|value| bytes::encode(value.as_ref()))
            .serialize(serializer)
    }

    #[doc(hidden)]
    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: From<Vec<u8>>,
        D: Deserializer<'de>,
    {
        Option::<Cow<str>>::deserialize(deserializer)?
            .map(|hex| Ok(bytes::decode(&hex)?.into()))
            .transpose()
    }
}

/// Serialize a single byte string parameter list, `(Vec<u8>,)`.
pub mod bytes_param {
    use super::*;
    use std::borrow::Cow;

    #[doc(hidden)]
    pub fn serialize<S>(value: &(Vec<u8>,), serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (bytes::encode(&value.0),).serialize(serializer)
    }

    #[doc(hidden)]
    pub fn deserialize<'de, D>(deserializer: D) -> Result<(Vec<u8>,), D::Error>
    where
        D: Deserializer<'de>,
    {
        let (hex,) = <(Cow<str>,)>::deserialize(deserializer)?;
        Ok((bytes::decode(&hex)?,))
    }
}

/// Serialize an account and byte string parameter list, `(Address, Vec<u8>)`.
pub mod address_bytes_param {
    use super::*;
    use ethprim::Address;
    use std::borrow::Cow;

    #[doc(hidden)]
    pub fn serialize<S>(value: &(Address, Vec<u8>), serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (value.0, bytes::encode(&value.1)).serialize(serializer)
    }

    #[doc(hidden)]
    pub fn deserialize<'de, D>(deserializer: D) -> Result<(Address, Vec<u8>), D::Error>
    where
        D: Deserializer<'de>,
    {
        let (address, hex) = <(Address, Cow<str>)>::deserialize(deserializer)?;
        Ok((address, bytes::decode(&hex)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        assert_eq!(encode_hex(&[0x00, 0xab, 0x7f]), "00ab7f");
        assert_eq!(decode_hex("0x00AB7f").unwrap(), [0x00, 0xab, 0x7f]);
        assert_eq!(decode_hex("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn hex_errors() {
        assert_eq!(decode_hex("abc"), Err(HexError::OddLength));
        assert_eq!(decode_hex("zz"), Err(HexError::Digit(b'z')));
    }

    #[test]
    fn prefixed_bytes() {
        let value = serde_json::to_value(Wrapper(vec![1, 2])).unwrap();
        assert_eq!(value, serde_json::json!("0x0102"));
        let wrapper = serde_json::from_value::<Wrapper>(value).unwrap();
        assert_eq!(wrapper.0, [1, 2]);
        assert!(serde_json::from_value::<Wrapper>(serde_json::json!("0102")).is_err());
    }

    #[test]
    fn byte_params() {
        let value = bytes_param::serialize(&(vec![0xab],), serde_json::value::Serializer).unwrap();
        assert_eq!(value, serde_json::json!(["0xab"]));
        assert_eq!(bytes_param::deserialize(value).unwrap(), (vec![0xab],));
    }

    #[derive(serde::Deserialize, serde::Serialize)]
    struct Wrapper(#[serde(with = "bytes")] Vec<u8>);
}
