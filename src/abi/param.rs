//! Word aligned encoded values and the head/tail layout of parameter lists.

use super::Error;
use crate::utils;
use ethprim::U256;

/// Number of hex characters in a 32-byte word.
pub const WORD_HEX_LEN: usize = 64;

/// Number of bytes in a word.
pub const WORD_SIZE: usize = 32;

/// A single encoded value made of one or more 32-byte words.
///
/// A parameter is dynamic when it spans more than one word or when an offset
/// was explicitly assigned. Dynamic parameters are laid out as an offset word
/// in the head of an encoding with their value appended to the tail.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SolidityParam {
    value: String,
    offset: Option<usize>,
}

impl SolidityParam {
    /// Creates a new parameter from hex digits (without `0x` prefix).
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            offset: None,
        }
    }

    /// Creates a new parameter with an explicit offset.
    pub fn with_value_and_offset(value: impl Into<String>, offset: usize) -> Self {
        Self {
            value: value.into(),
            offset: Some(offset),
        }
    }

    /// The raw hex value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The byte offset, if one was assigned.
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Number of bytes in the dynamic part.
    pub fn dynamic_part_length(&self) -> usize {
        self.dynamic_part().len() / 2
    }

    /// Returns a copy of this parameter with the given offset.
    pub fn with_offset(&self, offset: usize) -> Self {
        Self::with_value_and_offset(self.value.clone(), offset)
    }

    /// Appends the value of `other` to this parameter's value. The result has
    /// no offset.
    pub fn combine(&self, other: &Self) -> Self {
        Self::new(format!("{}{}", self.value, other.value))
    }

    /// Returns `true` if this parameter must be encoded out of line.
    pub fn is_dynamic(&self) -> bool {
        self.value.len() > WORD_HEX_LEN || self.offset.is_some()
    }

    /// The offset encoded as a word, or an empty string for static values.
    pub fn offset_as_bytes(&self) -> String {
        match self.offset {
            Some(offset) if self.is_dynamic() => utils::to_word(U256::from(offset as u64)),
            _ => String::new(),
        }
    }

    /// The part of the encoding that goes in the head.
    pub fn static_part(&self) -> String {
        if self.is_dynamic() {
            self.offset_as_bytes()
        } else {
            self.value.clone()
        }
    }

    /// The part of the encoding that goes in the tail.
    pub fn dynamic_part(&self) -> &str {
        if self.is_dynamic() {
            &self.value
        } else {
            ""
        }
    }

    /// Encodes this parameter on its own.
    pub fn encode(&self) -> String {
        format!("{}{}", self.static_part(), self.dynamic_part())
    }

    /// Encodes a list of parameters, resolving the offsets of dynamic ones
    /// relative to the start of the encoding.
    pub fn encode_list(params: &[Self]) -> String {
        let mut total_offset = params.len() * WORD_SIZE;
        let params = params
            .iter()
            .map(|param| {
                if !param.is_dynamic() {
                    return param.clone();
                }
                let offset = total_offset;
                total_offset += param.dynamic_part_length();
                param.with_offset(offset)
            })
            .collect::<Vec<_>>();

        let mut result = String::new();
        for param in &params {
            result.push_str(&param.static_part());
        }
        for param in &params {
            result.push_str(param.dynamic_part());
        }
        result
    }

    /// Slices the static word at `index` out of an encoding.
    pub fn decode_param(bytes: &str, index: usize) -> Self {
        Self::new(substr(bytes, index * WORD_HEX_LEN, WORD_HEX_LEN))
    }

    /// Reads the byte offset stored in the word at `index`.
    pub fn get_offset(bytes: &str, index: usize) -> Result<usize, Error> {
        read_usize(substr(bytes, index * WORD_HEX_LEN, WORD_HEX_LEN))
    }

    /// Slices a dynamic `bytes` value referenced by the word at `index`.
    ///
    /// Only the length word and the first data word are returned, so values
    /// longer than 32 bytes are truncated.
    pub fn decode_bytes(bytes: &str, index: usize) -> Result<Self, Error> {
        let offset = Self::get_offset(bytes, index)?;
        let start = hex_position(offset)?;
        Ok(Self::with_value_and_offset(
            substr(bytes, start, 2 * WORD_HEX_LEN),
            0,
        ))
    }

    /// Slices a dynamic array referenced by the word at `index`, including its
    /// length word.
    pub fn decode_array(bytes: &str, index: usize) -> Result<Self, Error> {
        let offset = Self::get_offset(bytes, index)?;
        let start = hex_position(offset)?;
        let length = read_usize(substr(bytes, start, WORD_HEX_LEN))?;
        let words = length
            .checked_add(1)
            .and_then(|words| words.checked_mul(WORD_HEX_LEN))
            .ok_or(Error::InvalidData("offset out of range"))?;
        Ok(Self::with_value_and_offset(substr(bytes, start, words), 0))
    }
}

/// Substring by character position that clamps to the end of the input.
pub(super) fn substr(value: &str, start: usize, len: usize) -> &str {
    let start = start.min(value.len());
    let end = start.saturating_add(len).min(value.len());
    value.get(start..end).unwrap_or_default()
}

fn hex_position(offset: usize) -> Result<usize, Error> {
    offset
        .checked_mul(2)
        .ok_or(Error::InvalidData("offset out of range"))
}

fn read_usize(word: &str) -> Result<usize, Error> {
    let value = utils::from_word(word).map_err(|_| Error::InvalidData("invalid hex word"))?;
    match value.into_words() {
        (0, low) => usize::try_from(low).map_err(|_| Error::InvalidData("offset out of range")),
        _ => Err(Error::InvalidData("offset out of range")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(n: u64) -> String {
        utils::to_word(U256::from(n))
    }

    #[test]
    fn dynamic_detection() {
        assert!(!SolidityParam::new(word(1)).is_dynamic());
        assert!(SolidityParam::new(word(1)).with_offset(0).is_dynamic());
        assert!(SolidityParam::new(word(1) + &word(2)).is_dynamic());
    }

    #[test]
    fn static_and_dynamic_parts() {
        let param = SolidityParam::new(word(7));
        assert_eq!(param.static_part(), word(7));
        assert_eq!(param.dynamic_part(), "");
        assert_eq!(param.offset_as_bytes(), "");
        assert_eq!(param.encode(), word(7));

        let param = SolidityParam::new(word(1) + &word(2)).with_offset(32);
        assert_eq!(param.static_part(), word(32));
        assert_eq!(param.dynamic_part(), word(1) + &word(2));
        assert_eq!(param.dynamic_part_length(), 64);
        assert_eq!(param.encode(), word(32) + &word(1) + &word(2));
    }

    #[test]
    fn combine_drops_offset() {
        let a = SolidityParam::new(word(1)).with_offset(5);
        let b = SolidityParam::new(word(2));
        let combined = a.combine(&b);
        assert_eq!(combined.value(), word(1) + &word(2));
        assert_eq!(combined.offset(), None);
    }

    #[test]
    fn encodes_lists_with_offsets() {
        let params = [
            SolidityParam::new(word(1)),
            SolidityParam::new(word(1) + &word(0xaa)).with_offset(32),
            SolidityParam::new(word(2)),
            SolidityParam::new(word(2) + &word(0xbb) + &word(0xcc)).with_offset(32),
        ];
        let encoded = SolidityParam::encode_list(&params);
        let expected = [
            word(1),
            word(4 * 32),
            word(2),
            word(4 * 32 + 64),
            word(1),
            word(0xaa),
            word(2),
            word(0xbb),
            word(0xcc),
        ]
        .concat();
        assert_eq!(encoded, expected);
    }

    #[test]
    fn decodes_slices() {
        let bytes = [word(0x20), word(2), word(5), word(6)].concat();
        assert_eq!(SolidityParam::decode_param(&bytes, 2).value(), word(5));
        assert_eq!(SolidityParam::get_offset(&bytes, 0).unwrap(), 32);

        let array = SolidityParam::decode_array(&bytes, 0).unwrap();
        assert_eq!(array.value(), [word(2), word(5), word(6)].concat());
        assert_eq!(array.offset(), Some(0));

        let blob = SolidityParam::decode_bytes(&bytes, 0).unwrap();
        assert_eq!(blob.value(), [word(2), word(5)].concat());
    }

    #[test]
    fn slicing_past_the_end_is_clamped() {
        let bytes = word(1);
        assert_eq!(SolidityParam::decode_param(&bytes, 3).value(), "");
        assert_eq!(SolidityParam::get_offset(&bytes, 3).unwrap(), 0);
    }

    #[test]
    fn rejects_huge_offsets() {
        let bytes = "f".repeat(64);
        assert!(matches!(
            SolidityParam::decode_array(&bytes, 0),
            Err(Error::InvalidData(_))
        ));
    }
}
