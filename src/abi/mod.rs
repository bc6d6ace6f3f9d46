//! Solidity ABI encoding and decoding.
//!
//! Values are encoded into lowercase hex strings made of 32-byte words, with
//! dynamic values (arrays, `bytes` and `string`) referenced by offset from the
//! head of the encoding and stored in its tail.
//!
//! ```
//! use web3rpc::abi::{SolidityCoder, Token};
//!
//! let coder = SolidityCoder::default();
//! let encoded = coder.encode_param("int", &Token::from(-1i64)).unwrap();
//! assert_eq!(encoded, "f".repeat(64));
//! assert_eq!(coder.decode_param("int", &encoded).unwrap(), Token::from(-1i64));
//! ```

mod formatters;
pub mod param;
mod token;
pub mod types;

pub use self::{
    param::SolidityParam,
    token::Token,
    types::{Match, Mode, SolidityType, DEFAULT_TYPES},
};
use crate::utils;
use ethprim::Digest;
use thiserror::Error;

/// Encodes and decodes parameter lists against Solidity type names.
#[derive(Clone, Debug)]
pub struct SolidityCoder {
    types: Vec<SolidityType>,
}

impl Default for SolidityCoder {
    fn default() -> Self {
        Self::new(DEFAULT_TYPES.to_vec())
    }
}

impl SolidityCoder {
    /// Creates a coder for the given type descriptors. Earlier descriptors take
    /// precedence when several match the same type name.
    pub fn new(types: Vec<SolidityType>) -> Self {
        Self { types }
    }

    fn require_type(&self, name: &str) -> Result<&SolidityType, Error> {
        self.types
            .iter()
            .find(|ty| ty.is_type(name))
            .ok_or_else(|| Error::InvalidType(name.to_owned()))
    }

    fn format_input(&self, name: &str, value: &Token) -> Result<SolidityParam, Error> {
        self.require_type(name)?
            .format_input(value, name.ends_with("[]"))
    }

    /// Encodes a single value on its own.
    pub fn encode_param(&self, name: &str, value: &Token) -> Result<String, Error> {
        Ok(self.format_input(name, value)?.encode())
    }

    /// Encodes a list of values, e.g. the arguments of a function call.
    pub fn encode_params<S>(&self, names: &[S], values: &[Token]) -> Result<String, Error>
    where
        S: AsRef<str>,
    {
        if names.len() != values.len() {
            return Err(Error::LengthMismatch {
                types: names.len(),
                values: values.len(),
            });
        }

        let params = names
            .iter()
            .zip(values)
            .map(|(name, value)| self.format_input(name.as_ref(), value))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SolidityParam::encode_list(&params))
    }

    /// Decodes a single value.
    pub fn decode_param(&self, name: &str, bytes: &str) -> Result<Token, Error> {
        let mut tokens = self.decode_params(&[name], bytes)?;
        Ok(tokens.remove(0))
    }

    /// Decodes a list of values, e.g. the return data of a function call.
    pub fn decode_params<S>(&self, names: &[S], bytes: &str) -> Result<Vec<Token>, Error>
    where
        S: AsRef<str>,
    {
        let bytes = bytes.strip_prefix("0x").unwrap_or(bytes);
        names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let name = name.as_ref();
                let ty = self.require_type(name)?;
                let param = ty.slice_param(bytes, index, name)?;
                ty.format_output(&param, name.ends_with("[]"))
            })
            .collect()
    }
}

/// Computes the 4-byte function selector for a canonical signature such as
/// `transfer(address,uint256)`.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let digest = utils::sha3(signature);
    let mut selector = [0; 4];
    selector.copy_from_slice(&digest[..4]);
    selector
}

/// Computes the topic of a non-anonymous event from its canonical signature.
pub fn event_topic(signature: &str) -> Digest {
    utils::sha3(signature)
}

/// An ABI encoding or decoding error.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    #[error("invalid solidity type!: {0}")]
    InvalidType(String),
    #[error("expected {expected} value but got {found}")]
    InvalidValue {
        expected: &'static str,
        found: &'static str,
    },
    #[error("{0} value out of range")]
    OutOfRange(&'static str),
    #[error("invalid ABI data: {0}")]
    InvalidData(&'static str),
    #[error("{types} types but {values} values")]
    LengthMismatch { types: usize, values: usize },
}

impl Error {
    fn unexpected(expected: &'static str, found: &Token) -> Self {
        Self::InvalidValue {
            expected,
            found: found.kind(),
        }
    }

    fn out_of_range(kind: &'static str) -> Self {
        Self::OutOfRange(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethprim::{address, I256, U256};
    use hex_literal::hex;

    fn word(n: u64) -> String {
        utils::to_word(U256::from(n))
    }

    #[test]
    fn roundtrips_every_type_family() {
        let coder = SolidityCoder::default();
        let cases = [
            ("uint", Token::from(255u64)),
            ("uint256", Token::Uint(U256::MAX)),
            ("int8", Token::from(-42i64)),
            ("int", Token::Int(I256::MIN)),
            ("bool", Token::Bool(true)),
            (
                "address",
                Token::Address(address!("0x407D73d8a49eeb85D32Cf465507dd71d507100c1")),
            ),
            ("bytes32", Token::from("hello")),
            ("bytes", Token::from("dynamic")),
            ("string", Token::from("hello world")),
            ("real", Token::Real(-0.75)),
            ("ureal", Token::Real(8.5)),
            ("uint[]", Token::from(vec![1u64, 2, 3])),
            ("int256[]", Token::from(vec![-1i64, 1])),
            ("bool[]", Token::from(vec![true, false])),
        ];

        for (name, value) in cases {
            let encoded = coder.encode_param(name, &value).unwrap();
            let decoded = coder.decode_params(&[name], &encoded).unwrap();
            assert_eq!(decoded, [value], "{name}");
        }
    }

    #[test]
    fn decodes_uint() {
        let coder = SolidityCoder::default();
        let encoded = coder.encode_param("uint", &Token::from(255u64)).unwrap();
        assert_eq!(encoded, word(255));
        assert_eq!(
            coder.decode_param("uint", &encoded).unwrap(),
            Token::from(255u64)
        );
    }

    #[test]
    fn negative_integers_use_twos_complement() {
        let coder = SolidityCoder::default();
        let encoded = coder.encode_param("int", &Token::from(-1i64)).unwrap();
        assert_eq!(encoded, "f".repeat(64));

        for n in [-1i64, -2, -255, -256, i64::MIN] {
            let encoded = coder.encode_param("int", &Token::from(n)).unwrap();
            assert_eq!(encoded.len(), 64);
            let first = u8::from_str_radix(&encoded[..1], 16).unwrap();
            assert_ne!(first & 0x8, 0);
            assert_eq!(coder.decode_param("int", &encoded).unwrap(), Token::from(n));
        }
    }

    #[test]
    fn arrays_are_length_prefixed() {
        let coder = SolidityCoder::default();
        let encoded = coder
            .encode_params(&["uint256[]"], &[Token::from(vec![1u64, 2, 3])])
            .unwrap();
        assert_eq!(
            encoded,
            [word(32), word(3), word(1), word(2), word(3)].concat()
        );
    }

    #[test]
    fn dynamic_offsets_point_at_their_payload() {
        let coder = SolidityCoder::default();
        let names = ["uint", "bytes", "int[]", "bool", "uint[]"];
        let values = [
            Token::from(7u64),
            Token::from("abc"),
            Token::from(vec![-3i64, 4]),
            Token::Bool(true),
            Token::from(vec![9u64]),
        ];
        let encoded = coder.encode_params(&names, &values).unwrap();

        for (index, (name, value)) in names.iter().zip(&values).enumerate() {
            let param = coder.format_input(name, value).unwrap();
            if !param.is_dynamic() {
                continue;
            }
            let offset = SolidityParam::get_offset(&encoded, index).unwrap();
            let payload = param.dynamic_part();
            assert_eq!(&encoded[offset * 2..offset * 2 + payload.len()], payload);
        }

        assert_eq!(coder.decode_params(&names, &encoded).unwrap(), values);
    }

    #[test]
    fn single_dynamic_param_encoding() {
        let coder = SolidityCoder::default();
        let encoded = coder.encode_param("bytes", &Token::from("gavofyork")).unwrap();
        assert_eq!(
            encoded,
            format!(
                "{}{}{}{}",
                word(32),
                word(9),
                "6761766f66796f726b",
                "0".repeat(46)
            ),
        );
    }

    #[test]
    fn long_dynamic_bytes_are_truncated_when_decoding() {
        let coder = SolidityCoder::default();
        let value = "a".repeat(40);
        let encoded = coder.encode_param("bytes", &Token::from(value.as_str())).unwrap();
        assert_eq!(
            coder.decode_param("bytes", &encoded).unwrap(),
            Token::from("a".repeat(32))
        );
    }

    #[test]
    fn fixed_bytes_stop_at_nul() {
        let coder = SolidityCoder::default();
        let encoded = format!("6162006364{}", "0".repeat(54));
        assert_eq!(
            coder.decode_param("bytes32", &encoded).unwrap(),
            Token::from("ab")
        );
    }

    #[test]
    fn accepts_prefixed_data() {
        let coder = SolidityCoder::default();
        let encoded = format!("0x{}", word(1));
        assert_eq!(
            coder.decode_param("bool", &encoded).unwrap(),
            Token::Bool(true)
        );
    }

    #[test]
    fn rejects_unknown_types() {
        let coder = SolidityCoder::default();
        let err = coder
            .encode_param("nosuchtype", &Token::from(1u64))
            .unwrap_err();
        assert!(err.to_string().contains("invalid solidity type!"));
        assert_eq!(
            coder.decode_param("addressX", &word(1)).unwrap_err(),
            Error::InvalidType("addressX".to_owned())
        );
    }

    #[test]
    fn rejects_mismatched_values() {
        let coder = SolidityCoder::default();
        assert!(matches!(
            coder.encode_param("bool", &Token::from("yes")),
            Err(Error::InvalidValue { .. })
        ));
        assert!(matches!(
            coder.encode_params(&["uint", "uint"], &[Token::from(1u64)]),
            Err(Error::LengthMismatch { types: 2, values: 1 })
        ));
    }

    #[test]
    fn selectors() {
        assert_eq!(
            function_selector("transfer(address,uint256)"),
            hex!("a9059cbb")
        );
        assert_eq!(
            *event_topic("Transfer(address,address,uint256)"),
            hex!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"),
        );
    }
}
