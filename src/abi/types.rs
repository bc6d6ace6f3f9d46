//! Solidity type family descriptors.

use super::{
    formatters::*,
    param::{substr, SolidityParam, WORD_HEX_LEN},
    Error, Token,
};

type InputFormatter = fn(&Token) -> Result<SolidityParam, Error>;
type OutputFormatter = fn(&SolidityParam) -> Result<Token, Error>;

/// How a descriptor matches type names.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Match {
    /// Matches the exact name, or the name followed by `[]`.
    Strict,
    /// Matches any type name starting with the descriptor name, for example
    /// `uint` matches `uint8`, `uint256` and `uint256[]`.
    Prefix,
}

/// How values of a type are laid out.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// One word per element.
    Value,
    /// A length prefixed dynamic blob.
    Bytes,
}

/// A descriptor for one Solidity type family.
#[derive(Clone, Copy)]
pub struct SolidityType {
    name: &'static str,
    matching: Match,
    mode: Mode,
    input_formatter: InputFormatter,
    output_formatter: OutputFormatter,
}

impl SolidityType {
    /// Creates a new type descriptor.
    pub const fn new(
        name: &'static str,
        matching: Match,
        mode: Mode,
        input_formatter: InputFormatter,
        output_formatter: OutputFormatter,
    ) -> Self {
        Self {
            name,
            matching,
            mode,
            input_formatter,
            output_formatter,
        }
    }

    /// The type family name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The match mode of the descriptor.
    pub fn matching(&self) -> Match {
        self.matching
    }

    /// The layout mode of the descriptor.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns `true` if the descriptor handles the given type name.
    pub fn is_type(&self, name: &str) -> bool {
        match self.matching {
            Match::Strict => match name.strip_prefix(self.name) {
                Some(rest) => rest.is_empty() || rest == "[]",
                None => false,
            },
            Match::Prefix => name.starts_with(self.name),
        }
    }

    /// Formats a value into a parameter, encoding it as a dynamic array when
    /// `array_type` is set and the value is an array.
    pub fn format_input(&self, value: &Token, array_type: bool) -> Result<SolidityParam, Error> {
        match value {
            Token::Array(elements) if array_type => {
                let length = format_input_int(&Token::from(elements.len() as u64))?;
                let param = elements.iter().try_fold(length, |acc, element| {
                    Ok::<_, Error>(acc.combine(&(self.input_formatter)(element)?))
                })?;
                Ok(param.with_offset(32))
            }
            _ => (self.input_formatter)(value),
        }
    }

    /// Formats a parameter back into a value. When `array_type` is set, the
    /// parameter's dynamic part holds a length word followed by one word per
    /// element.
    pub fn format_output(&self, param: &SolidityParam, array_type: bool) -> Result<Token, Error> {
        if !array_type {
            return (self.output_formatter)(param);
        }

        let data = param.dynamic_part();
        let length = SolidityParam::get_offset(data, 0)?;
        (0..length)
            .map(|i| {
                let word = substr(data, (i + 1) * WORD_HEX_LEN, WORD_HEX_LEN);
                (self.output_formatter)(&SolidityParam::new(word))
            })
            .collect::<Result<_, _>>()
            .map(Token::Array)
    }

    /// Slices the parameter for the value at word `index` out of an encoding.
    pub fn slice_param(&self, bytes: &str, index: usize, name: &str) -> Result<SolidityParam, Error> {
        if self.mode == Mode::Bytes {
            SolidityParam::decode_bytes(bytes, index)
        } else if name.ends_with("[]") {
            SolidityParam::decode_array(bytes, index)
        } else {
            Ok(SolidityParam::decode_param(bytes, index))
        }
    }
}

impl std::fmt::Debug for SolidityType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SolidityType")
            .field("name", &self.name)
            .field("matching", &self.matching)
            .field("mode", &self.mode)
            .finish()
    }
}

/// The built-in type descriptors, in match priority order.
pub const DEFAULT_TYPES: &[SolidityType] = &[
    SolidityType::new(
        "address",
        Match::Strict,
        Mode::Value,
        format_input_address,
        format_output_address,
    ),
    SolidityType::new(
        "bool",
        Match::Strict,
        Mode::Value,
        format_input_bool,
        format_output_bool,
    ),
    SolidityType::new(
        "int",
        Match::Prefix,
        Mode::Value,
        format_input_int,
        format_output_int,
    ),
    SolidityType::new(
        "uint",
        Match::Prefix,
        Mode::Value,
        format_input_int,
        format_output_uint,
    ),
    SolidityType::new(
        "bytes",
        Match::Strict,
        Mode::Bytes,
        format_input_dynamic_bytes,
        format_output_dynamic_bytes,
    ),
    SolidityType::new(
        "bytes",
        Match::Prefix,
        Mode::Value,
        format_input_bytes,
        format_output_bytes,
    ),
    SolidityType::new(
        "real",
        Match::Prefix,
        Mode::Value,
        format_input_real,
        format_output_real,
    ),
    SolidityType::new(
        "ureal",
        Match::Prefix,
        Mode::Value,
        format_input_real,
        format_output_ureal,
    ),
    SolidityType::new(
        "string",
        Match::Strict,
        Mode::Bytes,
        format_input_dynamic_bytes,
        format_output_dynamic_bytes,
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn find(name: &str, matching: Match) -> SolidityType {
        *DEFAULT_TYPES
            .iter()
            .find(|ty| ty.name() == name && ty.matching() == matching)
            .unwrap()
    }

    #[test]
    fn prefix_matching() {
        let uint = find("uint", Match::Prefix);
        assert!(uint.is_type("uint"));
        assert!(uint.is_type("uint256"));
        assert!(uint.is_type("uint8"));
        assert!(uint.is_type("uint256[]"));
        assert!(!uint.is_type("int256"));
    }

    #[test]
    fn strict_matching() {
        let address = find("address", Match::Strict);
        assert!(address.is_type("address"));
        assert!(address.is_type("address[]"));
        assert!(!address.is_type("addressX"));
        assert!(!address.is_type("address[2]"));
    }

    #[test]
    fn arrays_are_length_prefixed() {
        let uint = find("uint", Match::Prefix);
        let values = Token::from(vec![1u64, 2, 3]);
        let param = uint.format_input(&values, true).unwrap();
        assert!(param.is_dynamic());
        assert_eq!(param.dynamic_part_length(), 4 * 32);
        assert_eq!(uint.format_output(&param, true).unwrap(), values);
    }

    #[test]
    fn empty_arrays() {
        let int = find("int", Match::Prefix);
        let param = int.format_input(&Token::Array(vec![]), true).unwrap();
        assert_eq!(param.dynamic_part_length(), 32);
        assert_eq!(
            int.format_output(&param, true).unwrap(),
            Token::Array(vec![])
        );
    }
}
