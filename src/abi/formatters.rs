//! Input and output formatters for each Solidity type family.
//!
//! Input formatters turn a [`Token`] into a [`SolidityParam`]; output
//! formatters read a [`SolidityParam`] sliced out of an encoding back into a
//! [`Token`].

use super::{
    param::{SolidityParam, WORD_HEX_LEN, WORD_SIZE},
    Error, Token,
};
use crate::{serialization, utils};
use ethprim::{Address, U256};

/// Number of fractional bits of `real` and `ureal` values.
const REAL_FRACTION_BITS: i32 = 128;

const TRUE_WORD: &str = "0000000000000000000000000000000000000000000000000000000000000001";
const FALSE_WORD: &str = "0000000000000000000000000000000000000000000000000000000000000000";

pub fn format_input_int(value: &Token) -> Result<SolidityParam, Error> {
    Ok(SolidityParam::new(utils::to_word(integer(value)?)))
}

pub fn format_input_address(value: &Token) -> Result<SolidityParam, Error> {
    format_input_int(value)
}

pub fn format_input_bool(value: &Token) -> Result<SolidityParam, Error> {
    match value {
        Token::Bool(true) => Ok(SolidityParam::new(TRUE_WORD)),
        Token::Bool(false) => Ok(SolidityParam::new(FALSE_WORD)),
        other => Err(Error::unexpected("bool", other)),
    }
}

pub fn format_input_bytes(value: &Token) -> Result<SolidityParam, Error> {
    let value = bytes(value)?;
    Ok(SolidityParam::new(padded_hex(value)))
}

pub fn format_input_dynamic_bytes(value: &Token) -> Result<SolidityParam, Error> {
    let value = bytes(value)?;
    let length = utils::to_word(U256::from(value.len() as u64));
    Ok(SolidityParam::with_value_and_offset(
        length + &padded_hex(value),
        WORD_SIZE,
    ))
}

pub fn format_input_real(value: &Token) -> Result<SolidityParam, Error> {
    let word = match value {
        Token::Real(value) => fixed_point(*value, REAL_FRACTION_BITS)?,
        Token::Int(_) | Token::Uint(_) => {
            let word = integer(value)?;
            let negative = matches!(value, Token::Int(value) if value.is_negative());
            let magnitude = if negative {
                U256::ZERO.wrapping_sub(word)
            } else {
                word
            };
            if magnitude.leading_zeros() < REAL_FRACTION_BITS as u32 {
                return Err(Error::out_of_range("real"));
            }
            let shifted = magnitude << REAL_FRACTION_BITS as u32;
            if negative {
                U256::ZERO.wrapping_sub(shifted)
            } else {
                shifted
            }
        }
        other => return Err(Error::unexpected("real", other)),
    };
    Ok(SolidityParam::new(utils::to_word(word)))
}

pub fn format_output_int(param: &SolidityParam) -> Result<Token, Error> {
    Ok(Token::Int(utils::from_twos_complement(word(param)?)))
}

pub fn format_output_uint(param: &SolidityParam) -> Result<Token, Error> {
    Ok(Token::Uint(word(param)?))
}

pub fn format_output_real(param: &SolidityParam) -> Result<Token, Error> {
    let value = utils::from_twos_complement(word(param)?);
    let magnitude = if value.is_negative() {
        -utils::to_f64(U256::ZERO.wrapping_sub(utils::to_twos_complement(value)))
    } else {
        utils::to_f64(utils::to_twos_complement(value))
    };
    Ok(Token::Real(magnitude / real_scale()))
}

pub fn format_output_ureal(param: &SolidityParam) -> Result<Token, Error> {
    Ok(Token::Real(utils::to_f64(word(param)?) / real_scale()))
}

pub fn format_output_bool(param: &SolidityParam) -> Result<Token, Error> {
    Ok(Token::Bool(param.static_part() == TRUE_WORD))
}

pub fn format_output_bytes(param: &SolidityParam) -> Result<Token, Error> {
    ascii(&param.static_part())
}

pub fn format_output_dynamic_bytes(param: &SolidityParam) -> Result<Token, Error> {
    let data = param.dynamic_part().get(WORD_HEX_LEN..).unwrap_or_default();
    ascii(data)
}

pub fn format_output_address(param: &SolidityParam) -> Result<Token, Error> {
    let value = param.static_part();
    let hex = value
        .get(value.len().saturating_sub(40)..)
        .unwrap_or_default();
    let mut address = [0; 20];
    serialization::decode_hex_into(&utils::pad_left(hex, 40, '0'), &mut address)
        .map_err(|_| Error::InvalidData("invalid address word"))?;
    Ok(Token::Address(Address(address)))
}

/// Converts a numeric token into its 256-bit two's complement word.
fn integer(value: &Token) -> Result<U256, Error> {
    match value {
        Token::Uint(value) => Ok(*value),
        Token::Int(value) => Ok(utils::to_twos_complement(*value)),
        Token::Real(value) => fixed_point(*value, 0),
        Token::Address(address) => {
            let mut word = [0; 32];
            word[12..].copy_from_slice(&address.0);
            Ok(U256::from_be_bytes(word))
        }
        other => Err(Error::unexpected("integer", other)),
    }
}

/// Converts `value * 2^fraction_bits` to a two's complement word, rounding
/// towards negative infinity.
fn fixed_point(value: f64, fraction_bits: i32) -> Result<U256, Error> {
    if !value.is_finite() {
        return Err(Error::InvalidValue {
            expected: "finite number",
            found: "real",
        });
    }

    let bits = value.to_bits();
    let negative = bits >> 63 != 0;
    let biased_exponent = ((bits >> 52) & 0x7ff) as i32;
    let fraction = bits & ((1 << 52) - 1);
    // |value| = mantissa * 2^exponent
    let (mantissa, exponent) = if biased_exponent == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1 << 52), biased_exponent - 1075)
    };

    let shift = exponent + fraction_bits;
    let (magnitude, inexact) = if shift >= 0 {
        let width = 64 - mantissa.leading_zeros() as i32;
        if mantissa != 0 && width + shift > 256 {
            return Err(Error::out_of_range("integer"));
        }
        (U256::from(mantissa) << shift as u32, false)
    } else if shift > -64 {
        let shift = (-shift) as u32;
        (
            U256::from(mantissa >> shift),
            mantissa & ((1 << shift) - 1) != 0,
        )
    } else {
        (U256::ZERO, mantissa != 0)
    };

    let magnitude = if negative && inexact {
        magnitude + U256::ONE
    } else {
        magnitude
    };
    Ok(if negative {
        U256::ZERO.wrapping_sub(magnitude)
    } else {
        magnitude
    })
}

fn real_scale() -> f64 {
    2f64.powi(REAL_FRACTION_BITS)
}

fn bytes(value: &Token) -> Result<&str, Error> {
    match value {
        Token::Bytes(value) => Ok(value),
        other => Err(Error::unexpected("bytes", other)),
    }
}

fn padded_hex(value: &str) -> String {
    let hex = utils::from_ascii(value, WORD_SIZE);
    hex[2..].to_owned()
}

fn word(param: &SolidityParam) -> Result<U256, Error> {
    utils::from_word(&param.static_part()).map_err(|_| Error::InvalidData("invalid hex word"))
}

fn ascii(hex: &str) -> Result<Token, Error> {
    utils::to_ascii(hex)
        .map(Token::Bytes)
        .map_err(|_| Error::InvalidData("invalid hex data"))
}
