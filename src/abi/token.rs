//! Plain values flowing in and out of the ABI codec.

use ethprim::{Address, I256, U256};

/// A Solidity value.
///
/// Encoding is lenient in the same way the type descriptors are: any numeric
/// token can be used for any numeric Solidity type, while decoding always
/// produces the token that matches the type family.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// An `address` value.
    Address(Address),
    /// A `bool` value.
    Bool(bool),
    /// A signed `int<N>` value.
    Int(I256),
    /// An unsigned `uint<N>` value.
    Uint(U256),
    /// A `real`/`ureal` fixed point value.
    Real(f64),
    /// A `bytes`, `bytes<N>` or `string` value.
    Bytes(String),
    /// A dynamic array `T[]`.
    Array(Vec<Token>),
}

impl Token {
    /// Returns a short description of the token kind, used for errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Address(_) => "address",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Real(_) => "real",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "array",
        }
    }
}

impl From<Address> for Token {
    fn from(value: Address) -> Self {
        Self::Address(value)
    }
}

impl From<bool> for Token {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<I256> for Token {
    fn from(value: I256) -> Self {
        Self::Int(value)
    }
}

impl From<U256> for Token {
    fn from(value: U256) -> Self {
        Self::Uint(value)
    }
}

impl From<f64> for Token {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self::Bytes(value.to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self::Bytes(value)
    }
}

macro_rules! impl_from_int {
    ($variant:ident, $wide:ty: $($t:ty),*) => {$(
        impl From<$t> for Token {
            fn from(value: $t) -> Self {
                Self::$variant(<$wide>::from(value))
            }
        }
    )*};
}

impl_from_int!(Uint, U256: u8, u16, u32, u64, u128);
impl_from_int!(Int, I256: i8, i16, i32, i64, i128);

impl<T> From<Vec<T>> for Token
where
    T: Into<Token>,
{
    fn from(values: Vec<T>) -> Self {
        Self::Array(values.into_iter().map(Into::into).collect())
    }
}
