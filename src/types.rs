//! Ethereum RPC parameter types.

use crate::{serialization, utils};
use ethprim::AsU256 as _;
use serde::{de::Deserializer, ser::Serializer, Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

pub use arrayvec::ArrayVec;
pub use ethprim::{Address, Digest, I256, U256};

/// Empty JSON RPC parameters.
pub struct Empty;

impl Serialize for Empty {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        [(); 0].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Empty {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        <[(); 0]>::deserialize(deserializer)?;
        Ok(Empty)
    }
}

/// Block number or tag.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockSpec {
    /// Block by number.
    Number(U256),
    /// Block by tag.
    Tag(BlockTag),
}

impl Default for BlockSpec {
    fn default() -> Self {
        Self::Tag(Default::default())
    }
}

impl From<U256> for BlockSpec {
    fn from(number: U256) -> Self {
        Self::Number(number)
    }
}

impl From<u64> for BlockSpec {
    fn from(number: u64) -> Self {
        number.as_u256().into()
    }
}

impl From<BlockTag> for BlockSpec {
    fn from(tag: BlockTag) -> Self {
        Self::Tag(tag)
    }
}

/// Block number, tag, or block hash.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BlockId {
    /// Block by number.
    Number(U256),
    /// Block by hash.
    Hash(Digest),
    /// Block by tag.
    Tag(BlockTag),
}

impl Default for BlockId {
    fn default() -> Self {
        Self::Tag(Default::default())
    }
}

impl From<U256> for BlockId {
    fn from(number: U256) -> Self {
        Self::Number(number)
    }
}

impl From<u64> for BlockId {
    fn from(number: u64) -> Self {
        number.as_u256().into()
    }
}

impl From<BlockTag> for BlockId {
    fn from(tag: BlockTag) -> Self {
        Self::Tag(tag)
    }
}

impl From<BlockSpec> for BlockId {
    fn from(spec: BlockSpec) -> Self {
        match spec {
            BlockSpec::Number(number) => Self::Number(number),
            BlockSpec::Tag(tag) => Self::Tag(tag),
        }
    }
}

/// Block tag.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockTag {
    /// The genesis block.
    Earliest,
    /// The most recent block in the canonical chain observed by the client.
    #[default]
    Latest,
    /// The block currently being built from pending transactions.
    Pending,
}

/// An identifier for a filter installed on the node.
///
/// Displays as minimal `0x` prefixed hex, which is how it is keyed for
/// polling.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct FilterId(U256);

impl FilterId {
    /// Creates a filter from a raw ID. The caller must make sure that this is a
    /// valid ID, otherwise filter ID RPC methods will fail.
    pub fn from_raw(value: U256) -> Self {
        Self(value)
    }

    /// Gets the raw underlying ID for the filter.
    pub fn into_raw(self) -> U256 {
        self.0
    }
}

impl Display for FilterId {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let word = utils::to_word(self.0);
        let digits = word.trim_start_matches('0');
        write!(f, "0x{}", if digits.is_empty() { "0" } else { digits })
    }
}

/// Whether block transactions should be hydrated.
#[derive(Clone, Copy, Debug, Default)]
pub enum Hydrated {
    /// Only fetch transaction hashes for blocks.
    #[default]
    No,
    /// Fetch full transaction data for blocks.
    Yes,
}

impl Serialize for Hydrated {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        matches!(self, Self::Yes).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Hydrated {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match bool::deserialize(deserializer)? {
            false => Self::No,
            true => Self::Yes,
        })
    }
}

/// A message call or transaction request.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCall {
    /// The account sending the transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// The transaction recipient, `None` for contract creation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    /// The calldata, usually a function selector followed by ABI encoded
    /// arguments.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serialization::option_bytes"
    )]
    pub data: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,
}

/// A value used for filtering logs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum LogFilterValue<T> {
    /// A filter that accepts all values.
    #[default]
    Any,
    /// A filter that only accepts a single value.
    Exact(T),
    /// A filter that accepts any one of the specified values.
    OneOf(Vec<T>),
}

impl<T> LogFilterValue<T> {
    /// Returns `true` if the filter accepts all values.
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl<T> Serialize for LogFilterValue<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Any => serializer.serialize_unit(),
            Self::Exact(value) => value.serialize(serializer),
            Self::OneOf(values) => values.serialize(serializer),
        }
    }
}

impl<'de, T> Deserialize<'de> for LogFilterValue<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Value<T> {
            Exact(T),
            OneOf(Vec<T>),
        }

        match <Option<Value<T>>>::deserialize(deserializer)? {
            None => Ok(Self::Any),
            Some(Value::Exact(value)) => Ok(Self::Exact(value)),
            Some(Value::OneOf(values)) => Ok(Self::OneOf(values)),
        }
    }
}

/// A log topic or whisper topic as `0x` prefixed hex.
///
/// Topics that are not already hex are treated as text and hex encoded
/// without padding.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Creates a topic from hex or text.
    pub fn new(value: &str) -> Self {
        if value.starts_with("0x") {
            Self(value.to_owned())
        } else {
            Self(utils::from_ascii(value, 0))
        }
    }

    /// The topic as hex.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Topic {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Digest> for Topic {
    fn from(value: Digest) -> Self {
        Self(serialization::bytes::encode(&*value))
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(&value))
    }
}

/// Options for a log filter.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogOptions {
    /// The first block to include logs for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_block: Option<BlockSpec>,
    /// The last block to include logs for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_block: Option<BlockSpec>,
    /// The contract addresses to fetch logs for.
    #[serde(skip_serializing_if = "LogFilterValue::is_any")]
    pub address: LogFilterValue<Address>,
    /// The log topics to filter for, by position.
    pub topics: ArrayVec<LogFilterValue<Topic>, 4>,
    /// The recipient identity, used by whisper filters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// Options a filter is created with.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FilterOptions {
    /// A block or pending transaction filter.
    Tag(BlockTag),
    /// A log or whisper message filter.
    Logs(LogOptions),
}

impl FilterOptions {
    /// Filter for new block hashes.
    pub fn latest() -> Self {
        Self::Tag(BlockTag::Latest)
    }

    /// Filter for new pending transaction hashes.
    pub fn pending() -> Self {
        Self::Tag(BlockTag::Pending)
    }
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self::Logs(LogOptions::default())
    }
}

impl From<LogOptions> for FilterOptions {
    fn from(options: LogOptions) -> Self {
        Self::Logs(options)
    }
}

/// A whisper message to post.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Identity of the sender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Identity of the receiver.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default)]
    pub topics: Vec<Topic>,
    #[serde(with = "serialization::bytes")]
    pub payload: Vec<u8>,
    pub priority: U256,
    pub ttl: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_to_prove: Option<U256>,
}
