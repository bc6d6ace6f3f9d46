//! An Ethereum JSON RPC client.
//!
//! Requests are built from typed [`method::Method`]s or raw [`jsonrpc::Call`]s
//! and sent through a [`RequestManager`], which owns the [`provider::Provider`]
//! transport and drives polling for [`filter::Filter`]s. The [`abi`] module
//! encodes and decodes contract call data.
//!
//! Documentation for the APIs can be found here:
//! <https://ethereum.github.io/execution-apis/>

pub mod abi;
pub mod filter;
pub mod formatters;
#[cfg(feature = "http")]
pub mod http;
pub mod jsonrpc;
pub mod manager;
#[macro_use]
pub mod method;
pub mod provider;
pub mod serialization;
pub mod types;
pub mod utils;

pub use self::{
    filter::Filter,
    manager::{Configuration, Error, RequestManager},
    provider::Provider,
};

use self::types::*;
use serde_json::Value;

module! {
    /// The `eth` namespace.
    pub mod eth {
        /// Returns a list of addresses owned by client.
        pub struct Accounts as "eth_accounts"
            Empty => Vec<Address>;

        /// Returns the number of most recent block.
        pub struct BlockNumber as "eth_blockNumber"
            Empty => U256;

        /// Executes a new message call immediately without creating a
        /// transaction on the block chain.
        pub struct Call as "eth_call"
            (TransactionCall, BlockId) => Vec<u8> [serialization::bytes];

        /// Returns the client coinbase address.
        pub struct Coinbase as "eth_coinbase"
            Empty => Address;

        /// Returns a list of available compilers in the client.
        pub struct GetCompilers as "eth_getCompilers"
            Empty => Vec<String>;

        /// Generates and returns an estimate of how much gas is necessary to
        /// allow the transaction to complete.
        pub struct EstimateGas as "eth_estimateGas"
            (TransactionCall,) => U256;

        /// Returns the current price per gas in wei.
        pub struct GasPrice as "eth_gasPrice"
            Empty => U256;

        /// Returns the balance of the account of given address.
        pub struct GetBalance as "eth_getBalance"
            (Address, BlockId) => U256;

        /// Returns information about a block by hash.
        pub struct GetBlockByHash as "eth_getBlockByHash"
            (Digest, Hydrated) => Option<Value>;

        /// Returns information about a block by number.
        pub struct GetBlockByNumber as "eth_getBlockByNumber"
            (BlockSpec, Hydrated) => Option<Value>;

        /// Returns the number of transactions in a block from a block
        /// matching the given block hash.
        pub struct GetBlockTransactionCountByHash as "eth_getBlockTransactionCountByHash"
            (Digest,) => Option<U256>;

        /// Returns the number of transactions in a block matching the given
        /// block number.
        pub struct GetBlockTransactionCountByNumber as "eth_getBlockTransactionCountByNumber"
            (BlockSpec,) => Option<U256>;

        /// Returns code at a given address.
        pub struct GetCode as "eth_getCode"
            (Address, BlockId) => Vec<u8> [serialization::bytes];

        /// Polling method for a filter, which returns an array of events that
        /// have occurred since the last poll.
        pub struct GetFilterChanges as "eth_getFilterChanges"
            (FilterId,) => Vec<Value>;

        /// Returns an array of all logs matching the filter with the given ID.
        pub struct GetFilterLogs as "eth_getFilterLogs"
            (FilterId,) => Vec<Value>;

        /// Returns an array of all logs matching the specified options.
        pub struct GetLogs as "eth_getLogs"
            (LogOptions,) => Vec<Value>;

        /// Returns the value from a storage position at a given address.
        pub struct GetStorageAt as "eth_getStorageAt"
            (Address, U256, BlockId) => Digest;

        /// Returns information about a transaction by block hash and
        /// transaction index position.
        pub struct GetTransactionByBlockHashAndIndex as "eth_getTransactionByBlockHashAndIndex"
            (Digest, U256) => Option<Value>;

        /// Returns information about a transaction by block number and
        /// transaction index position.
        pub struct GetTransactionByBlockNumberAndIndex as "eth_getTransactionByBlockNumberAndIndex"
            (BlockSpec, U256) => Option<Value>;

        /// Returns the information about a transaction requested by
        /// transaction hash.
        pub struct GetTransactionByHash as "eth_getTransactionByHash"
            (Digest,) => Option<Value>;

        /// Returns the number of transactions sent from an address.
        pub struct GetTransactionCount as "eth_getTransactionCount"
            (Address, BlockId) => U256;

        /// Returns the receipt of a transaction by transaction hash.
        pub struct GetTransactionReceipt as "eth_getTransactionReceipt"
            (Digest,) => Option<Value>;

        /// Returns information about an uncle by block hash and index.
        pub struct GetUncleByBlockHashAndIndex as "eth_getUncleByBlockHashAndIndex"
            (Digest, U256) => Option<Value>;

        /// Returns information about an uncle by block number and index.
        pub struct GetUncleByBlockNumberAndIndex as "eth_getUncleByBlockNumberAndIndex"
            (BlockSpec, U256) => Option<Value>;

        /// Returns the number of uncles in a block from a block matching the
        /// given block hash.
        pub struct GetUncleCountByBlockHash as "eth_getUncleCountByBlockHash"
            (Digest,) => Option<U256>;

        /// Returns the number of uncles in a block from a block matching the
        /// given block number.
        pub struct GetUncleCountByBlockNumber as "eth_getUncleCountByBlockNumber"
            (BlockSpec,) => Option<U256>;

        /// Returns the number of hashes per second that the node is mining
        /// with.
        pub struct Hashrate as "eth_hashrate"
            Empty => U256;

        /// Returns `true` if client is actively mining new blocks.
        pub struct Mining as "eth_mining"
            Empty => bool;

        /// Creates a filter in the node, to notify when a new block arrives.
        pub struct NewBlockFilter as "eth_newBlockFilter"
            Empty => FilterId;

        /// Creates a filter object, based on filter options, to notify when
        /// the state changes (logs).
        pub struct NewFilter as "eth_newFilter"
            (LogOptions,) => FilterId;

        /// Creates a filter in the node, to notify when new pending
        /// transactions arrive.
        pub struct NewPendingTransactionFilter as "eth_newPendingTransactionFilter"
            Empty => FilterId;

        /// Returns the current Ethereum protocol version.
        pub struct ProtocolVersion as "eth_protocolVersion"
            Empty => String;

        /// Submits a signed raw transaction.
        pub struct SendRawTransaction as "eth_sendRawTransaction"
            (Vec<u8>,) [serialization::bytes_param] => Digest;

        /// Creates a new message call transaction or a contract creation.
        pub struct SendTransaction as "eth_sendTransaction"
            (TransactionCall,) => Digest;

        /// Signs data with an account unlocked on the node.
        pub struct Sign as "eth_sign"
            (Address, Vec<u8>) [serialization::address_bytes_param]
                => Vec<u8> [serialization::bytes];

        /// Returns the sync status of the node, or `false` when it is not
        /// syncing.
        pub struct Syncing as "eth_syncing"
            Empty => Value;

        /// Uninstalls a filter with given id.
        pub struct UninstallFilter as "eth_uninstallFilter"
            (FilterId,) => bool;
    }
}

module! {
    /// The `net` namespace.
    pub mod net {
        /// Returns the current network ID.
        pub struct Version as "net_version"
            Empty => U256 [ethprim::num::serde::decimal];

        /// Returns `true` if the client is actively listening for network
        /// connections.
        pub struct Listening as "net_listening"
            Empty => bool;

        /// Returns the number of peers currently connected to the client.
        pub struct PeerCount as "net_peerCount"
            Empty => U256;
    }
}

module! {
    /// The `web3` namespace.
    pub mod web3 {
        /// Returns the current client version.
        pub struct ClientVersion as "web3_clientVersion"
            Empty => String;

        /// Returns Keccak-256 (not the standardized SHA3-256) of the given
        /// data.
        pub struct Sha3 as "web3_sha3"
            (Vec<u8>,) [serialization::bytes_param] => Digest;
    }
}

module! {
    /// The `shh` whisper namespace.
    pub mod shh {
        /// Sends a whisper message.
        pub struct Post as "shh_post"
            (types::Post,) => bool;

        /// Creates a new whisper identity in the client.
        pub struct NewIdentity as "shh_newIdentity"
            Empty => String;

        /// Checks if the client holds the private keys for an identity.
        pub struct HasIdentity as "shh_hasIdentity"
            (String,) => bool;

        pub struct NewGroup as "shh_newGroup"
            Empty => String;

        pub struct AddToGroup as "shh_addToGroup"
            (String,) => bool;

        /// Creates a filter to notify when the client receives a whisper
        /// message matching the filter options.
        pub struct NewFilter as "shh_newFilter"
            (LogOptions,) => FilterId;

        /// Uninstalls a filter with given id.
        pub struct UninstallFilter as "shh_uninstallFilter"
            (FilterId,) => bool;

        /// Polling method for whisper filters.
        pub struct GetFilterChanges as "shh_getFilterChanges"
            (FilterId,) => Vec<Value>;

        /// Get all messages matching a filter.
        pub struct GetMessages as "shh_getMessages"
            (FilterId,) => Vec<Value>;
    }
}
