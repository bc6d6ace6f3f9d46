//! JSON RPC envelopes.

pub mod batch;

use crate::method::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{self, AtomicU32};
use thiserror::Error;

/// JSON RPC supported version.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Version {
    /// Version 2.0 of the JSON RPC specification.
    #[serde(rename = "2.0")]
    V2,
}

/// Request and response ID.
///
/// Note that `u32` is used. This is so it always fits in a `f64` and obeys the
/// "SHOULD NOT have fractional parts" rule from the specification.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[serde(transparent)]
pub struct Id(pub u32);

/// A request object.
#[derive(Debug, Deserialize, Serialize)]
pub struct Request<M>
where
    M: Method,
{
    pub jsonrpc: Version,
    pub method: M,
    #[serde(
        deserialize_with = "M::deserialize_params",
        serialize_with = "M::serialize_params"
    )]
    pub params: M::Params,
    pub id: Id,
}

/// A request object for a method identified by name, with untyped params.
pub type Payload = Request<String>;

impl Clone for Payload {
    fn clone(&self) -> Self {
        Self {
            jsonrpc: self.jsonrpc,
            method: self.method.clone(),
            params: self.params.clone(),
            id: self.id,
        }
    }
}

/// A method name and its positional parameters, not yet assigned an ID.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Call {
    pub method: String,
    pub params: Vec<Value>,
}

impl Call {
    /// Creates a new call.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Creates a new call for a method that takes exactly `arity` parameters.
    pub fn with_arity(
        method: impl Into<String>,
        params: Vec<Value>,
        arity: usize,
    ) -> Result<Self, crate::Error> {
        if params.len() != arity {
            return Err(crate::Error::InvalidNumberOfParams);
        }
        Ok(Self::new(method, params))
    }

    /// Creates a call for a typed method.
    pub fn for_method<M>(method: &M, params: &M::Params) -> Result<Self, serde_json::Error>
    where
        M: Method,
    {
        let params = match M::serialize_params(params, serde_json::value::Serializer)? {
            Value::Array(params) => params,
            Value::Null => Vec::new(),
            param => vec![param],
        };
        Ok(Self::new(method.name(), params))
    }
}

/// Builds request envelopes with strictly increasing IDs.
#[derive(Debug)]
pub struct Jsonrpc {
    message_id: AtomicU32,
}

impl Default for Jsonrpc {
    fn default() -> Self {
        Self {
            message_id: AtomicU32::new(1),
        }
    }
}

impl Jsonrpc {
    /// Creates a new envelope builder whose first ID is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next message ID.
    pub fn next_id(&self) -> Id {
        Id(self.message_id.fetch_add(1, atomic::Ordering::Relaxed))
    }

    /// Wraps a method and its parameters into a request envelope.
    ///
    /// An empty method name is logged, but still produces an envelope.
    pub fn to_payload(&self, method: &str, params: Option<Vec<Value>>) -> Payload {
        if method.is_empty() {
            tracing::warn!("jsonrpc method should be specified");
        }

        Request {
            jsonrpc: Version::V2,
            method: method.to_owned(),
            params: Value::Array(params.unwrap_or_default()),
            id: self.next_id(),
        }
    }

    /// Wraps each call into its own envelope.
    pub fn to_batch_payload<'a, I>(&self, messages: I) -> Vec<Payload>
    where
        I: IntoIterator<Item = &'a Call>,
    {
        messages
            .into_iter()
            .map(|call| self.to_payload(&call.method, Some(call.params.clone())))
            .collect()
    }

    /// Returns `true` if the raw response is a successful JSON RPC response.
    ///
    /// A `null` result is valid; a missing one is not.
    pub fn is_valid_response(response: &Value) -> bool {
        let Some(response) = response.as_object() else {
            return false;
        };

        response.get("error").map_or(true, Value::is_null)
            && response.get("jsonrpc").and_then(Value::as_str) == Some("2.0")
            && response.get("id").is_some_and(Value::is_number)
            && response.contains_key("result")
    }
}

/// An RPC error that may be produced on a response.
#[derive(Clone, Debug, Deserialize, Error, Serialize)]
#[error("{code}: {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

/// An error code.
#[derive(Clone, Copy, Debug, Deserialize, Error, Serialize)]
#[serde(from = "i32", into = "i32")]
pub enum ErrorCode {
    #[error("parse error")]
    ParseError,
    #[error("invalid request")]
    InvalidRequest,
    #[error("method not found")]
    MethodNotFound,
    #[error("invalid params")]
    InvalidParams,
    #[error("internal error")]
    InternalError,
    #[error("server error ({0})")]
    ServerError(i32),
    #[error("reserved ({0})")]
    Reserved(i32),
    #[error("{0}")]
    Other(i32),
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        #[allow(clippy::match_overlapping_arm)]
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            -32099..=-32000 => Self::ServerError(code),
            -32768..=-32000 => Self::Reserved(code),
            _ => Self::Other(code),
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::ServerError(code) => code,
            ErrorCode::Reserved(code) => code,
            ErrorCode::Other(code) => code,
        }
    }
}
