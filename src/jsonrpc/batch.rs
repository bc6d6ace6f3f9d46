//! Typed JSON RPC batches.
//!
//! A batch is a tuple, array or vector of `(method, params)` pairs. Requests
//! are sent as a single JSON array and responses are matched back to their
//! method by position.

use super::{Call, Jsonrpc};
use crate::{jsonrpc, manager::Error, method::Method};
use serde_json::Value;

/// A batch of typed JSON RPC requests.
pub trait Batch {
    type Results;
    type Values;

    /// Serializes the batch into calls, in order.
    fn calls(self) -> Result<Vec<Call>, serde_json::Error>;
    /// Reads the results of each call. `responses` must be in call order.
    fn results(responses: Vec<Value>) -> Result<Self::Results, Error>;
    /// Fails on the first RPC error.
    fn values(results: Self::Results) -> Result<Self::Values, jsonrpc::Error>;
}

fn call<M>(method: &M, params: &M::Params) -> Result<Call, serde_json::Error>
where
    M: Method,
{
    Call::for_method(method, params)
}

/// Reads a single response. RPC errors are returned in the inner result,
/// malformed responses in the outer one.
pub(crate) fn result<M>(mut response: Value) -> Result<Result<M::Result, jsonrpc::Error>, Error>
where
    M: Method,
{
    if Jsonrpc::is_valid_response(&response) {
        let result = response["result"].take();
        return Ok(Ok(M::deserialize_result(result)?));
    }

    match response.get("error") {
        Some(error) if !error.is_null() => match serde_json::from_value(error.clone()) {
            Ok(error) => Ok(Err(error)),
            Err(_) => Err(Error::invalid_response(&response)),
        },
        _ => Err(Error::invalid_response(&response)),
    }
}

macro_rules! impl_batch_for_tuple {
    ($($m:ident),*) => {
        impl<$($m,)*> Batch for ($(($m, <$m>::Params),)*)
        where
            $($m: Method,)*
        {
            type Results = ($(Result<<$m>::Result, jsonrpc::Error>,)*);
            type Values = ($(<$m>::Result,)*);

            fn calls(self) -> Result<Vec<Call>, serde_json::Error> {
                #[allow(non_snake_case)]
                let ($($m,)*) = self;
                Ok(vec![
                    $(call(&$m.0, &$m.1)?,)*
                ])
            }

            fn results(responses: Vec<Value>) -> Result<Self::Results, Error> {
                #[allow(unused_mut, unused_variables)]
                let mut responses = responses.into_iter();
                Ok((
                    $(result::<$m>(responses.next().ok_or(Error::BatchMismatch)?)?,)*
                ))
            }

            fn values(results: Self::Results) -> Result<Self::Values, jsonrpc::Error> {
                #[allow(non_snake_case)]
                let ($($m,)*) = results;
                Ok(($($m?,)*))
            }
        }
    };
}

impl_batch_for_tuple!();
impl_batch_for_tuple!(M0);
impl_batch_for_tuple!(M0, M1);
impl_batch_for_tuple!(M0, M1, M2);
impl_batch_for_tuple!(M0, M1, M2, M3);
impl_batch_for_tuple!(M0, M1, M2, M3, M4);
impl_batch_for_tuple!(M0, M1, M2, M3, M4, M5);
impl_batch_for_tuple!(M0, M1, M2, M3, M4, M5, M6);
impl_batch_for_tuple!(M0, M1, M2, M3, M4, M5, M6, M7);

impl<M, const N: usize> Batch for [(M, M::Params); N]
where
    M: Method,
{
    type Results = [Result<M::Result, jsonrpc::Error>; N];
    type Values = [M::Result; N];

    fn calls(self) -> Result<Vec<Call>, serde_json::Error> {
        self.iter()
            .map(|(method, params)| call(method, params))
            .collect()
    }

    fn results(responses: Vec<Value>) -> Result<Self::Results, Error> {
        responses
            .into_iter()
            .map(result::<M>)
            .collect::<Result<Vec<_>, _>>()?
            .try_into()
            .map_err(|_| Error::BatchMismatch)
    }

    fn values(results: Self::Results) -> Result<Self::Values, jsonrpc::Error> {
        let values = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        match values.try_into() {
            Ok(values) => Ok(values),
            Err(_) => unreachable!("one value per result"),
        }
    }
}

impl<M> Batch for Vec<(M, M::Params)>
where
    M: Method,
{
    type Results = Vec<Result<M::Result, jsonrpc::Error>>;
    type Values = Vec<M::Result>;

    fn calls(self) -> Result<Vec<Call>, serde_json::Error> {
        self.iter()
            .map(|(method, params)| call(method, params))
            .collect()
    }

    fn results(responses: Vec<Value>) -> Result<Self::Results, Error> {
        responses.into_iter().map(result::<M>).collect()
    }

    fn values(results: Self::Results) -> Result<Self::Values, jsonrpc::Error> {
        results.into_iter().collect()
    }
}
