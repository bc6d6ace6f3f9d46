//! Transport abstraction for sending JSON RPC payloads.

use crate::{jsonrpc, manager::Error};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;

/// A request body: either a single envelope or a batch of envelopes.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Single(jsonrpc::Payload),
    Batch(Vec<jsonrpc::Payload>),
}

impl Payload {
    /// Number of envelopes in the payload.
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Batch(payloads) => payloads.len(),
        }
    }

    /// Returns `true` for an empty batch.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A transport for JSON RPC payloads.
///
/// Providers return the raw decoded response body; validating the envelope
/// is left to the caller.
pub trait Provider: Send + Sync {
    /// Sends a payload, blocking the current thread until a response arrives.
    fn send(&self, payload: &Payload) -> Result<Value, Error>;

    /// Sends a payload asynchronously.
    fn send_async<'a>(&'a self, payload: &'a Payload) -> BoxFuture<'a, Result<Value, Error>>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use futures::FutureExt as _;
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };
    use tokio::sync::Notify;

    type Responder = Box<dyn FnMut(&Payload) -> Result<Value, Error> + Send>;

    /// A provider that records payloads and answers from a queue of
    /// responders, falling back to a default.
    pub struct MockProvider {
        requests: Mutex<Vec<Value>>,
        responders: Mutex<VecDeque<Responder>>,
        fallback: Mutex<Responder>,
        gate: Mutex<Option<Arc<Notify>>>,
    }

    impl MockProvider {
        pub fn new() -> Arc<Self> {
            Self::with_fallback(|payload| Ok(echo(payload, Value::Null)))
        }

        pub fn with_fallback(
            fallback: impl FnMut(&Payload) -> Result<Value, Error> + Send + 'static,
        ) -> Arc<Self> {
            Arc::new(Self {
                requests: Default::default(),
                responders: Default::default(),
                fallback: Mutex::new(Box::new(fallback)),
                gate: Default::default(),
            })
        }

        /// Queues a responder for the next request.
        pub fn respond(
            &self,
            responder: impl FnMut(&Payload) -> Result<Value, Error> + Send + 'static,
        ) {
            self.responders
                .lock()
                .unwrap()
                .push_back(Box::new(responder));
        }

        /// Holds asynchronous responses until the returned gate is notified.
        pub fn hold(&self) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            *self.gate.lock().unwrap() = Some(gate.clone());
            gate
        }

        /// The serialized payloads received so far.
        pub fn requests(&self) -> Vec<Value> {
            self.requests.lock().unwrap().clone()
        }

        /// The method names of the single envelopes received so far.
        pub fn methods(&self) -> Vec<String> {
            self.requests()
                .iter()
                .filter_map(|request| Some(request.get("method")?.as_str()?.to_owned()))
                .collect()
        }

        fn answer(&self, payload: &Payload) -> Result<Value, Error> {
            self.requests
                .lock()
                .unwrap()
                .push(serde_json::to_value(payload).unwrap());
            let responder = self.responders.lock().unwrap().pop_front();
            match responder {
                Some(mut responder) => responder(payload),
                None => (self.fallback.lock().unwrap())(payload),
            }
        }
    }

    impl Provider for MockProvider {
        fn send(&self, payload: &Payload) -> Result<Value, Error> {
            self.answer(payload)
        }

        fn send_async<'a>(&'a self, payload: &'a Payload) -> BoxFuture<'a, Result<Value, Error>> {
            let gate = self.gate.lock().unwrap().clone();
            async move {
                let response = self.answer(payload);
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                response
            }
            .boxed()
        }
    }

    /// Builds a successful response to every envelope in the payload.
    pub fn echo(payload: &Payload, result: Value) -> Value {
        let respond = |request: &jsonrpc::Payload| {
            serde_json::json!({"jsonrpc": "2.0", "id": request.id, "result": result})
        };
        match payload {
            Payload::Single(request) => respond(request),
            Payload::Batch(requests) => requests.iter().map(respond).collect(),
        }
    }
}
