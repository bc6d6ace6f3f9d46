//! Request manager: sends calls through the current provider and runs the
//! poll loop that drives filters.

use crate::{
    jsonrpc::{
        self,
        batch::{self, Batch},
        Call, Jsonrpc,
    },
    method::Method,
    provider::{Payload, Provider},
    types::Empty,
};
use serde_json::Value;
use std::{
    collections::HashMap,
    mem,
    sync::{Arc, Mutex, PoisonError, RwLock, Weak},
    time::Duration,
};
use thiserror::Error;
use tokio::{
    runtime::Handle,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_stream::{wrappers::IntervalStream, StreamExt as _};

/// Callback receiving the non-empty results of a poll.
pub type PollCallback = Arc<dyn Fn(Result<Vec<Value>, Error>) + Send + Sync>;

/// Cleanup run for a poll when the manager is reset.
pub type Uninstall = Arc<dyn Fn() + Send + Sync>;

/// Request manager configuration.
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Time between two poll ticks.
    pub polling_interval: Duration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_millis(500),
        }
    }
}

struct Poll {
    call: Call,
    callback: PollCallback,
    uninstall: Uninstall,
}

struct Timer {
    runtime: Handle,
    task: JoinHandle<()>,
}

/// Sends JSON RPC calls and periodically polls registered calls in a single
/// batch.
///
/// Managers are shared as `Arc<RequestManager>`; the poll loop only holds a
/// weak reference and stops once the last strong reference is dropped.
pub struct RequestManager {
    provider: RwLock<Option<Arc<dyn Provider>>>,
    jsonrpc: Jsonrpc,
    polls: Mutex<HashMap<String, Poll>>,
    config: Configuration,
    timer: Mutex<Option<Timer>>,
}

impl RequestManager {
    /// Creates a new request manager with the default configuration.
    pub fn new(provider: Option<Arc<dyn Provider>>) -> Arc<Self> {
        Self::with_config(provider, Configuration::default())
    }

    /// Creates a new request manager.
    pub fn with_config(provider: Option<Arc<dyn Provider>>, config: Configuration) -> Arc<Self> {
        Arc::new(Self {
            provider: RwLock::new(provider),
            jsonrpc: Jsonrpc::new(),
            polls: Default::default(),
            config,
            timer: Default::default(),
        })
    }

    /// Starts the poll loop on the current tokio runtime. Starting an already
    /// started manager restarts its loop.
    pub fn start(self: &Arc<Self>) -> Result<(), Error> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let task = self.spawn_poll_loop(&runtime);
        let previous = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Timer { runtime, task });
        if let Some(previous) = previous {
            previous.task.abort();
        }
        Ok(())
    }

    fn spawn_poll_loop(self: &Arc<Self>, runtime: &Handle) -> JoinHandle<()> {
        let manager = Arc::downgrade(self);
        let interval = self.config.polling_interval;
        runtime.spawn(async move {
            let mut interval = time::interval(interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = IntervalStream::new(interval);

            while ticks.next().await.is_some() {
                let Some(manager) = Weak::upgrade(&manager) else {
                    break;
                };
                manager.poll().await;
            }
            tracing::trace!("poll loop stopped");
        })
    }

    /// The envelope builder shared by every request sent by this manager.
    pub fn jsonrpc(&self) -> &Jsonrpc {
        &self.jsonrpc
    }

    fn provider(&self) -> Result<Arc<dyn Provider>, Error> {
        let provider = self
            .provider
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        provider.ok_or_else(|| {
            tracing::error!("provider not set");
            Error::InvalidProvider
        })
    }

    fn payload(&self, call: &Call) -> Payload {
        Payload::Single(self.jsonrpc.to_payload(&call.method, Some(call.params.clone())))
    }

    fn result(mut response: Value) -> Result<Value, Error> {
        if !Jsonrpc::is_valid_response(&response) {
            return Err(Error::invalid_response(&response));
        }
        Ok(response["result"].take())
    }

    /// Sends a call, blocking the current thread until the result arrives.
    pub fn send(&self, call: &Call) -> Result<Value, Error> {
        let provider = self.provider()?;
        let response = provider.send(&self.payload(call))?;
        Self::result(response)
    }

    /// Sends a call.
    pub async fn send_async(&self, call: &Call) -> Result<Value, Error> {
        let provider = self.provider()?;
        let payload = self.payload(call);
        let response = provider.send_async(&payload).await?;
        Self::result(response)
    }

    /// Sends several calls in one batch and returns the raw response
    /// envelopes. The envelopes are not validated.
    pub async fn send_batch(&self, calls: &[Call]) -> Result<Vec<Value>, Error> {
        let provider = self.provider()?;
        let payload = Payload::Batch(self.jsonrpc.to_batch_payload(calls));
        match provider.send_async(&payload).await? {
            Value::Array(responses) => Ok(responses),
            response => Err(Error::invalid_response(&response)),
        }
    }

    /// Replaces the provider. Requests already in flight complete with the
    /// provider they started with.
    pub fn set_provider(&self, provider: Option<Arc<dyn Provider>>) {
        *self
            .provider
            .write()
            .unwrap_or_else(PoisonError::into_inner) = provider;
    }

    /// Executes a typed method, blocking the current thread.
    pub fn execute<M>(&self, method: M, params: M::Params) -> Result<M::Result, Error>
    where
        M: Method,
    {
        let call = Call::for_method(&method, &params)?;
        let response = self.provider()?.send(&self.payload(&call))?;
        Ok(batch::result::<M>(response)??)
    }

    /// Executes a typed method.
    pub async fn execute_async<M>(&self, method: M, params: M::Params) -> Result<M::Result, Error>
    where
        M: Method,
    {
        let call = Call::for_method(&method, &params)?;
        let provider = self.provider()?;
        let payload = self.payload(&call);
        let response = provider.send_async(&payload).await?;
        Ok(batch::result::<M>(response)??)
    }

    /// Executes a typed method that takes no parameters.
    pub async fn call<M>(&self, method: M) -> Result<M::Result, Error>
    where
        M: Method<Params = Empty>,
    {
        self.execute_async(method, Empty).await
    }

    /// Executes a typed batch, failing on the first RPC error.
    pub async fn batch<B>(&self, batch: B) -> Result<B::Values, Error>
    where
        B: Batch,
    {
        let results = self.try_batch(batch).await?;
        Ok(B::values(results)?)
    }

    /// Executes a typed batch, returning the result of each call so that RPC
    /// errors can be handled per call.
    pub async fn try_batch<B>(&self, batch: B) -> Result<B::Results, Error>
    where
        B: Batch,
    {
        let calls = batch.calls()?;
        let requests = self.jsonrpc.to_batch_payload(&calls);
        let ids = requests
            .iter()
            .map(|request| u64::from(request.id.0))
            .collect::<Vec<_>>();

        let provider = self.provider()?;
        let mut responses = match provider.send_async(&Payload::Batch(requests)).await? {
            Value::Array(responses) => responses,
            response => return Err(Error::invalid_response(&response)),
        };

        let id = |response: &Value| response.get("id").and_then(Value::as_u64);
        responses.sort_by_key(id);
        if responses.len() != ids.len()
            || responses
                .iter()
                .zip(&ids)
                .any(|(response, expected)| id(response) != Some(*expected))
        {
            return Err(Error::BatchMismatch);
        }

        B::results(responses)
    }

    /// Registers a call to be sent on every poll tick under `"poll_" + id`,
    /// replacing any previous registration with that id.
    pub fn start_polling(&self, call: Call, id: &str, callback: PollCallback, uninstall: Uninstall) {
        tracing::debug!(id, method = %call.method, "start polling");
        self.polls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                poll_key(id),
                Poll {
                    call,
                    callback,
                    uninstall,
                },
            );
    }

    /// Unregisters a poll. Responses to a tick already in flight are dropped.
    pub fn stop_polling(&self, id: &str) {
        let removed = self
            .polls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&poll_key(id));
        if removed.is_some() {
            tracing::debug!(id, "stop polling");
        }
    }

    /// Returns `true` if a poll is registered for the id.
    pub fn is_polling(&self, id: &str) -> bool {
        self.polls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&poll_key(id))
    }

    /// Uninstalls and unregisters every poll, and restarts the poll loop if
    /// it was started.
    pub fn reset(self: &Arc<Self>) {
        let polls = mem::take(&mut *self.polls.lock().unwrap_or_else(PoisonError::into_inner));
        for poll in polls.into_values() {
            (poll.uninstall)();
        }

        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = timer.as_mut() {
            timer.task.abort();
            timer.task = self.spawn_poll_loop(&timer.runtime);
        }
    }

    /// Runs a single poll tick: sends every registered call in one batch and
    /// dispatches the responses.
    pub async fn poll(&self) {
        let (keys, calls): (Vec<_>, Vec<_>) = {
            let polls = self.polls.lock().unwrap_or_else(PoisonError::into_inner);
            polls
                .iter()
                .map(|(key, poll)| (key.clone(), poll.call.clone()))
                .unzip()
        };
        if calls.is_empty() {
            return;
        }

        let provider = self
            .provider
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(provider) = provider else {
            tracing::debug!("skipping poll without a provider");
            return;
        };

        tracing::trace!(count = calls.len(), "polling");
        let payload = Payload::Batch(self.jsonrpc.to_batch_payload(&calls));
        let responses = match provider.send_async(&payload).await {
            Ok(Value::Array(responses)) => responses,
            Ok(response) => {
                tracing::debug!(%response, "poll response is not a batch");
                return;
            }
            Err(err) => {
                tracing::debug!(?err, "poll failed");
                return;
            }
        };

        for (key, mut response) in keys.into_iter().zip(responses) {
            let callback = self
                .polls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&key)
                .map(|poll| poll.callback.clone());
            let Some(callback) = callback else {
                continue;
            };

            if !Jsonrpc::is_valid_response(&response) {
                callback(Err(Error::invalid_response(&response)));
                continue;
            }
            match response["result"].take() {
                Value::Array(results) if !results.is_empty() => callback(Ok(results)),
                _ => {}
            }
        }
    }
}

impl Drop for RequestManager {
    fn drop(&mut self) {
        let timer = self
            .timer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = timer {
            timer.task.abort();
        }
    }
}

fn poll_key(id: &str) -> String {
    format!("poll_{id}")
}

/// A request manager error.
#[derive(Clone, Debug, Error)]
pub enum Error {
    #[error("invalid number of input parameters")]
    InvalidNumberOfParams,
    #[error("CONNECTION ERROR: couldn't connect to node {0}, is it running?")]
    InvalidConnection(String),
    #[error("provider not set or invalid")]
    InvalidProvider,
    #[error("{0}")]
    InvalidResponse(String),
    #[error("filter not installed")]
    FilterNotInstalled,
    #[error("batch responses do not match requests")]
    BatchMismatch,
    #[error("no tokio runtime to run the poll loop on")]
    NoRuntime,
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("JSON error: {0}")]
    Json(Arc<serde_json::Error>),
    #[error("RPC error: {0}")]
    Rpc(#[from] jsonrpc::Error),
    #[error("transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Creates an error for a response that is not a successful JSON RPC
    /// response, using its error message when it has one.
    pub fn invalid_response(response: &Value) -> Self {
        let message = response
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("Invalid JSON RPC response");
        Self::InvalidResponse(message.to_owned())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(Arc::new(err))
    }
}
