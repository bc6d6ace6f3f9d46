//! Filters installed on the node and watched through the request manager's
//! poll loop.

use crate::{
    formatters,
    jsonrpc::Call,
    manager::{Error, PollCallback, RequestManager, Uninstall},
    types::{BlockTag, FilterId, FilterOptions},
};
use serde_json::Value;
use std::{
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};
use tokio::runtime::Handle;

/// Callback receiving each formatted log or message, or a filter error.
pub type WatchCallback = Arc<dyn Fn(Result<Value, Error>) + Send + Sync>;

/// Formats each log or message before it is handed to a callback.
pub type Formatter = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// The RPC methods backing a kind of filter.
pub trait FilterImplementation: Send + Sync {
    fn new_filter(&self, options: &FilterOptions) -> Result<Call, Error>;
    fn uninstall_filter(&self, id: FilterId) -> Call;
    fn get_logs(&self, id: FilterId) -> Call;
    fn poll(&self, id: FilterId) -> Call;
}

fn with_id(method: &str, id: FilterId) -> Call {
    Call::new(method, vec![Value::String(id.to_string())])
}

/// Log, block and pending transaction filters.
#[derive(Clone, Copy, Debug, Default)]
pub struct EthFilter;

impl FilterImplementation for EthFilter {
    fn new_filter(&self, options: &FilterOptions) -> Result<Call, Error> {
        Ok(match options {
            FilterOptions::Tag(BlockTag::Latest) => Call::new("eth_newBlockFilter", vec![]),
            FilterOptions::Tag(BlockTag::Pending) => {
                Call::new("eth_newPendingTransactionFilter", vec![])
            }
            options => Call::new("eth_newFilter", vec![serde_json::to_value(options)?]),
        })
    }

    fn uninstall_filter(&self, id: FilterId) -> Call {
        with_id("eth_uninstallFilter", id)
    }

    fn get_logs(&self, id: FilterId) -> Call {
        with_id("eth_getFilterLogs", id)
    }

    fn poll(&self, id: FilterId) -> Call {
        with_id("eth_getFilterChanges", id)
    }
}

/// Whisper message filters.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShhFilter;

impl FilterImplementation for ShhFilter {
    fn new_filter(&self, options: &FilterOptions) -> Result<Call, Error> {
        Ok(Call::new(
            "shh_newFilter",
            vec![serde_json::to_value(options)?],
        ))
    }

    fn uninstall_filter(&self, id: FilterId) -> Call {
        with_id("shh_uninstallFilter", id)
    }

    fn get_logs(&self, id: FilterId) -> Call {
        with_id("shh_getMessages", id)
    }

    fn poll(&self, id: FilterId) -> Call {
        with_id("shh_getFilterChanges", id)
    }
}

#[derive(Clone, Debug)]
enum State {
    Pending,
    Active(FilterId),
    Failed,
    Stopped,
}

struct Inner {
    manager: Arc<RequestManager>,
    implementation: Box<dyn FilterImplementation>,
    options: FilterOptions,
    formatter: Formatter,
    state: Mutex<State>,
    callbacks: Mutex<Vec<WatchCallback>>,
    runtime: Handle,
}

/// A filter installed on the node.
///
/// Creating a filter installs it in the background. Callbacks registered with
/// [`Filter::watch`] receive past logs once the filter is installed (for log
/// filters), and new ones every time the request manager polls.
#[derive(Clone)]
pub struct Filter(Arc<Inner>);

impl Filter {
    /// Creates and installs a filter. Must be called from within a tokio
    /// runtime.
    pub fn new(
        manager: Arc<RequestManager>,
        options: FilterOptions,
        implementation: impl FilterImplementation + 'static,
        formatter: Formatter,
    ) -> Result<Self, Error> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let call = implementation.new_filter(&options)?;
        let inner = Arc::new(Inner {
            manager,
            implementation: Box::new(implementation),
            options,
            formatter,
            state: Mutex::new(State::Pending),
            callbacks: Default::default(),
            runtime,
        });

        inner.runtime.spawn(install(inner.clone(), call));
        Ok(Self(inner))
    }

    /// Creates an `eth` filter. Logs are formatted with
    /// [`formatters::output_log_formatter`]; block and transaction hashes are
    /// passed through.
    pub fn eth(manager: Arc<RequestManager>, options: FilterOptions) -> Result<Self, Error> {
        let formatter: Formatter = match options {
            FilterOptions::Logs(_) => Arc::new(formatters::output_log_formatter),
            FilterOptions::Tag(_) => Arc::new(|value: Value| value),
        };
        Self::new(manager, options, EthFilter, formatter)
    }

    /// Creates a whisper filter whose messages are formatted with
    /// [`formatters::output_post_formatter`].
    pub fn shh(manager: Arc<RequestManager>, options: FilterOptions) -> Result<Self, Error> {
        Self::new(
            manager,
            options,
            ShhFilter,
            Arc::new(formatters::output_post_formatter),
        )
    }

    /// The filter ID, once installed.
    pub fn filter_id(&self) -> Option<FilterId> {
        match *self.0.state() {
            State::Active(id) => Some(id),
            _ => None,
        }
    }

    /// Registers a callback. If the filter is already installed, past logs are
    /// replayed to it and polling is (re)started.
    pub fn watch(&self, callback: WatchCallback) -> &Self {
        // Callbacks pushed while pending are replayed by `install`, later
        // ones here.
        let id = {
            let state = self.0.state();
            if matches!(*state, State::Stopped) {
                tracing::debug!("ignoring watch on a stopped filter");
                return self;
            }
            self.0.callbacks().push(callback.clone());
            match *state {
                State::Active(id) => Some(id),
                _ => None,
            }
        };

        if let Some(id) = id {
            self.0.runtime.spawn({
                let inner = self.0.clone();
                async move { inner.get_logs_at_start(id, &callback).await }
            });
            Inner::start_polling(&self.0, id);
        }
        self
    }

    /// Stops polling, uninstalls the filter from the node in the background
    /// and drops all callbacks. A stopped filter cannot be restarted.
    pub fn stop_watching(&self) {
        let mut state = self.0.state();
        if let State::Active(id) = mem::replace(&mut *state, State::Stopped) {
            self.0.manager.stop_polling(&id.to_string());
            self.0.spawn_uninstall(id);
        }
        self.0.callbacks().clear();
    }

    /// Fetches every log matching the filter, blocking the current thread.
    ///
    /// This goes through [`Provider::send`](crate::provider::Provider::send),
    /// so it must not be called from an async context when the provider
    /// blocks, such as the HTTP provider.
    pub fn get(&self) -> Result<Vec<Value>, Error> {
        let id = self.installed()?;
        let logs = self.0.manager.send(&self.0.implementation.get_logs(id))?;
        self.0.format_all(logs)
    }

    /// Fetches every log matching the filter.
    pub async fn get_async(&self) -> Result<Vec<Value>, Error> {
        let id = self.installed()?;
        let logs = self
            .0
            .manager
            .send_async(&self.0.implementation.get_logs(id))
            .await?;
        self.0.format_all(logs)
    }

    fn installed(&self) -> Result<FilterId, Error> {
        self.filter_id().ok_or(Error::FilterNotInstalled)
    }
}

async fn install(inner: Arc<Inner>, call: Call) {
    let id = match inner.manager.send_async(&call).await {
        Ok(id) => serde_json::from_value::<FilterId>(id).map_err(Error::from),
        Err(err) => Err(err),
    };

    let id = match id {
        Ok(id) => id,
        Err(err) => {
            tracing::debug!(?err, "failed to install filter");
            let mut state = inner.state();
            if matches!(*state, State::Pending) {
                *state = State::Failed;
            }
            drop(state);
            let callbacks = inner.callbacks().clone();
            for callback in callbacks {
                callback(Err(err.clone()));
            }
            return;
        }
    };

    // Snapshot taken while activating; later callbacks are replayed by `watch`.
    let callbacks = {
        let mut state = inner.state();
        match *state {
            State::Pending => {
                *state = State::Active(id);
                Some(inner.callbacks().clone())
            }
            _ => None,
        }
    };
    let Some(callbacks) = callbacks else {
        tracing::debug!(%id, "filter stopped before it was installed");
        inner.spawn_uninstall(id);
        return;
    };

    tracing::debug!(%id, "filter installed");
    for callback in &callbacks {
        inner.get_logs_at_start(id, callback).await;
    }
    Inner::start_polling(&inner, id);
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn callbacks(&self) -> MutexGuard<'_, Vec<WatchCallback>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn format_all(&self, logs: Value) -> Result<Vec<Value>, Error> {
        let logs = serde_json::from_value::<Vec<Value>>(logs)?;
        Ok(logs.into_iter().map(|log| (self.formatter)(log)).collect())
    }

    /// Replays past logs to a callback. Only log filters have past logs.
    async fn get_logs_at_start(&self, id: FilterId, callback: &WatchCallback) {
        if matches!(self.options, FilterOptions::Tag(_)) {
            return;
        }

        let logs = self
            .manager
            .send_async(&self.implementation.get_logs(id))
            .await
            .and_then(|logs| self.format_all(logs));
        if !self.is_active(id) {
            return;
        }
        match logs {
            Ok(logs) => {
                for log in logs {
                    callback(Ok(log));
                }
            }
            Err(err) => callback(Err(err)),
        }
    }

    fn is_active(&self, id: FilterId) -> bool {
        matches!(*self.state(), State::Active(active) if active == id)
    }

    /// Registers the filter with the poll loop if it is still active. The
    /// state lock is held until the registration is done.
    fn start_polling(this: &Arc<Self>, id: FilterId) {
        let state = this.state();
        if !matches!(*state, State::Active(active) if active == id) {
            tracing::debug!(%id, "not polling a stopped filter");
            return;
        }

        let callback: PollCallback = {
            let inner = Arc::downgrade(this);
            Arc::new(move |result: Result<Vec<Value>, Error>| {
                if let Some(inner) = Weak::upgrade(&inner) {
                    inner.dispatch(result);
                }
            })
        };
        let uninstall: Uninstall = {
            let inner = Arc::downgrade(this);
            Arc::new(move || {
                if let Some(inner) = Weak::upgrade(&inner) {
                    inner.spawn_uninstall(id);
                }
            })
        };

        this.manager.start_polling(
            this.implementation.poll(id),
            &id.to_string(),
            callback,
            uninstall,
        );
    }

    fn dispatch(&self, result: Result<Vec<Value>, Error>) {
        let callbacks = self.callbacks().clone();
        match result {
            Ok(messages) => {
                for message in messages {
                    let message = (self.formatter)(message);
                    for callback in &callbacks {
                        callback(Ok(message.clone()));
                    }
                }
            }
            Err(err) => {
                for callback in &callbacks {
                    callback(Err(err.clone()));
                }
            }
        }
    }

    fn spawn_uninstall(&self, id: FilterId) {
        let manager = self.manager.clone();
        let call = self.implementation.uninstall_filter(id);
        self.runtime.spawn(async move {
            if let Err(err) = manager.send_async(&call).await {
                tracing::debug!(%id, ?err, "failed to uninstall filter");
            }
        });
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let State::Active(id) = state {
            self.manager.stop_polling(&id.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        jsonrpc,
        provider::{mock::MockProvider, Payload},
        types::{LogFilterValue, LogOptions, Topic},
    };
    use serde_json::json;

    fn respond(request: &jsonrpc::Payload) -> Value {
        let result = match request.method.as_str() {
            "eth_newFilter" | "eth_newBlockFilter" | "shh_newFilter" => json!("0x2a"),
            "eth_getFilterLogs" => json!([{"blockNumber": "0x1", "logIndex": "0x0"}]),
            "eth_getFilterChanges" => json!([{"blockNumber": "0x2", "logIndex": "0x0"}]),
            "eth_uninstallFilter" => json!(true),
            _ => Value::Null,
        };
        json!({"jsonrpc": "2.0", "id": request.id, "result": result})
    }

    fn node() -> Arc<MockProvider> {
        MockProvider::with_fallback(|payload| {
            Ok(match payload {
                Payload::Single(request) => respond(request),
                Payload::Batch(requests) => requests.iter().map(respond).collect(),
            })
        })
    }

    fn recorder() -> (WatchCallback, Arc<Mutex<Vec<Result<Value, Error>>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        let callback = {
            let received = received.clone();
            Arc::new(move |result: Result<Value, Error>| {
                received.lock().unwrap().push(result)
            }) as WatchCallback
        };
        (callback, received)
    }

    async fn until(condition: impl Fn() -> bool) {
        for _ in 0..1000 {
            if condition() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    fn log_options() -> FilterOptions {
        LogOptions {
            topics: [LogFilterValue::Exact(Topic::new("0x01"))]
                .into_iter()
                .collect(),
            ..Default::default()
        }
        .into()
    }

    #[tokio::test]
    async fn log_filter_lifecycle() {
        let provider = node();
        let manager = RequestManager::new(Some(provider.clone()));
        let filter = Filter::eth(manager.clone(), log_options()).unwrap();
        let (callback, received) = recorder();
        filter.watch(callback);

        until(|| received.lock().unwrap().len() == 1).await;
        assert_eq!(filter.filter_id().unwrap().to_string(), "0x2a");
        assert!(manager.is_polling("0x2a"));
        assert_eq!(
            *received.lock().unwrap()[0].as_ref().unwrap(),
            json!({"blockNumber": 1, "logIndex": 0}),
        );

        manager.poll().await;
        assert_eq!(
            *received.lock().unwrap()[1].as_ref().unwrap(),
            json!({"blockNumber": 2, "logIndex": 0}),
        );

        filter.stop_watching();
        assert!(!manager.is_polling("0x2a"));
        until(|| provider.methods().contains(&"eth_uninstallFilter".to_owned())).await;

        let requests = provider.requests();
        assert_eq!(requests[0]["method"], json!("eth_newFilter"));
        assert_eq!(requests[0]["params"], json!([{"topics": ["0x01"]}]));
        assert_eq!(requests[1]["method"], json!("eth_getFilterLogs"));
        assert_eq!(requests[1]["params"], json!(["0x2a"]));
    }

    #[tokio::test]
    async fn block_filters_do_not_replay() {
        let provider = node();
        let manager = RequestManager::new(Some(provider.clone()));
        let filter = Filter::eth(manager.clone(), FilterOptions::latest()).unwrap();
        let (callback, received) = recorder();
        filter.watch(callback);

        until(|| manager.is_polling("0x2a")).await;
        assert_eq!(provider.methods(), ["eth_newBlockFilter"]);
        assert!(received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn watching_an_installed_filter() {
        let provider = node();
        let manager = RequestManager::new(Some(provider.clone()));
        let filter = Filter::eth(manager.clone(), log_options()).unwrap();
        until(|| filter.filter_id().is_some()).await;
        assert!(manager.is_polling("0x2a"));

        let (callback, received) = recorder();
        filter.watch(callback);
        until(|| received.lock().unwrap().len() == 1).await;
        assert!(manager.is_polling("0x2a"));
    }

    #[tokio::test]
    async fn stopped_while_pending() {
        let provider = node();
        let gate = provider.hold();
        let manager = RequestManager::new(Some(provider.clone()));
        let filter = Filter::eth(manager.clone(), log_options()).unwrap();
        let (callback, received) = recorder();
        filter.watch(callback);

        until(|| !provider.requests().is_empty()).await;
        filter.stop_watching();
        gate.notify_one();

        until(|| provider.methods().contains(&"eth_uninstallFilter".to_owned())).await;
        assert!(filter.filter_id().is_none());
        assert!(!manager.is_polling("0x2a"));
        assert!(received.lock().unwrap().is_empty());
    }

    async fn settle() {
        for _ in 0..100 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn stopped_while_replaying() {
        let provider = node();
        let gate = provider.hold();
        let manager = RequestManager::new(Some(provider.clone()));
        let filter = Filter::eth(manager.clone(), log_options()).unwrap();
        let (callback, received) = recorder();
        filter.watch(callback);

        until(|| provider.requests().len() == 1).await;
        gate.notify_one();
        until(|| provider.requests().len() == 2).await;
        assert_eq!(provider.methods(), ["eth_newFilter", "eth_getFilterLogs"]);

        filter.stop_watching();
        gate.notify_one();
        settle().await;

        assert!(!manager.is_polling("0x2a"));
        assert!(received.lock().unwrap().is_empty());
        assert!(provider.methods().contains(&"eth_uninstallFilter".to_owned()));

        drop(filter);
        manager.poll().await;
        assert!(provider.requests().iter().all(|request| !request.is_array()));
    }

    #[tokio::test]
    async fn callbacks_are_replayed_once() {
        let provider = node();
        let gate = provider.hold();
        let manager = RequestManager::new(Some(provider.clone()));
        let filter = Filter::eth(manager.clone(), log_options()).unwrap();
        let (early, early_logs) = recorder();
        filter.watch(early);

        until(|| provider.requests().len() == 1).await;
        gate.notify_one();
        until(|| provider.requests().len() == 2).await;

        // Registered while the install replay is in flight.
        let (late, late_logs) = recorder();
        filter.watch(late);
        gate.notify_one();
        gate.notify_one();
        until(|| late_logs.lock().unwrap().len() == 1).await;
        until(|| early_logs.lock().unwrap().len() == 1).await;
        settle().await;

        assert_eq!(early_logs.lock().unwrap().len(), 1);
        assert_eq!(late_logs.lock().unwrap().len(), 1);
        let replays = provider
            .methods()
            .into_iter()
            .filter(|method| method == "eth_getFilterLogs")
            .count();
        assert_eq!(replays, 2);
        assert!(manager.is_polling("0x2a"));
    }

    #[tokio::test]
    async fn install_failures_are_delivered() {
        let provider = node();
        provider.respond(|_| Err(Error::InvalidConnection("http://localhost:8545".to_owned())));
        let manager = RequestManager::new(Some(provider.clone()));
        let filter = Filter::eth(manager, log_options()).unwrap();
        let (callback, received) = recorder();
        filter.watch(callback);

        until(|| !received.lock().unwrap().is_empty()).await;
        assert!(matches!(
            received.lock().unwrap()[0],
            Err(Error::InvalidConnection(_))
        ));
        assert!(matches!(
            filter.get_async().await,
            Err(Error::FilterNotInstalled)
        ));
    }

    #[tokio::test]
    async fn get_formats_logs() {
        let provider = node();
        let manager = RequestManager::new(Some(provider.clone()));
        let filter = Filter::eth(manager, log_options()).unwrap();
        until(|| filter.filter_id().is_some()).await;

        let logs = filter.get_async().await.unwrap();
        assert_eq!(logs, [json!({"blockNumber": 1, "logIndex": 0})]);
    }

    #[test]
    fn filter_methods() {
        let id = FilterId::from_raw(ethprim::U256::new(7));
        assert_eq!(
            EthFilter.new_filter(&FilterOptions::pending()).unwrap(),
            Call::new("eth_newPendingTransactionFilter", vec![]),
        );
        assert_eq!(
            EthFilter
                .new_filter(&FilterOptions::Tag(BlockTag::Earliest))
                .unwrap(),
            Call::new("eth_newFilter", vec![json!("earliest")]),
        );
        assert_eq!(ShhFilter.get_logs(id), Call::new("shh_getMessages", vec![json!("0x7")]));
        assert_eq!(
            ShhFilter.poll(id),
            Call::new("shh_getFilterChanges", vec![json!("0x7")]),
        );
        assert_eq!(
            ShhFilter.new_filter(&log_options()).unwrap().method,
            "shh_newFilter",
        );
    }

    #[test]
    fn filters_need_a_runtime() {
        let manager = RequestManager::new(None);
        assert!(matches!(
            Filter::eth(manager, FilterOptions::latest()),
            Err(Error::NoRuntime)
        ));
    }
}
