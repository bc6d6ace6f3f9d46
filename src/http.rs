//! HTTP JSON RPC provider.

use crate::{
    manager::Error,
    provider::{Payload, Provider},
};
use futures::{future::BoxFuture, FutureExt as _};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::{env, sync::OnceLock};

/// A provider that posts payloads to a node over HTTP.
///
/// The blocking client used by [`Provider::send`] is created on first use, so
/// blocking sends must happen outside of an async context.
pub struct HttpProvider {
    client: reqwest::Client,
    blocking: OnceLock<reqwest::blocking::Client>,
    url: Url,
}

impl HttpProvider {
    /// Creates a new HTTP provider for the specified URL with the default HTTP
    /// client.
    pub fn new(url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    /// Creates a new HTTP provider for the specified client instance and URL.
    pub fn with_client(client: reqwest::Client, url: Url) -> Self {
        Self {
            client,
            blocking: OnceLock::new(),
            url,
        }
    }

    /// Creates a new HTTP provider from the `NODE_URL` environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let url = env::var("NODE_URL").map_err(|_| Error::InvalidProvider)?;
        let url = url
            .parse()
            .map_err(|_| Error::InvalidConnection(url.clone()))?;
        Ok(Self::new(url))
    }

    /// The node URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn connection_error(&self, err: reqwest::Error) -> Error {
        tracing::debug!(url = %self.url, ?err, "HTTP request failed");
        Error::InvalidConnection(self.url.to_string())
    }
}

fn parse(status: StatusCode, body: String) -> Result<Value, Error> {
    if !status.is_success() {
        return Err(Error::Status {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body)
        .map_err(|_| Error::InvalidResponse(format!("Invalid JSON RPC response: {body}")))
}

impl Provider for HttpProvider {
    fn send(&self, payload: &Payload) -> Result<Value, Error> {
        let client = self.blocking.get_or_init(reqwest::blocking::Client::new);
        let response = client
            .post(self.url.clone())
            .json(payload)
            .send()
            .map_err(|err| self.connection_error(err))?;

        let status = response.status();
        let body = response.text().map_err(|err| self.connection_error(err))?;
        parse(status, body)
    }

    fn send_async<'a>(&'a self, payload: &'a Payload) -> BoxFuture<'a, Result<Value, Error>> {
        async move {
            let response = self
                .client
                .post(self.url.clone())
                .json(payload)
                .send()
                .await
                .map_err(|err| self.connection_error(err))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|err| self.connection_error(err))?;
            parse(status, body)
        }
        .boxed()
    }
}
