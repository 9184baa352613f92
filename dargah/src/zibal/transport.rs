use http::StatusCode;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Sends a JSON body to a provider endpoint and hands back the JSON reply.
///
/// [`GatewayClient`](crate::zibal::GatewayClient) only ever talks to the
/// provider through this trait, so tests can swap the network out for a spy.
pub trait Transport: Send + Sync {
    /// Sends `payload` as a `POST` request to `url`.
    ///
    /// `context` is a human-readable label used in logs and error messages
    /// (e.g. `"POST /v1/verify"`).
    fn post_json<'a>(
        &'a self,
        url: &'a Url,
        context: &'static str,
        payload: &'a Value,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send + 'a;
}

/// Errors that can occur while exchanging JSON with the provider.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        context: &'static str,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    /// Applied to every request; the provider itself defines none.
    timeout: Duration,
}

impl HttpTransport {
    /// Builds a transport whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Http {
                context: "Failed to build HTTP client",
                source: e,
            })?;
        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Transport for HttpTransport {
    fn post_json<'a>(
        &'a self,
        url: &'a Url,
        context: &'static str,
        payload: &'a Value,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send + 'a {
        async move {
            debug!("{} -> {}", context, url);
            let http_response = self
                .client
                .post(url.clone())
                .json(payload)
                .send()
                .await
                .map_err(|e| TransportError::Http { context, source: e })?;

            if http_response.status() == StatusCode::OK {
                http_response
                    .json::<Value>()
                    .await
                    .map_err(|e| TransportError::JsonDeserialization { context, source: e })
            } else {
                let status = http_response.status();
                let body = http_response
                    .text()
                    .await
                    .map_err(|e| TransportError::ResponseBodyRead { context, source: e })?;
                Err(TransportError::HttpStatus {
                    context,
                    status,
                    body,
                })
            }
        }
    }
}
