//! [`HttpTransport`]: the `reqwest` implementation of [`manager::Transport`].

use std::time::Duration;

use async_trait::async_trait;
use manager::{CallResult, Endpoint, ManagerError, Procedure, Transport, TransportFault};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::faults;
use crate::jsonrpc::{RpcRequest, RpcResponse};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Settings for the HTTP client behind an [`HttpTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportConfig {
    /// Skip certificate verification. Job managers are usually deployed with
    /// self-signed certificates, so operators often need this.
    pub accept_invalid_certs: bool,

    /// Limit on establishing the TCP/TLS connection.
    pub connect_timeout: Option<Duration>,

    /// Limit on a whole request, enforced by `reqwest` in addition to the
    /// dispatcher's per-call deadline.
    pub request_timeout: Option<Duration>,

    /// `User-Agent` header value.
    pub user_agent: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            accept_invalid_certs: false,
            connect_timeout: None,
            request_timeout: None,
            user_agent: concat!("manager-http/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

/// Errors raised while building an [`HttpTransport`].
#[derive(Debug, Error)]
pub enum HttpTransportError {
    /// `reqwest` could not build its client (e.g. TLS backend initialisation).
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

impl From<HttpTransportError> for ManagerError {
    fn from(err: HttpTransportError) -> Self {
        ManagerError::configuration(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Sends each call as one JSON-RPC POST to the manager's URL.
///
/// Building it creates a connection pool handle only; nothing is sent until the
/// first call.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    timeout_hint: Duration,
}

impl HttpTransport {
    /// Creates a transport that posts to `url`.
    ///
    /// # Errors
    ///
    /// [`HttpTransportError::Build`] if the HTTP client cannot be built.
    pub fn new(
        url: impl Into<String>,
        config: &HttpTransportConfig,
    ) -> Result<Self, HttpTransportError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            url: url.into(),
            timeout_hint: config
                .request_timeout
                .or(config.connect_timeout)
                .unwrap_or_default(),
        })
    }

    /// Creates a transport bound to `endpoint`'s HTTPS URL.
    pub fn for_endpoint(
        endpoint: &Endpoint,
        config: &HttpTransportConfig,
    ) -> Result<Self, HttpTransportError> {
        Self::new(endpoint.url(), config)
    }

    /// Returns the URL requests are posted to.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn invoke(
        &self,
        procedure: Procedure,
        params: &[Value],
    ) -> Result<CallResult, TransportFault> {
        let request = RpcRequest::new(procedure, params);
        // params are never logged: the last one is the secret.
        debug!(%procedure, request_id = %request.id, url = %self.url, "sending JSON-RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|err| faults::from_reqwest(&err, self.timeout_hint))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(err) => {
                    debug!(%procedure, request_id = %request.id, %status, error = %err, "failed to read error response body");
                    String::new()
                }
            };
            return Err(faults::from_status(status, &body));
        }

        let envelope: RpcResponse = response
            .json()
            .await
            .map_err(|err| faults::from_reqwest(&err, self.timeout_hint))?;
        if let Some(error) = envelope.error {
            debug!(%procedure, request_id = %request.id, code = error.code, "JSON-RPC error response");
            return Err(faults::from_rpc_error(&error));
        }

        serde_json::from_value(envelope.result.unwrap_or(Value::Null))
            .map_err(|err| TransportFault::other("decode", err.to_string()))
    }
}
