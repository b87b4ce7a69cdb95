//! HTTP transport.
//!
//! The dispatcher issues exactly one `POST` per request through
//! [`HttpTransport`]. There are no retries and no timeouts beyond those of the
//! underlying client.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::StatusCode;
use tracing::debug;

use crate::adapter::PreparedRequest;
use crate::error::DispatchError;

/// What came back from the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response body, or `None` if it could not be read.
    pub body: Option<Bytes>,
}

impl HttpResponse {
    /// A response with a readable body.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: Some(body.into()),
        }
    }
}

/// Sends prepared requests.
pub trait HttpTransport: Send + Sync {
    /// Send `request` as a `POST` and collect the full response.
    ///
    /// Only transport-level failures are errors; any HTTP status is a response.
    fn send(
        &self,
        request: PreparedRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, DispatchError>> + Send + '_>>;
}

/// Transport backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport around an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    fn send(
        &self,
        request: PreparedRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, DispatchError>> + Send + '_>> {
        Box::pin(async move {
            let mut builder = self.client.post(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            let response = builder
                .body(request.body)
                .send()
                .await
                .map_err(|e| DispatchError::Network(e.to_string()))?;

            let status = response.status();
            let body = match response.bytes().await {
                Ok(body) => Some(body),
                Err(e) => {
                    debug!(error = %e, %status, "Failed to read response body");
                    None
                }
            };

            Ok(HttpResponse { status, body })
        })
    }
}
