//! Chat dispatch.
//!
//! Every call reads settings fresh through the [`SettingsLoader`], selects the
//! adapter for the configured provider, sends one request, and folds every
//! outcome into a [`DispatchResult`].

use std::sync::Arc;

use chatgate_core::{ChatRequest, SettingsLoader};
use tracing::{debug, info, warn};

use crate::adapter::{RequestOptions, adapter_for};
use crate::error::{DispatchError, UNREADABLE_BODY};
use crate::result::DispatchResult;
use crate::transport::HttpTransport;

/// Routes chat requests to the configured backend.
#[derive(Clone)]
pub struct Dispatcher {
    loader: SettingsLoader,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("loader", &self.loader)
            .field("transport", &"...")
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher reading settings through `loader`.
    pub fn new(loader: SettingsLoader, transport: Arc<dyn HttpTransport>) -> Self {
        Self { loader, transport }
    }

    /// Dispatch `request`. Never fails; errors become `{error}` results.
    pub async fn dispatch(&self, request: &ChatRequest) -> DispatchResult {
        match self.try_dispatch(request).await {
            Ok(text) => DispatchResult::success(text),
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Dispatch failed");
                DispatchResult::failure(e.to_string())
            }
        }
    }

    /// Dispatch `request`, returning the reply text or the typed failure.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`] for missing configuration, an unsupported
    /// provider, transport failures, non-success statuses and malformed replies.
    pub async fn try_dispatch(&self, request: &ChatRequest) -> Result<String, DispatchError> {
        let settings = self.loader.load().await?;
        let provider = settings.provider()?;
        let credentials = settings.credentials(provider)?;

        let adapter = adapter_for(provider, self.loader.catalog());
        let model = adapter.validate_model(settings.selected_model()).into_model();
        let options =
            RequestOptions::new(&model).with_endpoint(settings.endpoint_override(provider));

        let prepared = adapter.build_request(request, &credentials, &options)?;
        info!(
            %provider,
            model = %model,
            url = %prepared.url,
            messages = request.messages.len(),
            "Dispatching chat request"
        );

        let response = self.transport.send(prepared).await?;
        debug!(%provider, status = %response.status, "Received response");

        if !response.status.is_success() {
            let body = response.body.map_or_else(
                || UNREADABLE_BODY.to_owned(),
                |b| String::from_utf8_lossy(&b).into_owned(),
            );
            return Err(DispatchError::UpstreamHttp {
                provider,
                status: response.status.as_u16(),
                body,
            });
        }

        let body = response
            .body
            .ok_or_else(|| DispatchError::Network("failed to read response body".to_owned()))?;
        adapter.parse_response(&body)
    }
}
