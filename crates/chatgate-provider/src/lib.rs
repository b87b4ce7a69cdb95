//! Provider adapters and chat dispatch for ChatGate.
//!
//! A [`Dispatcher`] turns a [`chatgate_core::ChatRequest`] into one HTTP call
//! to the configured backend and folds the outcome into a [`DispatchResult`]:
//!
//! - settings and credentials are read through the
//!   [`chatgate_core::SettingsLoader`] on every call;
//! - a [`ProviderAdapter`] builds the provider-specific request (signing it
//!   for Bedrock) and parses the reply;
//! - an [`HttpTransport`] sends it.
//!
//! # Modules
//!
//! - [`adapter`] - Per-provider request building and response parsing
//! - [`dispatch`] - The dispatcher
//! - [`error`] - Dispatch error types
//! - [`result`] - The `{success, data}` / `{error}` result
//! - [`state`] - Caller-owned in-flight guard
//! - [`transport`] - HTTP transport trait and reqwest implementation

pub mod adapter;
pub mod dispatch;
pub mod error;
pub mod result;
pub mod state;
pub mod transport;

pub use adapter::{PreparedRequest, ProviderAdapter, RequestOptions, adapter_for};
pub use dispatch::Dispatcher;
pub use error::{DispatchError, SessionError};
pub use result::DispatchResult;
pub use state::{RequestSession, RequestState};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
