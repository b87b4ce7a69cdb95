//! Core types, persisted settings, and model catalog for ChatGate.
//!
//! This crate holds everything the dispatch layer needs before it talks to
//! the network: the provider and message types, the settings store
//! abstraction, the typed settings view, per-provider model policies, and
//! the self-correcting settings loader.

mod config;
mod error;
pub mod models;
mod repair;
pub mod settings;
mod store;
mod types;

pub use config::{ChatGateConfig, DEFAULT_SETTINGS_PATH};
pub use error::{ConfigError, ConfigResult, StoreError};
pub use models::{ModelCatalog, ModelCheck, ModelPolicy};
pub use repair::{RepairOutcome, SettingsLoader, bootstrap, repair_selected_model, reset_model};
pub use settings::{ApiKeys, Settings};
pub use store::{
    InMemorySettingsStore, JsonFileSettingsStore, SettingsMap, SettingsStore, StoreFuture,
};
pub use types::{ChatMessage, ChatRequest, Credentials, Provider, Role};
