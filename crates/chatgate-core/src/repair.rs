//! Settings loading and model self-correction.
//!
//! A persisted model identifier that fails its provider's allow-list is
//! replaced by the provider default and the correction is written back once.
//! The repair is idempotent: after one write the stored model is valid and
//! later runs find nothing to fix.
//!
//! Repair runs in three places, all outside the dispatch hot path:
//!
//! - [`SettingsLoader::load`], which every dispatch uses to read settings;
//! - [`bootstrap`], at install/startup time;
//! - [`repair_selected_model`], on demand.
//!
//! [`reset_model`] is the unconditional variant.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{ConfigResult, StoreError};
use crate::models::{ModelCatalog, ModelCheck};
use crate::settings::{Settings, keys};
use crate::store::{SettingsMap, SettingsStore};
use crate::types::Provider;

/// Result of a repair attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairOutcome {
    /// The stored model was valid, absent, or not subject to an allow-list.
    Unchanged,
    /// The stored model was replaced.
    Repaired {
        /// Provider whose model was corrected.
        provider: Provider,
        /// Previous identifier.
        from: String,
        /// Identifier now stored.
        to: String,
    },
}

/// Reads settings through a store on every call and repairs invalid models.
#[derive(Clone)]
pub struct SettingsLoader {
    store: Arc<dyn SettingsStore>,
    catalog: Arc<ModelCatalog>,
}

impl std::fmt::Debug for SettingsLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsLoader")
            .field("store", &"...")
            .field("catalog", &self.catalog)
            .finish()
    }
}

impl SettingsLoader {
    /// Create a loader over `store` using the model policies in `catalog`.
    pub fn new(store: Arc<dyn SettingsStore>, catalog: Arc<ModelCatalog>) -> Self {
        Self { store, catalog }
    }

    /// The model policies this loader applies.
    #[must_use]
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Read fresh settings from the store, correcting an invalid model.
    ///
    /// A failed correction write is logged and the corrected model is still
    /// returned, so the current request proceeds with a valid identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::ConfigError`] if the store cannot be read or holds
    /// malformed settings.
    pub async fn load(&self) -> ConfigResult<Settings> {
        let mut settings = read_settings(self.store.as_ref()).await?;

        if let Some((provider, ModelCheck::Corrected { requested, model })) =
            check_selected_model(&settings, &self.catalog)
        {
            if let Err(e) = persist_model(self.store.as_ref(), provider, &requested, &model).await {
                error!(error = %e, "Failed to persist corrected model");
            }
            settings.selected_model = Some(model);
        }

        Ok(settings)
    }
}

/// Validate the stored model against its provider's policy and persist a
/// correction if needed.
///
/// # Errors
///
/// Returns a [`crate::ConfigError`] if the store cannot be read or written.
pub async fn repair_selected_model(
    store: &dyn SettingsStore,
    catalog: &ModelCatalog,
) -> ConfigResult<RepairOutcome> {
    let settings = read_settings(store).await?;

    match check_selected_model(&settings, catalog) {
        Some((provider, ModelCheck::Corrected { requested, model })) => {
            persist_model(store, provider, &requested, &model).await?;
            Ok(RepairOutcome::Repaired {
                provider,
                from: requested,
                to: model,
            })
        }
        _ => Ok(RepairOutcome::Unchanged),
    }
}

/// Startup-time repair. Identical to [`repair_selected_model`], logged as bootstrap.
///
/// # Errors
///
/// Returns a [`crate::ConfigError`] if the store cannot be read or written.
pub async fn bootstrap(
    store: &dyn SettingsStore,
    catalog: &ModelCatalog,
) -> ConfigResult<RepairOutcome> {
    let outcome = repair_selected_model(store, catalog).await?;
    info!(repaired = outcome != RepairOutcome::Unchanged, "Bootstrap settings check complete");
    Ok(outcome)
}

/// Force the signed provider's model back to its default.
///
/// Writes only when the configured provider is the signed provider, whatever
/// model is currently stored.
///
/// # Errors
///
/// Returns a [`crate::ConfigError`] if the store cannot be read or written.
pub async fn reset_model(
    store: &dyn SettingsStore,
    catalog: &ModelCatalog,
) -> ConfigResult<RepairOutcome> {
    let settings = read_settings(store).await?;
    info!(
        api_provider = ?settings.api_provider,
        selected_model = ?settings.selected_model,
        "Settings before model reset"
    );

    if settings.api_provider.as_deref() != Some(Provider::Bedrock.as_str()) {
        return Ok(RepairOutcome::Unchanged);
    }

    let from = settings.selected_model.unwrap_or_default();
    let to = catalog.policy(Provider::Bedrock).default_model().to_owned();
    write_model(store, &to).await?;
    info!(selected_model = %to, "Model force reset to default");

    Ok(RepairOutcome::Repaired {
        provider: Provider::Bedrock,
        from,
        to,
    })
}

async fn read_settings(store: &dyn SettingsStore) -> ConfigResult<Settings> {
    let entries = store.get(keys::ALL).await?;
    Settings::from_map(entries)
}

/// Check the stored model, if both a known provider and a model are stored.
fn check_selected_model(
    settings: &Settings,
    catalog: &ModelCatalog,
) -> Option<(Provider, ModelCheck)> {
    let provider: Provider = settings.api_provider.as_deref()?.parse().ok()?;
    let selected = settings.selected_model()?;
    let check = catalog.policy(provider).validate(Some(selected));
    debug!(%provider, selected, corrected = check.needs_correction(), "Checked stored model");
    Some((provider, check))
}

async fn persist_model(
    store: &dyn SettingsStore,
    provider: Provider,
    requested: &str,
    model: &str,
) -> Result<(), StoreError> {
    warn!(%provider, requested, default = model, "Invalid model detected, using default");
    write_model(store, model).await?;
    info!(%provider, selected_model = model, "Persisted corrected model");
    Ok(())
}

async fn write_model(store: &dyn SettingsStore, model: &str) -> Result<(), StoreError> {
    let mut entries = SettingsMap::new();
    entries.insert(keys::SELECTED_MODEL.to_owned(), Value::String(model.to_owned()));
    store.set(entries).await
}
