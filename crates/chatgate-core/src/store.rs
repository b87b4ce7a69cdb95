//! Asynchronous key-value settings store.
//!
//! The engine never owns the persisted settings. It reads and writes them
//! through [`SettingsStore`], an async key-value interface modelled on browser
//! extension storage: `get` returns the subset of requested keys that exist,
//! `set` merges the given entries into the stored object.
//!
//! Two implementations are provided:
//!
//! - [`InMemorySettingsStore`] for tests and embedding; it counts writes.
//! - [`JsonFileSettingsStore`] for the command-line binary; it keeps the whole
//!   object in one JSON file.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::error::StoreError;

/// Raw settings entries, keyed by persisted name.
pub type SettingsMap = serde_json::Map<String, Value>;

/// Boxed future returned by [`SettingsStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Persisted settings backend.
pub trait SettingsStore: Send + Sync {
    /// Read the entries for `keys`. Missing keys are absent from the result.
    fn get<'a>(&'a self, keys: &'a [&'a str]) -> StoreFuture<'a, SettingsMap>;

    /// Merge `entries` into the stored settings.
    fn set(&self, entries: SettingsMap) -> StoreFuture<'_, ()>;
}

/// In-memory settings store.
///
/// # Examples
///
/// ```
/// use chatgate_core::{InMemorySettingsStore, SettingsStore};
///
/// # tokio_test_block_on(async {
/// let store = InMemorySettingsStore::from_value(serde_json::json!({"apiProvider": "openai"}));
/// let entries = store.get(&["apiProvider", "selectedModel"]).await.unwrap();
/// assert_eq!(entries.len(), 1);
/// assert_eq!(store.write_count(), 0);
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    entries: Mutex<SettingsMap>,
    writes: AtomicUsize,
}

impl InMemorySettingsStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the entries of a JSON object.
    ///
    /// Non-object values produce an empty store.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let entries = match value {
            Value::Object(map) => map,
            _ => SettingsMap::new(),
        };
        Self {
            entries: Mutex::new(entries),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of `set` calls served so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of everything currently stored.
    #[must_use]
    pub fn snapshot(&self) -> SettingsMap {
        self.entries.lock().clone()
    }
}

impl SettingsStore for InMemorySettingsStore {
    fn get<'a>(&'a self, keys: &'a [&'a str]) -> StoreFuture<'a, SettingsMap> {
        let entries = self.entries.lock();
        let found = select_keys(&entries, keys);
        Box::pin(async move { Ok(found) })
    }

    fn set(&self, entries: SettingsMap) -> StoreFuture<'_, ()> {
        self.entries.lock().extend(entries);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

/// Settings store backed by a single JSON file.
///
/// A missing file reads as an empty object. Writes go to a sibling temporary
/// file that is renamed over the target, so a reader sees either the old or
/// the new object. Reads share a lock that `set` holds exclusively for its
/// read-merge-write cycle.
#[derive(Debug)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
    lock: tokio::sync::RwLock<()>,
}

impl JsonFileSettingsStore {
    /// Create a store for the file at `path`. The file is not touched until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::RwLock::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<SettingsMap, StoreError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SettingsMap::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(SettingsMap::new());
        }
        Ok(serde_json::from_slice(&raw)?)
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn get<'a>(&'a self, keys: &'a [&'a str]) -> StoreFuture<'a, SettingsMap> {
        Box::pin(async move {
            let _guard = self.lock.read().await;
            let all = self.read_all().await?;
            Ok(select_keys(&all, keys))
        })
    }

    fn set(&self, entries: SettingsMap) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let _guard = self.lock.write().await;
            let mut all = self.read_all().await?;
            all.extend(entries);
            let encoded = serde_json::to_vec_pretty(&Value::Object(all))?;
            let staging = self.staging_path();
            tokio::fs::write(&staging, encoded).await?;
            tokio::fs::rename(&staging, &self.path).await?;
            debug!(path = %self.path.display(), "Wrote settings file");
            Ok(())
        })
    }
}

fn select_keys(entries: &SettingsMap, keys: &[&str]) -> SettingsMap {
    keys.iter()
        .filter_map(|k| entries.get(*k).map(|v| ((*k).to_owned(), v.clone())))
        .collect()
}
