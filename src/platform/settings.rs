//! Flat key/value settings storage.
//!
//! The extension keeps preferences and the legacy thumbnail blob in a flat
//! JSON key/value area. [`SettingsStore`] abstracts it; [`JsonFileSettings`]
//! persists one JSON object to disk and [`MemorySettings`] keeps it in memory.

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Keys
// ============================================================================

/// Key of the legacy single-blob thumbnail map.
pub const LEGACY_THUMBNAILS_KEY: &str = "tabsago_thumbnails";

/// Key of the automatic thumbnail capture preference.
pub const AUTO_THUMBNAIL_CAPTURE_KEY: &str = "tabsago_auto_thumbnail_capture";

// ============================================================================
// SettingsStore
// ============================================================================

/// Flat persisted key/value store.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Reads a key. Returns `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Writes a key.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Deletes a key. Deleting an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

// ============================================================================
// MemorySettings
// ============================================================================

/// In-memory settings store.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<FxHashMap<String, Value>>,
}

impl MemorySettings {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of keys.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Checks if the store is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.values.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

// ============================================================================
// JsonFileSettings
// ============================================================================

/// Settings store backed by a single JSON object file.
///
/// Writes go through a temporary file and a rename. A missing file reads as
/// an empty object.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    /// Serializes read-modify-write cycles.
    lock: tokio::sync::Mutex<()>,
}

impl JsonFileSettings {
    /// Creates a store persisting to `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Map<String, Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::settings(format!(
                "{} holds {} instead of an object",
                self.path.display(),
                json_type(&other)
            ))),
        }
    }

    async fn save(&self, map: Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(&Value::Object(map))?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, content).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettings {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        map.insert(key.to_string(), value);
        self.save(map).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.save(map).await?;
        }
        Ok(())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ============================================================================
// Tests
// ============================================================================
