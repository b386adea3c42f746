//! Builder for thumbnail store configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tabsago_capture::{JsonFileSettings, RetentionPolicy, ThumbnailStore};
//!
//! let store = ThumbnailStore::builder()
//!     .path("profile/thumbnails.sqlite")
//!     .retention(RetentionPolicy::new().with_global_cap(300))
//!     .settings(Arc::new(JsonFileSettings::new("profile/settings.json")))
//!     .build()?;
//! store.initialize().await;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::platform::SettingsStore;

use super::ThumbnailStore;
use super::cache::DEFAULT_CACHE_CAPACITY;
use super::normalize::NormalizeOptions;
use super::prune::RetentionPolicy;

// ============================================================================
// Types
// ============================================================================

/// Wall clock returning epoch milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Returns a clock reading the system time.
#[must_use]
pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_millis())
}

/// Where the record database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// SQLite file on disk.
    Path(PathBuf),
    /// Private in-memory database, gone when the store is dropped.
    Memory,
}

impl StoreLocation {
    /// Returns the file path, if on disk.
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Memory => None,
        }
    }
}

// ============================================================================
// StoreBuilder
// ============================================================================

/// Builder for a [`ThumbnailStore`].
///
/// Use [`ThumbnailStore::builder()`] to create one.
#[derive(Clone, Default)]
pub struct StoreBuilder {
    location: Option<StoreLocation>,
    retention: RetentionPolicy,
    normalize: NormalizeOptions,
    cache_capacity: Option<usize>,
    settings: Option<Arc<dyn SettingsStore>>,
    clock: Option<Clock>,
}

impl StoreBuilder {
    /// Creates a builder with default policy and no location.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores records in a SQLite file.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(StoreLocation::Path(path.into()));
        self
    }

    /// Stores records in memory.
    #[must_use]
    pub fn in_memory(mut self) -> Self {
        self.location = Some(StoreLocation::Memory);
        self
    }

    /// Sets the retention policy.
    #[must_use]
    pub fn retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Sets the normalization target.
    #[must_use]
    pub fn normalize(mut self, normalize: NormalizeOptions) -> Self {
        self.normalize = normalize;
        self
    }

    /// Sets how many URLs the read cache holds.
    #[must_use]
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Sets the settings store holding legacy thumbnails.
    ///
    /// Without one, [`ThumbnailStore::initialize`] skips migration.
    #[must_use]
    pub fn settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Replaces the wall clock.
    #[must_use]
    pub fn clock(mut self, clock: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Builds the store. The database is opened on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no location was set or the retention
    /// or normalization options are invalid.
    pub fn build(self) -> Result<ThumbnailStore> {
        let location = self.location.ok_or_else(|| {
            Error::config(
                "Store location is required. Use .path() or .in_memory() to set it.",
            )
        })?;

        if let StoreLocation::Path(path) = &location
            && path.as_os_str().is_empty()
        {
            return Err(Error::config("Store path must not be empty"));
        }

        self.retention.validate()?;
        self.normalize.validate()?;

        Ok(ThumbnailStore::from_parts(
            location,
            self.retention,
            self.normalize,
            self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY),
            self.settings,
            self.clock.unwrap_or_else(system_clock),
        ))
    }
}

impl fmt::Debug for StoreBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreBuilder")
            .field("location", &self.location)
            .field("retention", &self.retention)
            .field("normalize", &self.normalize)
            .field("cache_capacity", &self.cache_capacity)
            .field("settings", &self.settings.is_some())
            .field("clock", &self.clock.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
