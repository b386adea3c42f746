//! Thumbnail persistence.
//!
//! [`ThumbnailStore`] normalizes captures, persists them in SQLite, enforces
//! the [`RetentionPolicy`] around every write, and serves reads through a
//! URL-keyed LRU cache.
//!
//! # Write path
//!
//! | Step | Failure handling |
//! |------|------------------|
//! | Normalize (decode, downscale, JPEG) | falls back to the original bytes |
//! | Prune records older than the TTL | logged, write continues |
//! | Insert record | aborts the write |
//! | Prune the `(tab_id, url)` key to the per-key cap | logged |
//! | Prune oldest records down to the global cap | logged |
//! | Cache the new record by URL | - |
//!
//! Each database step is its own transaction, so a failed prune never
//! rolls back a committed insert.

// ============================================================================
// Submodules
// ============================================================================

/// Store builder and clock.
pub mod builder;

/// Image normalization.
pub mod normalize;

/// Retention policy.
pub mod prune;

/// Record types.
pub mod record;

mod cache;
mod migration;
mod schema;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::Connection;
use tokio::sync::OnceCell;
use tokio::task::spawn_blocking;
use tracing::{debug, error, info, trace, warn};

use crate::capture::{CaptureKind, CaptureMetadata, CaptureSink};
use crate::error::{Error, Result};
use crate::identifiers::{RecordId, TabId, WindowId};
use crate::platform::{LEGACY_THUMBNAILS_KEY, SettingsStore};

use self::cache::ThumbnailCache;
use self::normalize::normalize_or_original;
use self::record::NewThumbnail;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{Clock, StoreBuilder, StoreLocation, system_clock};
pub use cache::DEFAULT_CACHE_CAPACITY;
pub use normalize::{NormalizeOptions, NormalizedImage};
pub use prune::RetentionPolicy;
pub use record::{StoreStats, ThumbnailRecord};

// ============================================================================
// Constants
// ============================================================================

/// Default number of records returned by [`ThumbnailStore::get_latest`].
pub const DEFAULT_LATEST_LIMIT: usize = 2;

// ============================================================================
// ThumbnailStore
// ============================================================================

/// Durable, size-bounded thumbnail storage.
///
/// Cheap to clone; clones share the database, cache, and migration flag.
#[derive(Clone)]
pub struct ThumbnailStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    location: StoreLocation,
    retention: RetentionPolicy,
    normalize: NormalizeOptions,
    settings: Option<Arc<dyn SettingsStore>>,
    clock: Clock,
    conn: OnceCell<Arc<Mutex<Connection>>>,
    cache: Mutex<ThumbnailCache>,
    migration_ran: AtomicBool,
}

/// A capture on its way into the store.
struct Incoming {
    tab_id: TabId,
    window_id: WindowId,
    url: String,
    kind: CaptureKind,
    data: Vec<u8>,
    fallback_mime: String,
    captured_at: Option<i64>,
}

// ============================================================================
// Constructors
// ============================================================================

impl ThumbnailStore {
    /// Creates a store builder.
    #[inline]
    #[must_use]
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    pub(crate) fn from_parts(
        location: StoreLocation,
        retention: RetentionPolicy,
        normalize: NormalizeOptions,
        cache_capacity: usize,
        settings: Option<Arc<dyn SettingsStore>>,
        clock: Clock,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                location,
                retention,
                normalize,
                settings,
                clock,
                conn: OnceCell::new(),
                cache: Mutex::new(ThumbnailCache::new(cache_capacity)),
                migration_ran: AtomicBool::new(false),
            }),
        }
    }

    /// Returns the retention policy.
    #[inline]
    #[must_use]
    pub fn retention(&self) -> &RetentionPolicy {
        &self.inner.retention
    }

    /// Returns the number of cached URLs.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.inner.cache.lock().len()
    }
}

impl fmt::Debug for ThumbnailStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThumbnailStore")
            .field("location", &self.inner.location)
            .field("retention", &self.inner.retention)
            .field("normalize", &self.inner.normalize)
            .field("opened", &self.inner.conn.initialized())
            .field("cached", &self.cache_len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Public Operations
// ============================================================================

impl ThumbnailStore {
    /// Opens the database and migrates legacy thumbnails once per process.
    ///
    /// Failures are logged. See [`try_initialize`](Self::try_initialize).
    pub async fn initialize(&self) {
        if let Err(e) = self.try_initialize().await {
            error!(error = %e, "Thumbnail store initialization failed");
        }
    }

    /// Opens the database and migrates legacy thumbnails once per process.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened. Migration
    /// failures are logged and do not fail initialization.
    pub async fn try_initialize(&self) -> Result<()> {
        self.connection().await?;
        self.run_migration().await;
        Ok(())
    }

    /// Normalizes and stores a capture. Returns `None` on failure.
    pub async fn put_capture(&self, metadata: CaptureMetadata) -> Option<ThumbnailRecord> {
        let tab_id = metadata.tab_id;
        match self.try_put_capture(metadata).await {
            Ok(record) => Some(record),
            Err(e) => {
                error!(%tab_id, error = %e, "Failed to store capture");
                None
            }
        }
    }

    /// Normalizes and stores a capture.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is empty or the insert fails. Prune
    /// failures are logged only.
    pub async fn try_put_capture(&self, metadata: CaptureMetadata) -> Result<ThumbnailRecord> {
        self.store(Incoming {
            tab_id: metadata.tab_id,
            window_id: metadata.window_id,
            url: metadata.url,
            kind: metadata.kind,
            fallback_mime: metadata.format.mime_type().to_string(),
            data: metadata.data,
            captured_at: None,
        })
        .await
    }

    /// Returns up to `limit` newest records for `url`.
    ///
    /// A cache hit returns the single cached record. Records are matched on
    /// URL only; `tab_id` is accepted for callers that track it. Failures
    /// yield an empty list.
    pub async fn get_latest(&self, tab_id: TabId, url: &str, limit: usize) -> Vec<ThumbnailRecord> {
        match self.try_get_latest(tab_id, url, limit).await {
            Ok(records) => records,
            Err(e) => {
                warn!(%tab_id, error = %e, "Thumbnail lookup failed");
                Vec::new()
            }
        }
    }

    /// Fallible form of [`get_latest`](Self::get_latest).
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn try_get_latest(
        &self,
        tab_id: TabId,
        url: &str,
        limit: usize,
    ) -> Result<Vec<ThumbnailRecord>> {
        if url.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        if let Some(record) = self.inner.cache.lock().get(url) {
            trace!(%tab_id, url, "Thumbnail cache hit");
            return Ok(vec![record]);
        }

        let owned_url = url.to_string();
        let records = self
            .with_conn(move |conn| schema::latest_by_url(conn, &owned_url, limit))
            .await?;

        // A write may have cached a newer record while the query ran.
        if let Some(newest) = records.first() {
            self.inner.cache.lock().insert_if_newer(newest.clone());
        }
        Ok(records)
    }

    /// Returns the newest record for `url`, if any.
    pub async fn get_latest_record(&self, tab_id: TabId, url: &str) -> Option<ThumbnailRecord> {
        self.get_latest(tab_id, url, 1).await.into_iter().next()
    }

    /// Deletes every record and empties the cache. Failures are logged.
    pub async fn clear_all(&self) {
        if let Err(e) = self.try_clear_all().await {
            warn!(error = %e, "Failed to clear thumbnails");
        }
    }

    /// Deletes every record and empties the cache.
    ///
    /// Returns the number of deleted records.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails; the cache is then left intact.
    pub async fn try_clear_all(&self) -> Result<usize> {
        let removed = self.with_conn(schema::clear).await?;
        self.inner.cache.lock().clear();
        info!(removed, "Thumbnails cleared");
        Ok(removed)
    }

    /// Returns record count and payload size.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn stats(&self) -> Result<StoreStats> {
        self.with_conn(|conn| schema::stats(conn)).await
    }

    /// Returns the number of persisted records.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn count(&self) -> Result<u64> {
        self.with_conn(|conn| schema::count(conn)).await
    }
}

// ============================================================================
// Write Path
// ============================================================================

impl ThumbnailStore {
    async fn store(&self, incoming: Incoming) -> Result<ThumbnailRecord> {
        if incoming.url.is_empty() {
            return Err(Error::storage("put_capture", "url must not be empty"));
        }

        let options = self.inner.normalize;
        let data = incoming.data;
        let fallback_mime = incoming.fallback_mime;
        let normalized =
            spawn_blocking(move || normalize_or_original(data, &fallback_mime, &options)).await?;

        let now = self.now();
        let new = NewThumbnail {
            tab_id: incoming.tab_id,
            window_id: incoming.window_id,
            url: incoming.url,
            kind: incoming.kind,
            image: normalized.bytes,
            mime_type: normalized.mime_type,
            width: normalized.width,
            height: normalized.height,
            dpr: normalized.dpr,
            captured_at: incoming.captured_at.unwrap_or(now),
        };
        let tab_id = new.tab_id;
        let key_url = new.url.clone();
        let retention = self.inner.retention;

        let cutoff = retention.cutoff(now);
        let mut removed = self
            .prune_step("prune_expired", move |conn| {
                prune::prune_expired(conn, cutoff)
            })
            .await;

        let record = self
            .with_conn(move |conn| {
                let id = schema::insert(conn, &new)?;
                Ok(new.into_record(id))
            })
            .await?;

        removed.extend(
            self.prune_step("prune_per_key", move |conn| {
                prune::prune_per_key(conn, tab_id, &key_url, retention.per_key_cap)
            })
            .await,
        );

        removed.extend(
            self.prune_step("enforce_global_cap", move |conn| {
                prune::enforce_global_cap(conn, retention.global_cap)
            })
            .await,
        );

        {
            let mut cache = self.inner.cache.lock();
            cache.evict_ids(&removed);
            if !removed.contains(&record.id) {
                cache.insert(record.clone());
            }
        }

        debug!(
            id = %record.id,
            tab_id = %record.tab_id,
            kind = %record.kind,
            bytes = record.size(),
            pruned = removed.len(),
            "Thumbnail stored"
        );
        Ok(record)
    }

    /// Runs one prune stage, logging instead of failing.
    async fn prune_step<F>(&self, stage: &'static str, f: F) -> Vec<RecordId>
    where
        F: FnOnce(&mut Connection) -> Result<Vec<RecordId>> + Send + 'static,
    {
        match self.with_conn(f).await {
            Ok(ids) => {
                if !ids.is_empty() {
                    debug!(stage, removed = ids.len(), "Pruned thumbnails");
                }
                ids
            }
            Err(e) => {
                warn!(stage, error = %e, "Prune stage failed");
                Vec::new()
            }
        }
    }

    #[inline]
    fn now(&self) -> i64 {
        (self.inner.clock)()
    }
}

// ============================================================================
// Migration
// ============================================================================

impl ThumbnailStore {
    /// Runs the legacy migration at most once per process.
    ///
    /// The legacy key is removed only after every usable entry was stored,
    /// so a failed run leaves it for the next process.
    async fn run_migration(&self) {
        if self.inner.migration_ran.swap(true, Ordering::SeqCst) {
            return;
        }

        let Some(settings) = self.inner.settings.clone() else {
            return;
        };

        match self.migrate_legacy(settings.as_ref()).await {
            Ok(0) => {}
            Ok(migrated) => info!(migrated, "Legacy thumbnails migrated"),
            Err(e) => warn!(error = %e, "Legacy thumbnail migration failed"),
        }
    }

    async fn migrate_legacy(&self, settings: &dyn SettingsStore) -> Result<usize> {
        let Some(value) = settings.get(LEGACY_THUMBNAILS_KEY).await? else {
            return Ok(0);
        };

        let cutoff = self.inner.retention.cutoff(self.now());
        let mut migrated = 0;

        for entry in migration::parse_legacy(value)? {
            if entry.captured_at.is_some_and(|at| at < cutoff) {
                continue;
            }

            self.store(Incoming {
                tab_id: entry.tab_id,
                window_id: WindowId::NONE,
                url: entry.url,
                kind: CaptureKind::First,
                data: entry.image,
                fallback_mime: entry.mime_type,
                captured_at: entry.captured_at,
            })
            .await?;
            migrated += 1;
        }

        settings.remove(LEGACY_THUMBNAILS_KEY).await?;
        Ok(migrated)
    }
}

// ============================================================================
// Database Access
// ============================================================================

impl ThumbnailStore {
    /// Opens the database on first use.
    async fn connection(&self) -> Result<Arc<Mutex<Connection>>> {
        let conn = self
            .inner
            .conn
            .get_or_try_init(|| async {
                let location = self.inner.location.clone();
                let conn = spawn_blocking(move || open(&location)).await??;
                info!(location = ?self.inner.location, "Thumbnail store opened");
                Ok::<_, Error>(Arc::new(Mutex::new(conn)))
            })
            .await?;
        Ok(Arc::clone(conn))
    }

    /// Runs a blocking database closure off the async executor.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = self.connection().await?;
        spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await?
    }
}

fn open(location: &StoreLocation) -> Result<Connection> {
    let mut conn = match location {
        StoreLocation::Path(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open(path)?
        }
        StoreLocation::Memory => Connection::open_in_memory()?,
    };

    schema::migrate(&mut conn)?;
    Ok(conn)
}

// ============================================================================
// CaptureSink
// ============================================================================

#[async_trait]
impl CaptureSink for ThumbnailStore {
    async fn on_capture(&self, metadata: CaptureMetadata) -> Result<()> {
        self.try_put_capture(metadata).await.map(|_| ())
    }

    async fn capture_age(&self, tab_id: TabId, url: &str) -> Option<Duration> {
        let owned_url = url.to_string();
        match self
            .with_conn(move |conn| schema::latest_captured_at(conn, tab_id, &owned_url))
            .await
        {
            // A capture stamped in the future counts as brand new.
            Ok(at) => at.map(|at| {
                u64::try_from(self.now().saturating_sub(at))
                    .map(Duration::from_millis)
                    .unwrap_or(Duration::ZERO)
            }),
            Err(e) => {
                warn!(%tab_id, error = %e, "Freshness lookup failed");
                None
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
