//! Tabsago capture - background thumbnail capture for a tab manager.
//!
//! This library keeps a small, recent screenshot of every page the user
//! visits. It is split into two cooperating halves:
//!
//! - **Capture scheduler**: Listens to tab, window, and navigation events and
//!   decides *when* to screenshot the visible tab
//! - **Thumbnail store**: Normalizes screenshots and keeps them in a bounded
//!   SQLite database behind an in-memory cache
//!
//! Key design principles:
//!
//! - Each page visit is a [`VisitEpoch`]; a visit gets at most one
//!   [`CaptureKind::First`] and one [`CaptureKind::Final`] screenshot
//! - Captures are serialized through one queue and rate limited
//! - Eligibility is re-checked right before capturing, so stale requests drop
//! - Host access goes through the [`Browser`] and [`SettingsStore`] traits
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tabsago_capture::{Browser, CaptureOptions, CaptureScheduler, Result, ThumbnailStore};
//!
//! async fn run(browser: Arc<dyn Browser>) -> Result<()> {
//!     let store = ThumbnailStore::builder()
//!         .path("profile/thumbnails.sqlite")
//!         .build()?;
//!     store.initialize().await;
//!
//!     let scheduler = CaptureScheduler::new(browser, CaptureOptions::new())?;
//!     scheduler.set_capture_handler(Arc::new(store.clone()));
//!     scheduler.bootstrap().await;
//!
//!     // Feed host events with scheduler.handle_event(...)
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`capture`] | Capture scheduler, visit epochs, capture requests |
//! | [`store`] | Thumbnail store, normalization, retention |
//! | [`platform`] | Host browser and settings abstractions |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Capture scheduling.
///
/// - [`CaptureScheduler`] - Event-driven capture queue
/// - [`VisitEpoch`] - One page visit of one tab
pub mod capture;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for tabs, windows, frames, and records.
pub mod identifiers;

/// Host browser and settings abstractions.
pub mod platform;

/// Thumbnail persistence.
///
/// Use [`ThumbnailStore::builder()`] to create a store.
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

// Capture types
pub use capture::{
    CaptureKind, CaptureMetadata, CaptureOptions, CaptureOutcome, CaptureRequest,
    CaptureScheduler, CaptureSink, DropReason, KindFlags, VisitEpoch, is_capturable_url,
};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{FrameId, RecordId, TabId, WindowId};

// Platform types
pub use platform::{
    Browser, BrowserEvent, ImageFormat, JsonFileSettings, MemorySettings, NavigationDetails,
    RawEvent, SettingsStore, TabActivated, TabChange, TabInfo, TabStatus, WindowInfo, WindowState,
};

// Store types
pub use store::{
    NormalizeOptions, RetentionPolicy, StoreBuilder, StoreStats, ThumbnailRecord, ThumbnailStore,
};
