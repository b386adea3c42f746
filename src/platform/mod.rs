//! Host platform boundary.
//!
//! Everything the capture core consumes from the browser lives behind this
//! module: tab/window queries and the screenshot call ([`Browser`]), the
//! lifecycle event payloads ([`BrowserEvent`]), and the flat settings area
//! ([`SettingsStore`]).
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `browser` | [`Browser`] trait, tab/window snapshots, [`ImageFormat`] |
//! | `event` | [`RawEvent`] adapter and typed [`BrowserEvent`] |
//! | `settings` | [`SettingsStore`] trait and implementations |

// ============================================================================
// Submodules
// ============================================================================

/// Browser capability trait and snapshot types.
pub mod browser;

/// Lifecycle event types.
pub mod event;

/// Flat key/value settings storage.
pub mod settings;

#[cfg(test)]
pub(crate) mod fake;

// ============================================================================
// Re-exports
// ============================================================================

pub use browser::{Browser, ImageFormat, TabInfo, TabStatus, WindowInfo, WindowState};
pub use event::{BrowserEvent, NavigationDetails, RawEvent, TabActivated, TabChange};
pub use settings::{
    AUTO_THUMBNAIL_CAPTURE_KEY, JsonFileSettings, LEGACY_THUMBNAILS_KEY, MemorySettings,
    SettingsStore,
};
