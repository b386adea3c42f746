//! Host browser capabilities consumed by the scheduler.
//!
//! The [`Browser`] trait is the seam between the capture core and the
//! extension runtime: tab/window enumeration and the visible-tab screenshot
//! call. An adapter in the extension's entrypoint implements it over the
//! native APIs.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identifiers::{TabId, WindowId};

// ============================================================================
// ImageFormat
// ============================================================================

/// Image format requested from the visible-tab capture call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG format (lossless, larger payload).
    Png,
    /// JPEG format with quality (0-100).
    Jpeg(u8),
    /// JPEG at the quality used for background thumbnails.
    #[default]
    Thumbnail,
}

impl ImageFormat {
    /// Quality used by [`ImageFormat::Thumbnail`].
    pub const THUMBNAIL_QUALITY: u8 = 50;

    /// Creates PNG format.
    #[inline]
    #[must_use]
    pub fn png() -> Self {
        Self::Png
    }

    /// Creates JPEG format with quality (0-100).
    #[inline]
    #[must_use]
    pub fn jpeg(quality: u8) -> Self {
        Self::Jpeg(quality.min(100))
    }

    /// Returns the MIME type for this format.
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg(_) | Self::Thumbnail => "image/jpeg",
        }
    }

    /// Returns the format string used by the platform API.
    #[must_use]
    pub fn format_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg(_) | Self::Thumbnail => "jpeg",
        }
    }

    /// Returns the quality value if JPEG.
    #[must_use]
    pub fn quality(&self) -> Option<u8> {
        match self {
            Self::Png => None,
            Self::Jpeg(q) => Some(*q),
            Self::Thumbnail => Some(Self::THUMBNAIL_QUALITY),
        }
    }
}

// ============================================================================
// Tab / Window Snapshots
// ============================================================================

/// Load status of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    /// Tab is unloaded (discarded).
    Unloaded,
    /// Page is loading.
    Loading,
    /// Page finished loading.
    Complete,
}

/// Snapshot of a tab as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    /// Tab ID.
    pub id: TabId,
    /// Window containing the tab.
    pub window_id: WindowId,
    /// Committed URL, if the extension may see it.
    #[serde(default)]
    pub url: Option<String>,
    /// Whether the tab is its window's active tab.
    #[serde(default)]
    pub active: bool,
    /// Load status.
    #[serde(default)]
    pub status: Option<TabStatus>,
}

impl TabInfo {
    /// Creates an active, fully loaded tab snapshot.
    #[must_use]
    pub fn new(id: TabId, window_id: WindowId, url: impl Into<String>) -> Self {
        Self {
            id,
            window_id,
            url: Some(url.into()),
            active: true,
            status: Some(TabStatus::Complete),
        }
    }
}

/// Window display state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowState {
    /// Regular window.
    #[default]
    Normal,
    /// Minimized window.
    Minimized,
    /// Maximized window.
    Maximized,
    /// Fullscreen window.
    Fullscreen,
    /// Kiosk-style locked fullscreen.
    #[serde(rename = "locked-fullscreen")]
    LockedFullscreen,
}

/// Snapshot of a window as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    /// Window ID.
    pub id: WindowId,
    /// Whether the window currently has focus.
    #[serde(default)]
    pub focused: bool,
    /// Display state.
    #[serde(default)]
    pub state: WindowState,
    /// Tabs in the window (populated by [`Browser::windows`]).
    #[serde(default)]
    pub tabs: Vec<TabInfo>,
}

impl WindowInfo {
    /// Checks if the window is minimized.
    #[inline]
    #[must_use]
    pub fn is_minimized(&self) -> bool {
        self.state == WindowState::Minimized
    }

    /// Returns the window's active tab, if listed.
    #[must_use]
    pub fn active_tab(&self) -> Option<&TabInfo> {
        self.tabs.iter().find(|tab| tab.active)
    }
}

// ============================================================================
// Browser
// ============================================================================

/// Browser capabilities the capture scheduler depends on.
///
/// Every method may fail; callers treat failures as transient.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Enumerates all windows with their tabs populated.
    async fn windows(&self) -> Result<Vec<WindowInfo>>;

    /// Gets a single window (tabs may be empty).
    async fn window(&self, window_id: WindowId) -> Result<WindowInfo>;

    /// Gets a single tab by ID.
    async fn tab(&self, tab_id: TabId) -> Result<TabInfo>;

    /// Queries the active tab of a window.
    async fn active_tab(&self, window_id: WindowId) -> Result<Option<TabInfo>>;

    /// Captures the visible area of the window's active tab.
    ///
    /// Returns encoded image bytes in the requested format.
    async fn capture_visible_tab(&self, window_id: WindowId, format: ImageFormat)
    -> Result<Vec<u8>>;
}

// ============================================================================
// Tests
// ============================================================================
