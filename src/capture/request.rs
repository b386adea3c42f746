//! Capture requests, results, and the downstream sink.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::identifiers::{TabId, WindowId};
use crate::platform::ImageFormat;

use super::epoch::CaptureKind;

// ============================================================================
// CaptureRequest
// ============================================================================

/// An enqueued intent to capture a tab for one epoch and kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    /// Tab to capture.
    pub tab_id: TabId,
    /// Window the tab belonged to when scheduled.
    pub window_id: WindowId,
    /// URL of the epoch when scheduled.
    pub url: String,
    /// Capture kind.
    pub kind: CaptureKind,
    /// Sequence number of the epoch the request belongs to.
    pub epoch_seq: u64,
}

impl CaptureRequest {
    /// Returns the queue deduplication key.
    #[inline]
    #[must_use]
    pub fn key(&self) -> (TabId, CaptureKind) {
        (self.tab_id, self.kind)
    }
}

// ============================================================================
// CaptureMetadata
// ============================================================================

/// A successful platform capture handed to the [`CaptureSink`].
#[derive(Clone, PartialEq, Eq)]
pub struct CaptureMetadata {
    /// Captured tab.
    pub tab_id: TabId,
    /// Window the tab was captured in.
    pub window_id: WindowId,
    /// URL of the visit.
    pub url: String,
    /// Capture kind.
    pub kind: CaptureKind,
    /// Encoded image bytes as returned by the platform.
    pub data: Vec<u8>,
    /// Format the bytes were requested in.
    pub format: ImageFormat,
}

impl fmt::Debug for CaptureMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureMetadata")
            .field("tab_id", &self.tab_id)
            .field("window_id", &self.window_id)
            .field("url", &self.url)
            .field("kind", &self.kind)
            .field("data_len", &self.data.len())
            .field("format", &self.format)
            .finish()
    }
}

// ============================================================================
// CaptureSink
// ============================================================================

/// Downstream consumer of successful captures.
///
/// [`ThumbnailStore`](crate::ThumbnailStore) implements this; tests and
/// alternative wirings may provide their own.
#[async_trait]
pub trait CaptureSink: Send + Sync {
    /// Consumes a capture.
    async fn on_capture(&self, metadata: CaptureMetadata) -> Result<()>;

    /// Returns how long ago the newest stored capture for `(tab_id, url)`
    /// was taken, measured on the sink's own clock. Used by the freshness
    /// cooldown.
    async fn capture_age(&self, _tab_id: TabId, _url: &str) -> Option<Duration> {
        None
    }
}

// ============================================================================
// CaptureOutcome
// ============================================================================

/// Why the worker skipped a request without calling the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Automatic capture is switched off.
    Disabled,
    /// The request's window does not have focus.
    WindowNotFocused,
    /// The request's window is minimized.
    WindowMinimized,
    /// Another tab is active in the request's window.
    TabNotActive,
    /// The epoch the request was scheduled for no longer exists.
    EpochSuperseded,
    /// A capture younger than the cooldown already exists.
    Fresh,
}

impl DropReason {
    /// Returns a short log label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::WindowNotFocused => "window_not_focused",
            Self::WindowMinimized => "window_minimized",
            Self::TabNotActive => "tab_not_active",
            Self::EpochSuperseded => "epoch_superseded",
            Self::Fresh => "fresh",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of processing one request.
#[derive(Debug)]
pub enum CaptureOutcome {
    /// The platform captured the tab and the sink accepted it.
    Captured,
    /// The request was no longer eligible.
    Dropped(DropReason),
    /// The platform call or the sink failed.
    Failed(Error),
}

impl CaptureOutcome {
    /// Checks if the capture completed.
    #[inline]
    #[must_use]
    pub fn is_captured(&self) -> bool {
        matches!(self, Self::Captured)
    }

    /// Returns the drop reason, if dropped.
    #[inline]
    #[must_use]
    pub fn drop_reason(&self) -> Option<DropReason> {
        match self {
            Self::Dropped(reason) => Some(*reason),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        assert!(CaptureOutcome::Captured.is_captured());

        let dropped = CaptureOutcome::Dropped(DropReason::TabNotActive);
        assert!(!dropped.is_captured());
        assert_eq!(dropped.drop_reason(), Some(DropReason::TabNotActive));

        let failed = CaptureOutcome::Failed(Error::tab_not_found(TabId::new(1)));
        assert_eq!(failed.drop_reason(), None);
    }

    #[test]
    fn test_metadata_debug_hides_payload() {
        let metadata = CaptureMetadata {
            tab_id: TabId::new(7),
            window_id: WindowId::new(1),
            url: "https://example.com/a".to_string(),
            kind: CaptureKind::First,
            data: vec![0; 4096],
            format: ImageFormat::Thumbnail,
        };

        let debug = format!("{metadata:?}");
        assert!(debug.contains("data_len: 4096"));
        assert!(!debug.contains("0, 0, 0"));
    }
}
