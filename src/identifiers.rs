//! Type-safe identifiers for browser entities and stored records.
//!
//! Newtype wrappers prevent mixing a tab ID with a window ID (both are plain
//! integers in the host platform's payloads).
//!
//! | Type | Wraps | Notes |
//! |------|-------|-------|
//! | [`TabId`] | `u32` | Browser tab |
//! | [`WindowId`] | `i32` | Browser window, `-1` is [`WindowId::NONE`] |
//! | [`FrameId`] | `u64` | Navigation frame, `0` is the main frame |
//! | [`RecordId`] | `i64` | Auto-increment thumbnail row id |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// TabId
// ============================================================================

/// Identifier of a browser tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(u32);

impl TabId {
    /// Creates a tab ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Converts a raw platform integer, rejecting negative and out-of-range values.
    ///
    /// The platform uses `-1` as "no tab".
    #[inline]
    #[must_use]
    pub fn from_raw(raw: i64) -> Option<Self> {
        u32::try_from(raw).ok().map(Self)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// WindowId
// ============================================================================

/// Identifier of a browser window.
///
/// Focus-change events carry [`WindowId::NONE`] when no browser window has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(i32);

impl WindowId {
    /// The "no focused window" sentinel.
    pub const NONE: Self = Self(-1);

    /// Creates a window ID.
    #[inline]
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Converts a raw platform integer.
    ///
    /// Out-of-range values map to [`WindowId::NONE`].
    #[inline]
    #[must_use]
    pub fn from_raw(raw: i64) -> Self {
        i32::try_from(raw).map(Self).unwrap_or(Self::NONE)
    }

    /// Checks if this is the "no window" sentinel.
    #[inline]
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.0 < 0
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

// ============================================================================
// FrameId
// ============================================================================

/// Identifier of a frame inside a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameId(u64);

impl FrameId {
    /// Creates a frame ID.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the main (top-level) frame ID.
    #[inline]
    #[must_use]
    pub const fn main() -> Self {
        Self(0)
    }

    /// Checks if this is the main frame.
    #[inline]
    #[must_use]
    pub const fn is_main(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// RecordId
// ============================================================================

/// Auto-assigned identity of a persisted thumbnail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    /// Creates a record ID.
    #[inline]
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tab_id_from_raw() {
        assert_eq!(TabId::from_raw(7), Some(TabId::new(7)));
        assert_eq!(TabId::from_raw(-1), None);
        assert_eq!(TabId::from_raw(i64::MAX), None);
    }

    #[test]
    fn test_window_none_sentinel() {
        assert!(WindowId::NONE.is_none());
        assert!(WindowId::from_raw(-1).is_none());
        assert!(!WindowId::new(3).is_none());
        assert_eq!(WindowId::NONE.to_string(), "none");
    }

    #[test]
    fn test_frame_main() {
        assert!(FrameId::main().is_main());
        assert!(!FrameId::new(4).is_main());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        let json = serde_json::to_string(&TabId::new(12)).expect("serialize");
        assert_eq!(json, "12");
        let window: WindowId = serde_json::from_str("-1").expect("deserialize");
        assert!(window.is_none());
    }
}
