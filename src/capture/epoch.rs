//! Visit epochs and capture kinds.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use url::Url;

use crate::identifiers::TabId;

// ============================================================================
// CaptureKind
// ============================================================================

/// Which of the two per-visit capture opportunities a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureKind {
    /// Shortly after the page finished loading.
    First,
    /// Just before the visit ends.
    Final,
}

impl CaptureKind {
    /// Both kinds, in flag order.
    pub const ALL: [Self; 2] = [Self::First, Self::Final];

    /// Returns the lowercase name stored alongside records.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Final => "final",
        }
    }

    /// Parses a stored kind name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "first" => Some(Self::First),
            "final" => Some(Self::Final),
            _ => None,
        }
    }

    #[inline]
    const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Final => 1,
        }
    }
}

impl fmt::Display for CaptureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// KindFlags
// ============================================================================

/// Progress of one capture kind within an epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindFlags {
    /// A request is queued or executing.
    pub pending: bool,
    /// A capture succeeded for this epoch.
    pub completed: bool,
}

// ============================================================================
// VisitEpoch
// ============================================================================

/// One continuous viewing of a URL in one tab.
///
/// Each epoch gets a scheduler-wide sequence number. Requests remember the
/// sequence they were scheduled for, so a request can never settle flags on
/// a successor epoch of the same tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitEpoch {
    tab_id: TabId,
    url: String,
    started_at: Instant,
    seq: u64,
    flags: [KindFlags; 2],
}

impl VisitEpoch {
    pub(crate) fn new(tab_id: TabId, url: impl Into<String>, seq: u64) -> Self {
        Self {
            tab_id,
            url: url.into(),
            started_at: Instant::now(),
            seq,
            flags: [KindFlags::default(); 2],
        }
    }

    /// Returns the tab this epoch belongs to.
    #[inline]
    #[must_use]
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    /// Returns the URL being viewed.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns when the epoch started.
    #[inline]
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the epoch's sequence number.
    #[inline]
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Returns the flags of one capture kind.
    #[inline]
    #[must_use]
    pub fn flags(&self, kind: CaptureKind) -> KindFlags {
        self.flags[kind.index()]
    }

    /// Checks if a request of `kind` is outstanding.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, kind: CaptureKind) -> bool {
        self.flags(kind).pending
    }

    /// Checks if `kind` was captured during this epoch.
    #[inline]
    #[must_use]
    pub fn is_completed(&self, kind: CaptureKind) -> bool {
        self.flags(kind).completed
    }

    /// Neither pending nor completed.
    pub(crate) fn can_schedule(&self, kind: CaptureKind) -> bool {
        let flags = self.flags(kind);
        !flags.pending && !flags.completed
    }

    pub(crate) fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub(crate) fn mark_pending(&mut self, kind: CaptureKind) {
        self.flags[kind.index()].pending = true;
    }

    /// Clears the pending flag and optionally records completion.
    pub(crate) fn settle(&mut self, kind: CaptureKind, completed: bool) {
        let flags = &mut self.flags[kind.index()];
        flags.pending = false;
        flags.completed |= completed;
    }
}

// ============================================================================
// URL Qualification
// ============================================================================

/// Checks if a URL may be captured (`http` or `https` only).
#[must_use]
pub fn is_capturable_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|parsed| matches!(parsed.scheme(), "http" | "https"))
}

// ============================================================================
// Tests
// ============================================================================
