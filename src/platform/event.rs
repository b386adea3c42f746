//! Browser lifecycle event types.
//!
//! The extension's event wiring forwards each native listener callback as a
//! [`RawEvent`]; [`RawEvent::parse`] turns it into a typed [`BrowserEvent`]
//! that the scheduler consumes.
//!
//! # Event Types
//!
//! | Module | Events |
//! |--------|--------|
//! | `tabs` | `onActivated`, `onUpdated`, `onRemoved` |
//! | `windows` | `onFocusChanged` |
//! | `webNavigation` | `onBeforeNavigate`, `onCommitted`, `onHistoryStateUpdated` |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::identifiers::{FrameId, TabId, WindowId};

use super::browser::{TabInfo, TabStatus};

// ============================================================================
// RawEvent
// ============================================================================

/// A native event as forwarded by the extension's listener wiring.
///
/// # Format
///
/// ```json
/// {
///   "method": "module.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    /// Event name in `module.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,
}

impl RawEvent {
    /// Creates a raw event.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Returns the module name from the method.
    #[inline]
    #[must_use]
    pub fn module(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    ///
    /// Payloads with missing or invalid IDs become [`BrowserEvent::Unknown`].
    #[must_use]
    pub fn parse(&self) -> BrowserEvent {
        self.parse_internal().unwrap_or_else(|| BrowserEvent::Unknown {
            method: self.method.clone(),
            params: self.params.clone(),
        })
    }
}

// ============================================================================
// Payload Types
// ============================================================================

/// Payload of `tabs.onActivated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabActivated {
    /// Newly active tab.
    pub tab_id: TabId,
    /// Window in which the switch happened.
    pub window_id: WindowId,
}

/// `changeInfo` of `tabs.onUpdated`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TabChange {
    /// New load status, if it changed.
    #[serde(default)]
    pub status: Option<TabStatus>,
    /// New URL, if it changed.
    #[serde(default)]
    pub url: Option<String>,
}

impl TabChange {
    /// Checks if the page just finished loading.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == Some(TabStatus::Complete)
    }
}

/// Payload shared by the `webNavigation` events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationDetails {
    /// Navigating tab.
    pub tab_id: TabId,
    /// Navigating frame (only the main frame is acted upon).
    pub frame_id: FrameId,
    /// Destination URL.
    pub url: String,
}

impl NavigationDetails {
    /// Creates main-frame navigation details.
    #[must_use]
    pub fn main_frame(tab_id: TabId, url: impl Into<String>) -> Self {
        Self {
            tab_id,
            frame_id: FrameId::main(),
            url: url.into(),
        }
    }
}

// ============================================================================
// BrowserEvent
// ============================================================================

/// Typed lifecycle events consumed by the capture scheduler.
#[derive(Debug, Clone)]
pub enum BrowserEvent {
    /// Active tab switched within a window.
    TabActivated(TabActivated),

    /// Tab status or URL changed.
    TabUpdated {
        /// Updated tab.
        tab_id: TabId,
        /// What changed.
        change: TabChange,
        /// Tab snapshot after the change.
        tab: TabInfo,
    },

    /// Tab closed.
    TabRemoved {
        /// Closed tab.
        tab_id: TabId,
    },

    /// Window focus moved (possibly to [`WindowId::NONE`]).
    WindowFocusChanged {
        /// Newly focused window.
        window_id: WindowId,
    },

    /// A navigation is about to start.
    BeforeNavigate(NavigationDetails),

    /// A navigation committed.
    NavigationCommitted(NavigationDetails),

    /// Client-side route change (`history.pushState` and friends).
    HistoryStateUpdated(NavigationDetails),

    /// Unknown or malformed event.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// Event Parsing Implementation
// ============================================================================

impl RawEvent {
    /// Internal parsing implementation.
    fn parse_internal(&self) -> Option<BrowserEvent> {
        let event = match self.method.as_str() {
            "tabs.onActivated" => BrowserEvent::TabActivated(TabActivated {
                tab_id: self.get_tab_id("tabId")?,
                window_id: self.get_window_id("windowId")?,
            }),

            "tabs.onUpdated" => BrowserEvent::TabUpdated {
                tab_id: self.get_tab_id("tabId")?,
                change: self.get_object("changeInfo").unwrap_or_default(),
                tab: self.get_object("tab")?,
            },

            "tabs.onRemoved" => BrowserEvent::TabRemoved {
                tab_id: self.get_tab_id("tabId")?,
            },

            "windows.onFocusChanged" => BrowserEvent::WindowFocusChanged {
                window_id: self.get_window_id("windowId")?,
            },

            "webNavigation.onBeforeNavigate" => {
                BrowserEvent::BeforeNavigate(self.get_navigation()?)
            }

            "webNavigation.onCommitted" => BrowserEvent::NavigationCommitted(self.get_navigation()?),

            "webNavigation.onHistoryStateUpdated" => {
                BrowserEvent::HistoryStateUpdated(self.get_navigation()?)
            }

            _ => return None,
        };

        Some(event)
    }

    /// Gets navigation details from params.
    fn get_navigation(&self) -> Option<NavigationDetails> {
        Some(NavigationDetails {
            tab_id: self.get_tab_id("tabId")?,
            frame_id: FrameId::new(self.get_u64("frameId")?),
            url: self.get_string("url")?,
        })
    }

    /// Gets a tab ID from params.
    #[inline]
    fn get_tab_id(&self, key: &str) -> Option<TabId> {
        self.params
            .get(key)
            .and_then(|v| v.as_i64())
            .and_then(TabId::from_raw)
    }

    /// Gets a window ID from params.
    #[inline]
    fn get_window_id(&self, key: &str) -> Option<WindowId> {
        self.params
            .get(key)
            .and_then(|v| v.as_i64())
            .map(WindowId::from_raw)
    }

    /// Gets a string from params.
    #[inline]
    fn get_string(&self, key: &str) -> Option<String> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Gets a u64 from params.
    #[inline]
    fn get_u64(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(|v| v.as_u64())
    }

    /// Deserializes a nested object from params.
    #[inline]
    fn get_object<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.params
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

// ============================================================================
// Tests
// ============================================================================
