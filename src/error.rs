//! Error types for the capture subsystem.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Internal operations return [`Result<T>`] which uses [`Error`]. The public
//! "best-effort" surface (scheduler handlers, `put_capture`, `get_latest`,
//! `clear_all`) absorbs these errors and logs them; the `try_*` variants on
//! [`ThumbnailStore`](crate::ThumbnailStore) expose them directly:
//!
//! ```ignore
//! use tabsago_capture::{Result, ThumbnailStore};
//!
//! async fn example(store: &ThumbnailStore) -> Result<()> {
//!     store.try_clear_all().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Platform | [`Error::Platform`], [`Error::TabNotFound`], [`Error::WindowNotFound`], [`Error::CaptureRejected`] |
//! | Storage | [`Error::Storage`], [`Error::Database`], [`Error::Settings`] |
//! | Image | [`Error::Image`], [`Error::InvalidDataUrl`], [`Error::Base64`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::Task`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use base64::DecodeError;
use thiserror::Error;
use tokio::task::JoinError;

use crate::identifiers::{TabId, WindowId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when store or scheduler configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Platform Errors
    // ========================================================================
    /// A host platform call failed.
    ///
    /// Returned when a tab/window query or other browser API rejects.
    #[error("Platform call {operation} failed: {message}")]
    Platform {
        /// Name of the platform operation.
        operation: String,
        /// Message reported by the platform.
        message: String,
    },

    /// Tab not found.
    ///
    /// Returned when the tab was closed before the platform answered.
    #[error("Tab not found: {tab_id}")]
    TabNotFound {
        /// The missing tab ID.
        tab_id: TabId,
    },

    /// Window not found.
    #[error("Window not found: {window_id}")]
    WindowNotFound {
        /// The missing window ID.
        window_id: WindowId,
    },

    /// The visible-tab capture call was rejected.
    ///
    /// Typical causes are browser-internal pages and tabs closed mid-capture.
    #[error("Capture of window {window_id} rejected: {message}")]
    CaptureRejected {
        /// Window whose active tab was being captured.
        window_id: WindowId,
        /// Message reported by the platform.
        message: String,
    },

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// A thumbnail store step failed.
    #[error("Storage error during {operation}: {message}")]
    Storage {
        /// Step that failed.
        operation: String,
        /// Description of the failure.
        message: String,
    },

    /// Settings store error.
    ///
    /// Returned when the flat key/value store cannot be read or written.
    #[error("Settings error: {message}")]
    Settings {
        /// Description of the failure.
        message: String,
    },

    /// SQLite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    // ========================================================================
    // Image Errors
    // ========================================================================
    /// Image decode/encode error.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Malformed `data:` URL in legacy thumbnail data.
    #[error("Invalid data URL: {message}")]
    InvalidDataUrl {
        /// Description of the problem.
        message: String,
    },

    /// Base64 decode error.
    #[error("Base64 error: {0}")]
    Base64(#[from] DecodeError),

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Blocking task panicked or was cancelled.
    #[error("Task error: {0}")]
    Task(#[from] JoinError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a platform call error.
    #[inline]
    pub fn platform(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Platform {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a tab not found error.
    #[inline]
    pub fn tab_not_found(tab_id: TabId) -> Self {
        Self::TabNotFound { tab_id }
    }

    /// Creates a window not found error.
    #[inline]
    pub fn window_not_found(window_id: WindowId) -> Self {
        Self::WindowNotFound { window_id }
    }

    /// Creates a capture rejected error.
    #[inline]
    pub fn capture_rejected(window_id: WindowId, message: impl Into<String>) -> Self {
        Self::CaptureRejected {
            window_id,
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[inline]
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a settings error.
    #[inline]
    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings {
            message: message.into(),
        }
    }

    /// Creates an invalid data URL error.
    #[inline]
    pub fn invalid_data_url(message: impl Into<String>) -> Self {
        Self::InvalidDataUrl {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error came from the host platform.
    ///
    /// Platform errors are transient: the attempt is treated as not having
    /// happened and a later lifecycle event may trigger it again.
    #[inline]
    #[must_use]
    pub fn is_platform_error(&self) -> bool {
        matches!(
            self,
            Self::Platform { .. }
                | Self::TabNotFound { .. }
                | Self::WindowNotFound { .. }
                | Self::CaptureRejected { .. }
        )
    }

    /// Returns `true` if this is a persistence error.
    #[inline]
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Database(_) | Self::Settings { .. } | Self::Io(_)
        )
    }

    /// Returns `true` if this error concerns image bytes.
    #[inline]
    #[must_use]
    pub fn is_image_error(&self) -> bool {
        matches!(
            self,
            Self::Image(_) | Self::InvalidDataUrl { .. } | Self::Base64(_)
        )
    }

    /// Returns `true` if the tab or window disappeared underneath the call.
    ///
    /// These are expected during normal browsing and are logged at debug level.
    #[inline]
    #[must_use]
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::TabNotFound { .. } | Self::WindowNotFound { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
