//! Capture scheduler configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use tabsago_capture::CaptureOptions;
//!
//! let options = CaptureOptions::new()
//!     .with_min_capture_interval(Duration::from_secs(1))
//!     .with_cooldown(Duration::from_secs(15 * 60));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::platform::ImageFormat;

// ============================================================================
// Constants
// ============================================================================

/// Default minimum spacing between two platform capture calls.
pub const DEFAULT_MIN_CAPTURE_INTERVAL: Duration = Duration::from_millis(600);

/// Default delay before the `first` capture after a client-side route change.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(800);

// ============================================================================
// CaptureOptions
// ============================================================================

/// Tuning knobs for [`CaptureScheduler`](super::CaptureScheduler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Minimum time between two capture calls, across all tabs.
    pub min_capture_interval: Duration,

    /// Delay before scheduling `first` after a history state update.
    pub settle_delay: Duration,

    /// Format requested from the platform capture call.
    pub format: ImageFormat,

    /// Whether captures are scheduled at all. Epochs are tracked either way.
    pub auto_capture: bool,

    /// Skip a capture when the sink already holds one younger than this.
    pub cooldown: Option<Duration>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl CaptureOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_capture_interval: DEFAULT_MIN_CAPTURE_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            format: ImageFormat::Thumbnail,
            auto_capture: true,
            cooldown: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl CaptureOptions {
    /// Sets the minimum spacing between capture calls.
    #[inline]
    #[must_use]
    pub fn with_min_capture_interval(mut self, interval: Duration) -> Self {
        self.min_capture_interval = interval;
        self
    }

    /// Sets the settle delay used after client-side route changes.
    #[inline]
    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the capture image format.
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    /// Enables or disables automatic capture.
    #[inline]
    #[must_use]
    pub fn with_auto_capture(mut self, enabled: bool) -> Self {
        self.auto_capture = enabled;
        self
    }

    /// Sets the freshness cooldown.
    #[inline]
    #[must_use]
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the format requests a zero JPEG quality
    /// or the cooldown is zero.
    pub fn validate(&self) -> Result<()> {
        if self.format.quality() == Some(0) {
            return Err(Error::config("capture JPEG quality must be at least 1"));
        }

        if self.cooldown.is_some_and(|c| c.is_zero()) {
            return Err(Error::config("cooldown must be non-zero when set"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
