//! Capture scheduling.
//!
//! Decides when to screenshot the active page and serializes the actual
//! platform captures through one worker.
//!
//! # Overview
//!
//! Each tab has at most one [`VisitEpoch`], the scheduler's model of one
//! continuous viewing of a URL. An epoch allows two capture attempts:
//!
//! | Kind | Trigger |
//! |------|---------|
//! | [`CaptureKind::First`] | page load completed, or a route change settled |
//! | [`CaptureKind::Final`] | tab switch, navigation away, window focus lost |
//!
//! Handlers enqueue a [`CaptureRequest`]; the worker re-checks eligibility
//! (focused, non-minimized window, tab still active, epoch unchanged),
//! enforces [`CaptureOptions::min_capture_interval`], calls the platform and
//! hands the bytes to the [`CaptureSink`].

// ============================================================================
// Submodules
// ============================================================================

/// Visit epochs and capture kinds.
pub mod epoch;

/// Scheduler configuration.
pub mod options;

/// Requests, outcomes, and the sink trait.
pub mod request;

/// Scheduler handle and handlers.
pub mod scheduler;

mod state;
mod worker;

// ============================================================================
// Re-exports
// ============================================================================

pub use epoch::{CaptureKind, KindFlags, VisitEpoch, is_capturable_url};
pub use options::CaptureOptions;
pub use request::{CaptureMetadata, CaptureOutcome, CaptureRequest, CaptureSink, DropReason};
pub use scheduler::CaptureScheduler;
