//! Single capture worker.
//!
//! The worker owns the only receiver of the capture queue, so at most one
//! platform capture is ever in flight. Requests are processed strictly in
//! FIFO order and every outcome is logged here.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use super::request::{CaptureMetadata, CaptureOutcome, CaptureRequest, DropReason};
use super::scheduler::Shared;

// ============================================================================
// QueueCommand
// ============================================================================

/// Messages accepted by the worker.
pub(super) enum QueueCommand {
    /// Process a capture request.
    Capture(CaptureRequest),
    /// Stop the worker.
    Shutdown,
}

// ============================================================================
// Worker Loop
// ============================================================================

/// Drains the queue until shutdown or until every sender is gone.
pub(super) async fn run(shared: Arc<Shared>, mut queue_rx: mpsc::UnboundedReceiver<QueueCommand>) {
    let mut last_capture: Option<Instant> = None;

    while let Some(command) = queue_rx.recv().await {
        let request = match command {
            QueueCommand::Capture(request) => request,
            QueueCommand::Shutdown => {
                debug!("Capture worker shutdown requested");
                break;
            }
        };

        shared.state.lock().queued.remove(&request.key());

        let outcome = process(&shared, &request, &mut last_capture).await;
        shared
            .state
            .lock()
            .settle(&request, outcome.is_captured());
        log_outcome(&request, &outcome);
    }

    debug!("Capture worker terminated");
}

/// Runs one request through eligibility, throttle, and capture.
async fn process(
    shared: &Shared,
    request: &CaptureRequest,
    last_capture: &mut Option<Instant>,
) -> CaptureOutcome {
    if let Err(reason) = check(shared, request) {
        return CaptureOutcome::Dropped(reason);
    }

    let min_interval = shared.options.min_capture_interval;
    if let Some(last) = *last_capture {
        let elapsed = last.elapsed();
        if elapsed < min_interval {
            sleep(min_interval - elapsed).await;
        }
    }

    // State may have moved on while throttled.
    if let Err(reason) = check(shared, request) {
        return CaptureOutcome::Dropped(reason);
    }

    let sink = shared.sink.lock().clone();

    if let (Some(cooldown), Some(sink)) = (shared.options.cooldown, sink.as_ref())
        && let Some(age) = sink.capture_age(request.tab_id, &request.url).await
        && age < cooldown
    {
        return CaptureOutcome::Dropped(DropReason::Fresh);
    }

    *last_capture = Some(Instant::now());

    let data = match shared
        .browser
        .capture_visible_tab(request.window_id, shared.options.format)
        .await
    {
        Ok(data) => data,
        Err(e) => return CaptureOutcome::Failed(e),
    };

    let Some(sink) = sink else {
        return CaptureOutcome::Captured;
    };

    let metadata = CaptureMetadata {
        tab_id: request.tab_id,
        window_id: request.window_id,
        url: request.url.clone(),
        kind: request.kind,
        data,
        format: shared.options.format,
    };

    match sink.on_capture(metadata).await {
        Ok(()) => CaptureOutcome::Captured,
        Err(e) => CaptureOutcome::Failed(e),
    }
}

fn check(shared: &Shared, request: &CaptureRequest) -> Result<(), DropReason> {
    if !shared.auto_capture.load(Ordering::Relaxed) {
        return Err(DropReason::Disabled);
    }
    shared.state.lock().check_eligible(request)
}

fn log_outcome(request: &CaptureRequest, outcome: &CaptureOutcome) {
    match outcome {
        CaptureOutcome::Captured => {
            debug!(
                tab_id = %request.tab_id,
                window_id = %request.window_id,
                kind = %request.kind,
                "Capture completed"
            );
        }

        CaptureOutcome::Dropped(reason) => {
            debug!(
                tab_id = %request.tab_id,
                kind = %request.kind,
                reason = %reason,
                "Capture dropped"
            );
        }

        CaptureOutcome::Failed(e) if e.is_gone() => {
            debug!(tab_id = %request.tab_id, kind = %request.kind, error = %e, "Capture target gone");
        }

        CaptureOutcome::Failed(e) => {
            warn!(tab_id = %request.tab_id, kind = %request.kind, error = %e, "Capture failed");
        }
    }
}
