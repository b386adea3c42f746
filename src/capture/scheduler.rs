//! Capture scheduler handle and lifecycle handlers.
//!
//! The scheduler turns bursty tab/window/navigation events into at most one
//! `first` and one `final` capture attempt per visit epoch. Handlers only
//! mutate bookkeeping and enqueue requests; the worker in
//! [`worker`](super::worker) performs the captures.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tabsago_capture::{CaptureOptions, CaptureScheduler, ThumbnailStore};
//!
//! let scheduler = CaptureScheduler::new(browser, CaptureOptions::new())?;
//! scheduler.set_capture_handler(Arc::new(store.clone()));
//! scheduler.bootstrap().await;
//!
//! // For each native event:
//! scheduler.handle_event(raw_event.parse()).await;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{TabId, WindowId};
use crate::platform::{
    AUTO_THUMBNAIL_CAPTURE_KEY, Browser, BrowserEvent, NavigationDetails, SettingsStore,
    TabActivated, TabChange, TabInfo,
};

use super::epoch::{CaptureKind, VisitEpoch, is_capturable_url};
use super::options::CaptureOptions;
use super::request::{CaptureRequest, CaptureSink};
use super::state::SchedulerState;
use super::worker::{self, QueueCommand};

// ============================================================================
// Shared
// ============================================================================

/// State shared between scheduler handles and the worker.
pub(super) struct Shared {
    pub browser: Arc<dyn Browser>,
    pub options: CaptureOptions,
    pub state: Mutex<SchedulerState>,
    pub sink: Mutex<Option<Arc<dyn CaptureSink>>>,
    pub auto_capture: AtomicBool,
    bootstrapped: AtomicBool,
}

// ============================================================================
// CaptureScheduler
// ============================================================================

/// Event-driven capture controller.
///
/// Cheap to clone; all clones share the same epochs and queue. The worker
/// stops when [`shutdown`](Self::shutdown) is called or every handle is
/// dropped.
#[derive(Clone)]
pub struct CaptureScheduler {
    shared: Arc<Shared>,
    queue_tx: mpsc::UnboundedSender<QueueCommand>,
}

impl CaptureScheduler {
    /// Creates a scheduler and spawns its worker.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `options` are invalid.
    pub fn new(browser: Arc<dyn Browser>, options: CaptureOptions) -> Result<Self> {
        options.validate()?;

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            browser,
            auto_capture: AtomicBool::new(options.auto_capture),
            options,
            state: Mutex::new(SchedulerState::default()),
            sink: Mutex::new(None),
            bootstrapped: AtomicBool::new(false),
        });

        tokio::spawn(worker::run(Arc::clone(&shared), queue_rx));

        Ok(Self { shared, queue_tx })
    }

    /// Returns the scheduler options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &CaptureOptions {
        &self.shared.options
    }

    /// Sets the consumer of successful captures.
    ///
    /// Without a handler, captures still run and their bytes are discarded.
    pub fn set_capture_handler(&self, sink: Arc<dyn CaptureSink>) {
        *self.shared.sink.lock() = Some(sink);
    }

    /// Removes the capture handler.
    pub fn clear_capture_handler(&self) {
        *self.shared.sink.lock() = None;
    }

    /// Switches automatic capture on or off.
    pub fn set_auto_capture_enabled(&self, enabled: bool) {
        let previous = self.shared.auto_capture.swap(enabled, Ordering::Relaxed);
        if previous != enabled {
            info!(enabled, "Automatic thumbnail capture toggled");
        }
    }

    /// Checks if automatic capture is on.
    #[inline]
    #[must_use]
    pub fn is_auto_capture_enabled(&self) -> bool {
        self.shared.auto_capture.load(Ordering::Relaxed)
    }

    /// Applies the stored auto-capture preference.
    ///
    /// Anything but an explicit `false` enables capture. A read failure
    /// leaves the current setting untouched.
    pub async fn sync_preferences(&self, settings: &dyn SettingsStore) {
        match settings.get(AUTO_THUMBNAIL_CAPTURE_KEY).await {
            Ok(value) => {
                self.set_auto_capture_enabled(!matches!(value, Some(Value::Bool(false))));
            }
            Err(e) => warn!(error = %e, "Failed to read capture preference"),
        }
    }

    /// Returns a snapshot of the tab's current epoch.
    #[must_use]
    pub fn epoch(&self, tab_id: TabId) -> Option<VisitEpoch> {
        self.shared.state.lock().epochs.get(&tab_id).cloned()
    }

    /// Stops the worker. Requests already queued behind this are discarded.
    pub fn shutdown(&self) {
        let _ = self.queue_tx.send(QueueCommand::Shutdown);
    }
}

// ============================================================================
// Lifecycle Handlers
// ============================================================================

impl CaptureScheduler {
    /// Scans open windows once and seeds focus, active tabs, and epochs.
    ///
    /// Later calls are no-ops. An enumeration failure leaves the state empty.
    pub async fn bootstrap(&self) {
        if self.shared.bootstrapped.swap(true, Ordering::SeqCst) {
            debug!("Capture scheduler already bootstrapped");
            return;
        }

        let windows = match self.shared.browser.windows().await {
            Ok(windows) => windows,
            Err(e) => {
                warn!(error = %e, "Window enumeration failed, starting empty");
                return;
            }
        };

        let mut epochs = 0usize;
        {
            let mut state = self.shared.state.lock();
            for window in &windows {
                state.minimized.insert(window.id, window.is_minimized());
                if window.focused {
                    state.focused_window = Some(window.id);
                }

                for tab in &window.tabs {
                    state.tab_windows.insert(tab.id, window.id);
                }

                let Some(active) = window.active_tab() else {
                    continue;
                };
                state.set_active(window.id, active.id);

                if let Some(url) = active.url.as_deref()
                    && is_capturable_url(url)
                {
                    state.start_epoch(active.id, url);
                    epochs += 1;
                }
            }
        }

        info!(windows = windows.len(), epochs, "Capture scheduler bootstrapped");
    }

    /// Dispatches a typed event to its handler.
    pub async fn handle_event(&self, event: BrowserEvent) {
        match event {
            BrowserEvent::TabActivated(info) => self.handle_tab_activated(info).await,
            BrowserEvent::TabUpdated {
                tab_id,
                change,
                tab,
            } => self.handle_tab_updated(tab_id, change, tab).await,
            BrowserEvent::TabRemoved { tab_id } => self.handle_tab_removed(tab_id).await,
            BrowserEvent::WindowFocusChanged { window_id } => {
                self.handle_window_focus_changed(window_id).await;
            }
            BrowserEvent::BeforeNavigate(details) => self.handle_before_navigate(details).await,
            BrowserEvent::NavigationCommitted(details) => {
                self.handle_navigation_committed(details).await;
            }
            BrowserEvent::HistoryStateUpdated(details) => {
                self.handle_history_state_updated(details).await;
            }
            BrowserEvent::Unknown { method, .. } => {
                trace!(%method, "Ignoring unhandled event");
            }
        }
    }

    /// Handles `windows.onFocusChanged`.
    pub async fn handle_window_focus_changed(&self, window_id: WindowId) {
        trace!(%window_id, "Window focus changed");

        if window_id.is_none() {
            let previous_tab = {
                let mut state = self.shared.state.lock();
                let tab = state.focused_active_tab();
                state.focused_window = None;
                tab
            };

            if let Some(tab_id) = previous_tab {
                self.schedule_capture(tab_id, CaptureKind::Final, None);
            }
            return;
        }

        let minimized = match self.shared.browser.window(window_id).await {
            Ok(window) => Some(window.is_minimized()),
            Err(e) => {
                log_platform_error("windows.get", &e);
                None
            }
        };

        let (previous_tab, known_active) = {
            let mut state = self.shared.state.lock();
            if let Some(minimized) = minimized {
                state.minimized.insert(window_id, minimized);
            }

            let previous_tab = match state.focused_window.replace(window_id) {
                Some(previous) if previous != window_id => {
                    state.active_tabs.get(&previous).copied()
                }
                _ => None,
            };

            (previous_tab, state.active_tabs.contains_key(&window_id))
        };

        if let Some(tab_id) = previous_tab {
            self.schedule_capture(tab_id, CaptureKind::Final, None);
        }

        if known_active {
            return;
        }

        match self.shared.browser.active_tab(window_id).await {
            Ok(Some(tab)) => self.track_active_tab(&tab),
            Ok(None) => {}
            Err(e) => log_platform_error("tabs.query", &e),
        }
    }

    /// Handles `tabs.onActivated`.
    pub async fn handle_tab_activated(&self, info: TabActivated) {
        trace!(tab_id = %info.tab_id, window_id = %info.window_id, "Tab activated");

        let previous = self
            .shared
            .state
            .lock()
            .active_tabs
            .get(&info.window_id)
            .copied()
            .filter(|previous| *previous != info.tab_id);

        if let Some(previous) = previous {
            self.schedule_capture(previous, CaptureKind::Final, None);
        }

        let has_epoch = {
            let mut state = self.shared.state.lock();
            state.set_active(info.window_id, info.tab_id);
            state.epochs.contains_key(&info.tab_id)
        };

        if has_epoch {
            return;
        }

        match self.shared.browser.tab(info.tab_id).await {
            Ok(tab) => {
                if let Some(url) = tab.url.as_deref() {
                    self.shared.state.lock().ensure_epoch(tab.id, url);
                }
            }
            Err(e) => log_platform_error("tabs.get", &e),
        }
    }

    /// Handles `tabs.onUpdated`.
    pub async fn handle_tab_updated(&self, tab_id: TabId, change: TabChange, tab: TabInfo) {
        trace!(%tab_id, status = ?change.status, "Tab updated");

        {
            let mut state = self.shared.state.lock();
            state.tab_windows.insert(tab_id, tab.window_id);

            if let Some(url) = change.url.as_deref() {
                match state.epochs.get_mut(&tab_id) {
                    Some(epoch) => epoch.set_url(url),
                    None => {
                        state.start_epoch(tab_id, url);
                    }
                }
            }

            if change.is_complete()
                && let Some(url) = tab.url.as_deref()
            {
                state.ensure_epoch(tab_id, url);
            }
        }

        if change.is_complete() {
            self.schedule_capture(tab_id, CaptureKind::First, None);
        }
    }

    /// Handles `webNavigation.onCommitted`.
    pub async fn handle_navigation_committed(&self, details: NavigationDetails) {
        if !details.frame_id.is_main() {
            return;
        }

        let seq = self
            .shared
            .state
            .lock()
            .start_epoch(details.tab_id, &details.url);
        debug!(tab_id = %details.tab_id, seq, "Visit epoch started");
    }

    /// Handles `webNavigation.onHistoryStateUpdated`.
    ///
    /// The outgoing epoch is replaced right away, so its `final` request is
    /// dropped as superseded once dequeued: the page already shows the new
    /// route. The new epoch's `first` capture is scheduled after the settle
    /// delay, and only if no later route change replaced it meanwhile.
    pub async fn handle_history_state_updated(&self, details: NavigationDetails) {
        if !details.frame_id.is_main() {
            return;
        }

        self.schedule_capture(details.tab_id, CaptureKind::Final, None);

        let seq = self
            .shared
            .state
            .lock()
            .start_epoch(details.tab_id, &details.url);
        debug!(tab_id = %details.tab_id, seq, "Visit epoch started by route change");

        let scheduler = self.clone();
        let delay = self.shared.options.settle_delay;
        tokio::spawn(async move {
            sleep(delay).await;
            scheduler.schedule_capture(details.tab_id, CaptureKind::First, Some(seq));
        });
    }

    /// Handles `webNavigation.onBeforeNavigate`.
    pub async fn handle_before_navigate(&self, details: NavigationDetails) {
        if details.frame_id.is_main() {
            self.schedule_capture(details.tab_id, CaptureKind::Final, None);
        }
    }

    /// Handles `tabs.onRemoved`.
    pub async fn handle_tab_removed(&self, tab_id: TabId) {
        if self.shared.state.lock().remove_tab(tab_id) {
            debug!(%tab_id, "Visit epoch discarded");
        }
    }
}

// ============================================================================
// Scheduling
// ============================================================================

impl CaptureScheduler {
    /// Records a tab reported active by the platform.
    fn track_active_tab(&self, tab: &TabInfo) {
        let mut state = self.shared.state.lock();
        state.set_active(tab.window_id, tab.id);
        if let Some(url) = tab.url.as_deref() {
            state.ensure_epoch(tab.id, url);
        }
    }

    /// Enqueues a capture of `kind` for the tab's current epoch.
    ///
    /// With `expected_seq`, nothing happens unless the epoch still has that
    /// sequence. Returns `true` if a request was enqueued.
    fn schedule_capture(&self, tab_id: TabId, kind: CaptureKind, expected_seq: Option<u64>) -> bool {
        if !self.is_auto_capture_enabled() {
            return false;
        }

        let mut guard = self.shared.state.lock();
        let state = &mut *guard;

        let Some(epoch) = state.epochs.get_mut(&tab_id) else {
            return false;
        };

        if expected_seq.is_some_and(|seq| seq != epoch.seq())
            || !epoch.can_schedule(kind)
            || !is_capturable_url(epoch.url())
        {
            return false;
        }

        let Some(window_id) = state.tab_windows.get(&tab_id).copied() else {
            debug!(%tab_id, %kind, "Window of tab unknown, not scheduling");
            return false;
        };

        if state.queued.contains(&(tab_id, kind)) {
            debug!(%tab_id, %kind, "Duplicate capture request dropped");
            return false;
        }

        let request = CaptureRequest {
            tab_id,
            window_id,
            url: epoch.url().to_string(),
            kind,
            epoch_seq: epoch.seq(),
        };

        if self.queue_tx.send(QueueCommand::Capture(request)).is_err() {
            warn!(%tab_id, %kind, "Capture worker stopped, request discarded");
            return false;
        }

        epoch.mark_pending(kind);
        state.queued.insert((tab_id, kind));
        debug!(%tab_id, %window_id, %kind, "Capture scheduled");
        true
    }
}

fn log_platform_error(operation: &'static str, error: &Error) {
    if error.is_gone() {
        debug!(operation, error = %error, "Platform target gone");
    } else {
        warn!(operation, error = %error, "Platform call failed");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::capture::request::CaptureMetadata;
    use crate::platform::fake::{FakeBrowser, init_tracing};
    use crate::platform::{MemorySettings, RawEvent};

    const W1: WindowId = WindowId::new(1);
    const W2: WindowId = WindowId::new(2);
    const T7: TabId = TabId::new(7);
    const T9: TabId = TabId::new(9);
    const URL_A: &str = "https://example.com/a";
    const URL_B: &str = "https://example.com/b";

    #[derive(Default)]
    struct RecordingSink {
        captures: Mutex<Vec<CaptureMetadata>>,
        age: Mutex<Option<Duration>>,
    }

    impl RecordingSink {
        fn kinds(&self) -> Vec<(TabId, String, CaptureKind)> {
            self.captures
                .lock()
                .iter()
                .map(|m| (m.tab_id, m.url.clone(), m.kind))
                .collect()
        }
    }

    #[async_trait]
    impl CaptureSink for RecordingSink {
        async fn on_capture(&self, metadata: CaptureMetadata) -> Result<()> {
            self.captures.lock().push(metadata);
            Ok(())
        }

        async fn capture_age(&self, _tab_id: TabId, _url: &str) -> Option<Duration> {
            *self.age.lock()
        }
    }

    fn two_tab_browser() -> Arc<FakeBrowser> {
        Arc::new(FakeBrowser::new().with_window(W1, true, &[(T7, URL_A), (T9, URL_B)]))
    }

    async fn started(
        browser: &Arc<FakeBrowser>,
        options: CaptureOptions,
    ) -> (CaptureScheduler, Arc<RecordingSink>) {
        init_tracing();
        let scheduler =
            CaptureScheduler::new(browser.clone(), options).expect("valid options");
        let sink = Arc::new(RecordingSink::default());
        scheduler.set_capture_handler(sink.clone());
        scheduler.bootstrap().await;
        (scheduler, sink)
    }

    /// Lets the worker and any settle timers run to completion.
    async fn settle() {
        sleep(Duration::from_secs(5)).await;
    }

    async fn load_complete(scheduler: &CaptureScheduler, tab_id: TabId, window_id: WindowId, url: &str) {
        scheduler
            .handle_navigation_committed(NavigationDetails::main_frame(tab_id, url))
            .await;
        scheduler
            .handle_tab_updated(
                tab_id,
                TabChange {
                    status: Some(crate::platform::TabStatus::Complete),
                    url: None,
                },
                TabInfo::new(tab_id, window_id, url),
            )
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_then_final_dropped_after_switch() {
        let browser = two_tab_browser();
        let (scheduler, sink) = started(&browser, CaptureOptions::new()).await;

        load_complete(&scheduler, T7, W1, URL_A).await;
        settle().await;

        assert_eq!(sink.kinds(), vec![(T7, URL_A.to_string(), CaptureKind::First)]);
        let epoch = scheduler.epoch(T7).expect("epoch");
        assert!(epoch.is_completed(CaptureKind::First));
        assert!(!epoch.is_pending(CaptureKind::First));

        browser.set_active(W1, T9);
        scheduler
            .handle_tab_activated(TabActivated {
                tab_id: T9,
                window_id: W1,
            })
            .await;
        settle().await;

        let epoch = scheduler.epoch(T7).expect("epoch");
        assert!(!epoch.is_pending(CaptureKind::Final));
        assert!(!epoch.is_completed(CaptureKind::Final));
        assert_eq!(browser.capture_calls().len(), 1);

        // Tab 9 got an epoch from the platform lookup.
        assert_eq!(scheduler.epoch(T9).expect("epoch").url(), URL_B);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_events_capture_once_per_kind() {
        let browser = two_tab_browser();
        let (scheduler, sink) = started(&browser, CaptureOptions::new()).await;

        load_complete(&scheduler, T7, W1, URL_A).await;
        for _ in 0..3 {
            scheduler
                .handle_tab_updated(
                    T7,
                    TabChange {
                        status: Some(crate::platform::TabStatus::Complete),
                        url: None,
                    },
                    TabInfo::new(T7, W1, URL_A),
                )
                .await;
        }
        settle().await;

        scheduler
            .handle_tab_updated(
                T7,
                TabChange {
                    status: Some(crate::platform::TabStatus::Complete),
                    url: None,
                },
                TabInfo::new(T7, W1, URL_A),
            )
            .await;
        settle().await;

        assert_eq!(sink.kinds().len(), 1);
        assert_eq!(browser.capture_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_captures_respect_min_interval() {
        let browser = two_tab_browser();
        let interval = Duration::from_millis(600);
        let (scheduler, sink) = started(
            &browser,
            CaptureOptions::new().with_min_capture_interval(interval),
        )
        .await;

        load_complete(&scheduler, T7, W1, URL_A).await;
        scheduler
            .handle_before_navigate(NavigationDetails::main_frame(T7, URL_B))
            .await;
        settle().await;

        let calls = browser.capture_calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].at.duration_since(calls[0].at) >= interval);
        assert_eq!(
            sink.kinds().into_iter().map(|(_, _, kind)| kind).collect::<Vec<_>>(),
            vec![CaptureKind::First, CaptureKind::Final]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_during_throttle_drops_request() {
        let browser = two_tab_browser();
        let (scheduler, sink) = started(&browser, CaptureOptions::new()).await;

        load_complete(&scheduler, T7, W1, URL_A).await;
        sleep(Duration::from_millis(10)).await;
        assert_eq!(browser.capture_calls().len(), 1);

        // The worker picks this up and waits out the min interval.
        scheduler
            .handle_before_navigate(NavigationDetails::main_frame(T7, URL_B))
            .await;
        sleep(Duration::from_millis(100)).await;
        assert!(scheduler.epoch(T7).expect("epoch").is_pending(CaptureKind::Final));

        browser.set_active(W1, T9);
        scheduler
            .handle_tab_activated(TabActivated {
                tab_id: T9,
                window_id: W1,
            })
            .await;
        settle().await;

        assert_eq!(browser.capture_calls().len(), 1);
        assert_eq!(sink.kinds(), vec![(T7, URL_A.to_string(), CaptureKind::First)]);

        let epoch = scheduler.epoch(T7).expect("epoch");
        assert!(!epoch.is_pending(CaptureKind::Final));
        assert!(!epoch.is_completed(CaptureKind::Final));
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_resets_epoch_flags() {
        let browser = two_tab_browser();
        let (scheduler, _sink) = started(&browser, CaptureOptions::new()).await;

        load_complete(&scheduler, T7, W1, URL_A).await;
        settle().await;
        let before = scheduler.epoch(T7).expect("epoch");
        assert!(before.is_completed(CaptureKind::First));

        scheduler
            .handle_navigation_committed(NavigationDetails::main_frame(T7, URL_B))
            .await;

        let after = scheduler.epoch(T7).expect("epoch");
        assert!(after.seq() > before.seq());
        assert_eq!(after.url(), URL_B);
        for kind in CaptureKind::ALL {
            assert!(!after.is_pending(kind));
            assert!(!after.is_completed(kind));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_subframe_navigation_ignored() {
        let browser = two_tab_browser();
        let (scheduler, _sink) = started(&browser, CaptureOptions::new()).await;
        let seq = scheduler.epoch(T7).expect("bootstrap epoch").seq();

        scheduler
            .handle_navigation_committed(NavigationDetails {
                tab_id: T7,
                frame_id: crate::identifiers::FrameId::new(3),
                url: "https://ads.example.net".to_string(),
            })
            .await;

        assert_eq!(scheduler.epoch(T7).expect("epoch").seq(), seq);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_route_changes_keep_latest_epoch() {
        let browser = two_tab_browser();
        let (scheduler, sink) = started(&browser, CaptureOptions::new()).await;

        load_complete(&scheduler, T7, W1, URL_A).await;
        settle().await;

        let route_b = "https://example.com/a#/b";
        let route_c = "https://example.com/a#/c";
        scheduler
            .handle_history_state_updated(NavigationDetails::main_frame(T7, route_b))
            .await;
        sleep(Duration::from_millis(50)).await;
        scheduler
            .handle_history_state_updated(NavigationDetails::main_frame(T7, route_c))
            .await;
        settle().await;

        let epoch = scheduler.epoch(T7).expect("epoch");
        assert_eq!(epoch.url(), route_c);
        assert!(epoch.is_completed(CaptureKind::First));

        let captured = sink.kinds();
        assert_eq!(
            captured,
            vec![
                (T7, URL_A.to_string(), CaptureKind::First),
                (T7, route_c.to_string(), CaptureKind::First),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_focus_loss_drops_final() {
        let browser = two_tab_browser();
        let (scheduler, sink) = started(&browser, CaptureOptions::new()).await;

        scheduler.handle_window_focus_changed(WindowId::NONE).await;
        assert!(scheduler.epoch(T7).expect("epoch").is_pending(CaptureKind::Final));
        settle().await;

        let epoch = scheduler.epoch(T7).expect("epoch");
        assert!(!epoch.is_pending(CaptureKind::Final));
        assert!(!epoch.is_completed(CaptureKind::Final));
        assert!(sink.kinds().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_minimized_window_is_not_captured() {
        let browser = Arc::new(
            FakeBrowser::new()
                .with_window(W1, true, &[(T7, URL_A)])
                .with_window(W2, false, &[(T9, URL_B)]),
        );
        let (scheduler, sink) = started(&browser, CaptureOptions::new()).await;

        browser.set_minimized(W2, true);
        scheduler.handle_window_focus_changed(W2).await;
        load_complete(&scheduler, T9, W2, URL_B).await;
        settle().await;

        assert!(sink.kinds().is_empty());
        assert!(!scheduler.epoch(T9).expect("epoch").is_pending(CaptureKind::First));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_capture_can_be_retried() {
        let browser = two_tab_browser();
        let (scheduler, sink) = started(&browser, CaptureOptions::new()).await;

        browser.reject_captures(true);
        load_complete(&scheduler, T7, W1, URL_A).await;
        settle().await;

        let epoch = scheduler.epoch(T7).expect("epoch");
        assert!(!epoch.is_pending(CaptureKind::First));
        assert!(!epoch.is_completed(CaptureKind::First));

        browser.reject_captures(false);
        scheduler
            .handle_tab_updated(
                T7,
                TabChange {
                    status: Some(crate::platform::TabStatus::Complete),
                    url: None,
                },
                TabInfo::new(T7, W1, URL_A),
            )
            .await;
        settle().await;

        assert_eq!(browser.capture_calls().len(), 2);
        assert_eq!(sink.kinds().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_http_pages_are_skipped() {
        let browser = two_tab_browser();
        let (scheduler, sink) = started(&browser, CaptureOptions::new()).await;

        load_complete(&scheduler, T7, W1, "about:preferences").await;
        settle().await;

        assert!(sink.kinds().is_empty());
        assert!(browser.capture_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_capture_preference() {
        let browser = two_tab_browser();
        let (scheduler, sink) = started(&browser, CaptureOptions::new()).await;

        let settings = MemorySettings::new();
        settings
            .set(AUTO_THUMBNAIL_CAPTURE_KEY, json!(false))
            .await
            .expect("set");
        scheduler.sync_preferences(&settings).await;
        assert!(!scheduler.is_auto_capture_enabled());

        load_complete(&scheduler, T7, W1, URL_A).await;
        settle().await;
        assert!(sink.kinds().is_empty());
        assert!(scheduler.epoch(T7).is_some());

        settings.remove(AUTO_THUMBNAIL_CAPTURE_KEY).await.expect("remove");
        scheduler.sync_preferences(&settings).await;
        assert!(scheduler.is_auto_capture_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_drops_fresh_capture() {
        let browser = two_tab_browser();
        let (scheduler, sink) = started(
            &browser,
            CaptureOptions::new().with_cooldown(Duration::from_secs(15 * 60)),
        )
        .await;
        *sink.age.lock() = Some(Duration::from_secs(60));

        load_complete(&scheduler, T7, W1, URL_A).await;
        settle().await;

        assert!(browser.capture_calls().is_empty());
        assert!(!scheduler.epoch(T7).expect("epoch").is_completed(CaptureKind::First));

        // An older capture no longer blocks the next visit.
        *sink.age.lock() = Some(Duration::from_secs(16 * 60));
        load_complete(&scheduler, T7, W1, URL_A).await;
        settle().await;

        assert_eq!(browser.capture_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_survives_enumeration_failure() {
        let browser = two_tab_browser();
        browser.fail_enumeration(true);
        let (scheduler, _sink) = started(&browser, CaptureOptions::new()).await;

        assert!(scheduler.epoch(T7).is_none());

        // Bootstrap only runs once.
        browser.fail_enumeration(false);
        scheduler.bootstrap().await;
        assert!(scheduler.epoch(T7).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_raw_events_drive_handlers() {
        let browser = two_tab_browser();
        let (scheduler, _sink) = started(&browser, CaptureOptions::new()).await;

        let committed = RawEvent::new(
            "webNavigation.onCommitted",
            json!({ "tabId": 9, "frameId": 0, "url": URL_B }),
        );
        scheduler.handle_event(committed.parse()).await;
        assert_eq!(scheduler.epoch(T9).expect("epoch").url(), URL_B);

        let removed = RawEvent::new("tabs.onRemoved", json!({ "tabId": 9 }));
        scheduler.handle_event(removed.parse()).await;
        assert!(scheduler.epoch(T9).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_worker() {
        let browser = two_tab_browser();
        let (scheduler, sink) = started(&browser, CaptureOptions::new()).await;

        scheduler.shutdown();
        settle().await;
        load_complete(&scheduler, T7, W1, URL_A).await;
        settle().await;

        assert!(sink.kinds().is_empty());
        assert!(!scheduler.epoch(T7).expect("epoch").is_pending(CaptureKind::First));
    }
}
