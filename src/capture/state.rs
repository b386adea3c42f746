//! Scheduler bookkeeping.
//!
//! All maps live in one [`SchedulerState`] behind a single mutex. The lock is
//! never held across an `.await`, so every handler and the worker read the
//! latest state at the point of use.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::{FxHashMap, FxHashSet};

use crate::identifiers::{TabId, WindowId};

use super::epoch::{CaptureKind, VisitEpoch};
use super::request::{CaptureRequest, DropReason};

// ============================================================================
// SchedulerState
// ============================================================================

#[derive(Debug, Default)]
pub(super) struct SchedulerState {
    /// At most one epoch per tab.
    pub epochs: FxHashMap<TabId, VisitEpoch>,
    pub active_tabs: FxHashMap<WindowId, TabId>,
    pub tab_windows: FxHashMap<TabId, WindowId>,
    pub minimized: FxHashMap<WindowId, bool>,
    pub focused_window: Option<WindowId>,
    /// Keys of requests sitting in the queue.
    pub queued: FxHashSet<(TabId, CaptureKind)>,
    next_seq: u64,
}

impl SchedulerState {
    /// Starts a fresh epoch, discarding any previous one for the tab.
    pub fn start_epoch(&mut self, tab_id: TabId, url: &str) -> u64 {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.epochs.insert(tab_id, VisitEpoch::new(tab_id, url, seq));
        seq
    }

    /// Returns the tab's epoch sequence, starting an epoch if none exists.
    pub fn ensure_epoch(&mut self, tab_id: TabId, url: &str) -> u64 {
        match self.epochs.get(&tab_id) {
            Some(epoch) => epoch.seq(),
            None => self.start_epoch(tab_id, url),
        }
    }

    /// Sets the tab as its window's active tab.
    pub fn set_active(&mut self, window_id: WindowId, tab_id: TabId) {
        self.active_tabs.insert(window_id, tab_id);
        self.tab_windows.insert(tab_id, window_id);
    }

    /// Returns the active tab of the focused window.
    pub fn focused_active_tab(&self) -> Option<TabId> {
        self.focused_window
            .and_then(|window_id| self.active_tabs.get(&window_id).copied())
    }

    /// Forgets everything about a closed tab.
    pub fn remove_tab(&mut self, tab_id: TabId) -> bool {
        self.tab_windows.remove(&tab_id);
        self.active_tabs.retain(|_, active| *active != tab_id);
        self.epochs.remove(&tab_id).is_some()
    }

    /// Checks whether a dequeued request may be executed now.
    pub fn check_eligible(&self, request: &CaptureRequest) -> Result<(), DropReason> {
        if self.focused_window != Some(request.window_id) {
            return Err(DropReason::WindowNotFocused);
        }

        if self
            .minimized
            .get(&request.window_id)
            .copied()
            .unwrap_or(false)
        {
            return Err(DropReason::WindowMinimized);
        }

        if self.active_tabs.get(&request.window_id) != Some(&request.tab_id) {
            return Err(DropReason::TabNotActive);
        }

        match self.epochs.get(&request.tab_id) {
            Some(epoch) if epoch.seq() == request.epoch_seq => Ok(()),
            _ => Err(DropReason::EpochSuperseded),
        }
    }

    /// Clears the request's pending flag on its own epoch, if it still exists.
    pub fn settle(&mut self, request: &CaptureRequest, completed: bool) {
        if let Some(epoch) = self.epochs.get_mut(&request.tab_id)
            && epoch.seq() == request.epoch_seq
        {
            epoch.settle(request.kind, completed);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const TAB: TabId = TabId::new(7);
    const WINDOW: WindowId = WindowId::new(1);

    fn request(state: &SchedulerState, kind: CaptureKind) -> CaptureRequest {
        let epoch = state.epochs.get(&TAB).expect("epoch");
        CaptureRequest {
            tab_id: TAB,
            window_id: WINDOW,
            url: epoch.url().to_string(),
            kind,
            epoch_seq: epoch.seq(),
        }
    }

    fn focused_state() -> SchedulerState {
        let mut state = SchedulerState::default();
        state.focused_window = Some(WINDOW);
        state.set_active(WINDOW, TAB);
        state.start_epoch(TAB, "https://example.com/a");
        state
    }

    #[test]
    fn test_start_epoch_supersedes_previous() {
        let mut state = focused_state();
        let first = state.epochs[&TAB].seq();

        let req = request(&state, CaptureKind::First);
        state.epochs.get_mut(&TAB).expect("epoch").mark_pending(CaptureKind::First);

        let second = state.start_epoch(TAB, "https://example.com/b");
        assert!(second > first);
        assert_eq!(state.epochs.len(), 1);
        assert!(!state.epochs[&TAB].is_pending(CaptureKind::First));

        // A stale request neither executes nor touches the new epoch.
        assert_eq!(state.check_eligible(&req), Err(DropReason::EpochSuperseded));
        state.settle(&req, true);
        assert!(!state.epochs[&TAB].is_completed(CaptureKind::First));
    }

    #[test]
    fn test_ensure_epoch_keeps_existing() {
        let mut state = focused_state();
        let seq = state.epochs[&TAB].seq();
        assert_eq!(state.ensure_epoch(TAB, "https://example.com/other"), seq);
        assert_eq!(state.epochs[&TAB].url(), "https://example.com/a");
    }

    #[test]
    fn test_eligibility_checks_in_order() {
        let mut state = focused_state();
        let req = request(&state, CaptureKind::Final);
        assert_eq!(state.check_eligible(&req), Ok(()));

        state.minimized.insert(WINDOW, true);
        assert_eq!(state.check_eligible(&req), Err(DropReason::WindowMinimized));
        state.minimized.insert(WINDOW, false);

        state.set_active(WINDOW, TabId::new(9));
        assert_eq!(state.check_eligible(&req), Err(DropReason::TabNotActive));

        state.focused_window = None;
        assert_eq!(state.check_eligible(&req), Err(DropReason::WindowNotFocused));
    }

    #[test]
    fn test_remove_tab_clears_bookkeeping() {
        let mut state = focused_state();
        assert!(state.remove_tab(TAB));
        assert!(state.epochs.is_empty());
        assert!(state.active_tabs.is_empty());
        assert!(state.tab_windows.is_empty());
        assert!(!state.remove_tab(TAB));
    }
}
