//! Scripted in-memory [`Browser`] used by unit tests.

use std::io::Cursor;

use async_trait::async_trait;
use image::{Rgb, RgbImage};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::identifiers::{TabId, WindowId};

use super::browser::{Browser, ImageFormat, TabInfo, WindowInfo, WindowState};

/// A recorded `capture_visible_tab` call.
#[derive(Debug, Clone)]
pub(crate) struct CaptureCall {
    pub window_id: WindowId,
    pub tab_id: Option<TabId>,
    pub at: Instant,
}

#[derive(Default)]
struct FakeState {
    windows: Vec<WindowInfo>,
    calls: Vec<CaptureCall>,
    fail_enumeration: bool,
    reject_captures: bool,
}

/// Browser double whose windows and tabs are edited directly by the test.
#[derive(Default)]
pub(crate) struct FakeBrowser {
    state: Mutex<FakeState>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a window holding `tabs`; the first tab is made active.
    pub fn with_window(self, window_id: WindowId, focused: bool, tabs: &[(TabId, &str)]) -> Self {
        let tabs = tabs
            .iter()
            .enumerate()
            .map(|(i, (tab_id, url))| {
                let mut tab = TabInfo::new(*tab_id, window_id, *url);
                tab.active = i == 0;
                tab
            })
            .collect();

        self.state.lock().windows.push(WindowInfo {
            id: window_id,
            focused,
            state: WindowState::Normal,
            tabs,
        });
        self
    }

    pub fn set_active(&self, window_id: WindowId, tab_id: TabId) {
        let mut state = self.state.lock();
        if let Some(window) = state.windows.iter_mut().find(|w| w.id == window_id) {
            for tab in &mut window.tabs {
                tab.active = tab.id == tab_id;
            }
        }
    }

    pub fn set_minimized(&self, window_id: WindowId, minimized: bool) {
        let mut state = self.state.lock();
        if let Some(window) = state.windows.iter_mut().find(|w| w.id == window_id) {
            window.state = if minimized {
                WindowState::Minimized
            } else {
                WindowState::Normal
            };
        }
    }

    pub fn set_url(&self, tab_id: TabId, url: &str) {
        let mut state = self.state.lock();
        for window in &mut state.windows {
            for tab in &mut window.tabs {
                if tab.id == tab_id {
                    tab.url = Some(url.to_string());
                }
            }
        }
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.state.lock().fail_enumeration = fail;
    }

    pub fn reject_captures(&self, reject: bool) {
        self.state.lock().reject_captures = reject;
    }

    pub fn capture_calls(&self) -> Vec<CaptureCall> {
        self.state.lock().calls.clone()
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn windows(&self) -> Result<Vec<WindowInfo>> {
        let state = self.state.lock();
        if state.fail_enumeration {
            return Err(Error::platform("windows.getAll", "enumeration failed"));
        }
        Ok(state.windows.clone())
    }

    async fn window(&self, window_id: WindowId) -> Result<WindowInfo> {
        self.state
            .lock()
            .windows
            .iter()
            .find(|w| w.id == window_id)
            .cloned()
            .ok_or_else(|| Error::window_not_found(window_id))
    }

    async fn tab(&self, tab_id: TabId) -> Result<TabInfo> {
        self.state
            .lock()
            .windows
            .iter()
            .flat_map(|w| w.tabs.iter())
            .find(|t| t.id == tab_id)
            .cloned()
            .ok_or_else(|| Error::tab_not_found(tab_id))
    }

    async fn active_tab(&self, window_id: WindowId) -> Result<Option<TabInfo>> {
        let window = self.window(window_id).await?;
        Ok(window.active_tab().cloned())
    }

    async fn capture_visible_tab(
        &self,
        window_id: WindowId,
        _format: ImageFormat,
    ) -> Result<Vec<u8>> {
        let mut state = self.state.lock();
        let tab_id = state
            .windows
            .iter()
            .find(|w| w.id == window_id)
            .and_then(|w| w.active_tab())
            .map(|t| t.id);

        state.calls.push(CaptureCall {
            window_id,
            tab_id,
            at: Instant::now(),
        });

        if state.reject_captures {
            return Err(Error::capture_rejected(window_id, "cannot capture this page"));
        }

        Ok(sample_png(64, 40))
    }
}

/// Encodes a solid-gradient PNG of the given size.
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png)
        .expect("encode sample png");
    bytes.into_inner()
}

/// Routes `tracing` output to the test harness. Honors `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
