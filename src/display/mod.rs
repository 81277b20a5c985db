//! Display sinks: where rendered frames go.
//!
//! - `HeadlessDisplay`: no window; quits only on Ctrl-C or end of stream
//! - `PreviewWindow`: single OpenCV window (feature: vision-opencv)

#[cfg(feature = "vision-opencv")]
mod preview;

use anyhow::Result;
use std::time::Duration;

use crate::config::DisplaySettings;
use crate::frame::Frame;
use crate::overlay::OverlayPlan;

#[cfg(feature = "vision-opencv")]
pub use preview::PreviewWindow;

/// Escape, accepted as a quit key alongside the configured one.
pub const ESCAPE_KEY: char = '\u{1b}';

pub trait DisplaySink {
    /// Draw `plan` on top of `frame` and present it.
    fn show(&mut self, frame: &Frame, plan: &OverlayPlan) -> Result<()>;

    /// Wait up to `wait` for a key press.
    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>>;

    fn is_open(&self) -> bool;

    /// Close the window. Idempotent.
    fn close(&mut self);
}

/// Sink that renders nothing.
#[derive(Debug)]
pub struct HeadlessDisplay {
    open: bool,
    frames_shown: u64,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self {
            open: true,
            frames_shown: 0,
        }
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for HeadlessDisplay {
    fn show(&mut self, frame: &Frame, plan: &OverlayPlan) -> Result<()> {
        self.frames_shown += 1;
        if !plan.is_empty() {
            log::debug!(
                "frame {}: {} boxes, texts {:?}",
                frame.index,
                plan.boxes.len(),
                plan.texts()
            );
        }
        Ok(())
    }

    fn poll_key(&mut self, _wait: Duration) -> Result<Option<char>> {
        Ok(None)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Build the sink the settings ask for, falling back to headless when no
/// window can be opened.
pub fn open_display(settings: &DisplaySettings, default_title: &str) -> Box<dyn DisplaySink> {
    if settings.headless {
        log::info!("display: running headless");
        return Box::new(HeadlessDisplay::new());
    }
    let title = settings
        .window_title
        .clone()
        .unwrap_or_else(|| default_title.to_string());
    open_window(&title)
}

#[cfg(feature = "vision-opencv")]
fn open_window(title: &str) -> Box<dyn DisplaySink> {
    match PreviewWindow::open(title) {
        Ok(window) => Box::new(window),
        Err(err) => {
            log::warn!("failed to open display window: {}. Running headless.", err);
            Box::new(HeadlessDisplay::new())
        }
    }
}

#[cfg(not(feature = "vision-opencv"))]
fn open_window(title: &str) -> Box<dyn DisplaySink> {
    log::warn!(
        "preview window '{}' requires the vision-opencv feature. Running headless.",
        title
    );
    Box::new(HeadlessDisplay::new())
}
