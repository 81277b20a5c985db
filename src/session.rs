//! Capture loops for the two pipelines.
//!
//! One thread reads a frame, runs the pipeline's decision step, renders the
//! overlay and polls for cancellation, once per iteration. Motion alerts
//! leave the loop through the `AlertDispatcher`; cascade alerts are console
//! lines written directly by the loop so that none are lost. The camera and
//! the window are released on every exit path, including errors.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::alert::{AlertDispatcher, AlertEmitter, AlertEvent, AlertKind};
use crate::config::DisplaySettings;
use crate::detect::ObjectDetector;
use crate::display::{DisplaySink, ESCAPE_KEY};
use crate::frame::{Frame, Rect};
use crate::ingest::FrameSource;
use crate::motion::MotionDetector;
use crate::overlay::OverlayPlan;

/// Why a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    QuitKey,
    EndOfStream,
    ReadFailure(String),
    Interrupted,
    FrameLimit,
}

/// Shared cancellation flag, set by Ctrl-C.
#[derive(Clone, Debug, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Route SIGINT to this flag. Call at most once per process.
    pub fn install_ctrlc(&self) -> Result<()> {
        let flag = Arc::clone(&self.0);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .context("install Ctrl-C handler")
    }
}

#[derive(Clone, Debug)]
pub struct LoopOptions {
    pub quit_key: char,
    /// Stop after this many frames.
    pub max_frames: Option<u64>,
    /// How long each iteration waits for a key press.
    pub key_wait: Duration,
    pub shutdown: Shutdown,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            quit_key: 'q',
            max_frames: None,
            key_wait: Duration::from_millis(1),
            shutdown: Shutdown::new(),
        }
    }
}

impl LoopOptions {
    pub fn from_display(settings: &DisplaySettings, shutdown: Shutdown) -> Self {
        Self {
            quit_key: settings.quit_key,
            shutdown,
            ..Self::default()
        }
    }

    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    fn is_quit(&self, key: char) -> bool {
        key == self.quit_key || key == ESCAPE_KEY
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames: u64,
    /// Frames that produced at least one box.
    pub detection_frames: u64,
    /// Alerts raised by the pipeline, whether or not they were delivered.
    pub alerts_raised: u64,
    pub stop: StopReason,
}

/// Result of one pipeline step.
struct StepOutcome {
    plan: OverlayPlan,
    detected: bool,
    alerts: Vec<AlertEvent>,
}

/// Releases the source and closes the display when the loop exits.
struct ReleaseGuard<'a> {
    source: &'a mut dyn FrameSource,
    display: &'a mut dyn DisplaySink,
}

impl Drop for ReleaseGuard<'_> {
    fn drop(&mut self) {
        let stats = self.source.stats();
        self.source.release();
        self.display.close();
        log::info!(
            "session: released {} after {} frames",
            stats.device,
            stats.frames_captured
        );
    }
}

fn run_loop<F, A>(
    source: &mut dyn FrameSource,
    display: &mut dyn DisplaySink,
    options: &LoopOptions,
    mut step: F,
    mut raise: A,
) -> Result<SessionSummary>
where
    F: FnMut(&Frame) -> Result<StepOutcome>,
    A: FnMut(AlertEvent),
{
    let mut guard = ReleaseGuard { source, display };
    let mut frames = 0u64;
    let mut detection_frames = 0u64;
    let mut alerts_raised = 0u64;

    let stop = loop {
        if options.shutdown.is_requested() {
            break StopReason::Interrupted;
        }
        if options.max_frames.is_some_and(|max| frames >= max) {
            break StopReason::FrameLimit;
        }

        let frame = match guard.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => break StopReason::EndOfStream,
            Err(err) => {
                log::warn!("frame read failed on {}: {:#}", guard.source.device(), err);
                break StopReason::ReadFailure(format!("{:#}", err));
            }
        };
        frames += 1;

        let outcome = step(&frame)?;
        if outcome.detected {
            detection_frames += 1;
        }
        for event in outcome.alerts {
            alerts_raised += 1;
            raise(event);
        }

        guard
            .display
            .show(&frame, &outcome.plan)
            .with_context(|| format!("render frame {}", frame.index))?;

        if let Some(key) = guard.display.poll_key(options.key_wait)? {
            if options.is_quit(key) {
                break StopReason::QuitKey;
            }
        }
    };

    log::info!(
        "session: stopped ({:?}) after {} frames, {} with detections, {} alerts",
        stop,
        frames,
        detection_frames,
        alerts_raised
    );
    drop(guard);

    Ok(SessionSummary {
        frames,
        detection_frames,
        alerts_raised,
        stop,
    })
}

/// Run the motion pipeline until quit, end of stream, Ctrl-C or frame limit.
pub fn run_motion(
    source: &mut dyn FrameSource,
    display: &mut dyn DisplaySink,
    alerts: &AlertDispatcher,
    detector: &mut MotionDetector,
    options: &LoopOptions,
) -> Result<SessionSummary> {
    let step = |frame: &Frame| -> Result<StepOutcome> {
        let decision = detector.process(frame)?;
        let alerts = if decision.fires_alert() {
            vec![AlertEvent {
                kind: AlertKind::Motion,
                frame_index: decision.frame_index,
                regions: decision.boxes.len(),
            }]
        } else {
            Vec::new()
        };
        Ok(StepOutcome {
            plan: OverlayPlan::for_motion(&decision.boxes),
            detected: decision.any_detected(),
            alerts,
        })
    };
    run_loop(source, display, options, step, |event| {
        alerts.dispatch(event);
    })
}

/// Per-frame output of the cascade pipeline.
#[derive(Clone, Debug)]
pub struct CascadeReport {
    pub frame_index: u64,
    pub boxes: Vec<Rect>,
    pub plan: OverlayPlan,
    /// One alert per detected box.
    pub alerts: Vec<AlertEvent>,
}

impl CascadeReport {
    fn empty(frame_index: u64) -> Self {
        Self {
            frame_index,
            boxes: Vec::new(),
            plan: OverlayPlan::empty(),
            alerts: Vec::new(),
        }
    }
}

/// Grayscale conversion plus an object detector.
pub struct CascadePipeline<D: ObjectDetector> {
    detector: D,
    failures: u64,
}

impl<D: ObjectDetector> CascadePipeline<D> {
    pub fn new(detector: D) -> Self {
        log::info!("cascade pipeline using detector {}", detector.name());
        Self {
            detector,
            failures: 0,
        }
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Detector errors seen so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Detect on one frame. A detector error is logged and yields an empty
    /// report so the stream keeps running.
    pub fn process(&mut self, frame: &Frame) -> CascadeReport {
        let gray = frame.to_gray();
        let boxes = match self.detector.detect(&gray) {
            Ok(boxes) => boxes,
            Err(err) => {
                self.failures += 1;
                log::warn!(
                    "frame {}: detector {} failed: {:#}",
                    frame.index,
                    self.detector.name(),
                    err
                );
                return CascadeReport::empty(frame.index);
            }
        };
        if boxes.is_empty() {
            return CascadeReport::empty(frame.index);
        }

        log::debug!("frame {}: {} detections", frame.index, boxes.len());
        let alerts = boxes
            .iter()
            .map(|_| AlertEvent {
                kind: AlertKind::Animal,
                frame_index: frame.index,
                regions: boxes.len(),
            })
            .collect();
        CascadeReport {
            frame_index: frame.index,
            plan: OverlayPlan::for_cascade(&boxes, self.detector.label()),
            boxes,
            alerts,
        }
    }
}

/// Run the cascade pipeline until quit, end of stream, Ctrl-C or frame limit.
///
/// Every per-box alert goes straight to `console` on the loop thread. There
/// is no queue on this path and no bell or sound command.
pub fn run_cascade<D: ObjectDetector>(
    source: &mut dyn FrameSource,
    display: &mut dyn DisplaySink,
    console: &mut dyn AlertEmitter,
    pipeline: &mut CascadePipeline<D>,
    options: &LoopOptions,
) -> Result<SessionSummary> {
    let step = |frame: &Frame| -> Result<StepOutcome> {
        let report = pipeline.process(frame);
        Ok(StepOutcome {
            detected: !report.boxes.is_empty(),
            plan: report.plan,
            alerts: report.alerts,
        })
    };
    run_loop(source, display, options, step, |event| {
        if let Err(err) = console.emit(&event) {
            log::warn!(
                "alert emitter {} failed on frame {}: {:#}",
                console.name(),
                event.frame_index,
                err
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MotionSettings;
    use crate::detect::ScriptedDetector;
    use crate::display::HeadlessDisplay;
    use crate::frame::PixelLayout;
    use crate::ingest::{is_claimed, SyntheticConfig, SyntheticScene, SyntheticSource};
    use crate::overlay::ANIMAL_LABEL;

    fn quiet_alerts() -> AlertDispatcher {
        AlertDispatcher::new(Vec::new(), 16).unwrap()
    }

    fn static_source(device: &str, frames: u64) -> SyntheticSource {
        SyntheticSource::open(
            SyntheticConfig::new(device, 32, 24, SyntheticScene::Static).with_max_frames(frames),
        )
        .unwrap()
    }

    fn motion_detector() -> MotionDetector {
        MotionDetector::new(MotionSettings {
            blur_kernel: 5,
            min_area: 20,
            ..MotionSettings::default()
        })
        .unwrap()
    }

    #[test]
    fn end_of_stream_releases_everything() -> Result<()> {
        let device = "stub://session-eos";
        let mut source = static_source(device, 5);
        let mut display = HeadlessDisplay::new();
        let alerts = quiet_alerts();
        let summary = run_motion(
            &mut source,
            &mut display,
            &alerts,
            &mut motion_detector(),
            &LoopOptions::default(),
        )?;
        assert_eq!(summary.stop, StopReason::EndOfStream);
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.alerts_raised, 0);
        assert!(!source.is_open());
        assert!(!display.is_open());
        assert!(!is_claimed(device));
        Ok(())
    }

    #[test]
    fn frame_limit_and_shutdown_stop_the_loop() -> Result<()> {
        let mut display = HeadlessDisplay::new();
        let alerts = quiet_alerts();
        let mut source = static_source("stub://session-limit", 50);
        let options = LoopOptions::default().with_max_frames(Some(3));
        let summary = run_motion(
            &mut source,
            &mut display,
            &alerts,
            &mut motion_detector(),
            &options,
        )?;
        assert_eq!(summary.stop, StopReason::FrameLimit);
        assert_eq!(summary.frames, 3);

        let options = LoopOptions::default();
        options.shutdown.request();
        let mut source = static_source("stub://session-interrupt", 50);
        let mut display = HeadlessDisplay::new();
        let summary = run_motion(
            &mut source,
            &mut display,
            &alerts,
            &mut motion_detector(),
            &options,
        )?;
        assert_eq!(summary.stop, StopReason::Interrupted);
        assert_eq!(summary.frames, 0);
        assert!(!is_claimed("stub://session-interrupt"));
        Ok(())
    }

    #[test]
    fn cascade_report_for_hits_and_misses() -> Result<()> {
        let frame = Frame::new(vec![90u8; 64], 8, 8, PixelLayout::Gray8, 4)?;
        let detector = ScriptedDetector::new()
            .then(Vec::new())
            .then(vec![Rect::new(1, 12, 3, 3), Rect::new(4, 4, 2, 2)])
            .then_fail("bad model");
        let mut pipeline = CascadePipeline::new(detector);

        let miss = pipeline.process(&frame);
        assert!(miss.plan.is_empty());
        assert!(miss.alerts.is_empty());

        let hit = pipeline.process(&frame);
        assert_eq!(hit.boxes.len(), 2);
        assert_eq!(hit.alerts.len(), 2);
        assert_eq!(hit.plan.texts(), vec![ANIMAL_LABEL, ANIMAL_LABEL]);
        assert_eq!(hit.plan.boxes[0].label_origin(), (1, 2));

        let failed = pipeline.process(&frame);
        assert!(failed.plan.is_empty());
        assert_eq!(pipeline.failures(), 1);
        assert_eq!(pipeline.detector().calls(), 3);
        Ok(())
    }

    #[test]
    fn quit_keys_include_escape() {
        let options = LoopOptions::default();
        assert!(options.is_quit('q'));
        assert!(options.is_quit(ESCAPE_KEY));
        assert!(!options.is_quit('x'));
    }
}
