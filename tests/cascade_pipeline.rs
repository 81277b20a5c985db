use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use image::{Rgb, RgbImage};

use wildlife_watch::alert::{AlertEmitter, AlertEvent, AlertKind};
use wildlife_watch::detect::ScriptedDetector;
use wildlife_watch::display::DisplaySink;
use wildlife_watch::frame::{Frame, Rect};
use wildlife_watch::ingest::{ImageSequenceSource, SyntheticConfig, SyntheticScene, SyntheticSource};
use wildlife_watch::overlay::{Color, OverlayPlan, ANIMAL_LABEL};
use wildlife_watch::session::{run_cascade, CascadePipeline, LoopOptions, StopReason};

#[derive(Default)]
struct RecordingDisplay {
    plans: Vec<OverlayPlan>,
    closed: bool,
}

impl DisplaySink for RecordingDisplay {
    fn show(&mut self, _frame: &Frame, plan: &OverlayPlan) -> Result<()> {
        self.plans.push(plan.clone());
        Ok(())
    }

    fn poll_key(&mut self, _wait: Duration) -> Result<Option<char>> {
        Ok(None)
    }

    fn is_open(&self) -> bool {
        !self.closed
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[derive(Default)]
struct RecordingEmitter {
    seen: Arc<Mutex<Vec<AlertEvent>>>,
}

impl RecordingEmitter {
    fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

impl AlertEmitter for RecordingEmitter {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn emit(&mut self, event: &AlertEvent) -> Result<()> {
        self.seen.lock().unwrap().push(event.clone());
        Ok(())
    }
}

#[test]
fn hits_are_labelled_and_alerted_misses_are_silent() -> Result<()> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut console = RecordingEmitter {
        seen: Arc::clone(&seen),
    };
    let detector = ScriptedDetector::new()
        .then_nothing(3)
        .then(vec![Rect::new(10, 30, 20, 20), Rect::new(40, 4, 10, 10)])
        .then_nothing(2);
    let mut pipeline = CascadePipeline::new(detector);
    let mut source = SyntheticSource::open(
        SyntheticConfig::new("stub://cascade", 64, 48, SyntheticScene::Static).with_max_frames(6),
    )?;
    let mut display = RecordingDisplay::default();

    let summary = run_cascade(
        &mut source,
        &mut display,
        &mut console,
        &mut pipeline,
        &LoopOptions::default(),
    )?;

    assert_eq!(summary.stop, StopReason::EndOfStream);
    assert_eq!(summary.frames, 6);
    assert_eq!(summary.detection_frames, 1);
    assert_eq!(summary.alerts_raised, 2);
    assert_eq!(pipeline.detector().calls(), 6);

    assert_eq!(display.plans.len(), 6);
    for (i, plan) in display.plans.iter().enumerate() {
        if i == 3 {
            assert_eq!(plan.texts(), vec![ANIMAL_LABEL, ANIMAL_LABEL]);
            assert!(plan.boxes.iter().all(|b| b.color == Color::RED));
            assert_eq!(plan.boxes[0].label_origin(), (10, 20));
            assert_eq!(plan.boxes[1].label_origin(), (40, 0));
        } else {
            assert!(plan.is_empty(), "frame {} should draw nothing", i + 1);
            assert!(plan.texts().is_empty());
        }
    }

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen.iter().all(|e| e.kind == AlertKind::Animal && e.frame_index == 4));
    assert!(display.closed);
    Ok(())
}

#[test]
fn detector_failure_skips_frame() -> Result<()> {
    let mut console = RecordingEmitter::default();
    let detector = ScriptedDetector::new()
        .then_fail("classifier crashed")
        .then(vec![Rect::new(0, 0, 8, 8)]);
    let mut pipeline = CascadePipeline::new(detector);
    let mut source = SyntheticSource::open(
        SyntheticConfig::new("stub://cascade-fail", 32, 24, SyntheticScene::Static)
            .with_max_frames(2),
    )?;
    let mut display = RecordingDisplay::default();

    let summary = run_cascade(
        &mut source,
        &mut display,
        &mut console,
        &mut pipeline,
        &LoopOptions::default(),
    )?;

    assert_eq!(summary.frames, 2);
    assert_eq!(summary.alerts_raised, 1);
    assert_eq!(pipeline.failures(), 1);
    assert!(display.plans[0].is_empty());
    assert_eq!(display.plans[1].boxes.len(), 1);
    assert_eq!(console.count(), 1);
    Ok(())
}

#[test]
fn replays_image_directory() -> Result<()> {
    let dir = tempfile::tempdir()?;
    for (i, level) in [20u8, 120, 220].iter().enumerate() {
        let img = RgbImage::from_pixel(24, 16, Rgb([*level, *level, *level]));
        img.save(dir.path().join(format!("frame_{:03}.png", i)))?;
    }

    let mut console = RecordingEmitter::default();
    let mut pipeline = CascadePipeline::new(ScriptedDetector::new());
    let mut source = ImageSequenceSource::open(dir.path())?;
    let mut display = RecordingDisplay::default();

    let summary = run_cascade(
        &mut source,
        &mut display,
        &mut console,
        &mut pipeline,
        &LoopOptions::default(),
    )?;

    assert_eq!(summary.stop, StopReason::EndOfStream);
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.alerts_raised, 0);
    assert!(display.plans.iter().all(OverlayPlan::is_empty));
    assert_eq!(console.count(), 0);
    Ok(())
}

#[test]
fn every_box_alert_reaches_the_console() -> Result<()> {
    let rects = vec![
        Rect::new(0, 0, 4, 4),
        Rect::new(10, 0, 4, 4),
        Rect::new(20, 0, 4, 4),
        Rect::new(30, 0, 4, 4),
    ];
    let mut detector = ScriptedDetector::new();
    for _ in 0..5 {
        detector = detector.then(rects.clone());
    }
    let mut pipeline = CascadePipeline::new(detector);
    let mut source = SyntheticSource::open(
        SyntheticConfig::new("stub://cascade-burst", 48, 16, SyntheticScene::Static)
            .with_max_frames(5),
    )?;
    let mut display = RecordingDisplay::default();
    let mut console = RecordingEmitter::default();

    let summary = run_cascade(
        &mut source,
        &mut display,
        &mut console,
        &mut pipeline,
        &LoopOptions::default(),
    )?;

    assert_eq!(summary.frames, 5);
    assert_eq!(summary.alerts_raised, 20);
    assert_eq!(console.count(), 20);
    let seen = console.seen.lock().unwrap();
    for frame in 1..=5u64 {
        let per_frame = seen.iter().filter(|e| e.frame_index == frame).count();
        assert_eq!(per_frame, 4, "frame {} lost alerts", frame);
    }
    Ok(())
}
