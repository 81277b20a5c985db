use std::time::Duration;

use anyhow::{anyhow, Result};

use wildlife_watch::config::{CameraSettings, MotionSettings};
use wildlife_watch::display::{DisplaySink, ESCAPE_KEY};
use wildlife_watch::frame::{Frame, PixelLayout};
use wildlife_watch::ingest::{
    is_claimed, open_source, DeviceClaim, FrameSource, SourceStats, SyntheticConfig,
    SyntheticScene, SyntheticSource,
};
use wildlife_watch::overlay::OverlayPlan;
use wildlife_watch::session::{run_motion, LoopOptions, StopReason};
use wildlife_watch::{AlertDispatcher, MotionDetector};

/// Display that presses `key` after `after` frames.
struct KeyPressDisplay {
    key: char,
    after: u64,
    shown: u64,
    open: bool,
    fail_render: bool,
}

impl KeyPressDisplay {
    fn new(key: char, after: u64) -> Self {
        Self {
            key,
            after,
            shown: 0,
            open: true,
            fail_render: false,
        }
    }
}

impl DisplaySink for KeyPressDisplay {
    fn show(&mut self, _frame: &Frame, _plan: &OverlayPlan) -> Result<()> {
        if self.fail_render {
            return Err(anyhow!("window vanished"));
        }
        self.shown += 1;
        Ok(())
    }

    fn poll_key(&mut self, _wait: Duration) -> Result<Option<char>> {
        Ok((self.shown >= self.after).then_some(self.key))
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Source whose reads start failing after a few frames.
struct FlakySource {
    claim: DeviceClaim,
    good_frames: u64,
    served: u64,
}

impl FrameSource for FlakySource {
    fn device(&self) -> &str {
        "flaky://camera"
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.served >= self.good_frames {
            return Err(anyhow!("usb disconnect"));
        }
        self.served += 1;
        Frame::new(vec![50u8; 16 * 12], 16, 12, PixelLayout::Gray8, self.served).map(Some)
    }

    fn is_open(&self) -> bool {
        self.claim.is_held()
    }

    fn release(&mut self) {
        self.claim.release();
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.served,
            device: self.device().to_string(),
        }
    }
}

fn settings(device: &str) -> CameraSettings {
    CameraSettings {
        device: device.to_string(),
        width: 32,
        height: 24,
        target_fps: 30,
    }
}

fn detector() -> MotionDetector {
    MotionDetector::new(MotionSettings {
        blur_kernel: 5,
        min_area: 20,
        ..MotionSettings::default()
    })
    .expect("motion detector")
}

#[test]
fn quit_key_releases_camera_and_window() -> Result<()> {
    let camera = settings("stub://wanderer");
    let alerts = AlertDispatcher::new(Vec::new(), 4)?;
    let mut display = KeyPressDisplay::new('q', 5);
    let mut source = open_source(&camera)?;

    let summary = run_motion(
        source.as_mut(),
        &mut display,
        &alerts,
        &mut detector(),
        &LoopOptions::default(),
    )?;

    assert_eq!(summary.stop, StopReason::QuitKey);
    assert_eq!(summary.frames, 5);
    assert!(!source.is_open());
    assert!(!display.is_open());
    assert!(!is_claimed("stub://wanderer"));

    // Same device opens again in the same process.
    let mut again = open_source(&camera)?;
    assert!(again.next_frame()?.is_some());
    Ok(())
}

#[test]
fn escape_also_quits() -> Result<()> {
    let alerts = AlertDispatcher::new(Vec::new(), 4)?;
    let mut display = KeyPressDisplay::new(ESCAPE_KEY, 2);
    let mut source = SyntheticSource::open(SyntheticConfig::new(
        "stub://escape",
        32,
        24,
        SyntheticScene::Static,
    ))?;
    let summary = run_motion(
        &mut source,
        &mut display,
        &alerts,
        &mut detector(),
        &LoopOptions::default(),
    )?;
    assert_eq!(summary.stop, StopReason::QuitKey);
    assert_eq!(summary.frames, 2);
    Ok(())
}

#[test]
fn other_keys_do_not_quit() -> Result<()> {
    let alerts = AlertDispatcher::new(Vec::new(), 4)?;
    let mut display = KeyPressDisplay::new('x', 1);
    let mut source = open_source(&settings("stub://static?frames=4"))?;
    let summary = run_motion(
        source.as_mut(),
        &mut display,
        &alerts,
        &mut detector(),
        &LoopOptions::default(),
    )?;
    assert_eq!(summary.stop, StopReason::EndOfStream);
    assert_eq!(summary.frames, 4);
    assert!(!display.is_open());
    assert!(!is_claimed("stub://static?frames=4"));
    Ok(())
}

#[test]
fn busy_camera_fails_startup_until_released() -> Result<()> {
    let camera = settings("stub://intruder?frames=3");
    let holder = open_source(&camera)?;

    let err = open_source(&camera).err().expect("second open must fail");
    assert!(err.to_string().contains("already in use"));

    drop(holder);
    assert!(!is_claimed("stub://intruder?frames=3"));
    let mut reopened = open_source(&camera)?;
    assert!(reopened.next_frame()?.is_some());
    Ok(())
}

#[test]
fn read_failure_stops_cleanly() -> Result<()> {
    let alerts = AlertDispatcher::new(Vec::new(), 4)?;
    let mut display = KeyPressDisplay::new('q', u64::MAX);
    let mut source = FlakySource {
        claim: DeviceClaim::acquire("flaky://camera")?,
        good_frames: 3,
        served: 0,
    };

    let summary = run_motion(
        &mut source,
        &mut display,
        &alerts,
        &mut detector(),
        &LoopOptions::default(),
    )?;

    assert_eq!(summary.frames, 3);
    match summary.stop {
        StopReason::ReadFailure(reason) => assert!(reason.contains("usb disconnect")),
        other => panic!("unexpected stop {:?}", other),
    }
    assert!(!is_claimed("flaky://camera"));
    assert!(!display.is_open());
    Ok(())
}

#[test]
fn render_error_still_releases() -> Result<()> {
    let alerts = AlertDispatcher::new(Vec::new(), 4)?;
    let mut display = KeyPressDisplay::new('q', u64::MAX);
    display.fail_render = true;
    let mut source = SyntheticSource::open(SyntheticConfig::new(
        "stub://render-error",
        32,
        24,
        SyntheticScene::Static,
    ))?;

    let result = run_motion(
        &mut source,
        &mut display,
        &alerts,
        &mut detector(),
        &LoopOptions::default(),
    );

    let err = result.expect_err("render failure must surface");
    assert!(format!("{:#}", err).contains("window vanished"));
    assert!(!source.is_open());
    assert!(!display.is_open());
    assert!(!is_claimed("stub://render-error"));
    Ok(())
}
