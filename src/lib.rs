//! Wildlife Watch
//!
//! Watches a camera and flags animals or motion in the scene.
//!
//! # Pipelines
//!
//! 1. **Cascade**: each grayscale frame goes through a pretrained Haar
//!    cascade; every hit gets a red box, an `Animal Detected!` label and a
//!    console alert.
//! 2. **Motion**: frames are blurred and compared against an exponentially
//!    smoothed background. Changed regions larger than `min_area` are boxed,
//!    and an alert fires once at the start of each detection episode.
//!
//! # Module Structure
//!
//! - `frame`: Frame buffers, grayscale conversion and blur
//! - `ingest`: Frame sources (synthetic, image directories, V4L2, OpenCV)
//! - `motion`: Background model, threshold, regions, area filter, debounce
//! - `detect`: Object detectors for the cascade pipeline
//! - `overlay`: What gets drawn on a frame
//! - `display`: Preview window or headless sink
//! - `alert`: Non-blocking alert dispatch
//! - `session`: Capture loops tying the pieces together
//! - `config`: File and environment configuration
//!
//! # Features
//!
//! The default build has no live camera. It runs on `stub://` scenes and
//! image directories, which is what the test suite uses. Reading a real
//! camera needs one of:
//!
//! - `camera-v4l2`: `/dev/videoN` devices; a bare index `N` opens `/dev/videoN`
//! - `vision-opencv`: OpenCV capture by index, the Haar cascade and the
//!   preview window (needs system OpenCV)
//!
//! ```text
//! cargo run --features camera-v4l2 --bin motion_watch            # camera 0
//! cargo run --features vision-opencv --bin cascade_watch -- --camera 0
//! ```
//!
//! `cascade_watch` always requires `vision-opencv` because the cascade
//! classifier comes from OpenCV. Without it the binary exits with an error
//! before touching the camera.

pub mod alert;
pub mod config;
pub mod detect;
pub mod display;
pub mod frame;
pub mod ingest;
pub mod motion;
pub mod overlay;
pub mod session;
#[cfg(feature = "vision-opencv")]
mod vision;

pub use alert::{AlertDispatcher, AlertEmitter, AlertEvent, AlertKind};
pub use config::{
    AlertSettings, CameraSettings, CascadeSettings, DisplaySettings, MotionSettings, WatchConfig,
};
pub use detect::{ObjectDetector, ScriptedDetector};
pub use display::{open_display, DisplaySink, HeadlessDisplay};
pub use frame::{Frame, GrayFrame, PixelLayout, Rect};
pub use ingest::{open_source, FrameSource};
pub use motion::{AlertState, MotionDecision, MotionDetector, MotionPhase};
pub use overlay::{OverlayPlan, ANIMAL_LABEL, MOTION_LABEL};
pub use session::{
    run_cascade, run_motion, CascadePipeline, LoopOptions, SessionSummary, Shutdown, StopReason,
};

#[cfg(feature = "vision-opencv")]
pub use detect::HaarCascade;
