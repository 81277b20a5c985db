//! Frame ingestion sources.
//!
//! This module provides the sources a pipeline can read frames from:
//! - Synthetic scenes (`stub://<scene>`, testing and demos)
//! - Directories of still images (replay)
//! - USB/V4L2 devices (feature: camera-v4l2)
//! - OpenCV cameras by numeric index (feature: vision-opencv)
//!
//! A numeric index opens through OpenCV when it is built in. Otherwise, with
//! only camera-v4l2, index `N` opens `/dev/videoN`.
//!
//! Every source holds an exclusive `DeviceClaim` for its device. Releasing
//! the source (explicitly or by drop) frees the device so it can be opened
//! again in the same process.

mod claim;
pub mod image_dir;
#[cfg(feature = "camera-v4l2")]
mod normalize;
#[cfg(feature = "vision-opencv")]
pub mod cv_camera;
pub mod synthetic;
#[cfg(feature = "camera-v4l2")]
pub mod v4l2;

use anyhow::{anyhow, Result};
use std::path::Path;

use crate::config::CameraSettings;
use crate::frame::Frame;

pub use claim::{is_claimed, DeviceClaim};
pub use image_dir::ImageSequenceSource;
#[cfg(feature = "vision-opencv")]
pub use cv_camera::OpencvCamera;
pub use synthetic::{SceneObject, SyntheticConfig, SyntheticScene, SyntheticSource};
#[cfg(feature = "camera-v4l2")]
pub use v4l2::V4l2Source;

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub device: String,
}

/// A camera-like producer of frames.
pub trait FrameSource {
    /// Device identifier this source holds.
    fn device(&self) -> &str;

    /// Next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// True until `release` runs.
    fn is_open(&self) -> bool;

    /// Release the device. Idempotent.
    fn release(&mut self);

    fn stats(&self) -> SourceStats;
}

/// Open the source named by `settings.device`.
///
/// - `stub://...` opens a synthetic scene
/// - an existing directory replays its images
/// - `/dev/video*` opens a V4L2 device
/// - an integer opens an OpenCV camera index, or `/dev/videoN` without OpenCV
pub fn open_source(settings: &CameraSettings) -> Result<Box<dyn FrameSource>> {
    let device = settings.device.as_str();
    if device.starts_with("stub://") {
        let config = SyntheticConfig::from_url(device, settings.width, settings.height)?;
        return Ok(Box::new(SyntheticSource::open(config)?));
    }
    if Path::new(device).is_dir() {
        return Ok(Box::new(ImageSequenceSource::open(device)?));
    }
    if device.starts_with("/dev/video") {
        return open_v4l2(settings);
    }
    if device.parse::<i32>().is_ok() {
        return open_index(settings);
    }
    Err(anyhow!("unrecognized camera device '{}'", device))
}

#[cfg(feature = "camera-v4l2")]
fn open_v4l2(settings: &CameraSettings) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(V4l2Source::open(settings)?))
}

#[cfg(not(feature = "camera-v4l2"))]
fn open_v4l2(settings: &CameraSettings) -> Result<Box<dyn FrameSource>> {
    Err(anyhow!(
        "camera {} requires the camera-v4l2 feature",
        settings.device
    ))
}

/// V4L2 node for a numeric camera index, e.g. `2` -> `/dev/video2`.
pub fn v4l2_path_for_index(device: &str) -> Option<String> {
    device
        .parse::<u32>()
        .ok()
        .map(|index| format!("/dev/video{}", index))
}

#[cfg(feature = "vision-opencv")]
fn open_index(settings: &CameraSettings) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(OpencvCamera::open(settings)?))
}

#[cfg(all(not(feature = "vision-opencv"), feature = "camera-v4l2"))]
fn open_index(settings: &CameraSettings) -> Result<Box<dyn FrameSource>> {
    let path = v4l2_path_for_index(&settings.device)
        .ok_or_else(|| anyhow!("camera index {} has no V4L2 device", settings.device))?;
    log::info!("camera index {} mapped to {}", settings.device, path);
    let mapped = CameraSettings {
        device: path,
        ..settings.clone()
    };
    open_v4l2(&mapped)
}

#[cfg(all(not(feature = "vision-opencv"), not(feature = "camera-v4l2")))]
fn open_index(settings: &CameraSettings) -> Result<Box<dyn FrameSource>> {
    Err(anyhow!(
        "camera index {} requires the camera-v4l2 or vision-opencv feature",
        settings.device
    ))
}
