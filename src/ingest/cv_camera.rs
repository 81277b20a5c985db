//! OpenCV camera source for numeric device indices.

use anyhow::{anyhow, Context, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture},
};

use super::claim::DeviceClaim;
use super::{FrameSource, SourceStats};
use crate::config::CameraSettings;
use crate::frame::Frame;
use crate::vision::frame_from_mat;

pub struct OpencvCamera {
    device: String,
    capture: VideoCapture,
    frame: Mat,
    frame_count: u64,
    claim: DeviceClaim,
}

impl OpencvCamera {
    pub fn open(settings: &CameraSettings) -> Result<Self> {
        let index: i32 = settings
            .device
            .parse()
            .map_err(|_| anyhow!("camera index must be an integer, got {}", settings.device))?;
        let claim = DeviceClaim::acquire(&settings.device)?;

        let mut capture = VideoCapture::new(index, videoio::CAP_ANY)
            .with_context(|| format!("open camera {}", index))?;
        if !capture.is_opened()? {
            return Err(anyhow!("failed to open camera {}", index));
        }
        let _ = capture.set(videoio::CAP_PROP_FRAME_WIDTH, settings.width as f64);
        let _ = capture.set(videoio::CAP_PROP_FRAME_HEIGHT, settings.height as f64);
        let _ = capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0);
        if settings.target_fps > 0 {
            let _ = capture.set(videoio::CAP_PROP_FPS, settings.target_fps as f64);
        }

        log::info!(
            "OpencvCamera: connected to camera {} ({}x{})",
            index,
            capture.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0),
            capture.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0)
        );

        Ok(Self {
            device: settings.device.clone(),
            capture,
            frame: Mat::default(),
            frame_count: 0,
            claim,
        })
    }
}

impl FrameSource for OpencvCamera {
    fn device(&self) -> &str {
        &self.device
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.claim.is_held() {
            return Err(anyhow!("camera {} was released", self.device));
        }
        let ok = self
            .capture
            .read(&mut self.frame)
            .context("read camera frame")?;
        if !ok || self.frame.empty() {
            return Ok(None);
        }
        self.frame_count += 1;
        frame_from_mat(&self.frame, self.frame_count).map(Some)
    }

    fn is_open(&self) -> bool {
        self.claim.is_held()
    }

    fn release(&mut self) {
        if !self.claim.is_held() {
            return;
        }
        if let Err(err) = self.capture.release() {
            log::warn!("OpencvCamera: release of camera {} failed: {}", self.device, err);
        }
        self.claim.release();
        log::info!(
            "OpencvCamera: released camera {} after {} frames",
            self.device,
            self.frame_count
        );
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.device.clone(),
        }
    }
}

impl Drop for OpencvCamera {
    fn drop(&mut self) {
        self.release();
    }
}
