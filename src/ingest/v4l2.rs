//! V4L2 camera source.
//!
//! Opens a local device node (e.g. `/dev/video0`), negotiates YUYV or RGB3
//! capture at the configured size, and streams through mmap buffers.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::claim::DeviceClaim;
use super::normalize::{normalize_frame, CaptureFormat};
use super::{FrameSource, SourceStats};
use crate::config::CameraSettings;
use crate::frame::Frame;

pub struct V4l2Source {
    settings: CameraSettings,
    state: Option<V4l2State>,
    format: CaptureFormat,
    active_width: u32,
    active_height: u32,
    frame_count: u64,
    claim: DeviceClaim,
}

#[self_referencing]
struct V4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Source {
    pub fn open(settings: &CameraSettings) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let claim = DeviceClaim::acquire(&settings.device)?;

        let mut device = v4l::Device::with_path(&settings.device)
            .with_context(|| format!("open v4l2 device {}", settings.device))?;
        let mut requested = device.format().context("read v4l2 format")?;
        requested.width = settings.width;
        requested.height = settings.height;
        requested.fourcc = v4l::FourCC::new(b"YUYV");

        let format = match device.set_format(&requested) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "V4l2Source: failed to set format on {}: {}",
                    settings.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        let capture_format = match &format.fourcc.repr {
            b"YUYV" => CaptureFormat::Yuyv,
            b"RGB3" => CaptureFormat::Rgb24,
            other => {
                return Err(anyhow!(
                    "v4l2 device {} delivers unsupported format {}",
                    settings.device,
                    String::from_utf8_lossy(other)
                ))
            }
        };

        if settings.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(settings.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "V4l2Source: failed to set fps on {}: {}",
                    settings.device,
                    err
                );
            }
        }

        let state = V4l2StateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        log::info!(
            "V4l2Source: connected to {} ({}x{}, {:?})",
            settings.device,
            format.width,
            format.height,
            capture_format
        );

        Ok(Self {
            settings: settings.clone(),
            state: Some(state),
            format: capture_format,
            active_width: format.width,
            active_height: format.height,
            frame_count: 0,
            claim,
        })
    }
}

impl FrameSource for V4l2Source {
    fn device(&self) -> &str {
        &self.settings.device
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("v4l2 device not connected")?;
        let buf = state
            .with_mut(|fields| fields.stream.next().map(|(buf, _meta)| buf.to_vec()))
            .context("capture v4l2 frame")?;

        self.frame_count += 1;
        normalize_frame(
            &buf,
            self.active_width,
            self.active_height,
            self.format,
            self.frame_count,
        )
        .map(Some)
    }

    fn is_open(&self) -> bool {
        self.state.is_some()
    }

    fn release(&mut self) {
        if self.state.take().is_some() {
            log::info!(
                "V4l2Source: released {} after {} frames",
                self.settings.device,
                self.frame_count
            );
        }
        self.claim.release();
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.settings.device.clone(),
        }
    }
}

impl Drop for V4l2Source {
    fn drop(&mut self) {
        self.release();
    }
}
