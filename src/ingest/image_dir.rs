//! Image-sequence frame source.
//!
//! Replays the still images in a local directory, in file-name order, as
//! if they came from a camera. Decoding goes through the `image` crate;
//! files it cannot identify as images are skipped at open time.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use super::claim::DeviceClaim;
use super::{FrameSource, SourceStats};
use crate::frame::{Frame, PixelLayout};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

pub struct ImageSequenceSource {
    device: String,
    files: Vec<PathBuf>,
    position: usize,
    claim: DeviceClaim,
}

impl ImageSequenceSource {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("read image directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(anyhow!("no images found in {}", dir.display()));
        }

        let device = dir.display().to_string();
        let claim = DeviceClaim::acquire(&device)?;
        log::info!(
            "ImageSequenceSource: connected to {} ({} images)",
            device,
            files.len()
        );
        Ok(Self {
            device,
            files,
            position: 0,
            claim,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

impl FrameSource for ImageSequenceSource {
    fn device(&self) -> &str {
        &self.device
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.claim.is_held() {
            return Err(anyhow!("image source {} was released", self.device));
        }
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        let rgb = image::open(path)
            .with_context(|| format!("decode image {}", path.display()))?
            .to_rgb8();
        self.position += 1;
        let (width, height) = rgb.dimensions();
        Frame::new(
            rgb.into_raw(),
            width,
            height,
            PixelLayout::Rgb24,
            self.position as u64,
        )
        .map(Some)
    }

    fn is_open(&self) -> bool {
        self.claim.is_held()
    }

    fn release(&mut self) {
        if self.claim.is_held() {
            self.claim.release();
            log::info!("ImageSequenceSource: released {}", self.device);
        }
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.position as u64,
            device: self.device.clone(),
        }
    }
}

impl Drop for ImageSequenceSource {
    fn drop(&mut self) {
        self.release();
    }
}
