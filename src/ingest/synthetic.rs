//! Synthetic frame source (`stub://` devices).
//!
//! Generates camera-shaped BGR frames from a small scene script so the
//! pipelines can run without hardware. URL form:
//! `stub://<scene>[?frames=N&noise=M]` where scene is `static`,
//! `wanderer` or `intruder`.

use anyhow::{anyhow, Result};
use rand::Rng;
use std::ops::Range;

use super::claim::DeviceClaim;
use super::{FrameSource, SourceStats};
use crate::frame::{Frame, PixelLayout, Rect};

const BACKGROUND_LEVEL: u8 = 60;
const OBJECT_LEVEL: u8 = 210;
const WANDER_PERIOD: u64 = 50;

/// Configuration for a synthetic source.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub scene: SyntheticScene,
    /// End of stream after this many frames; `None` runs forever.
    pub max_frames: Option<u64>,
    /// Maximum per-pixel sensor noise added to every frame.
    pub noise: u8,
}

/// What the synthetic camera looks at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyntheticScene {
    /// Empty, unchanging background.
    Static,
    /// A block crosses the frame for half of every 50-frame period.
    Wanderer,
    /// Explicit objects, each visible over a frame range (1-based indices).
    Scripted(Vec<SceneObject>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneObject {
    pub frames: Range<u64>,
    pub rect: Rect,
    pub level: u8,
}

impl SyntheticConfig {
    pub fn new(device: &str, width: u32, height: u32, scene: SyntheticScene) -> Self {
        Self {
            device: device.to_string(),
            width,
            height,
            scene,
            max_frames: None,
            noise: 0,
        }
    }

    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    pub fn with_noise(mut self, noise: u8) -> Self {
        self.noise = noise;
        self
    }

    /// Parse a `stub://` URL.
    pub fn from_url(url: &str, width: u32, height: u32) -> Result<Self> {
        let rest = url
            .strip_prefix("stub://")
            .ok_or_else(|| anyhow!("synthetic device must start with stub://, got {}", url))?;
        let (scene_name, query) = match rest.split_once('?') {
            Some((scene, query)) => (scene, Some(query)),
            None => (rest, None),
        };

        let scene = match scene_name {
            "" | "static" => SyntheticScene::Static,
            "wanderer" => SyntheticScene::Wanderer,
            "intruder" => SyntheticScene::Scripted(vec![SceneObject {
                frames: 10..40,
                rect: Rect::new(width / 4, height / 4, width / 3, height / 3),
                level: OBJECT_LEVEL,
            }]),
            other => return Err(anyhow!("unknown synthetic scene '{}'", other)),
        };

        let mut cfg = Self::new(url, width, height, scene);
        for pair in query.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| anyhow!("malformed stub query parameter '{}'", pair))?;
            match key {
                "frames" => {
                    cfg.max_frames = Some(
                        value
                            .parse()
                            .map_err(|_| anyhow!("frames must be an integer"))?,
                    )
                }
                "noise" => {
                    cfg.noise = value
                        .parse()
                        .map_err(|_| anyhow!("noise must be 0-255"))?
                }
                other => return Err(anyhow!("unknown stub query parameter '{}'", other)),
            }
        }
        Ok(cfg)
    }
}

/// Synthetic frame source.
pub struct SyntheticSource {
    config: SyntheticConfig,
    claim: DeviceClaim,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn open(config: SyntheticConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(anyhow!("synthetic frame size must be non-zero"));
        }
        let claim = DeviceClaim::acquire(&config.device)?;
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            config.device,
            config.width,
            config.height
        );
        Ok(Self {
            config,
            claim,
            frame_count: 0,
        })
    }

    fn objects_at(&self, index: u64) -> Vec<Rect> {
        match &self.config.scene {
            SyntheticScene::Static => Vec::new(),
            SyntheticScene::Wanderer => {
                let phase = index % WANDER_PERIOD;
                if phase < WANDER_PERIOD / 2 {
                    return Vec::new();
                }
                let size = (self.config.width.min(self.config.height) / 4).max(1);
                let travel = self.config.width.saturating_sub(size);
                let step = phase - WANDER_PERIOD / 2;
                let x = (travel as u64 * step / (WANDER_PERIOD / 2)) as u32;
                let y = (self.config.height - size) / 2;
                vec![Rect::new(x, y, size, size)]
            }
            SyntheticScene::Scripted(objects) => objects
                .iter()
                .filter(|obj| obj.frames.contains(&index))
                .map(|obj| obj.rect)
                .collect(),
        }
    }

    fn object_level(&self, rect: &Rect) -> u8 {
        match &self.config.scene {
            SyntheticScene::Scripted(objects) => objects
                .iter()
                .find(|obj| obj.rect == *rect)
                .map(|obj| obj.level)
                .unwrap_or(OBJECT_LEVEL),
            _ => OBJECT_LEVEL,
        }
    }

    fn render(&self, index: u64) -> Vec<u8> {
        let w = self.config.width;
        let h = self.config.height;
        let mut gray = vec![BACKGROUND_LEVEL; (w * h) as usize];

        for rect in self.objects_at(index) {
            let level = self.object_level(&rect);
            for y in rect.y..rect.bottom().min(h) {
                for x in rect.x..rect.right().min(w) {
                    gray[(y * w + x) as usize] = level;
                }
            }
        }

        if self.config.noise > 0 {
            let mut rng = rand::thread_rng();
            for px in &mut gray {
                *px = px.saturating_add(rng.gen_range(0..=self.config.noise));
            }
        }

        gray.iter().flat_map(|&v| [v, v, v]).collect()
    }
}

impl FrameSource for SyntheticSource {
    fn device(&self) -> &str {
        &self.config.device
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.claim.is_held() {
            return Err(anyhow!("synthetic source {} was released", self.config.device));
        }
        if self
            .config
            .max_frames
            .is_some_and(|max| self.frame_count >= max)
        {
            return Ok(None);
        }
        self.frame_count += 1;
        let pixels = self.render(self.frame_count);
        Frame::new(
            pixels,
            self.config.width,
            self.config.height,
            PixelLayout::Bgr24,
            self.frame_count,
        )
        .map(Some)
    }

    fn is_open(&self) -> bool {
        self.claim.is_held()
    }

    fn release(&mut self) {
        if self.claim.is_held() {
            self.claim.release();
            log::info!(
                "SyntheticSource: released {} after {} frames",
                self.config.device,
                self.frame_count
            );
        }
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}

impl Drop for SyntheticSource {
    fn drop(&mut self) {
        self.release();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
