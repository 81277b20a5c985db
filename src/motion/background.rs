use anyhow::{anyhow, Result};
use image::{GrayImage, Luma};
use imageproc::map::map_colors2;

use crate::frame::GrayFrame;

/// Slowly-adapting estimate of the static scene.
///
/// The model is seeded from the first observed frame and then blended
/// toward every subsequent frame with an exponential moving average.
/// Gradual lighting drift is absorbed; fast changes lag behind and show
/// up in the difference.
#[derive(Debug)]
pub struct BackgroundModel {
    adapt_rate: f32,
    state: Option<ModelGrid>,
}

#[derive(Debug)]
struct ModelGrid {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

/// Outcome of feeding one frame into the model.
#[derive(Debug)]
pub enum BackgroundUpdate {
    /// No model existed; it now equals this frame.
    Seeded,
    /// The frame size changed; the old model was discarded and re-seeded.
    Reseeded { previous: (u32, u32) },
    /// The model was blended and `diff` holds `|frame - background|`.
    Updated { diff: GrayFrame },
}

impl BackgroundModel {
    /// `adapt_rate` must lie strictly between 0 and 1.
    pub fn new(adapt_rate: f32) -> Result<Self> {
        if !(adapt_rate > 0.0 && adapt_rate < 1.0) {
            return Err(anyhow!(
                "adapt_rate must be in (0, 1), got {}",
                adapt_rate
            ));
        }
        Ok(Self {
            adapt_rate,
            state: None,
        })
    }

    /// Dimensions of the current model, if seeded.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.state.as_ref().map(|grid| (grid.width, grid.height))
    }

    /// Blend `frame` into the model and return the difference against the
    /// updated background.
    pub fn observe(&mut self, frame: &GrayFrame) -> BackgroundUpdate {
        let dims = frame.dimensions();
        match &mut self.state {
            None => {
                self.state = Some(ModelGrid::seed(frame));
                BackgroundUpdate::Seeded
            }
            Some(grid) if (grid.width, grid.height) != dims => {
                let previous = (grid.width, grid.height);
                *grid = ModelGrid::seed(frame);
                BackgroundUpdate::Reseeded { previous }
            }
            Some(grid) => {
                let keep = 1.0 - self.adapt_rate;
                for (bg, &px) in grid.values.iter_mut().zip(frame.as_slice()) {
                    *bg = *bg * keep + px as f32 * self.adapt_rate;
                }
                let reference = grid.to_image();
                let diff = map_colors2(frame.as_image(), &reference, |px, bg| {
                    Luma([px[0].abs_diff(bg[0])])
                });
                BackgroundUpdate::Updated {
                    diff: GrayFrame::from_image(diff),
                }
            }
        }
    }
}

#[cfg(test)]
impl BackgroundModel {
    fn is_seeded(&self) -> bool {
        self.state.is_some()
    }

    fn value_at(&self, x: u32, y: u32) -> Option<f32> {
        self.state
            .as_ref()
            .map(|grid| grid.values[y as usize * grid.width as usize + x as usize])
    }
}

impl ModelGrid {
    fn seed(frame: &GrayFrame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            values: frame.as_slice().iter().map(|&v| v as f32).collect(),
        }
    }

    /// Model rounded and saturated to 8 bits.
    fn to_image(&self) -> GrayImage {
        let width = self.width as usize;
        GrayImage::from_fn(self.width, self.height, |x, y| {
            let value = self.values[y as usize * width + x as usize];
            Luma([value.round().clamp(0.0, 255.0) as u8])
        })
    }
}
