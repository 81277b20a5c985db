//! Frame containers and pixel primitives.
//!
//! - `Frame`: one captured image in its native layout (BGR, RGB or gray).
//! - `GrayFrame`: single-channel 8-bit grid that detectors consume.
//! - `Rect`: axis-aligned box in pixel coordinates.
//!
//! Frames are produced once per camera read and owned by the loop iteration
//! that read them. Only the derived gray buffer flows into detection.

use anyhow::{anyhow, Result};
use image::{imageops, GrayImage, Luma, Rgb, RgbImage};
use imageproc::filter::separable_filter_equal;

/// Pixel layout of a captured frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelLayout {
    /// Three bytes per pixel, blue first (OpenCV native order).
    Bgr24,
    /// Three bytes per pixel, red first (V4L2 RGB3, decoded image files).
    Rgb24,
    /// One byte per pixel.
    Gray8,
}

impl PixelLayout {
    pub fn channels(self) -> usize {
        match self {
            PixelLayout::Bgr24 | PixelLayout::Rgb24 => 3,
            PixelLayout::Gray8 => 1,
        }
    }
}

fn expected_len(width: u32, height: u32, channels: usize) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(channels))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

// ----------------------------------------------------------------------------
// Frame: captured image
// ----------------------------------------------------------------------------

/// One captured image.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    /// Capture sequence number, starting at 1 for each source.
    pub index: u64,
}

impl Frame {
    /// Wrap a packed pixel buffer. The length must match the layout exactly.
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        layout: PixelLayout,
        index: u64,
    ) -> Result<Self> {
        let expected = expected_len(width, height, layout.channels())?;
        if data.len() != expected {
            return Err(anyhow!(
                "{:?} frame length mismatch: expected {}, got {}",
                layout,
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            layout,
            index,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Copy into an `image` RGB buffer.
    pub fn to_rgb_image(&self) -> RgbImage {
        let w = self.width as usize;
        let data = &self.data;
        match self.layout {
            PixelLayout::Rgb24 => RgbImage::from_fn(self.width, self.height, |x, y| {
                let i = (y as usize * w + x as usize) * 3;
                Rgb([data[i], data[i + 1], data[i + 2]])
            }),
            PixelLayout::Bgr24 => RgbImage::from_fn(self.width, self.height, |x, y| {
                let i = (y as usize * w + x as usize) * 3;
                Rgb([data[i + 2], data[i + 1], data[i]])
            }),
            PixelLayout::Gray8 => RgbImage::from_fn(self.width, self.height, |x, y| {
                let v = data[y as usize * w + x as usize];
                Rgb([v, v, v])
            }),
        }
    }

    /// Luma conversion via `image::imageops::grayscale`.
    pub fn to_gray(&self) -> GrayFrame {
        let image = match self.layout {
            PixelLayout::Gray8 => {
                let w = self.width as usize;
                GrayImage::from_fn(self.width, self.height, |x, y| {
                    Luma([self.data[y as usize * w + x as usize]])
                })
            }
            PixelLayout::Bgr24 | PixelLayout::Rgb24 => imageops::grayscale(&self.to_rgb_image()),
        };
        GrayFrame::from_image(image)
    }

    /// Packed BGR bytes regardless of the native layout.
    pub fn to_bgr_bytes(&self) -> Vec<u8> {
        match self.layout {
            PixelLayout::Bgr24 => self.data.clone(),
            PixelLayout::Rgb24 => self
                .data
                .chunks_exact(3)
                .flat_map(|px| [px[2], px[1], px[0]])
                .collect(),
            PixelLayout::Gray8 => self.data.iter().flat_map(|&v| [v, v, v]).collect(),
        }
    }
}

// ----------------------------------------------------------------------------
// GrayFrame: single-channel grid
// ----------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayFrame {
    image: GrayImage,
    pub width: u32,
    pub height: u32,
}

impl GrayFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = expected_len(width, height, 1)?;
        if data.len() != expected {
            return Err(anyhow!(
                "gray frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        let image = GrayImage::from_raw(width, height, data)
            .ok_or_else(|| anyhow!("gray frame buffer too small for {}x{}", width, height))?;
        Ok(Self::from_image(image))
    }

    pub(crate) fn from_image(image: GrayImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            image,
            width,
            height,
        }
    }

    /// Uniform frame, mostly for tests and synthetic scenes.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self::from_image(GrayImage::from_pixel(width, height, Luma([value])))
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.image
    }

    pub fn as_slice(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.image.get_pixel(x, y)[0]
    }

    /// Separable Gaussian blur with an odd `kernel` size; edges are clamped.
    ///
    /// A kernel of 1 returns a copy.
    pub fn gaussian_blur(&self, kernel: u32) -> Result<GrayFrame> {
        if kernel == 0 || kernel % 2 == 0 {
            return Err(anyhow!("blur kernel must be odd, got {}", kernel));
        }
        if kernel == 1 || self.width == 0 || self.height == 0 {
            return Ok(self.clone());
        }
        let weights = gaussian_weights(kernel);
        Ok(Self::from_image(separable_filter_equal(&self.image, &weights)))
    }
}

/// Normalized 1-D Gaussian weights; sigma follows OpenCV's default for a
/// given kernel size.
fn gaussian_weights(kernel: u32) -> Vec<f32> {
    let sigma = 0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let radius = (kernel / 2) as i32;
    let mut weights: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

// ----------------------------------------------------------------------------
// Rect
// ----------------------------------------------------------------------------

/// Axis-aligned box in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
