use image::GrayImage;
use imageproc::contrast::threshold;
use imageproc::distance_transform::Norm;
use imageproc::morphology::dilate;

use crate::frame::GrayFrame;

/// Binary foreground mask: 255 marks a changed pixel, 0 background.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    image: GrayImage,
}

impl Mask {
    /// Foreground where `diff > level`.
    pub fn threshold(diff: &GrayFrame, level: u8) -> Self {
        Self {
            image: threshold(diff.as_image(), level),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub(crate) fn as_image(&self) -> &GrayImage {
        &self.image
    }

    /// Grow foreground by a 3x3 square `iterations` times.
    ///
    /// Repeated 3x3 dilation equals one dilation by a square of radius
    /// `iterations` (L-infinity norm).
    pub fn dilate(&self, iterations: u32) -> Mask {
        if iterations == 0 {
            return self.clone();
        }
        let radius = u8::try_from(iterations).unwrap_or(u8::MAX);
        Mask {
            image: dilate(&self.image, Norm::LInf, radius),
        }
    }
}

#[cfg(test)]
impl Mask {
    pub(crate) fn from_rows(rows: &[&str]) -> Mask {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |row| row.len()) as u32;
        let image = GrayImage::from_fn(width, height, |x, y| {
            let hit = rows[y as usize].as_bytes()[x as usize] == b'#';
            image::Luma([if hit { 255 } else { 0 }])
        });
        Mask { image }
    }

    fn get(&self, x: u32, y: u32) -> bool {
        self.image.get_pixel(x, y)[0] != 0
    }

    fn count(&self) -> usize {
        self.image.pixels().filter(|px| px[0] != 0).count()
    }
}
