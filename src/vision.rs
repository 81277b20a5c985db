//! Conversions between crate frames and OpenCV `Mat`s.

use anyhow::{anyhow, Result};
use opencv::{core::Mat, prelude::*};

use crate::frame::{Frame, GrayFrame, PixelLayout, Rect};

/// Copy a BGR (3-channel) or gray (1-channel) 8-bit `Mat` into a `Frame`.
pub(crate) fn frame_from_mat(mat: &Mat, index: u64) -> Result<Frame> {
    let width = u32::try_from(mat.cols())?;
    let height = u32::try_from(mat.rows())?;
    let layout = match mat.channels() {
        3 => PixelLayout::Bgr24,
        1 => PixelLayout::Gray8,
        n => return Err(anyhow!("unsupported Mat with {} channels", n)),
    };
    let data = if mat.is_continuous() {
        mat.data_bytes()?.to_vec()
    } else {
        mat.try_clone()?.data_bytes()?.to_vec()
    };
    Frame::new(data, width, height, layout, index)
}

/// Owned 3-channel BGR `Mat` for drawing and display.
pub(crate) fn bgr_mat_from_frame(frame: &Frame) -> Result<Mat> {
    let bytes = frame.to_bgr_bytes();
    let flat = Mat::from_slice(&bytes)?;
    let shaped = flat.reshape(3, frame.height as i32)?;
    Ok(shaped.try_clone()?)
}

/// Owned single-channel `Mat` for classifiers.
pub(crate) fn gray_mat(gray: &GrayFrame) -> Result<Mat> {
    let flat = Mat::from_slice(gray.as_slice())?;
    let shaped = flat.reshape(1, gray.height as i32)?;
    Ok(shaped.try_clone()?)
}

pub(crate) fn to_cv_rect(rect: &Rect) -> opencv::core::Rect {
    opencv::core::Rect::new(
        rect.x as i32,
        rect.y as i32,
        rect.width as i32,
        rect.height as i32,
    )
}

/// Clamp a classifier rect into frame coordinates.
pub(crate) fn from_cv_rect(rect: &opencv::core::Rect) -> Rect {
    Rect::new(
        rect.x.max(0) as u32,
        rect.y.max(0) as u32,
        rect.width.max(0) as u32,
        rect.height.max(0) as u32,
    )
}
