use anyhow::{anyhow, Result};

use crate::frame::{Frame, PixelLayout};

/// Capture formats the V4L2 source negotiates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CaptureFormat {
    Rgb24,
    Yuyv,
}

/// Turn a captured buffer into a `Frame`.
pub(crate) fn normalize_frame(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: CaptureFormat,
    index: u64,
) -> Result<Frame> {
    match format {
        CaptureFormat::Rgb24 => {
            Frame::new(pixels.to_vec(), width, height, PixelLayout::Rgb24, index)
        }
        CaptureFormat::Yuyv => {
            let bgr = yuyv_to_bgr(pixels, width, height)?;
            Frame::new(bgr, width, height, PixelLayout::Bgr24, index)
        }
    }
}

/// Packed 4:2:2 (Y0 U Y1 V) to BGR.
fn yuyv_to_bgr(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    if width % 2 != 0 {
        return Err(anyhow!("YUYV frames need an even width, got {}", width));
    }
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(2))
        .ok_or_else(|| anyhow!("YUYV frame dimensions overflow"))?;
    // Drivers may pad the last buffer; only the exact prefix is used.
    if pixels.len() < expected {
        return Err(anyhow!(
            "YUYV frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut bgr = Vec::with_capacity(width as usize * height as usize * 3);
    for quad in pixels[..expected].chunks_exact(4) {
        let u = quad[1] as f32 - 128.0;
        let v = quad[3] as f32 - 128.0;
        for y in [quad[0], quad[2]] {
            let y = y as f32;
            let r = y + 1.402_f32 * v;
            let g = y - 0.344_136_f32 * u - 0.714_136_f32 * v;
            let b = y + 1.772_f32 * u;
            bgr.push(clamp_to_u8(b));
            bgr.push(clamp_to_u8(g));
            bgr.push(clamp_to_u8(r));
        }
    }
    Ok(bgr)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
