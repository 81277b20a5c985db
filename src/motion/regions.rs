use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};

use super::mask::Mask;
use crate::frame::Rect;

/// One connected blob of foreground pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CandidateRegion {
    pub bounds: Rect,
    /// Number of foreground pixels in the blob.
    pub area: u64,
}

#[derive(Clone, Copy)]
struct Extent {
    first: u64,
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
    area: u64,
}

/// Extract 8-connected foreground regions, ordered by their first pixel
/// in raster order.
pub fn find_regions(mask: &Mask) -> Vec<CandidateRegion> {
    let (width, _) = mask.dimensions();
    let labels = connected_components(mask.as_image(), Connectivity::Eight, Luma([0u8]));

    let mut extents: Vec<Option<Extent>> = Vec::new();
    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue;
        }
        if extents.len() < label {
            extents.resize(label, None);
        }
        let slot = &mut extents[label - 1];
        match slot {
            Some(extent) => {
                extent.min_x = extent.min_x.min(x);
                extent.min_y = extent.min_y.min(y);
                extent.max_x = extent.max_x.max(x);
                extent.max_y = extent.max_y.max(y);
                extent.area += 1;
            }
            None => {
                *slot = Some(Extent {
                    first: y as u64 * width as u64 + x as u64,
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                    area: 1,
                });
            }
        }
    }

    let mut extents: Vec<Extent> = extents.into_iter().flatten().collect();
    extents.sort_by_key(|extent| extent.first);
    extents
        .into_iter()
        .map(|e| CandidateRegion {
            bounds: Rect::new(e.min_x, e.min_y, e.max_x - e.min_x + 1, e.max_y - e.min_y + 1),
            area: e.area,
        })
        .collect()
}
