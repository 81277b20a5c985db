//! What to draw on top of a frame.
//!
//! Pipelines build an `OverlayPlan` from their decisions; display sinks
//! turn it into pixels. Keeping the plan as data lets tests check exactly
//! what would be rendered without opening a window.

use crate::frame::Rect;

pub const ANIMAL_LABEL: &str = "Animal Detected!";
pub const MOTION_LABEL: &str = "Motion Detected!";

/// Vertical gap between a box's top edge and its label baseline.
pub const LABEL_OFFSET: u32 = 10;

/// BGR color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

impl Color {
    pub const RED: Color = Color { b: 0, g: 0, r: 255 };
    pub const GREEN: Color = Color { b: 0, g: 255, r: 0 };
}

/// A box with an optional label above it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayBox {
    pub rect: Rect,
    pub label: Option<String>,
    pub color: Color,
}

impl OverlayBox {
    /// Label anchor: `LABEL_OFFSET` above the box, clamped to the top edge.
    pub fn label_origin(&self) -> (u32, u32) {
        (self.rect.x, self.rect.y.saturating_sub(LABEL_OFFSET))
    }
}

/// Text pinned to the top-left corner of the frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Banner {
    pub text: String,
    pub color: Color,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverlayPlan {
    pub boxes: Vec<OverlayBox>,
    pub banner: Option<Banner>,
}

impl OverlayPlan {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Red box and `Animal Detected!` above each cascade hit.
    pub fn for_cascade(rects: &[Rect], label: &str) -> Self {
        Self {
            boxes: rects
                .iter()
                .map(|rect| OverlayBox {
                    rect: *rect,
                    label: Some(label.to_string()),
                    color: Color::RED,
                })
                .collect(),
            banner: None,
        }
    }

    /// Green boxes around moving regions plus a red banner while anything moves.
    pub fn for_motion(rects: &[Rect]) -> Self {
        Self {
            boxes: rects
                .iter()
                .map(|rect| OverlayBox {
                    rect: *rect,
                    label: None,
                    color: Color::GREEN,
                })
                .collect(),
            banner: (!rects.is_empty()).then(|| Banner {
                text: MOTION_LABEL.to_string(),
                color: Color::RED,
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty() && self.banner.is_none()
    }

    /// Every string that would be drawn.
    pub fn texts(&self) -> Vec<&str> {
        self.boxes
            .iter()
            .filter_map(|b| b.label.as_deref())
            .chain(self.banner.as_ref().map(|b| b.text.as_str()))
            .collect()
    }
}
