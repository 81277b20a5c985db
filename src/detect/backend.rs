use anyhow::Result;

use crate::frame::{GrayFrame, Rect};
use crate::overlay::ANIMAL_LABEL;

/// Object detector run by the cascade pipeline.
///
/// Detectors see only the grayscale frame for the current iteration and
/// must not retain it. Output is the list of object rectangles in pixel
/// coordinates; an empty list means nothing was found.
pub trait ObjectDetector {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Label drawn beside each detection.
    fn label(&self) -> &str {
        ANIMAL_LABEL
    }

    /// Run detection on a grayscale frame.
    fn detect(&mut self, gray: &GrayFrame) -> Result<Vec<Rect>>;
}

impl<D: ObjectDetector + ?Sized> ObjectDetector for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn label(&self) -> &str {
        (**self).label()
    }

    fn detect(&mut self, gray: &GrayFrame) -> Result<Vec<Rect>> {
        (**self).detect(gray)
    }
}
