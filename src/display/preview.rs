use anyhow::{Context, Result};
use opencv::{
    core::{Point, Scalar},
    highgui, imgproc,
};
use std::time::Duration;

use super::{DisplaySink, ESCAPE_KEY};
use crate::frame::Frame;
use crate::overlay::{Color, OverlayPlan};
use crate::vision::{bgr_mat_from_frame, to_cv_rect};

const BOX_THICKNESS: i32 = 2;
const FONT_SCALE: f64 = 0.7;
const BANNER_ORIGIN: (i32, i32) = (10, 30);

/// One OpenCV highgui window.
pub struct PreviewWindow {
    title: String,
    open: bool,
}

impl PreviewWindow {
    pub fn open(title: &str) -> Result<Self> {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)
            .with_context(|| format!("create window '{}'", title))?;
        log::info!("PreviewWindow: opened '{}'", title);
        Ok(Self {
            title: title.to_string(),
            open: true,
        })
    }
}

fn scalar(color: Color) -> Scalar {
    Scalar::new(color.b as f64, color.g as f64, color.r as f64, 0.0)
}

impl DisplaySink for PreviewWindow {
    fn show(&mut self, frame: &Frame, plan: &OverlayPlan) -> Result<()> {
        let mut mat = bgr_mat_from_frame(frame)?;
        for overlay in &plan.boxes {
            let color = scalar(overlay.color);
            imgproc::rectangle(
                &mut mat,
                to_cv_rect(&overlay.rect),
                color,
                BOX_THICKNESS,
                imgproc::LINE_8,
                0,
            )?;
            if let Some(label) = &overlay.label {
                let (x, y) = overlay.label_origin();
                imgproc::put_text(
                    &mut mat,
                    label,
                    Point::new(x as i32, y as i32),
                    imgproc::FONT_HERSHEY_SIMPLEX,
                    FONT_SCALE,
                    color,
                    BOX_THICKNESS,
                    imgproc::LINE_8,
                    false,
                )?;
            }
        }
        if let Some(banner) = &plan.banner {
            imgproc::put_text(
                &mut mat,
                &banner.text,
                Point::new(BANNER_ORIGIN.0, BANNER_ORIGIN.1),
                imgproc::FONT_HERSHEY_SIMPLEX,
                FONT_SCALE,
                scalar(banner.color),
                BOX_THICKNESS,
                imgproc::LINE_8,
                false,
            )?;
        }
        highgui::imshow(&self.title, &mat)?;
        Ok(())
    }

    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>> {
        let delay = (wait.as_millis() as i32).max(1);
        let key = highgui::wait_key(delay)?;
        if key < 0 {
            return Ok(None);
        }
        let code = (key & 0xFF) as u8;
        Ok(Some(if code == 27 { ESCAPE_KEY } else { code as char }))
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        if let Err(err) = highgui::destroy_window(&self.title) {
            log::warn!("PreviewWindow: destroy '{}' failed: {}", self.title, err);
        }
        // highgui processes the destroy on the next event pump
        let _ = highgui::wait_key(1);
        log::info!("PreviewWindow: closed '{}'", self.title);
    }
}

impl Drop for PreviewWindow {
    fn drop(&mut self) {
        self.close();
    }
}
