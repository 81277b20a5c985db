use anyhow::{anyhow, Context, Result};
use opencv::{
    core::{Size, Vector},
    objdetect::CascadeClassifier,
    prelude::*,
};

use super::backend::ObjectDetector;
use crate::config::CascadeSettings;
use crate::frame::{GrayFrame, Rect};
use crate::vision::{from_cv_rect, gray_mat};

/// Haar-cascade classifier backed by OpenCV.
///
/// The model file is loaded once at construction. A missing, unreadable or
/// empty model is an error there, never a silent per-frame failure.
pub struct HaarCascade {
    classifier: CascadeClassifier,
    settings: CascadeSettings,
    hits: Vector<opencv::core::Rect>,
}

impl HaarCascade {
    pub fn load(settings: &CascadeSettings) -> Result<Self> {
        settings.validate()?;
        let path = &settings.model_path;
        if !path.is_file() {
            return Err(anyhow!("cascade model {} does not exist", path.display()));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("cascade model path {} is not UTF-8", path.display()))?;
        let classifier = CascadeClassifier::new(path_str)
            .with_context(|| format!("failed to load cascade model {}", path.display()))?;
        if classifier.empty()? {
            return Err(anyhow!("cascade model {} is empty or invalid", path.display()));
        }
        log::info!("HaarCascade: loaded {}", path.display());
        Ok(Self {
            classifier,
            settings: settings.clone(),
            hits: Vector::new(),
        })
    }
}

impl ObjectDetector for HaarCascade {
    fn name(&self) -> &'static str {
        "haar-cascade"
    }

    fn detect(&mut self, gray: &GrayFrame) -> Result<Vec<Rect>> {
        let mat = gray_mat(gray)?;
        let min = self.settings.min_size as i32;
        self.hits.clear();
        self.classifier
            .detect_multi_scale(
                &mat,
                &mut self.hits,
                self.settings.scale_factor,
                self.settings.min_neighbors,
                0,
                Size::new(min, min),
                Size::default(),
            )
            .context("cascade detection failed")?;
        Ok(self.hits.iter().map(|r| from_cv_rect(&r)).collect())
    }
}
