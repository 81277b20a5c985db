//! Background-subtraction motion detection.
//!
//! Per frame: gray → blur → background update → threshold → dilate →
//! regions → area filter → debounce. Everything here is pure decision
//! logic; rendering and alert side effects live in `session`.

mod background;
mod debounce;
mod filter;
mod mask;
mod regions;

pub use background::{BackgroundModel, BackgroundUpdate};
pub use debounce::{AlertState, Debouncer, Transition};
pub use filter::{AreaFilter, AreaVerdict};
pub use mask::Mask;
pub use regions::{find_regions, CandidateRegion};

use anyhow::Result;

use crate::config::MotionSettings;
use crate::frame::{Frame, GrayFrame, Rect};

/// What happened to the background model on this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionPhase {
    /// First frame of the session; the model was created, no detection ran.
    Seeded,
    /// Frame size changed; the model was rebuilt, no detection ran.
    Reseeded { previous: (u32, u32) },
    /// Detection ran against the updated model.
    Evaluated,
}

/// Decision for one frame.
#[derive(Clone, Debug)]
pub struct MotionDecision {
    pub frame_index: u64,
    pub phase: MotionPhase,
    /// Regions extracted before area filtering.
    pub regions_seen: usize,
    /// Bounding boxes of regions above `min_area`.
    pub boxes: Vec<Rect>,
    /// Debounce edge; `None` when no detection ran.
    pub transition: Option<Transition>,
}

impl MotionDecision {
    pub fn any_detected(&self) -> bool {
        !self.boxes.is_empty()
    }

    pub fn fires_alert(&self) -> bool {
        self.transition.is_some_and(Transition::fires_alert)
    }
}

/// Session-scoped motion detector. Owns all state that persists across frames.
#[derive(Debug)]
pub struct MotionDetector {
    settings: MotionSettings,
    background: BackgroundModel,
    filter: AreaFilter,
    debouncer: Debouncer,
}

impl MotionDetector {
    pub fn new(settings: MotionSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            background: BackgroundModel::new(settings.adapt_rate)?,
            filter: AreaFilter::new(settings.min_area),
            debouncer: Debouncer::new(),
            settings,
        })
    }

    pub fn settings(&self) -> &MotionSettings {
        &self.settings
    }

    pub fn alert_state(&self) -> AlertState {
        self.debouncer.state()
    }

    pub fn episodes(&self) -> u64 {
        self.debouncer.episodes()
    }

    pub fn background(&self) -> &BackgroundModel {
        &self.background
    }

    /// Gray conversion and blur applied before the background model.
    pub fn prepare(&self, frame: &Frame) -> Result<GrayFrame> {
        frame.to_gray().gaussian_blur(self.settings.blur_kernel)
    }

    pub fn process(&mut self, frame: &Frame) -> Result<MotionDecision> {
        let gray = self.prepare(frame)?;
        Ok(self.process_gray(&gray, frame.index))
    }

    /// Run the decision pipeline on an already-prepared gray frame.
    pub fn process_gray(&mut self, gray: &GrayFrame, frame_index: u64) -> MotionDecision {
        let diff = match self.background.observe(gray) {
            BackgroundUpdate::Seeded => {
                log::debug!("frame {}: background model seeded", frame_index);
                return MotionDecision::idle(frame_index, MotionPhase::Seeded);
            }
            BackgroundUpdate::Reseeded { previous } => {
                log::warn!(
                    "frame {}: frame size changed from {}x{} to {}x{}, background model reset",
                    frame_index,
                    previous.0,
                    previous.1,
                    gray.width,
                    gray.height
                );
                self.debouncer.reset();
                return MotionDecision::idle(frame_index, MotionPhase::Reseeded { previous });
            }
            BackgroundUpdate::Updated { diff } => diff,
        };

        let mask = Mask::threshold(&diff, self.settings.diff_threshold)
            .dilate(self.settings.dilate_iterations);
        let regions = find_regions(&mask);
        let verdict = self.filter.apply(&regions);
        let transition = self.debouncer.observe(verdict.any_detected());

        log::debug!(
            "frame {}: {} regions, {} above min_area, {:?}",
            frame_index,
            regions.len(),
            verdict.boxes.len(),
            transition
        );

        MotionDecision {
            frame_index,
            phase: MotionPhase::Evaluated,
            regions_seen: regions.len(),
            boxes: verdict.boxes,
            transition: Some(transition),
        }
    }
}

impl MotionDecision {
    fn idle(frame_index: u64, phase: MotionPhase) -> Self {
        Self {
            frame_index,
            phase,
            regions_seen: 0,
            boxes: Vec::new(),
            transition: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelLayout;

    fn settings() -> MotionSettings {
        MotionSettings {
            adapt_rate: 0.01,
            blur_kernel: 1,
            diff_threshold: 25,
            dilate_iterations: 0,
            min_area: 50,
        }
    }

    fn scene(width: u32, height: u32, block: Option<Rect>, index: u64) -> Frame {
        let mut data = vec![40u8; (width * height) as usize];
        if let Some(block) = block {
            for y in block.y..block.bottom() {
                for x in block.x..block.right() {
                    data[(y * width + x) as usize] = 220;
                }
            }
        }
        Frame::new(data, width, height, PixelLayout::Gray8, index).unwrap()
    }

    #[test]
    fn first_frame_never_detects() -> Result<()> {
        let mut detector = MotionDetector::new(settings())?;
        let decision = detector.process(&scene(32, 32, Some(Rect::new(0, 0, 20, 20)), 1))?;
        assert_eq!(decision.phase, MotionPhase::Seeded);
        assert!(!decision.any_detected());
        assert!(decision.transition.is_none());
        Ok(())
    }

    #[test]
    fn block_entering_scene_is_detected_once() -> Result<()> {
        let mut detector = MotionDetector::new(settings())?;
        detector.process(&scene(32, 32, None, 1))?;
        let block = Rect::new(4, 4, 10, 10);

        let first = detector.process(&scene(32, 32, Some(block), 2))?;
        assert!(first.any_detected());
        assert!(first.fires_alert());
        assert_eq!(first.boxes, vec![block]);

        let second = detector.process(&scene(32, 32, Some(block), 3))?;
        assert!(second.any_detected());
        assert!(!second.fires_alert());
        assert_eq!(second.transition, Some(Transition::Hold));
        assert_eq!(detector.episodes(), 1);
        Ok(())
    }

    #[test]
    fn small_blob_is_ignored() -> Result<()> {
        let mut detector = MotionDetector::new(settings())?;
        detector.process(&scene(32, 32, None, 1))?;
        // 7x7 = 49 pixels, min_area is 50
        let decision = detector.process(&scene(32, 32, Some(Rect::new(3, 3, 7, 7)), 2))?;
        assert_eq!(decision.phase, MotionPhase::Evaluated);
        assert_eq!(decision.regions_seen, 1);
        assert!(!decision.any_detected());
        Ok(())
    }

    #[test]
    fn resize_reseeds_and_clears_alert() -> Result<()> {
        let mut detector = MotionDetector::new(settings())?;
        detector.process(&scene(32, 32, None, 1))?;
        detector.process(&scene(32, 32, Some(Rect::new(0, 0, 16, 16)), 2))?;
        assert_eq!(detector.alert_state(), AlertState::Alerting);

        let decision = detector.process(&scene(16, 16, Some(Rect::new(0, 0, 16, 16)), 3))?;
        assert_eq!(
            decision.phase,
            MotionPhase::Reseeded { previous: (32, 32) }
        );
        assert!(!decision.any_detected());
        assert_eq!(detector.alert_state(), AlertState::Idle);
        Ok(())
    }
}
