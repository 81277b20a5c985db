use anyhow::{anyhow, Result};
use std::collections::VecDeque;

use super::backend::ObjectDetector;
use crate::frame::{GrayFrame, Rect};

/// Deterministic detector that replays a prepared list of results, one
/// entry per call. Once the script runs out it reports nothing.
#[derive(Debug, Default)]
pub struct ScriptedDetector {
    script: VecDeque<Result<Vec<Rect>, String>>,
    calls: u64,
}

impl ScriptedDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, rects: Vec<Rect>) -> Self {
        self.script.push_back(Ok(rects));
        self
    }

    pub fn then_nothing(self, frames: usize) -> Self {
        (0..frames).fold(self, |det, _| det.then(Vec::new()))
    }

    /// Queue a detector failure for the next call.
    pub fn then_fail(mut self, reason: &str) -> Self {
        self.script.push_back(Err(reason.to_string()));
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl ObjectDetector for ScriptedDetector {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _gray: &GrayFrame) -> Result<Vec<Rect>> {
        self.calls += 1;
        match self.script.pop_front() {
            Some(Ok(rects)) => Ok(rects),
            Some(Err(reason)) => Err(anyhow!(reason)),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_script_then_goes_quiet() {
        let gray = GrayFrame::filled(4, 4, 0);
        let mut detector = ScriptedDetector::new()
            .then(vec![Rect::new(0, 0, 2, 2)])
            .then_nothing(1)
            .then_fail("model crashed");

        assert_eq!(detector.detect(&gray).unwrap().len(), 1);
        assert!(detector.detect(&gray).unwrap().is_empty());
        assert!(detector.detect(&gray).is_err());
        assert!(detector.detect(&gray).unwrap().is_empty());
        assert_eq!(detector.calls(), 4);
    }
}
