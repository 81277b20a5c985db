use super::regions::CandidateRegion;
use crate::frame::Rect;

/// Drops regions too small to be real motion.
#[derive(Clone, Copy, Debug)]
pub struct AreaFilter {
    min_area: u64,
}

/// Regions that survived the filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AreaVerdict {
    pub boxes: Vec<Rect>,
}

impl AreaVerdict {
    pub fn any_detected(&self) -> bool {
        !self.boxes.is_empty()
    }
}

impl AreaFilter {
    pub fn new(min_area: u64) -> Self {
        Self { min_area }
    }

    pub fn min_area(&self) -> u64 {
        self.min_area
    }

    /// A region qualifies only when its area is strictly greater than `min_area`.
    pub fn qualifies(&self, region: &CandidateRegion) -> bool {
        region.area > self.min_area
    }

    pub fn apply(&self, regions: &[CandidateRegion]) -> AreaVerdict {
        AreaVerdict {
            boxes: regions
                .iter()
                .filter(|region| self.qualifies(region))
                .map(|region| region.bounds)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(area: u64) -> CandidateRegion {
        CandidateRegion {
            bounds: Rect::new(0, 0, 10, 10),
            area,
        }
    }

    #[test]
    fn boundary_area_is_excluded() {
        let filter = AreaFilter::new(1000);
        assert!(!filter.qualifies(&region(1000)));
        assert!(filter.qualifies(&region(1001)));
        assert!(!filter.qualifies(&region(3)));
    }

    #[test]
    fn apply_keeps_only_large_regions() {
        let filter = AreaFilter::new(1000);
        let big = CandidateRegion {
            bounds: Rect::new(5, 6, 40, 40),
            area: 1600,
        };
        let verdict = filter.apply(&[region(1000), big, region(20)]);
        assert!(verdict.any_detected());
        assert_eq!(verdict.boxes, vec![Rect::new(5, 6, 40, 40)]);
    }

    #[test]
    fn no_regions_means_nothing_detected() {
        let verdict = AreaFilter::new(1000).apply(&[]);
        assert!(!verdict.any_detected());
    }
}
