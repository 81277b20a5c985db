/// Alert state of a detection session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlertState {
    #[default]
    Idle,
    Alerting,
}

/// Edge taken by one observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    /// Idle -> Alerting. The only edge that fires the alert.
    Rise,
    /// Alerting -> Alerting.
    Hold,
    /// Alerting -> Idle.
    Fall,
    /// Idle -> Idle.
    Quiet,
}

impl Transition {
    pub fn fires_alert(self) -> bool {
        matches!(self, Transition::Rise)
    }
}

/// Fires once per contiguous run of detections.
#[derive(Clone, Debug, Default)]
pub struct Debouncer {
    state: AlertState,
    episodes: u64,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Number of detection episodes started so far.
    pub fn episodes(&self) -> u64 {
        self.episodes
    }

    pub fn observe(&mut self, any_detected: bool) -> Transition {
        let (next, transition) = match (self.state, any_detected) {
            (AlertState::Idle, true) => (AlertState::Alerting, Transition::Rise),
            (AlertState::Alerting, true) => (AlertState::Alerting, Transition::Hold),
            (AlertState::Alerting, false) => (AlertState::Idle, Transition::Fall),
            (AlertState::Idle, false) => (AlertState::Idle, Transition::Quiet),
        };
        if transition.fires_alert() {
            self.episodes += 1;
        }
        self.state = next;
        transition
    }

    pub fn reset(&mut self) {
        self.state = AlertState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(sequence: &[bool]) -> (Vec<Transition>, Debouncer) {
        let mut debouncer = Debouncer::new();
        let transitions = sequence.iter().map(|&d| debouncer.observe(d)).collect();
        (transitions, debouncer)
    }

    #[test]
    fn starts_idle() {
        assert_eq!(Debouncer::new().state(), AlertState::Idle);
    }

    #[test]
    fn fires_once_per_episode() {
        let seq = [false, false, true, true, true, false, true];
        let (transitions, debouncer) = run(&seq);
        let fired = transitions.iter().filter(|t| t.fires_alert()).count();
        assert_eq!(fired, 2);
        assert_eq!(debouncer.episodes(), 2);
        assert_eq!(
            transitions,
            vec![
                Transition::Quiet,
                Transition::Quiet,
                Transition::Rise,
                Transition::Hold,
                Transition::Hold,
                Transition::Fall,
                Transition::Rise,
            ]
        );
        assert_eq!(debouncer.state(), AlertState::Alerting);
    }

    #[test]
    fn fire_count_matches_rising_edges() {
        // deterministic pseudo-random sequences
        let mut seed = 0x2545_f491_u32;
        for _ in 0..50 {
            let seq: Vec<bool> = (0..64)
                .map(|_| {
                    seed ^= seed << 13;
                    seed ^= seed >> 17;
                    seed ^= seed << 5;
                    seed % 3 == 0
                })
                .collect();
            let mut rising = 0;
            let mut prev = false;
            for &d in &seq {
                if d && !prev {
                    rising += 1;
                }
                prev = d;
            }
            let (transitions, _) = run(&seq);
            let fired = transitions.iter().filter(|t| t.fires_alert()).count();
            assert_eq!(fired, rising);
        }
    }

    #[test]
    fn long_episode_fires_once() {
        let seq = vec![true; 500];
        let (transitions, _) = run(&seq);
        assert_eq!(transitions.iter().filter(|t| t.fires_alert()).count(), 1);
    }
}
