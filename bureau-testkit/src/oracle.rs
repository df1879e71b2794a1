use std::time::Duration;

use bureau::DurationOracle;

/// Deterministic oracle returning the midpoint of each window.
///
/// Makes service times and break cadence reproducible without touching the
/// configuration under test.
#[derive(Clone, Copy, Debug, Default)]
pub struct MidpointOracle;

impl DurationOracle for MidpointOracle {
    fn sample(&self, min: Duration, max: Duration) -> Duration {
        min + (max.saturating_sub(min)) / 2
    }
}

/// Oracle returning one fixed duration regardless of the window.
#[derive(Clone, Copy, Debug)]
pub struct FixedOracle(pub Duration);

impl DurationOracle for FixedOracle {
    fn sample(&self, _min: Duration, _max: Duration) -> Duration {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_splits_the_window() {
        let oracle = MidpointOracle;
        assert_eq!(
            oracle.sample(Duration::from_millis(10), Duration::from_millis(30)),
            Duration::from_millis(20)
        );
        assert_eq!(
            oracle.sample(Duration::from_millis(10), Duration::from_millis(10)),
            Duration::from_millis(10)
        );
    }

    #[test]
    fn fixed_ignores_the_window() {
        let oracle = FixedOracle(Duration::from_millis(7));
        assert_eq!(
            oracle.sample(Duration::ZERO, Duration::from_secs(100)),
            Duration::from_millis(7)
        );
    }
}
