use std::time::Duration;

use rand::Rng;

/// Source of the simulated durations: service times and break cadence.
///
/// Kept behind a trait so tests can substitute a deterministic oracle.
pub trait DurationOracle: Send + Sync {
    /// Pick a duration in `[min, max]`, both inclusive.
    fn sample(&self, min: Duration, max: Duration) -> Duration;
}

/// Default oracle: uniform integer milliseconds over the window.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformOracle;

impl DurationOracle for UniformOracle {
    fn sample(&self, min: Duration, max: Duration) -> Duration {
        let min_ms = min.as_millis() as u64;
        let max_ms = max.as_millis() as u64;
        if max_ms <= min_ms {
            return min;
        }
        Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_within_the_window() {
        let oracle = UniformOracle;
        let min = Duration::from_millis(40);
        let max = Duration::from_millis(90);
        for _ in 0..200 {
            let sampled = oracle.sample(min, max);
            assert!(sampled >= min && sampled <= max, "{sampled:?} out of window");
        }
    }

    #[test]
    fn degenerate_window_returns_min() {
        let oracle = UniformOracle;
        let exact = Duration::from_millis(25);
        assert_eq!(oracle.sample(exact, exact), exact);
    }
}
