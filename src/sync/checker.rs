//! Optional per-step capabilities a simulation driver can inject
//!
//! Passing `None` for either capability means "do nothing".

use tracing::warn;

use crate::core::Measurement;

/// Soft diagnostic on a node's effective frequency
pub trait FrequencyChecker {
    /// Returns `false` when the frequency is suspicious; never aborts
    fn check(&self, node: usize, time: f64, frequency: f64) -> bool;
}

/// Warns when an effective frequency is zero or negative
#[derive(Debug, Clone, Copy, Default)]
pub struct PositiveFrequency;

impl FrequencyChecker for PositiveFrequency {
    fn check(&self, node: usize, time: f64, frequency: f64) -> bool {
        if frequency > 0.0 {
            return true;
        }
        warn!(node, time, frequency, "effective frequency is not positive");
        false
    }
}

/// Runs `checker` if one was injected
pub fn check_frequency(
    checker: Option<&dyn FrequencyChecker>,
    node: usize,
    time: f64,
    frequency: f64,
) -> bool {
    checker.map_or(true, |c| c.check(node, time, frequency))
}

/// Decides whether a simulation should end early
pub trait Stopper {
    fn should_stop(&mut self, time: f64, measurements: &[Measurement]) -> bool;
}

/// Stops once wall-clock time reaches `tmax`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeLimit {
    pub tmax: f64,
}

impl Stopper for TimeLimit {
    fn should_stop(&mut self, time: f64, _measurements: &[Measurement]) -> bool {
        time >= self.tmax
    }
}

/// Stops as soon as any buffer occupancy leaves `[-limit, limit]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccupancyBound {
    pub limit: f64,
}

impl Stopper for OccupancyBound {
    fn should_stop(&mut self, time: f64, measurements: &[Measurement]) -> bool {
        let overflow = measurements.iter()
            .enumerate()
            .flat_map(|(node, m)| m.occupancies.iter().map(move |o| (node, *o)))
            .find(|(_, o)| o.abs() > self.limit);

        if let Some((node, occupancy)) = overflow {
            warn!(node, time, occupancy, limit = self.limit, "buffer occupancy out of bounds");
            return true;
        }
        false
    }
}

/// Consults `stopper` if one was injected
pub fn should_stop(stopper: Option<&mut dyn Stopper>, time: f64, measurements: &[Measurement]) -> bool {
    stopper.map_or(false, |s| s.should_stop(time, measurements))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_frequency_checker() {
        crate::util::init_tracing(tracing::Level::WARN);
        let checker = PositiveFrequency;
        assert!(checker.check(0, 1.0, 0.5));
        assert!(!checker.check(0, 1.0, 0.0));
        assert!(!check_frequency(Some(&checker), 3, 2.0, -1.0));
    }

    #[test]
    fn test_absent_capabilities_are_noops() {
        assert!(check_frequency(None, 0, 0.0, -5.0));
        assert!(!should_stop(None, 1e12, &[]));
    }

    #[test]
    fn test_time_limit() {
        let mut stopper = TimeLimit { tmax: 10.0 };
        assert!(!should_stop(Some(&mut stopper), 9.9, &[]));
        assert!(should_stop(Some(&mut stopper), 10.0, &[]));
    }

    #[test]
    fn test_occupancy_bound() {
        let mut stopper = OccupancyBound { limit: 100.0 };
        let mut measurements = vec![Measurement::new(2), Measurement::new(1)];
        assert!(!stopper.should_stop(0.0, &measurements));

        measurements[1].occupancies[0] = -150.0;
        assert!(stopper.should_stop(0.0, &measurements));
    }
}
