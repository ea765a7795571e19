use std::f64::consts::{PI, TAU};

pub mod algorithms;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod sim;

pub use algorithms::period_trace::PeriodTrace;
pub use algorithms::period_timer::PeriodTimer;
pub use config::{LabConfig, PendulumConfig, TraceVisibility};
pub use engine::{Lab, TimeSpeed};
pub use error::{LabError, Result};
pub use models::body::Body;
pub use models::pendulum::{Pendulum, PendulumEvent, PendulumSnapshot};
pub use sim::{Environment, MotionEvent, StepOutcome};

#[cfg(target_arch = "wasm32")]
pub mod wasm;

/// Inclusive range of a bounded model quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

pub const LENGTH_RANGE: Range = Range::new(0.1, 1.0);
pub const MASS_RANGE: Range = Range::new(0.1, 1.5);
pub const GRAVITY_RANGE: Range = Range::new(0.0, 25.0);
pub const FRICTION_RANGE: Range = Range::new(0.0, 0.115);

/// Number of pendula the lab always carries (the second may be hidden).
pub const PENDULUM_COUNT: usize = 2;

/// Reduce an angle modulo 2π into `(-π, π]`.
///
/// Values already in range are returned untouched, so the function is
/// idempotent bit for bit.
pub fn mod_angle(angle: f64) -> f64 {
    if angle > -PI && angle <= PI {
        return angle;
    }
    let reduced = PI - (PI - angle).rem_euclid(TAU);
    // rem_euclid can round up to TAU for tiny negative remainders
    if reduced <= -PI { PI } else { reduced }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mod_angle_maps_into_half_open_interval() {
        for &x in &[0.0, 1.0, -1.0, PI, -PI, 3.0 * PI, -3.0 * PI, 7.5, -7.5, 1e6, -1e6, TAU] {
            let r = mod_angle(x);
            assert!(r > -PI && r <= PI, "mod_angle({x}) = {r}");
        }
    }

    #[test]
    fn mod_angle_is_idempotent() {
        let mut x = -50.0;
        while x < 50.0 {
            let once = mod_angle(x);
            assert_eq!(mod_angle(once), once);
            x += 0.173;
        }
    }

    #[test]
    fn mod_angle_wraps_both_ends_to_pi() {
        assert_eq!(mod_angle(-PI), PI);
        assert_eq!(mod_angle(PI), PI);
        assert_abs_diff_eq!(mod_angle(PI + 0.25), -PI + 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(mod_angle(-PI - 0.25), PI - 0.25, epsilon = 1e-12);
    }

    #[test]
    fn range_clamps_and_checks() {
        assert!(LENGTH_RANGE.contains(0.5));
        assert!(!MASS_RANGE.contains(0.0));
        assert_eq!(FRICTION_RANGE.clamp(1.0), 0.115);
    }
}
