//! Fixed-step RK4 integration of a single pendulum's angular state.
//!
//! One call to [`integrate`] advances `(θ, ω)` over a frame `dt` by running
//! at least seven RK4 substeps and reports equilibrium crossings and turning
//! points detected between consecutive substeps.

use crate::mod_angle;
use serde::{Deserialize, Serialize};

/// Substep density per simulated second.
pub const SUBSTEPS_PER_SECOND: f64 = 120.0;
/// Lower bound on substeps per frame.
pub const MIN_SUBSTEPS: usize = 7;

/// Gravity/friction pair shared by both pendula.
///
/// Only the lab mutates it; pendula receive a copy on every call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub gravity: f64,
    pub friction: f64,
}

impl Environment {
    pub fn new(gravity: f64, friction: f64) -> Self {
        Self { gravity, friction }
    }
}

/// Right-hand side of the pendulum ODE for one length/mass/environment.
#[derive(Debug, Clone, Copy)]
pub struct Dynamics {
    pub length: f64,
    pub mass: f64,
    pub env: Environment,
}

impl Dynamics {
    pub fn new(length: f64, mass: f64, env: Environment) -> Self {
        debug_assert!(mass > 0.0, "pendulum mass must be positive");
        debug_assert!(length > 0.0, "pendulum length must be positive");
        Self { length, mass, env }
    }

    /// Angular deceleration due to friction: a quadratic drag part that grows
    /// with length and a linear part, both softened by mass.
    pub fn friction_term(&self, omega: f64) -> f64 {
        let friction = self.env.friction;
        friction * self.length / self.mass.cbrt() * omega * omega.abs()
            + friction / self.mass.powf(2.0 / 3.0) * omega
    }

    /// dω/dt
    pub fn omega_derivative(&self, theta: f64, omega: f64) -> f64 {
        -self.friction_term(omega) - (self.env.gravity / self.length) * theta.sin()
    }
}

/// Event raised between two consecutive substeps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MotionEvent {
    /// θ changed sign. `dt` is the interpolated crossing time measured from
    /// the start of the frame; `angle` is θ right before the crossing substep.
    Crossing {
        dt: f64,
        is_positive_direction: bool,
        angle: f64,
    },
    /// ω changed sign near `angle`.
    Peak { angle: f64 },
}

/// Result of integrating one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub angle: f64,
    pub angular_velocity: f64,
    /// Events in substep order.
    pub events: Vec<MotionEvent>,
}

/// Number of RK4 substeps for a frame of length `dt`.
pub fn substep_count(dt: f64) -> usize {
    let scaled = (dt * SUBSTEPS_PER_SECOND).ceil();
    if scaled.is_finite() && scaled > MIN_SUBSTEPS as f64 {
        scaled as usize
    } else {
        MIN_SUBSTEPS
    }
}

/// Linear interpolation of the instant θ reaches zero inside `[t_old, t_new]`.
fn crossing_time(theta_old: f64, theta_new: f64, t_old: f64, t_new: f64) -> f64 {
    t_old + (0.0 - theta_old) * (t_new - t_old) / (theta_new - theta_old)
}

/// First-order estimate of the swing extremum between two samples.
fn turning_angle(theta_old: f64, theta_new: f64) -> f64 {
    if theta_old + theta_new > 0.0 {
        theta_old.max(theta_new)
    } else {
        theta_old.min(theta_new)
    }
}

/// Advance `(angle, angular_velocity)` by `dt` using classical RK4 substeps.
pub fn integrate(dynamics: &Dynamics, angle: f64, angular_velocity: f64, dt: f64) -> StepOutcome {
    debug_assert!(dt >= 0.0, "negative frame time");

    let num_steps = substep_count(dt);
    let h = dt / num_steps as f64;
    let f = |theta: f64, omega: f64| dynamics.omega_derivative(theta, omega);

    let mut theta = angle;
    let mut omega = angular_velocity;
    let mut events = Vec::new();

    for i in 0..num_steps {
        // k1
        let k1x = omega;
        let k1v = f(theta, omega);

        // k2
        let tmp_x = theta + 0.5 * h * k1x;
        let tmp_v = omega + 0.5 * h * k1v;
        let k2x = tmp_v;
        let k2v = f(tmp_x, tmp_v);

        // k3
        let tmp_x = theta + 0.5 * h * k2x;
        let tmp_v = omega + 0.5 * h * k2v;
        let k3x = tmp_v;
        let k3v = f(tmp_x, tmp_v);

        // k4
        let tmp_x = theta + h * k3x;
        let tmp_v = omega + h * k3v;
        let k4x = tmp_v;
        let k4v = f(tmp_x, tmp_v);

        let new_theta = mod_angle(theta + h * (k1x + 2.0 * k2x + 2.0 * k3x + k4x) / 6.0);
        let new_omega = omega + h * (k1v + 2.0 * k2v + 2.0 * k3v + k4v) / 6.0;

        if new_theta * theta < 0.0 || (new_theta == 0.0 && theta != 0.0) {
            let t_old = i as f64 * h;
            let t_new = (i + 1) as f64 * h;
            events.push(MotionEvent::Crossing {
                dt: crossing_time(theta, new_theta, t_old, t_new),
                is_positive_direction: new_omega > 0.0,
                angle: theta,
            });
        }
        if new_omega * omega < 0.0 || (new_omega == 0.0 && omega != 0.0) {
            events.push(MotionEvent::Peak {
                angle: turning_angle(theta, new_theta),
            });
        }

        theta = new_theta;
        omega = new_omega;
    }

    StepOutcome {
        angle: theta,
        angular_velocity: omega,
        events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn earth() -> Environment {
        Environment::new(9.81, 0.0)
    }

    #[test]
    fn substep_count_has_floor_and_scales() {
        assert_eq!(substep_count(0.0), MIN_SUBSTEPS);
        assert_eq!(substep_count(1.0 / 60.0), MIN_SUBSTEPS);
        assert_eq!(substep_count(0.5), 60);
        assert_eq!(substep_count(1.0), 120);
    }

    #[test]
    fn friction_term_opposes_motion() {
        let dynamics = Dynamics::new(1.0, 1.0, Environment::new(9.81, 0.1));
        assert!(dynamics.friction_term(2.0) > 0.0);
        assert!(dynamics.friction_term(-2.0) < 0.0);
        assert_eq!(dynamics.friction_term(0.0), 0.0);
        // mass = 1 makes both softening factors unity
        assert_relative_eq!(dynamics.friction_term(2.0), 0.1 * 4.0 + 0.1 * 2.0, epsilon = 1e-12);
    }

    #[test]
    fn resting_pendulum_stays_put_without_events() {
        let dynamics = Dynamics::new(0.7, 1.0, earth());
        let out = integrate(&dynamics, 0.0, 0.0, 0.016);
        assert_eq!(out.angle, 0.0);
        assert_eq!(out.angular_velocity, 0.0);
        assert!(out.events.is_empty());
    }

    #[test]
    fn crossing_is_interpolated_inside_the_frame() {
        let dynamics = Dynamics::new(1.0, 1.0, earth());
        // swinging left through the bottom
        let out = integrate(&dynamics, 0.01, -1.0, 0.05);
        let crossing = out
            .events
            .iter()
            .find_map(|e| match *e {
                MotionEvent::Crossing { dt, is_positive_direction, .. } => Some((dt, is_positive_direction)),
                _ => None,
            })
            .expect("crossing expected");
        assert!(!crossing.1);
        // θ ≈ 0.01 - t at ω ≈ -1 rad/s
        assert_relative_eq!(crossing.0, 0.01, epsilon = 5e-4);
        assert!(out.angle < 0.0);
    }

    #[test]
    fn crossing_direction_matches_velocity_after_crossing() {
        let dynamics = Dynamics::new(0.7, 1.0, earth());
        let mut theta = 0.8;
        let mut omega = 0.0;
        for _ in 0..300 {
            let out = integrate(&dynamics, theta, omega, 1.0 / 60.0);
            for event in &out.events {
                if let MotionEvent::Crossing { is_positive_direction, .. } = *event {
                    assert_eq!(is_positive_direction, out.angular_velocity > 0.0);
                }
            }
            theta = out.angle;
            omega = out.angular_velocity;
        }
    }

    #[test]
    fn peak_reports_the_extreme_sample() {
        assert_eq!(turning_angle(0.30, 0.31), 0.31);
        assert_eq!(turning_angle(-0.30, -0.31), -0.31);

        let dynamics = Dynamics::new(1.0, 1.0, earth());
        let out = integrate(&dynamics, 0.3, 0.01, 0.05);
        let peak = out.events.iter().find_map(|e| match *e {
            MotionEvent::Peak { angle } => Some(angle),
            _ => None,
        });
        let peak = peak.expect("turning point expected");
        assert!(peak >= 0.3 && peak < 0.301);
    }
}
