use crate::algorithms::period_trace::PeriodTrace;
use crate::config::PendulumConfig;
use crate::sim::{integrate, Dynamics, Environment, MotionEvent, StepOutcome};
use crate::{mod_angle, LENGTH_RANGE, MASS_RANGE};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, TAU};

/// Notification queued for the view layer. Drained with [`Pendulum::drain_events`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PendulumEvent {
    Step { dt: f64 },
    UserMoved,
    Crossing { dt: f64, is_positive_direction: bool },
    Peak { angle: f64 },
    Reset,
}

/// Plain-data view of a pendulum for hosts that cannot borrow the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendulumSnapshot {
    pub index: usize,
    pub length: f64,
    pub mass: f64,
    pub angle: f64,
    pub angular_velocity: f64,
    pub angular_acceleration: f64,
    pub position: [f64; 2],
    pub velocity: [f64; 2],
    pub acceleration: [f64; 2],
    pub kinetic_energy: f64,
    pub potential_energy: f64,
    pub thermal_energy: f64,
    pub is_user_controlled: bool,
    pub is_visible: bool,
    pub is_tick_visible: bool,
    pub trace_points: u8,
    pub trace_elapsed_time: f64,
}

fn polar(magnitude: f64, angle: f64) -> Vector2<f64> {
    Vector2::new(magnitude * angle.cos(), magnitude * angle.sin())
}

/// One rigid pendulum hanging from the origin, angle measured from straight down.
#[derive(Debug, Clone)]
pub struct Pendulum {
    index: usize,
    initial: PendulumConfig,

    length: f64,
    mass: f64,
    angle: f64,
    angular_velocity: f64,

    // derived, rewritten by update_derived
    angular_acceleration: f64,
    position: Vector2<f64>,
    velocity: Vector2<f64>,
    acceleration: Vector2<f64>,
    kinetic_energy: f64,
    potential_energy: f64,
    thermal_energy: f64,

    is_user_controlled: bool,
    is_visible: bool,
    is_tick_visible: bool,

    period_trace: PeriodTrace,
    events: Vec<PendulumEvent>,
}

impl Pendulum {
    pub fn new(index: usize, config: PendulumConfig, repeats_trace: bool, env: Environment) -> Self {
        let mut pendulum = Self {
            index,
            initial: config,
            length: config.length,
            mass: config.mass,
            angle: mod_angle(config.angle),
            angular_velocity: 0.0,
            angular_acceleration: 0.0,
            position: Vector2::zeros(),
            velocity: Vector2::zeros(),
            acceleration: Vector2::zeros(),
            kinetic_energy: 0.0,
            potential_energy: 0.0,
            thermal_energy: 0.0,
            is_user_controlled: false,
            is_visible: false,
            is_tick_visible: false,
            period_trace: PeriodTrace::new(index, repeats_trace),
            events: Vec::new(),
        };
        pendulum.update_derived(env, false);
        pendulum
    }

    pub fn index(&self) -> usize { self.index }
    pub fn length(&self) -> f64 { self.length }
    pub fn mass(&self) -> f64 { self.mass }
    pub fn angle(&self) -> f64 { self.angle }
    pub fn angular_velocity(&self) -> f64 { self.angular_velocity }
    pub fn angular_acceleration(&self) -> f64 { self.angular_acceleration }
    pub fn position(&self) -> Vector2<f64> { self.position }
    pub fn velocity(&self) -> Vector2<f64> { self.velocity }
    pub fn acceleration(&self) -> Vector2<f64> { self.acceleration }
    pub fn kinetic_energy(&self) -> f64 { self.kinetic_energy }
    pub fn potential_energy(&self) -> f64 { self.potential_energy }
    pub fn thermal_energy(&self) -> f64 { self.thermal_energy }
    pub fn is_user_controlled(&self) -> bool { self.is_user_controlled }
    pub fn is_visible(&self) -> bool { self.is_visible }
    pub fn is_tick_visible(&self) -> bool { self.is_tick_visible }
    pub fn period_trace(&self) -> &PeriodTrace { &self.period_trace }
    pub(crate) fn period_trace_mut(&mut self) -> &mut PeriodTrace { &mut self.period_trace }

    pub fn dynamics(&self, env: Environment) -> Dynamics {
        Dynamics::new(self.length, self.mass, env)
    }

    /// Integrate one frame without touching the pendulum.
    pub fn integrate_frame(&self, dt: f64, env: Environment) -> Option<StepOutcome> {
        if self.is_user_controlled {
            return None;
        }
        Some(integrate(&self.dynamics(env), self.angle, self.angular_velocity, dt))
    }

    /// Commit an integrated frame: trace events first, then derived
    /// quantities, then the frame tick.
    pub fn apply_frame(&mut self, outcome: StepOutcome, dt: f64, env: Environment) {
        self.angle = outcome.angle;
        self.angular_velocity = outcome.angular_velocity;

        for event in outcome.events {
            match event {
                MotionEvent::Crossing { dt, is_positive_direction, angle } => {
                    self.period_trace.on_crossing(dt, is_positive_direction, angle);
                    self.events.push(PendulumEvent::Crossing { dt, is_positive_direction });
                }
                MotionEvent::Peak { angle } => {
                    self.period_trace.on_peak(angle);
                    self.events.push(PendulumEvent::Peak { angle });
                }
            }
        }

        self.update_derived(env, env.friction > 0.0);
        self.period_trace.on_step(dt);
        self.events.push(PendulumEvent::Step { dt });
    }

    pub fn step(&mut self, dt: f64, env: Environment) {
        if let Some(outcome) = self.integrate_frame(dt, env) {
            self.apply_frame(outcome, dt, env);
        }
    }

    /// Recompute every derived quantity from angle and angular velocity.
    ///
    /// With `convert_to_thermal`, the drop in mechanical energy since the last
    /// recompute is booked as thermal energy. Parameter edits and drags must
    /// pass `false`.
    pub fn update_derived(&mut self, env: Environment, convert_to_thermal: bool) {
        let dynamics = self.dynamics(env);
        let (theta, omega) = (self.angle, self.angular_velocity);
        let speed = omega.abs() * self.length;

        self.angular_acceleration = dynamics.omega_derivative(theta, omega);
        let height = self.length * (1.0 - theta.cos());

        let old_mechanical = self.kinetic_energy + self.potential_energy;
        self.kinetic_energy = 0.5 * self.mass * speed * speed;
        self.potential_energy = self.mass * env.gravity * height;
        if convert_to_thermal {
            self.thermal_energy += old_mechanical - (self.kinetic_energy + self.potential_energy);
        }

        self.position = polar(self.length, theta - FRAC_PI_2);
        self.velocity = polar(omega * self.length, theta);

        // tangential friction + tangential gravity + centripetal
        let friction = polar(-dynamics.friction_term(omega) * self.length, theta);
        let gravity = polar(-env.gravity * theta.sin(), theta);
        let centripetal = polar(self.length * omega * omega, theta + FRAC_PI_2);
        self.acceleration = friction + gravity + centripetal;
    }

    pub fn set_length(&mut self, length: f64, env: Environment) {
        debug_assert!(LENGTH_RANGE.contains(length), "length {length} out of range");
        if length == self.length {
            return;
        }
        self.length = length;
        self.period_trace.reset_path_points();
        self.update_derived(env, false);
    }

    pub fn set_mass(&mut self, mass: f64, env: Environment) {
        debug_assert!(MASS_RANGE.contains(mass), "mass {mass} out of range");
        self.mass = mass;
        self.update_derived(env, false);
    }

    pub(crate) fn on_gravity_changed(&mut self, env: Environment) {
        self.period_trace.reset_path_points();
        self.update_derived(env, false);
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.is_visible = visible;
    }

    /// Grabbing halts the pendulum and discards its thermal energy and trace.
    pub fn set_user_controlled(&mut self, controlled: bool, env: Environment) {
        if self.is_user_controlled == controlled {
            return;
        }
        self.is_user_controlled = controlled;
        if controlled {
            self.is_tick_visible = true;
            self.angular_velocity = 0.0;
            self.thermal_energy = 0.0;
            self.period_trace.reset_path_points();
            self.update_derived(env, false);
        }
    }

    /// Drag continuation: set the angle while the user holds the pendulum.
    pub fn drag_to(&mut self, angle: f64, env: Environment) {
        if !self.is_user_controlled {
            return;
        }
        self.angle = mod_angle(angle);
        self.angular_velocity = 0.0;
        self.update_derived(env, false);
        self.events.push(PendulumEvent::UserMoved);
    }

    /// Snap to exact rest; used by the lab to cut off the friction tail.
    pub(crate) fn settle(&mut self, env: Environment) {
        tracing::trace!(pendulum = self.index, "pendulum settled");
        self.angle = 0.0;
        self.angular_velocity = 0.0;
        self.update_derived(env, false);
    }

    pub fn reset_thermal_energy(&mut self) {
        self.thermal_energy = 0.0;
    }

    pub fn reset_motion(&mut self, env: Environment) {
        self.angle = mod_angle(self.initial.angle);
        self.angular_velocity = 0.0;
        self.period_trace.reset_path_points();
        self.update_derived(env, false);
        self.events.push(PendulumEvent::Reset);
    }

    /// Back to construction defaults; visibility stays with the lab.
    pub fn reset(&mut self, env: Environment) {
        self.length = self.initial.length;
        self.mass = self.initial.mass;
        self.is_user_controlled = false;
        self.is_tick_visible = false;
        self.thermal_energy = 0.0;
        self.reset_motion(env);
    }

    pub fn is_stationary(&self) -> bool {
        self.is_user_controlled
            || (self.angle == 0.0 && self.angular_velocity == 0.0 && self.angular_acceleration == 0.0)
    }

    /// Small-angle period `2π·sqrt(L/g)`. Only good enough for fade timing.
    pub fn approximate_period(&self, env: Environment) -> f64 {
        TAU * (self.length / env.gravity).sqrt()
    }

    pub fn drain_events(&mut self) -> Vec<PendulumEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self) -> PendulumSnapshot {
        PendulumSnapshot {
            index: self.index,
            length: self.length,
            mass: self.mass,
            angle: self.angle,
            angular_velocity: self.angular_velocity,
            angular_acceleration: self.angular_acceleration,
            position: [self.position.x, self.position.y],
            velocity: [self.velocity.x, self.velocity.y],
            acceleration: [self.acceleration.x, self.acceleration.y],
            kinetic_energy: self.kinetic_energy,
            potential_energy: self.potential_energy,
            thermal_energy: self.thermal_energy,
            is_user_controlled: self.is_user_controlled,
            is_visible: self.is_visible,
            is_tick_visible: self.is_tick_visible,
            trace_points: self.period_trace.number_of_points(),
            trace_elapsed_time: self.period_trace.elapsed_time(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    const DT: f64 = 1.0 / 60.0;

    fn env(friction: f64) -> Environment {
        Environment::new(9.81, friction)
    }

    fn swinging(angle: f64, friction: f64) -> Pendulum {
        Pendulum::new(0, PendulumConfig::new(0.7, 1.0, angle), true, env(friction))
    }

    fn mechanical(p: &Pendulum) -> f64 {
        p.kinetic_energy() + p.potential_energy()
    }

    #[test]
    fn frictionless_energy_is_conserved() {
        let mut p = swinging(0.5, 0.0);
        let e0 = mechanical(&p);
        for _ in 0..1000 {
            p.step(DT, env(0.0));
        }
        assert!(((mechanical(&p) - e0) / e0).abs() < 1e-8);
        assert_eq!(p.thermal_energy(), 0.0);
    }

    #[test]
    fn friction_books_lost_energy_as_thermal() {
        let mut p = swinging(0.8, 0.05);
        let e0 = mechanical(&p);
        let mut last_thermal = 0.0;
        for _ in 0..600 {
            p.step(DT, env(0.05));
            assert!(p.thermal_energy() >= last_thermal - 1e-12);
            last_thermal = p.thermal_energy();
        }
        assert!(last_thermal > 0.0);
        assert_relative_eq!(mechanical(&p) + p.thermal_energy(), e0, epsilon = 1e-9);
    }

    #[test]
    fn derived_vectors_decompose_acceleration() {
        let mut p = swinging(0.4, 0.05);
        for _ in 0..7 {
            p.step(DT, env(0.05));
        }
        let (theta, omega) = (p.angle(), p.angular_velocity());
        assert_abs_diff_eq!(p.position().x, 0.7 * theta.sin(), epsilon = 1e-12);
        assert_abs_diff_eq!(p.position().y, -0.7 * theta.cos(), epsilon = 1e-12);

        let tangent = Vector2::new(theta.cos(), theta.sin());
        let inward = Vector2::new(-theta.sin(), theta.cos());
        assert_abs_diff_eq!(p.velocity().dot(&tangent), omega * 0.7, epsilon = 1e-12);
        assert_abs_diff_eq!(p.acceleration().dot(&tangent), 0.7 * p.angular_acceleration(), epsilon = 1e-9);
        assert_abs_diff_eq!(p.acceleration().dot(&inward), 0.7 * omega * omega, epsilon = 1e-9);
    }

    #[test]
    fn user_control_freezes_and_clears() {
        let mut p = swinging(0.8, 0.05);
        for _ in 0..30 {
            p.step(DT, env(0.05));
        }
        assert!(p.thermal_energy() > 0.0);
        assert!(!p.is_tick_visible());

        p.set_user_controlled(true, env(0.05));
        let angle = p.angle();
        p.step(DT, env(0.05));
        assert_eq!(p.angle(), angle);
        p.set_user_controlled(false, env(0.05));

        assert_eq!(p.angular_velocity(), 0.0);
        assert_eq!(p.thermal_energy(), 0.0);
        assert!(p.is_tick_visible());
        assert_eq!(p.period_trace().number_of_points(), 0);
    }

    #[test]
    fn drag_normalizes_and_does_not_heat() {
        let mut p = swinging(0.0, 0.1);
        p.drag_to(1.0, env(0.1));
        assert_eq!(p.angle(), 0.0);

        p.set_user_controlled(true, env(0.1));
        p.drag_to(3.0 * std::f64::consts::PI / 2.0, env(0.1));
        assert_relative_eq!(p.angle(), -std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
        assert_eq!(p.thermal_energy(), 0.0);
        assert!(p.drain_events().contains(&PendulumEvent::UserMoved));
        assert!(p.drain_events().is_empty());
    }

    #[test]
    fn parameter_edits_never_inject_thermal_energy() {
        let mut p = swinging(0.6, 0.0);
        p.set_mass(1.5, env(0.0));
        p.set_length(0.3, env(0.0));
        p.on_gravity_changed(Environment::new(24.79, 0.0));
        assert_eq!(p.thermal_energy(), 0.0);
        assert_relative_eq!(p.potential_energy(), 1.5 * 24.79 * 0.3 * (1.0 - 0.6_f64.cos()), epsilon = 1e-12);
    }

    #[test]
    fn events_keep_substep_order_then_step() {
        let mut p = swinging(0.01, 0.0);
        let mut saw_crossing = false;
        for _ in 0..120 {
            p.step(DT, env(0.0));
            let events = p.drain_events();
            assert!(matches!(events.last(), Some(PendulumEvent::Step { .. })));
            saw_crossing |= events.iter().any(|e| matches!(e, PendulumEvent::Crossing { .. }));
        }
        assert!(saw_crossing);
    }

    #[test]
    fn approximate_period_matches_small_angle_formula() {
        let p = Pendulum::new(0, PendulumConfig::new(1.0, 1.0, 0.1), false, env(0.0));
        assert_abs_diff_eq!(p.approximate_period(env(0.0)), 2.006, epsilon = 1e-3);
    }

    #[test]
    fn reset_restores_construction_state() {
        let mut p = swinging(0.5, 0.0);
        p.set_mass(0.2, env(0.0));
        p.set_user_controlled(true, env(0.0));
        p.reset(env(0.0));
        assert_eq!(p.mass(), 1.0);
        assert_eq!(p.angle(), 0.5);
        assert!(!p.is_user_controlled());
        assert!(!p.is_tick_visible());
        assert!(!p.is_stationary());
    }
}
