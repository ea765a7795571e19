use crate::algorithms::period_timer::PeriodTimer;
use crate::config::{LabConfig, TraceVisibility};
use crate::models::body::Body;
use crate::models::pendulum::{Pendulum, PendulumEvent, PendulumSnapshot};
use crate::sim::{Environment, StepOutcome};
use crate::{
    LabError, Range, Result, FRICTION_RANGE, GRAVITY_RANGE, LENGTH_RANGE, MASS_RANGE,
    PENDULUM_COUNT,
};
use serde::{Deserialize, Serialize};

/// Longest frame the model will integrate in one call (s).
pub const MAX_FRAME_DT: f64 = 0.05;
/// Keeps the period timer's last digits from locking onto a repeating value.
pub const TIMER_OFFSET: f64 = 1.007;
/// Frame advanced by the manual step button (s).
pub const MANUAL_STEP_DT: f64 = 0.01;
/// Below this |θ|, |ω| and |α| a pendulum is snapped to exact rest.
pub const REST_THRESHOLD: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeSpeed {
    Normal,
    Slow,
}

impl TimeSpeed {
    pub fn factor(self) -> f64 {
        match self {
            TimeSpeed::Normal => 1.0,
            TimeSpeed::Slow => 0.125,
        }
    }
}

fn clamp_checked(name: &'static str, value: f64, range: Range) -> Result<f64> {
    if range.contains(value) {
        Ok(value)
    } else {
        Err(LabError::OutOfRange { name, value, min: range.min, max: range.max })
    }
}

fn is_nearly_at_rest(pendulum: &Pendulum) -> bool {
    pendulum.angle().abs() < REST_THRESHOLD
        && pendulum.angular_acceleration().abs() < REST_THRESHOLD
        && pendulum.angular_velocity().abs() < REST_THRESHOLD
}

fn frame_outcome(pendulum: &Pendulum, dt: f64, env: Environment) -> Option<StepOutcome> {
    if is_nearly_at_rest(pendulum) {
        None
    } else {
        pendulum.integrate_frame(dt, env)
    }
}

#[cfg(not(feature = "parallel"))]
fn integrate_all(pendula: &[Pendulum], dt: f64, env: Environment) -> Vec<Option<StepOutcome>> {
    pendula.iter().map(|p| frame_outcome(p, dt, env)).collect()
}

/// Pendula are independent within a frame; results come back in index order.
#[cfg(feature = "parallel")]
fn integrate_all(pendula: &[Pendulum], dt: f64, env: Environment) -> Vec<Option<StepOutcome>> {
    use rayon::prelude::*;
    pendula.par_iter().map(|p| frame_outcome(p, dt, env)).collect()
}

/// The pendulum lab: two pendula sharing gravity and friction, the body
/// presets, play/speed state and the optional period timer.
#[derive(Debug, Clone)]
pub struct Lab {
    config: LabConfig,
    pendula: Vec<Pendulum>,
    env: Environment,
    custom_gravity: f64,
    selected_body: Body,
    number_of_active_pendula: usize,
    time_speed: TimeSpeed,
    is_playing: bool,
    is_period_trace_visible: bool,
    is_ruler_visible: bool,
    period_timer: Option<PeriodTimer>,
}

impl Default for Lab {
    fn default() -> Self {
        Self::build(LabConfig::default())
    }
}

impl Lab {
    pub fn new(config: LabConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: LabConfig) -> Self {
        let env = Self::default_environment();
        let repeats = config.trace_visibility() == TraceVisibility::Checkbox;
        let pendula = config
            .pendula
            .iter()
            .enumerate()
            .map(|(index, p)| Pendulum::new(index, *p, repeats, env))
            .collect();
        let mut lab = Self {
            pendula,
            env,
            custom_gravity: env.gravity,
            selected_body: Body::Earth,
            number_of_active_pendula: 1,
            time_speed: TimeSpeed::Normal,
            is_playing: true,
            is_period_trace_visible: false,
            is_ruler_visible: config.ruler_initially_visible,
            period_timer: config.has_period_timer.then(PeriodTimer::new),
            config,
        };
        lab.apply_pendulum_visibility();
        lab
    }

    fn default_environment() -> Environment {
        Environment::new(Body::Earth.gravity().unwrap_or(9.81), 0.0)
    }

    pub fn config(&self) -> &LabConfig { &self.config }
    pub fn environment(&self) -> Environment { self.env }
    pub fn gravity(&self) -> f64 { self.env.gravity }
    pub fn friction(&self) -> f64 { self.env.friction }
    pub fn custom_gravity(&self) -> f64 { self.custom_gravity }
    pub fn selected_body(&self) -> Body { self.selected_body }
    pub fn number_of_active_pendula(&self) -> usize { self.number_of_active_pendula }
    pub fn time_speed(&self) -> TimeSpeed { self.time_speed }
    pub fn is_playing(&self) -> bool { self.is_playing }
    pub fn is_period_trace_visible(&self) -> bool { self.is_period_trace_visible }
    pub fn is_ruler_visible(&self) -> bool { self.is_ruler_visible }
    pub fn period_timer(&self) -> Option<&PeriodTimer> { self.period_timer.as_ref() }
    pub fn pendula(&self) -> &[Pendulum] { &self.pendula }

    pub fn trace_visibility(&self) -> TraceVisibility {
        self.config.trace_visibility()
    }

    pub fn pendulum(&self, index: usize) -> Result<&Pendulum> {
        self.pendula.get(index).ok_or(LabError::InvalidPendulumIndex(index))
    }

    fn pendulum_mut(&mut self, index: usize) -> Result<&mut Pendulum> {
        self.pendula.get_mut(index).ok_or(LabError::InvalidPendulumIndex(index))
    }

    pub fn set_playing(&mut self, playing: bool) { self.is_playing = playing; }
    pub fn set_time_speed(&mut self, speed: TimeSpeed) { self.time_speed = speed; }
    pub fn set_ruler_visible(&mut self, visible: bool) { self.is_ruler_visible = visible; }

    /// Per-frame entry point. Does nothing while paused.
    pub fn step(&mut self, dt: f64) {
        if !self.is_playing {
            return;
        }
        let dt = dt.min(MAX_FRAME_DT) * self.time_speed.factor() * TIMER_OFFSET;
        self.model_step(dt);
    }

    /// Advance by a fixed 10 ms, paused or not.
    pub fn step_manual(&mut self) {
        self.model_step(MANUAL_STEP_DT);
    }

    fn model_step(&mut self, dt: f64) {
        tracing::trace!(dt, "lab step");
        let env = self.env;
        let active = self.number_of_active_pendula;
        let outcomes = integrate_all(&self.pendula[..active], dt, env);
        for (pendulum, outcome) in self.pendula.iter_mut().zip(outcomes) {
            if pendulum.is_user_controlled() {
                continue;
            }
            match outcome {
                Some(outcome) => pendulum.apply_frame(outcome, dt, env),
                None => pendulum.settle(env),
            }
        }
        if let Some(timer) = self.period_timer.as_mut() {
            timer.step(&mut self.pendula);
        }
    }

    fn apply_gravity(&mut self, gravity: f64) {
        self.env.gravity = gravity;
        let env = self.env;
        for pendulum in self.pendula.iter_mut() {
            pendulum.on_gravity_changed(env);
        }
    }

    /// Slider edit. Picks the preset with exactly this gravity, otherwise
    /// switches to `Custom` and remembers the value.
    pub fn set_gravity(&mut self, gravity: f64) {
        let gravity = GRAVITY_RANGE.clamp(gravity);
        self.selected_body = Body::matching(gravity);
        if self.selected_body == Body::Custom {
            self.custom_gravity = gravity;
        }
        if gravity != self.env.gravity {
            self.apply_gravity(gravity);
        }
    }

    pub fn try_set_gravity(&mut self, gravity: f64) -> Result<()> {
        let gravity = clamp_checked("gravity", gravity, GRAVITY_RANGE)?;
        self.set_gravity(gravity);
        Ok(())
    }

    pub fn select_body(&mut self, body: Body) {
        let previous = self.selected_body;
        if body == previous {
            return;
        }
        let gravity = match body.gravity() {
            Some(gravity) => gravity,
            // Planet X's value must not leak into the custom slider
            None if previous == Body::PlanetX => self.custom_gravity,
            None => {
                self.custom_gravity = self.env.gravity;
                self.env.gravity
            }
        };
        self.selected_body = body;
        tracing::debug!(body = body.id(), gravity, "body selected");
        if gravity != self.env.gravity {
            self.apply_gravity(gravity);
        }
    }

    pub fn set_friction(&mut self, friction: f64) {
        self.env.friction = FRICTION_RANGE.clamp(friction);
        let env = self.env;
        for pendulum in self.pendula.iter_mut() {
            pendulum.update_derived(env, false);
        }
    }

    pub fn try_set_friction(&mut self, friction: f64) -> Result<()> {
        let friction = clamp_checked("friction", friction, FRICTION_RANGE)?;
        self.set_friction(friction);
        Ok(())
    }

    pub fn set_length(&mut self, index: usize, length: f64) -> Result<()> {
        let env = self.env;
        self.pendulum_mut(index)?.set_length(LENGTH_RANGE.clamp(length), env);
        Ok(())
    }

    pub fn try_set_length(&mut self, index: usize, length: f64) -> Result<()> {
        let length = clamp_checked("length", length, LENGTH_RANGE)?;
        self.set_length(index, length)
    }

    pub fn set_mass(&mut self, index: usize, mass: f64) -> Result<()> {
        let env = self.env;
        self.pendulum_mut(index)?.set_mass(MASS_RANGE.clamp(mass), env);
        Ok(())
    }

    pub fn try_set_mass(&mut self, index: usize, mass: f64) -> Result<()> {
        let mass = clamp_checked("mass", mass, MASS_RANGE)?;
        self.set_mass(index, mass)
    }

    pub fn set_user_controlled(&mut self, index: usize, controlled: bool) -> Result<()> {
        let env = self.env;
        self.pendulum_mut(index)?.set_user_controlled(controlled, env);
        Ok(())
    }

    pub fn drag_pendulum(&mut self, index: usize, angle: f64) -> Result<()> {
        let env = self.env;
        self.pendulum_mut(index)?.drag_to(angle, env);
        Ok(())
    }

    pub fn set_number_of_active_pendula(&mut self, count: usize) -> Result<()> {
        if count == 0 || count > PENDULUM_COUNT {
            return Err(LabError::InvalidActivePendula(count));
        }
        self.number_of_active_pendula = count;
        self.apply_pendulum_visibility();
        if let Some(timer) = self.period_timer.as_mut() {
            if timer.active_pendulum_index() >= count {
                timer.set_active_pendulum_index(0, &mut self.pendula)?;
            }
        }
        Ok(())
    }

    fn apply_pendulum_visibility(&mut self) {
        let count = self.number_of_active_pendula;
        let checkbox = self.trace_visibility() == TraceVisibility::Checkbox;
        let show_traces = self.is_period_trace_visible;
        for pendulum in self.pendula.iter_mut() {
            let visible = pendulum.index() < count;
            pendulum.set_visible(visible);
            if !visible {
                pendulum.period_trace_mut().set_visible(false);
            } else if checkbox {
                pendulum.period_trace_mut().set_visible(show_traces);
            }
        }
    }

    /// Checkbox-governed trace visibility. Ignored when the period timer
    /// owns trace visibility.
    pub fn set_period_trace_visible(&mut self, visible: bool) {
        if self.trace_visibility() != TraceVisibility::Checkbox {
            tracing::debug!("trace checkbox ignored: period timer governs traces");
            return;
        }
        self.is_period_trace_visible = visible;
        for pendulum in self.pendula.iter_mut() {
            pendulum.period_trace_mut().set_visible(visible);
        }
    }

    /// The view finished fading out a completed trace.
    pub fn period_trace_faded(&mut self, index: usize) -> Result<()> {
        self.pendulum_mut(index)?.period_trace_mut().on_faded();
        Ok(())
    }

    pub fn set_period_timer_visible(&mut self, visible: bool) {
        if let Some(timer) = self.period_timer.as_mut() {
            timer.set_visible(visible, &mut self.pendula);
        }
    }

    pub fn set_period_timer_running(&mut self, running: bool) {
        if let Some(timer) = self.period_timer.as_mut() {
            timer.set_running(running, &mut self.pendula);
        }
    }

    pub fn set_timed_pendulum(&mut self, index: usize) -> Result<()> {
        if index >= self.number_of_active_pendula {
            return Err(LabError::InvalidPendulumIndex(index));
        }
        match self.period_timer.as_mut() {
            Some(timer) => timer.set_active_pendulum_index(index, &mut self.pendula),
            None => Ok(()),
        }
    }

    pub fn stop_period_timer(&mut self) {
        if let Some(timer) = self.period_timer.as_mut() {
            timer.stop(&mut self.pendula);
        }
    }

    /// Bring every pendulum back to its start angle and drop thermal energy.
    pub fn return_pendula(&mut self) {
        let env = self.env;
        for pendulum in self.pendula.iter_mut() {
            pendulum.reset_thermal_energy();
            pendulum.reset_motion(env);
        }
        self.stop_period_timer();
    }

    pub fn reset(&mut self) {
        self.env = Self::default_environment();
        self.custom_gravity = self.env.gravity;
        self.selected_body = Body::Earth;
        self.time_speed = TimeSpeed::Normal;
        self.is_playing = true;
        self.is_ruler_visible = self.config.ruler_initially_visible;
        self.number_of_active_pendula = 1;
        self.set_period_trace_visible(false);

        let env = self.env;
        for pendulum in self.pendula.iter_mut() {
            pendulum.reset(env);
        }
        self.apply_pendulum_visibility();
        if let Some(timer) = self.period_timer.as_mut() {
            timer.reset(&mut self.pendula);
        }
    }

    pub fn snapshot(&self) -> Vec<PendulumSnapshot> {
        self.pendula.iter().map(Pendulum::snapshot).collect()
    }

    pub fn drain_events(&mut self, index: usize) -> Result<Vec<PendulumEvent>> {
        Ok(self.pendulum_mut(index)?.drain_events())
    }
}
