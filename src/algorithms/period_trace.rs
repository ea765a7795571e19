//! Five-state recognizer for one full oscillation.
//!
//! The trace listens to a pendulum's crossing/peak events and per-frame
//! ticks. It arms on a crossing near equilibrium, records both turning
//! points, and completes on the next crossing, accumulating the elapsed
//! time from the true first crossing instant to the last one.

use serde::{Deserialize, Serialize};

/// Largest |θ| (rad) before a crossing for it to arm the trace. Filters
/// sign flips caused by wrapping through ±π.
pub const ARMING_ANGLE: f64 = 0.5;

/// Number of recorded points once one oscillation has been recognized.
pub const COMPLETE_POINTS: u8 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodTrace {
    /// Index of the owning pendulum.
    pendulum_index: usize,
    number_of_points: u8,
    counter_clockwise: Option<bool>,
    first_angle: Option<f64>,
    second_angle: Option<f64>,
    elapsed_time: f64,
    is_visible: bool,
    /// Completed traces re-arm after fading (checkbox mode).
    repeats: bool,
}

impl PeriodTrace {
    pub fn new(pendulum_index: usize, repeats: bool) -> Self {
        Self {
            pendulum_index,
            number_of_points: 0,
            counter_clockwise: None,
            first_angle: None,
            second_angle: None,
            elapsed_time: 0.0,
            is_visible: false,
            repeats,
        }
    }

    pub fn pendulum_index(&self) -> usize { self.pendulum_index }
    pub fn number_of_points(&self) -> u8 { self.number_of_points }
    pub fn counter_clockwise(&self) -> Option<bool> { self.counter_clockwise }
    pub fn first_angle(&self) -> Option<f64> { self.first_angle }
    pub fn second_angle(&self) -> Option<f64> { self.second_angle }
    pub fn elapsed_time(&self) -> f64 { self.elapsed_time }
    pub fn is_visible(&self) -> bool { self.is_visible }
    pub fn repeats(&self) -> bool { self.repeats }

    pub fn is_complete(&self) -> bool {
        self.number_of_points == COMPLETE_POINTS
    }

    fn advance(&mut self) {
        debug_assert!(self.number_of_points < COMPLETE_POINTS);
        self.number_of_points += 1;
    }

    /// Equilibrium crossing at `dt` seconds into the current frame.
    /// `angle` is the pendulum angle right before the crossing.
    pub fn on_crossing(&mut self, dt: f64, is_positive_direction: bool, angle: f64) {
        match self.number_of_points {
            0 if angle.abs() < ARMING_ANGLE => {
                self.counter_clockwise = Some(!is_positive_direction);
                self.advance();
                // the frame tick adds the whole frame; start from the crossing instant
                self.elapsed_time = -dt;
            }
            // crossed again without turning
            1 => self.reset_path_points(),
            3 => {
                self.elapsed_time += dt;
                self.advance();
                tracing::debug!(
                    pendulum = self.pendulum_index,
                    period = self.elapsed_time,
                    "period trace complete"
                );
            }
            _ => {}
        }
    }

    pub fn on_peak(&mut self, angle: f64) {
        match self.number_of_points {
            1 => {
                self.first_angle = Some(angle);
                self.advance();
            }
            2 => {
                self.second_angle = Some(angle);
                self.advance();
            }
            _ => {}
        }
    }

    /// Per-frame tick, delivered after the frame's events.
    pub fn on_step(&mut self, dt: f64) {
        if self.number_of_points > 0 && self.number_of_points < COMPLETE_POINTS {
            self.elapsed_time += dt;
        }
    }

    pub fn reset_path_points(&mut self) {
        self.counter_clockwise = None;
        self.first_angle = None;
        self.second_angle = None;
        self.number_of_points = 0;
        self.elapsed_time = 0.0;
    }

    /// Showing a hidden trace starts a fresh recording.
    pub fn set_visible(&mut self, visible: bool) {
        if visible && !self.is_visible {
            self.reset_path_points();
        }
        self.is_visible = visible;
    }

    /// Called by the view once a completed trace has faded out.
    pub fn on_faded(&mut self) {
        self.set_visible(false);
        if self.repeats {
            self.set_visible(true);
        }
    }
}
