//! Stopwatch that times one oscillation of whichever pendulum is active.
//!
//! The timer owns no pendulum. Every operation borrows the lab's pendula for
//! the duration of the call and drives the active pendulum's period trace.

use crate::algorithms::period_trace::COMPLETE_POINTS;
use crate::models::pendulum::Pendulum;
use crate::{LabError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodTimer {
    elapsed_time: f64,
    is_running: bool,
    is_visible: bool,
    active_pendulum_index: usize,
}

impl Default for PeriodTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl PeriodTimer {
    pub fn new() -> Self {
        Self {
            elapsed_time: 0.0,
            is_running: false,
            is_visible: false,
            active_pendulum_index: 0,
        }
    }

    pub fn elapsed_time(&self) -> f64 { self.elapsed_time }
    pub fn is_running(&self) -> bool { self.is_running }
    pub fn is_visible(&self) -> bool { self.is_visible }
    pub fn active_pendulum_index(&self) -> usize { self.active_pendulum_index }

    pub fn active_pendulum<'a>(&self, pendula: &'a [Pendulum]) -> &'a Pendulum {
        &pendula[self.active_pendulum_index]
    }

    pub fn set_running(&mut self, running: bool, pendula: &mut [Pendulum]) {
        if self.is_running == running {
            return;
        }
        self.is_running = running;
        tracing::debug!(running, pendulum = self.active_pendulum_index, "period timer toggled");
        self.sync(pendula);
    }

    pub fn set_visible(&mut self, visible: bool, pendula: &mut [Pendulum]) {
        if self.is_visible == visible {
            return;
        }
        self.is_visible = visible;
        self.sync(pendula);
    }

    /// Re-establish the (running, visible) invariant on the traces.
    fn sync(&mut self, pendula: &mut [Pendulum]) {
        let active = self.active_pendulum_index;
        match (self.is_running, self.is_visible) {
            (true, true) => {
                self.elapsed_time = 0.0;
                for pendulum in pendula.iter_mut() {
                    pendulum.period_trace_mut().reset_path_points();
                }
                pendula[active].period_trace_mut().set_visible(true);
            }
            (false, true) => {
                let trace = pendula[active].period_trace_mut();
                if trace.number_of_points() < COMPLETE_POINTS {
                    trace.reset_path_points();
                }
                if trace.number_of_points() == 0 {
                    trace.set_visible(false);
                }
            }
            (true, false) => {
                self.is_running = false;
                self.sync(pendula);
            }
            (false, false) => {
                self.elapsed_time = 0.0;
                for pendulum in pendula.iter_mut() {
                    pendulum.period_trace_mut().reset_path_points();
                }
                pendula[active].period_trace_mut().set_visible(false);
            }
        }
    }

    /// Stops the timer and zeroes the readout.
    pub fn clear(&mut self, pendula: &mut [Pendulum]) {
        self.elapsed_time = 0.0;
        self.set_running(false, pendula);
    }

    pub fn stop(&mut self, pendula: &mut [Pendulum]) {
        if self.is_running {
            self.clear(pendula);
        }
    }

    /// Switch timing to another pendulum.
    pub fn set_active_pendulum_index(&mut self, index: usize, pendula: &mut [Pendulum]) -> Result<()> {
        if index >= pendula.len() {
            return Err(LabError::InvalidPendulumIndex(index));
        }
        if index == self.active_pendulum_index {
            return Ok(());
        }
        self.clear(pendula);
        pendula[self.active_pendulum_index].period_trace_mut().set_visible(false);
        self.active_pendulum_index = index;
        let running = self.is_running;
        pendula[index].period_trace_mut().set_visible(running);
        tracing::debug!(pendulum = index, "period timer switched pendulum");
        Ok(())
    }

    /// Mirror the active trace after the pendula have been stepped; stops
    /// once the trace has recognized a full oscillation.
    pub fn step(&mut self, pendula: &mut [Pendulum]) {
        if !self.is_running {
            return;
        }
        let trace = pendula[self.active_pendulum_index].period_trace();
        self.elapsed_time = trace.elapsed_time().max(0.0);
        if trace.is_complete() {
            self.set_running(false, pendula);
        }
    }

    pub fn reset(&mut self, pendula: &mut [Pendulum]) {
        self.clear(pendula);
        self.set_visible(false, pendula);
        if self.active_pendulum_index != 0 {
            pendula[self.active_pendulum_index].period_trace_mut().set_visible(false);
            self.active_pendulum_index = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PendulumConfig;
    use crate::sim::Environment;

    fn pendula() -> Vec<Pendulum> {
        let env = Environment::new(9.81, 0.0);
        vec![
            Pendulum::new(0, PendulumConfig::new(0.7, 1.0, 0.3), false, env),
            Pendulum::new(1, PendulumConfig::new(1.0, 0.5, 0.3), false, env),
        ]
    }

    #[test]
    fn starting_zeroes_time_and_shows_active_trace() {
        let mut pendula = pendula();
        let mut timer = PeriodTimer::new();
        timer.set_visible(true, &mut pendula);
        timer.set_running(true, &mut pendula);
        assert_eq!(timer.elapsed_time(), 0.0);
        assert!(pendula[0].period_trace().is_visible());
        assert!(!pendula[1].period_trace().is_visible());
    }

    #[test]
    fn running_while_hidden_is_refused() {
        let mut pendula = pendula();
        let mut timer = PeriodTimer::new();
        timer.set_running(true, &mut pendula);
        assert!(!timer.is_running());
        assert!(!pendula[0].period_trace().is_visible());
    }

    #[test]
    fn hiding_stops_a_running_timer() {
        let mut pendula = pendula();
        let mut timer = PeriodTimer::new();
        timer.set_visible(true, &mut pendula);
        timer.set_running(true, &mut pendula);
        timer.set_visible(false, &mut pendula);
        assert!(!timer.is_running());
        assert!(!pendula[0].period_trace().is_visible());
    }

    #[test]
    fn switching_hides_old_trace_and_rejects_bad_index() {
        let mut pendula = pendula();
        let mut timer = PeriodTimer::new();
        timer.set_visible(true, &mut pendula);
        timer.set_running(true, &mut pendula);
        timer.set_active_pendulum_index(1, &mut pendula).unwrap();
        assert_eq!(timer.active_pendulum_index(), 1);
        assert!(!timer.is_running());
        assert!(!pendula[0].period_trace().is_visible());
        assert!(matches!(
            timer.set_active_pendulum_index(2, &mut pendula),
            Err(LabError::InvalidPendulumIndex(2))
        ));
    }

    #[test]
    fn stop_clears_only_when_running() {
        let mut pendula = pendula();
        let mut timer = PeriodTimer::new();
        timer.set_visible(true, &mut pendula);
        timer.stop(&mut pendula);
        assert!(timer.is_visible());
        timer.set_running(true, &mut pendula);
        timer.stop(&mut pendula);
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed_time(), 0.0);
    }
}
