//! Construction-time configuration for a [`Lab`](crate::Lab).
//!
//! ```json
//! {
//!   "has_period_timer": true,
//!   "ruler_initially_visible": false,
//!   "pendula": [
//!     { "length": 0.7, "mass": 1.0, "angle": 0.0 },
//!     { "length": 1.0, "mass": 0.5, "angle": 0.0 }
//!   ]
//! }
//! ```
//!
//! Every field is optional; missing ones take the defaults below.

use crate::{LabError, Range, Result, LENGTH_RANGE, MASS_RANGE, PENDULUM_COUNT};
use serde::{Deserialize, Serialize};

/// Initial configuration of one pendulum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendulumConfig {
    pub length: f64, // m
    pub mass: f64,   // kg
    #[serde(default)]
    pub angle: f64, // rad, from straight down
}

impl PendulumConfig {
    pub fn new(length: f64, mass: f64, angle: f64) -> Self {
        Self { length, mass, angle }
    }
}

/// Which component decides whether period traces are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TraceVisibility {
    /// A standalone checkbox shows every trace; completed traces repeat.
    Checkbox,
    /// The period timer shows only the timed pendulum's trace.
    PeriodTimer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    pub has_period_timer: bool,
    pub ruler_initially_visible: bool,
    pub pendula: [PendulumConfig; PENDULUM_COUNT],
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            has_period_timer: false,
            ruler_initially_visible: false,
            pendula: [
                PendulumConfig::new(0.7, 1.0, 0.0),
                PendulumConfig::new(1.0, 0.5, 0.0),
            ],
        }
    }
}

fn check(name: &'static str, value: f64, range: Range) -> Result<()> {
    if range.contains(value) {
        Ok(())
    } else {
        Err(LabError::OutOfRange { name, value, min: range.min, max: range.max })
    }
}

impl LabConfig {
    pub fn with_period_timer() -> Self {
        Self { has_period_timer: true, ..Self::default() }
    }

    pub fn trace_visibility(&self) -> TraceVisibility {
        if self.has_period_timer {
            TraceVisibility::PeriodTimer
        } else {
            TraceVisibility::Checkbox
        }
    }

    pub fn validate(&self) -> Result<()> {
        for pendulum in &self.pendula {
            check("length", pendulum.length, LENGTH_RANGE)?;
            check("mass", pendulum.mass, MASS_RANGE)?;
            if !pendulum.angle.is_finite() {
                return Err(LabError::OutOfRange {
                    name: "angle",
                    value: pendulum.angle,
                    min: f64::MIN,
                    max: f64::MAX,
                });
            }
        }
        Ok(())
    }
}
