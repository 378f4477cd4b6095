//! Run options, loadable from YAML or JSON.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

/// Options for simulation runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimOptions {
    /// Start time (seconds)
    pub start_time: f64,
    /// Stop time (seconds)
    pub stop_time: f64,
    /// Fixed time step of the top-level system (seconds)
    pub timestep: f64,
    /// Step independent subsystems on the rayon thread pool
    pub parallel: bool,
    /// Record node values every N-th step (0 disables recording)
    pub log_every: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            stop_time: 1.0,
            timestep: 1e-3,
            parallel: false,
            log_every: 0,
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(SimError::InvalidTimestep {
                what: format!("timestep must be positive, got {}", self.timestep),
            });
        }
        if !self.start_time.is_finite() || !self.stop_time.is_finite() {
            return Err(SimError::InvalidArg {
                what: "start and stop time must be finite",
            });
        }
        if self.stop_time < self.start_time {
            return Err(SimError::InvalidArg {
                what: "stop time must not precede start time",
            });
        }
        Ok(())
    }

    /// Number of whole timesteps between start and stop.
    pub fn step_count(&self) -> u64 {
        ((self.stop_time - self.start_time) / self.timestep).round() as u64
    }
}
