//! First order filter discretized with the bilinear transform.

use crate::delay::Delay;
use crate::error::{NumericError, NumericResult};

/// First order transfer function
///
/// ```text
///        a1*s + a0
/// G(s) = ---------
///        b1*s + b0
/// ```
///
/// declared as `num = [a1, a0]`, `den = [b1, b0]` and discretized with Tustin's
/// method. The output is saturated to `[min, max]`; while saturated, both the
/// input and output histories are pinned to the limit so the filter does not
/// wind up.
#[derive(Debug, Clone)]
pub struct FirstOrderFilter {
    timestep: f64,
    coeff_u: [f64; 2],
    coeff_y: [f64; 2],
    min: f64,
    max: f64,
    value: f64,
    delay_u: Delay,
    delay_y: Delay,
    last_time: Option<f64>,
    initialized: bool,
}

impl Default for FirstOrderFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl FirstOrderFilter {
    pub fn new() -> Self {
        Self {
            timestep: 0.0,
            coeff_u: [0.0; 2],
            coeff_y: [0.0; 2],
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            value: 0.0,
            delay_u: Delay::new(1),
            delay_y: Delay::new(1),
            last_time: None,
            initialized: false,
        }
    }

    /// Set up coefficients, limits and one-step histories.
    ///
    /// The output history is seeded with `y0` saturated into `[min, max]`.
    #[allow(clippy::too_many_arguments)]
    pub fn initialize(
        &mut self,
        timestep: f64,
        num: [f64; 2],
        den: [f64; 2],
        u0: f64,
        y0: f64,
        min: f64,
        max: f64,
    ) -> NumericResult<()> {
        if timestep <= 0.0 || !timestep.is_finite() {
            return Err(NumericError::InvalidArg {
                what: "filter timestep must be positive",
            });
        }
        if min > max {
            return Err(NumericError::InvalidArg {
                what: "filter min must not exceed max",
            });
        }
        let (coeff_u, coeff_y) = tustin(timestep, num, den)?;
        self.timestep = timestep;
        self.min = min;
        self.max = max;
        self.coeff_u = coeff_u;
        self.coeff_y = coeff_y;

        self.value = y0;
        self.delay_u.set_step_delay(1);
        self.delay_y.set_step_delay(1);
        self.delay_u.initialize(u0);
        self.delay_y.initialize(y0.clamp(min, max));
        self.last_time = None;
        self.initialized = true;
        Ok(())
    }

    /// Re-derive the difference equation for a new transfer function.
    ///
    /// Uses the timestep given to `initialize`; state histories are kept.
    pub fn set_num_den(&mut self, num: [f64; 2], den: [f64; 2]) -> NumericResult<()> {
        let (coeff_u, coeff_y) = tustin(self.timestep, num, den)?;
        self.coeff_u = coeff_u;
        self.coeff_y = coeff_y;
        Ok(())
    }

    pub fn set_min_max(&mut self, min: f64, max: f64) {
        self.min = min;
        self.max = max;
    }

    /// Reset both histories and the current output.
    pub fn initialize_values(&mut self, u0: f64, y0: f64) {
        self.assert_initialized();
        self.delay_u.initialize_values(u0);
        self.delay_y.initialize_values(y0);
        self.value = y0;
    }

    /// Advance the filter with input `u` at simulation time `time`.
    ///
    /// A second call with the same `time` is ignored, so several callers
    /// within one step see a single update.
    pub fn update(&mut self, time: f64, u: f64) {
        self.assert_initialized();
        if self.last_time == Some(time) {
            return;
        }

        let y = (self.coeff_u[1] * u + self.coeff_u[0] * self.delay_u.value()
            - self.coeff_y[0] * self.delay_y.value())
            / self.coeff_y[1];

        if y > self.max {
            self.saturate(self.max);
        } else if y < self.min {
            self.saturate(self.min);
        } else {
            self.value = y;
            self.delay_u.update(u);
            self.delay_y.update(y);
        }
        self.last_time = Some(time);
    }

    fn saturate(&mut self, limit: f64) {
        self.delay_u.initialize_values(limit);
        self.delay_y.initialize_values(limit);
        self.value = limit;
    }

    /// `update(time, u)` followed by [`FirstOrderFilter::value`].
    pub fn value_with(&mut self, time: f64, u: f64) -> f64 {
        self.update(time, u);
        self.value
    }

    /// The current filter output.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Update using the last buffered input in place of a new one.
    ///
    /// The result is provisional: the caller must follow up with a real
    /// [`FirstOrderFilter::update`] or [`FirstOrderFilter::value_with`].
    pub fn value_provisional(&mut self, time: f64) -> f64 {
        self.assert_initialized();
        let u = self.delay_u.value_idx(1);
        self.value_with(time, u)
    }

    /// `([cU0, cU1], [cY0, cY1])`.
    pub fn coefficients(&self) -> ([f64; 2], [f64; 2]) {
        (self.coeff_u, self.coeff_y)
    }

    /// Buffered previous input.
    pub fn delayed_input(&self) -> f64 {
        self.delay_u.value()
    }

    /// Buffered previous output.
    pub fn delayed_output(&self) -> f64 {
        self.delay_y.value()
    }

    pub fn last_update_time(&self) -> Option<f64> {
        self.last_time
    }

    fn assert_initialized(&self) {
        assert!(self.initialized, "FirstOrderFilter used before initialize()");
    }
}

/// Bilinear coefficients `(coeff_u, coeff_y)` of `num / den` at step `dt`.
fn tustin(dt: f64, num: [f64; 2], den: [f64; 2]) -> NumericResult<([f64; 2], [f64; 2])> {
    let coeff_u = [num[1] * dt - 2.0 * num[0], num[1] * dt + 2.0 * num[0]];
    let coeff_y = [den[1] * dt - 2.0 * den[0], den[1] * dt + 2.0 * den[0]];
    if coeff_y[1] == 0.0 {
        return Err(NumericError::ZeroCoefficient {
            what: "filter output coefficient den[1]*dt + 2*den[0]",
        });
    }
    for c in coeff_u.iter().chain(coeff_y.iter()) {
        if !c.is_finite() {
            return Err(NumericError::NonFinite {
                what: "filter coefficient",
                value: *c,
            });
        }
    }
    Ok((coeff_u, coeff_y))
}
