//! Trapezoidal integrators.

use crate::delay::Delay;

/// Trapezoidal integrator `y_k = y_{k-1} + dt/2 * (u_k + u_{k-1})`.
#[derive(Debug, Clone, Default)]
pub struct Integrator {
    timestep: f64,
    delay_u: Delay,
    delay_y: Delay,
    value: f64,
    last_time: Option<f64>,
    initialized: bool,
}

impl Integrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, timestep: f64, u0: f64, y0: f64) {
        self.timestep = timestep;
        self.delay_u.set_step_delay(1);
        self.delay_y.set_step_delay(1);
        self.delay_u.initialize(u0);
        self.delay_y.initialize(y0);
        self.value = y0;
        self.last_time = None;
        self.initialized = true;
    }

    /// Reset the histories without touching the timestep.
    pub fn initialize_values(&mut self, u0: f64, y0: f64) {
        self.assert_initialized();
        self.delay_u.initialize_values(u0);
        self.delay_y.initialize_values(y0);
        self.value = y0;
    }

    /// Integrate one step with input `u`; ignored if `time` was already seen.
    pub fn update(&mut self, time: f64, u: f64) {
        self.assert_initialized();
        if self.last_time == Some(time) {
            return;
        }
        let y = self.delay_y.value() + self.timestep / 2.0 * (u + self.delay_u.value());
        self.push_sample(u, y);
        self.last_time = Some(time);
    }

    /// Record an externally decided `(u, y)` pair as the latest sample.
    ///
    /// Used by limited integrators that clip `y` after integrating.
    pub fn push_sample(&mut self, u: f64, y: f64) {
        self.assert_initialized();
        self.delay_u.update(u);
        self.delay_y.update(y);
        self.value = y;
    }

    /// `update(time, u)` followed by [`Integrator::value`].
    pub fn value_with(&mut self, time: f64, u: f64) -> f64 {
        self.update(time, u);
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    fn assert_initialized(&self) {
        assert!(self.initialized, "Integrator used before initialize()");
    }
}

/// One sample of a [`DoubleIntegratorWithDamping`]: input, velocity, position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DampedState {
    pub u: f64,
    pub v: f64,
    pub x: f64,
}

/// Integrates an acceleration `u` into velocity `v` and position `x` with
/// viscous damping:
///
/// ```text
/// v_k = ((2 - w) v_{k-1} + dt (u_k + u_{k-1})) / (2 + w)
/// x_k = x_{k-1} + dt/2 (v_k + v_{k-1})
/// ```
///
/// where `w = b/J * dt` is the per-step damping.
///
/// Components that can only detect a limit violation after integrating (for
/// example cavitation in a motor) use the two-phase API: compute a
/// [`DampedState`] with [`DoubleIntegratorWithDamping::tentative`], inspect
/// it, then [`DoubleIntegratorWithDamping::commit`] either that step or one
/// recomputed with corrected damping. [`integrate_with_undo`] and
/// [`redo_integrate`] wrap the same pattern for in-place use.
///
/// [`integrate_with_undo`]: DoubleIntegratorWithDamping::integrate_with_undo
/// [`redo_integrate`]: DoubleIntegratorWithDamping::redo_integrate
#[derive(Debug, Clone, Default)]
pub struct DoubleIntegratorWithDamping {
    timestep: f64,
    damping: f64,
    state: DampedState,
    undo: Option<DampedState>,
    initialized: bool,
}

impl DoubleIntegratorWithDamping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self, timestep: f64, damping: f64, u0: f64, x0: f64, v0: f64) {
        self.timestep = timestep;
        self.damping = damping;
        self.state = DampedState {
            u: u0,
            v: v0,
            x: x0,
        };
        self.undo = None;
        self.initialized = true;
    }

    pub fn set_damping(&mut self, damping: f64) {
        self.damping = damping;
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Overwrite the stored sample, e.g. after a component clipped the result.
    pub fn initialize_values(&mut self, u0: f64, x0: f64, v0: f64) {
        self.assert_initialized();
        self.state = DampedState {
            u: u0,
            v: v0,
            x: x0,
        };
        self.undo = None;
    }

    /// The step that integrating `u` would produce. Does not mutate.
    pub fn tentative(&self, u: f64) -> DampedState {
        self.assert_initialized();
        let prev = self.state;
        let dt = self.timestep;
        let w = self.damping;
        let v = ((2.0 - w) * prev.v + dt * (u + prev.u)) / (2.0 + w);
        let x = prev.x + dt / 2.0 * (v + prev.v);
        DampedState { u, v, x }
    }

    /// Accept `step` as the newest sample.
    pub fn commit(&mut self, step: DampedState) {
        self.assert_initialized();
        self.state = step;
    }

    /// Integrate and commit in one call.
    pub fn integrate(&mut self, u: f64) -> DampedState {
        let step = self.tentative(u);
        self.commit(step);
        step
    }

    /// Integrate and commit, remembering the prior sample for [`Self::redo_integrate`].
    pub fn integrate_with_undo(&mut self, u: f64) -> DampedState {
        self.assert_initialized();
        self.undo = Some(self.state);
        self.integrate(u)
    }

    /// Discard the last [`Self::integrate_with_undo`] step and integrate `u`
    /// from the prior sample, typically after [`Self::set_damping`].
    ///
    /// # Panics
    ///
    /// Panics if there is no step to undo.
    pub fn redo_integrate(&mut self, u: f64) -> DampedState {
        let prior = self
            .undo
            .take()
            .expect("redo_integrate() requires a preceding integrate_with_undo()");
        self.state = prior;
        self.undo = Some(prior);
        self.integrate(u)
    }

    /// Latest velocity.
    pub fn value_first(&self) -> f64 {
        self.state.v
    }

    /// Latest position.
    pub fn value_second(&self) -> f64 {
        self.state.x
    }

    pub fn state(&self) -> DampedState {
        self.state
    }

    fn assert_initialized(&self) {
        assert!(
            self.initialized,
            "DoubleIntegratorWithDamping used before initialize()"
        );
    }
}
