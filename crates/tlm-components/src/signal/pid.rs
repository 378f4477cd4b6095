//! Discrete PID controller.
//!
//! The control law is written as one implicit equation in `u` and solved with
//! [`EquationSystemSolver`], carrying the previous step's contribution in a
//! one-step [`Delay`]:
//!
//! ```text
//! u + Kd*dy + (2*Kp + KI*dt)*(y - yref)/2 + d = 0
//! d = (-2*dy*Kd - 2*u - 2*Kp*y + KI*dt*y + 2*Kp*yref - KI*dt*yref)/2
//! ```
//!
//! which expands to the velocity form
//! `u_k = u_{k-1} + Kp*(e_k - e_{k-1}) + KI*dt/2*(e_k + e_{k-1}) - Kd*(dy_k - dy_{k-1})`
//! with `e = yref - y`. The output is clamped to `[umin, umax]` before it is
//! fed back, so the integral part does not wind up.

use crate::common::{ParamInput, bound, check_finite, core_accessors};
use nalgebra::DVector;
use tlm_core::numeric::limit_value;
use tlm_graph::{SlotRef, signal};
use tlm_numeric::Delay;
use tlm_sim::{Component, ComponentCore, CqsType, Parameter, SimContext, SimError, SimResult};
use tlm_solver::{DEFAULT_ITERATIONS, EquationSystemSolver};

#[derive(Debug, Clone, Copy)]
struct Gains {
    kp: f64,
    ki: f64,
    kd: f64,
    umin: f64,
    umax: f64,
}

#[derive(Debug, Clone, Copy)]
struct Inputs {
    yref: ParamInput,
    y: ParamInput,
    dy: ParamInput,
    u: SlotRef,
}

#[derive(Debug)]
pub struct SignalPid {
    core: ComponentCore,
    inputs: Option<Inputs>,
    gains: Gains,
    u: f64,
    delayed: Delay,
    solver: Option<EquationSystemSolver>,
}

impl SignalPid {
    pub const TYPE_NAME: &'static str = "SignalPID";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::S),
            inputs: None,
            gains: Gains {
                kp: 1.0,
                ki: 1.0,
                kd: 1.0,
                umin: -1.0,
                umax: 1.0,
            },
            u: 0.0,
            delayed: Delay::new(1),
            solver: None,
        }
    }

    /// Residual norm left by the last time step's Newton solve.
    pub fn residual_norm(&self) -> Option<f64> {
        self.solver.as_ref().map(EquationSystemSolver::last_residual_norm)
    }

    fn delayed_part(&self, dt: f64, yref: f64, y: f64, dy: f64, u: f64) -> f64 {
        let Gains { kp, ki, kd, .. } = self.gains;
        (-2.0 * dy * kd - 2.0 * u - 2.0 * kp * y + ki * dt * y + 2.0 * kp * yref
            - ki * dt * yref)
            / 2.0
    }
}

impl Default for SignalPid {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for SignalPid {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_optional_input("yref", 0.0)?;
        self.core.add_optional_input("y", 0.0)?;
        self.core.add_optional_input("dy", 0.0)?;
        self.core.add_optional_output("u")?;
        let params = [
            ("Kp", 1.0, "Proportional gain"),
            ("KI", 1.0, "Integral gain"),
            ("Kd", 1.0, "Differential gain"),
            ("umin", -1.0, "Minimum output signal"),
            ("umax", 1.0, "Maximum output signal"),
            ("yref", 0.0, "Reference value"),
            ("y", 0.0, "Actual value"),
            ("dy", 0.0, "Differential of actual value"),
        ];
        for (name, default, description) in params {
            self.core
                .add_parameter(Parameter::real(name, default).description(description))?;
        }
        self.core.add_parameter(
            Parameter::int("iterations", DEFAULT_ITERATIONS as i64)
                .description("Newton iterations per time step")
                .range(1.0, f64::MAX),
        )
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let p = self.core.parameters();
        self.gains = Gains {
            kp: p.real("Kp")?,
            ki: p.real("KI")?,
            kd: p.real("Kd")?,
            umin: p.real("umin")?,
            umax: p.real("umax")?,
        };
        let iterations = p.int("iterations")?.max(1) as usize;
        if self.gains.umin > self.gains.umax {
            return Err(SimError::InvalidArg {
                what: "umin must not exceed umax",
            });
        }
        let inputs = Inputs {
            yref: ParamInput::resolve(&self.core, ctx, "yref", "yref")?,
            y: ParamInput::resolve(&self.core, ctx, "y", "y")?,
            dy: ParamInput::resolve(&self.core, ctx, "dy", "dy")?,
            u: self.core.slot("u", signal::VALUE)?,
        };

        self.u = self
            .core
            .port("u")
            .and_then(|port| port.start_value(signal::VALUE))
            .unwrap_or(0.0);
        let d0 = self.delayed_part(
            ctx.timestep,
            inputs.yref.read(ctx),
            inputs.y.read(ctx),
            inputs.dy.read(ctx),
            self.u,
        );
        self.delayed.initialize(d0);
        let mut solver = EquationSystemSolver::new(1)?;
        solver.set_iterations(iterations)?;
        self.solver = Some(solver);
        ctx.write(inputs.u, self.u);
        self.inputs = Some(inputs);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let inputs = bound(self.inputs, &self.core)?;
        let (yref, y, dy) = (
            inputs.yref.read(ctx),
            inputs.y.read(ctx),
            inputs.dy.read(ctx),
        );
        let Gains { kp, ki, kd, .. } = self.gains;
        let dt = ctx.timestep;
        let delayed = self.delayed.value();

        let mut state = DVector::from_element(1, self.u);
        let solver = self
            .solver
            .as_mut()
            .ok_or_else(|| SimError::numerical(self.core.name(), "solver missing"))?;
        solver.solve(&mut state, |x, f, j| {
            f[0] = dy * kd + x[0] + (2.0 * kp + ki * dt) * (y - yref) / 2.0 + delayed;
            j[(0, 0)] = 1.0;
        })?;

        let u = limit_value(state[0], self.gains.umin, self.gains.umax);
        self.u = check_finite(self.core.name(), u, "controller output")?;
        let next = self.delayed_part(dt, yref, y, dy, self.u);
        self.delayed.update(next);
        ctx.write(inputs.u, self.u);
        Ok(())
    }
}
