//! Variable displacement hydraulic motor with an inertia load.

use crate::common::{ParamInput, bound, check_finite, core_accessors};
use std::f64::consts::TAU;
use tlm_core::numeric::limit_value;
use tlm_graph::{NodeType, SlotRef, hydraulic, mechanic_rotational as rot};
use tlm_numeric::DoubleIntegratorWithDamping;
use tlm_sim::{Component, ComponentCore, CqsType, Parameter, SimContext, SimResult};

#[derive(Debug, Clone, Copy)]
struct Slots {
    eps: ParamInput,
    hyd: [[SlotRef; 4]; 2],
    // c, Zx, torque, angle, angular velocity
    shaft: [SlotRef; 5],
}

#[derive(Debug, Clone, Copy)]
struct MotorParams {
    displacement: f64,
    friction: f64,
    leakage: f64,
    inertia: f64,
}

/// Effective quantities after the leakage coupling of both chambers.
#[derive(Debug, Clone, Copy)]
struct Effective {
    damping: f64,
    gamma: f64,
    c1: f64,
    c2: f64,
    torque: f64,
}

/// Q-type motor: P1/P2 hydraulic, P3 rotational shaft, optional `in` for the
/// displacement setting `epsilon_m` in `[-1, 1]`.
#[derive(Debug)]
pub struct HydraulicVariableDisplacementMotorQ {
    core: ComponentCore,
    slots: Option<Slots>,
    params: MotorParams,
    integrator: DoubleIntegratorWithDamping,
}

impl HydraulicVariableDisplacementMotorQ {
    pub const TYPE_NAME: &'static str = "HydraulicVariableDisplacementMotorQ";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::Q),
            slots: None,
            params: MotorParams {
                displacement: 5e-5,
                friction: 0.0,
                leakage: 0.0,
                inertia: 0.1,
            },
            integrator: DoubleIntegratorWithDamping::new(),
        }
    }

    fn effective(&self, dpe: f64, c: [f64; 2], zc: [f64; 2], c3: f64, zx3: f64) -> Effective {
        let MotorParams {
            friction, leakage, ..
        } = self.params;
        let damping = friction + (zc[0] + zc[1]) * dpe * dpe + zx3;
        let gamma = 1.0 / (leakage * (zc[0] + zc[1]) + 1.0);
        let c1 = (leakage * zc[1] + 1.0) * gamma * c[0] + leakage * gamma * zc[0] * c[1];
        let c2 = (leakage * zc[0] + 1.0) * gamma * c[1] + leakage * gamma * zc[1] * c[0];
        Effective {
            damping,
            gamma,
            c1,
            c2,
            torque: (c1 - c2) * dpe - c3,
        }
    }
}

impl Default for HydraulicVariableDisplacementMotorQ {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for HydraulicVariableDisplacementMotorQ {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_power_port("P1", NodeType::Hydraulic)?;
        self.core.add_power_port("P2", NodeType::Hydraulic)?;
        self.core
            .add_power_port("P3", NodeType::MechanicRotational)?;
        self.core.add_optional_input("in", 1.0)?;
        self.core.add_parameter(
            Parameter::real("D_m", 5e-5)
                .description("Displacement")
                .unit("m^3/rev"),
        )?;
        self.core.add_parameter(
            Parameter::real("B_m", 0.0)
                .description("Viscous friction")
                .unit("Nms/rad")
                .range(0.0, f64::MAX),
        )?;
        self.core.add_parameter(
            Parameter::real("C_i,m", 0.0)
                .description("Leakage coefficient")
                .unit("m^3/(s Pa)")
                .range(0.0, f64::MAX),
        )?;
        self.core.add_parameter(
            Parameter::real("J_m", 0.1)
                .description("Inertia load")
                .unit("kg m^2")
                .range(f64::MIN_POSITIVE, f64::MAX),
        )?;
        self.core.add_parameter(
            Parameter::real("epsilon_m", 1.0)
                .description("Displacement setting")
                .range(-1.0, 1.0),
        )
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let p = self.core.parameters();
        self.params = MotorParams {
            displacement: p.real("D_m")?,
            friction: p.real("B_m")?,
            leakage: p.real("C_i,m")?,
            inertia: p.real("J_m")?,
        };
        let s = |port: &str, slot: usize| self.core.slot(port, slot);
        let hyd = |port: &str| -> SimResult<[SlotRef; 4]> {
            Ok([
                s(port, hydraulic::WAVE_VARIABLE)?,
                s(port, hydraulic::CHAR_IMPEDANCE)?,
                s(port, hydraulic::PRESSURE)?,
                s(port, hydraulic::FLOW)?,
            ])
        };
        let slots = Slots {
            eps: ParamInput::resolve(&self.core, ctx, "in", "epsilon_m")?,
            hyd: [hyd("P1")?, hyd("P2")?],
            shaft: [
                s("P3", rot::WAVE_VARIABLE)?,
                s("P3", rot::CHAR_IMPEDANCE)?,
                s("P3", rot::TORQUE)?,
                s("P3", rot::ANGLE)?,
                s("P3", rot::ANGULAR_VELOCITY)?,
            ],
        };
        let angle = ctx.read(slots.shaft[3]);
        let speed = ctx.read(slots.shaft[4]);
        self.integrator
            .initialize(ctx.timestep, 0.0, 0.0, angle, speed);
        self.slots = Some(slots);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let slots = bound(self.slots, &self.core)?;
        let [[c1s, z1s, p1s, q1s], [c2s, z2s, p2s, q2s]] = slots.hyd;
        let [c3s, zx3s, t3s, a3s, w3s] = slots.shaft;
        let mut c = [ctx.read(c1s), ctx.read(c2s)];
        let mut zc = [ctx.read(z1s), ctx.read(z2s)];
        let (c3, zx3) = (ctx.read(c3s), ctx.read(zx3s));
        let eps = limit_value(slots.eps.read(ctx), -1.0, 1.0);
        let dt = ctx.timestep;
        let j = self.params.inertia;

        let dpe = self.params.displacement / TAU * eps;
        let mut eff = self.effective(dpe, c, zc, c3, zx3);
        self.integrator.set_damping(eff.damping / j * dt);
        self.integrator.integrate_with_undo(eff.torque / j);
        let mut w3 = self.integrator.value_first();
        let mut a3 = self.integrator.value_second();

        let mut q1a = -dpe * w3;
        let mut p1 = eff.c1 + eff.gamma * zc[0] * q1a;
        let mut p2 = eff.c2 - eff.gamma * zc[1] * q1a;

        if p1 < 0.0 || p2 < 0.0 {
            // Cavitating chambers are decoupled from their lines.
            for (i, p) in [p1, p2].into_iter().enumerate() {
                if p < 0.0 {
                    c[i] = 0.0;
                    zc[i] = 0.0;
                }
            }
            eff = self.effective(dpe, c, zc, c3, zx3);
            self.integrator.set_damping(eff.damping / j * dt);
            self.integrator.redo_integrate(eff.torque / j);
            w3 = self.integrator.value_first();
            a3 = self.integrator.value_second();

            q1a = -dpe * w3;
            p1 = eff.c1 + eff.gamma * zc[0] * q1a;
            p2 = eff.c2 - eff.gamma * zc[1] * q1a;
            if p1 <= 0.0 {
                p1 = 0.0;
                q1a = q1a.max(0.0);
                w3 = w3.min(0.0);
            }
            if p2 <= 0.0 {
                p2 = 0.0;
                q1a = q1a.min(0.0);
                w3 = w3.max(0.0);
            }
            self.integrator
                .initialize_values(eff.torque / j, a3, w3);
        }

        let q1leak = -self.params.leakage * (p1 - p2);
        let q1 = check_finite(self.core.name(), q1a + q1leak, "P1 flow")?;
        let q2 = -q1;
        let t3 = check_finite(self.core.name(), c3 + zx3 * w3, "shaft torque")?;

        ctx.write(p1s, p1);
        ctx.write(q1s, q1);
        ctx.write(p2s, p2);
        ctx.write(q2s, q2);
        ctx.write(t3s, t3);
        ctx.write(a3s, a3);
        ctx.write(w3s, w3);
        Ok(())
    }
}
