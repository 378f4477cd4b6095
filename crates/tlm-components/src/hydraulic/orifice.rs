//! Orifices between two hydraulic C nodes.

use crate::common::{bound, check_finite, core_accessors};
use nalgebra::DVector;
use tlm_core::numeric::{dx_low_limit, low_limit};
use tlm_graph::{NodeType, SlotRef, hydraulic};
use tlm_sim::{Component, ComponentCore, CqsType, Parameter, SimContext, SimError, SimResult};
use tlm_solver::{DEFAULT_ITERATIONS, EquationSystemSolver};

/// c, Zc, p, q of one port.
type PortSlots = [SlotRef; 4];

fn port_slots(core: &ComponentCore, port: &str) -> SimResult<PortSlots> {
    Ok([
        core.slot(port, hydraulic::WAVE_VARIABLE)?,
        core.slot(port, hydraulic::CHAR_IMPEDANCE)?,
        core.slot(port, hydraulic::PRESSURE)?,
        core.slot(port, hydraulic::FLOW)?,
    ])
}

fn add_ports(core: &mut ComponentCore) -> SimResult<()> {
    core.add_power_port("P1", NodeType::Hydraulic)?;
    core.add_power_port("P2", NodeType::Hydraulic)
}

/// `q2 = Kc * (p1 - p2)`, solved directly against both lines.
///
/// A side whose pressure would turn negative is treated as cavitating: its
/// wave is dropped and the flow recomputed, then both pressures are clamped
/// at zero.
#[derive(Debug)]
pub struct HydraulicLaminarOrificeQ {
    core: ComponentCore,
    slots: Option<[PortSlots; 2]>,
    kc: f64,
}

impl HydraulicLaminarOrificeQ {
    pub const TYPE_NAME: &'static str = "HydraulicLaminarOrificeQ";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::Q),
            slots: None,
            kc: 1e-11,
        }
    }

    /// `(q2, p1, p2)` for the given waves.
    fn solve(&self, c: [f64; 2], zc: [f64; 2]) -> (f64, f64, f64) {
        let q2 = self.kc * (c[0] - c[1]) / (1.0 + self.kc * (zc[0] + zc[1]));
        (q2, c[0] - zc[0] * q2, c[1] + zc[1] * q2)
    }
}

impl Default for HydraulicLaminarOrificeQ {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for HydraulicLaminarOrificeQ {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        add_ports(&mut self.core)?;
        self.core.add_parameter(
            Parameter::real("Kc", 1e-11)
                .description("Pressure-flow coefficient")
                .unit("m^5/Ns")
                .range(0.0, f64::MAX),
        )
    }

    fn initialize(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.kc = self.core.parameters().real("Kc")?;
        self.slots = Some([port_slots(&self.core, "P1")?, port_slots(&self.core, "P2")?]);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let [[c1, z1, p1s, q1s], [c2, z2, p2s, q2s]] = bound(self.slots, &self.core)?;
        let mut c = [ctx.read(c1), ctx.read(c2)];
        let mut zc = [ctx.read(z1), ctx.read(z2)];
        let (mut q2, mut p1, mut p2) = self.solve(c, zc);

        if p1 < 0.0 || p2 < 0.0 {
            for (i, p) in [p1, p2].into_iter().enumerate() {
                if p < 0.0 {
                    c[i] = 0.0;
                    zc[i] = 0.0;
                }
            }
            (q2, p1, p2) = self.solve(c, zc);
        }

        let q2 = check_finite(self.core.name(), q2, "orifice flow")?;
        ctx.write(q1s, -q2);
        ctx.write(q2s, q2);
        ctx.write(p1s, low_limit(p1, 0.0));
        ctx.write(p2s, low_limit(p2, 0.0));
        Ok(())
    }
}

/// Square-root orifice `q = Cq * A * sqrt(2 * dp / rho)`, blended into a
/// laminar characteristic near `dp = 0` so the Jacobian stays bounded.
///
/// With `g(dp) = dp / sqrt(a + b * |dp|)`, `a = (A / Kl)^2` and
/// `b = rho / (2 * Cq^2)`, the unknowns `[q1, p1, p2]` satisfy
///
/// ```text
/// q1 + A * g(p1 - p2)          = 0
/// p1 - max(c1 + Zc1 * q1, 0)   = 0
/// p2 - max(c2 - Zc2 * q1, 0)   = 0
/// ```
///
/// solved with a few damped Newton iterations from the previous step's state.
#[derive(Debug)]
pub struct HydraulicTurbulentOrificeQ {
    core: ComponentCore,
    slots: Option<[PortSlots; 2]>,
    area: f64,
    a: f64,
    b: f64,
    state: DVector<f64>,
    solver: Option<EquationSystemSolver>,
}

impl HydraulicTurbulentOrificeQ {
    pub const TYPE_NAME: &'static str = "HydraulicTurbulentOrificeQ";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::Q),
            slots: None,
            area: 1e-5,
            a: 1.0,
            b: 1.0,
            state: DVector::zeros(3),
            solver: None,
        }
    }

    /// Flow function and its derivative with respect to `dp`.
    fn g(a: f64, b: f64, dp: f64) -> (f64, f64) {
        let s = a + b * dp.abs();
        let root = s.sqrt();
        (dp / root, 1.0 / root - b * dp.abs() / (2.0 * s * root))
    }

    /// Residual norm left by the last time step's Newton solve.
    pub fn residual_norm(&self) -> Option<f64> {
        self.solver.as_ref().map(EquationSystemSolver::last_residual_norm)
    }

    /// Steady flow `q2` for a pressure drop `dp = p1 - p2`.
    pub fn flow(&self, dp: f64) -> f64 {
        self.area * Self::g(self.a, self.b, dp).0
    }
}

impl Default for HydraulicTurbulentOrificeQ {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for HydraulicTurbulentOrificeQ {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        add_ports(&mut self.core)?;
        self.core.add_parameter(
            Parameter::real("Cq", 0.67)
                .description("Flow coefficient")
                .range(f64::MIN_POSITIVE, f64::MAX),
        )?;
        self.core.add_parameter(
            Parameter::real("A", 1e-5)
                .description("Opening area")
                .unit("m^2")
                .range(0.0, f64::MAX),
        )?;
        self.core.add_parameter(
            Parameter::real("rho", 890.0)
                .description("Oil density")
                .unit("kg/m^3")
                .range(f64::MIN_POSITIVE, f64::MAX),
        )?;
        self.core.add_parameter(
            Parameter::real("Kl", 1e-8)
                .description("Laminar flow coefficient near zero pressure drop")
                .unit("m^3/(s Pa)")
                .range(f64::MIN_POSITIVE, f64::MAX),
        )?;
        self.core.add_parameter(
            Parameter::int("iterations", DEFAULT_ITERATIONS as i64)
                .description("Newton iterations per time step")
                .range(1.0, f64::MAX),
        )
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let p = self.core.parameters();
        let cq = p.real("Cq")?;
        self.area = p.real("A")?;
        let rho = p.real("rho")?;
        let kl = p.real("Kl")?;
        let iterations = p.int("iterations")?.max(1) as usize;
        self.a = (self.area / kl).powi(2).max(f64::MIN_POSITIVE);
        self.b = rho / (2.0 * cq * cq);

        let slots = [port_slots(&self.core, "P1")?, port_slots(&self.core, "P2")?];
        let [[_, _, p1, q1], [_, _, p2, _]] = slots;
        self.state = DVector::from_vec(vec![ctx.read(q1), ctx.read(p1), ctx.read(p2)]);
        let mut solver = EquationSystemSolver::new(3)?;
        solver.set_iterations(iterations)?;
        self.solver = Some(solver);
        self.slots = Some(slots);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let [[c1s, z1s, p1s, q1s], [c2s, z2s, p2s, q2s]] = bound(self.slots, &self.core)?;
        let (c1, zc1, c2, zc2) = (ctx.read(c1s), ctx.read(z1s), ctx.read(c2s), ctx.read(z2s));
        let (area, a, b) = (self.area, self.a, self.b);

        let solver = self
            .solver
            .as_mut()
            .ok_or_else(|| SimError::numerical(self.core.name(), "solver missing"))?;
        solver
            .solve(&mut self.state, |x, f, j| {
                let (q1, p1, p2) = (x[0], x[1], x[2]);
                let (g, dg) = Self::g(a, b, p1 - p2);
                let side1 = c1 + zc1 * q1;
                let side2 = c2 - zc2 * q1;
                f[0] = q1 + area * g;
                f[1] = p1 - low_limit(side1, 0.0);
                f[2] = p2 - low_limit(side2, 0.0);

                j.fill(0.0);
                j[(0, 0)] = 1.0;
                j[(0, 1)] = area * dg;
                j[(0, 2)] = -area * dg;
                j[(1, 0)] = -zc1 * dx_low_limit(side1, 0.0);
                j[(1, 1)] = 1.0;
                j[(2, 0)] = zc2 * dx_low_limit(side2, 0.0);
                j[(2, 2)] = 1.0;
            })?;

        let name = self.core.name();
        let q1 = check_finite(name, self.state[0], "orifice flow")?;
        ctx.write(q1s, q1);
        ctx.write(q2s, -q1);
        ctx.write(p1s, low_limit(check_finite(name, self.state[1], "P1 pressure")?, 0.0));
        ctx.write(p2s, low_limit(check_finite(name, self.state[2], "P2 pressure")?, 0.0));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::bench::Bench;
    use proptest::prelude::*;

    fn between_sources<C: Component>(
        mut orifice: C,
        c1: f64,
        c2: f64,
        zc: f64,
        steps: usize,
    ) -> (Bench, C, Vec<tlm_core::NodeId>) {
        let mut bench = Bench::new(1e-3);
        let ids = bench.configure(&mut orifice);
        bench.initialize(&mut orifice).unwrap();
        for (id, c) in [(ids[0], c1), (ids[1], c2)] {
            bench.set(id, hydraulic::WAVE_VARIABLE, c);
            bench.set(id, hydraulic::CHAR_IMPEDANCE, zc);
        }
        for _ in 0..steps {
            bench.step(&mut orifice).unwrap();
        }
        (bench, orifice, ids)
    }

    #[test]
    fn laminar_flow_follows_pressure_drop() {
        let (bench, _, ids) =
            between_sources(HydraulicLaminarOrificeQ::new(), 2e5, 1e5, 0.0, 1);
        assert!((bench.get(ids[1], hydraulic::FLOW) - 1e-6).abs() < 1e-18);
        assert_eq!(
            bench.get(ids[0], hydraulic::FLOW),
            -bench.get(ids[1], hydraulic::FLOW)
        );
        assert_eq!(bench.get(ids[0], hydraulic::PRESSURE), 2e5);
    }

    #[test]
    fn laminar_cavitation_keeps_pressures_non_negative() {
        let mut orifice = HydraulicLaminarOrificeQ::new();
        let mut bench = Bench::new(1e-3);
        let ids = bench.configure(&mut orifice);
        orifice.core_mut().parameters_mut().set("Kc", 1e-8).unwrap();
        bench.initialize(&mut orifice).unwrap();
        bench.set(ids[0], hydraulic::WAVE_VARIABLE, 1e5);
        bench.set(ids[0], hydraulic::CHAR_IMPEDANCE, 1e9);
        bench.set(ids[1], hydraulic::WAVE_VARIABLE, -1e6);
        bench.set(ids[1], hydraulic::CHAR_IMPEDANCE, 0.0);
        bench.step(&mut orifice).unwrap();
        // Both sides cavitate, which leaves nothing to drive a flow.
        assert_eq!(bench.get(ids[0], hydraulic::PRESSURE), 0.0);
        assert_eq!(bench.get(ids[1], hydraulic::PRESSURE), 0.0);
        assert_eq!(bench.get(ids[1], hydraulic::FLOW), 0.0);
    }

    #[test]
    fn turbulent_flow_converges_to_square_root_law() {
        let (bench, orifice, ids) =
            between_sources(HydraulicTurbulentOrificeQ::new(), 10e5, 1e5, 0.0, 5);
        let expected = orifice.flow(9e5);
        let q2 = bench.get(ids[1], hydraulic::FLOW);
        assert!((q2 - expected).abs() < 1e-9 * expected, "q2 = {q2}");
        // Far from the laminar region this is Cq*A*sqrt(2*dp/rho).
        let ideal = 0.67 * 1e-5 * (2.0 * 9e5 / 890.0_f64).sqrt();
        assert!((q2 - ideal).abs() < 0.01 * ideal);
    }

    #[test]
    fn more_iterations_leave_a_smaller_residual() {
        let residual_after = |iterations: i64| {
            let mut orifice = HydraulicTurbulentOrificeQ::new();
            let mut bench = Bench::new(1e-3);
            let ids = bench.configure(&mut orifice);
            orifice
                .core_mut()
                .parameters_mut()
                .set("iterations", iterations)
                .unwrap();
            bench.initialize(&mut orifice).unwrap();
            bench.set(ids[0], hydraulic::WAVE_VARIABLE, 10e5);
            bench.set(ids[1], hydraulic::WAVE_VARIABLE, 1e5);
            bench.step(&mut orifice).unwrap();
            orifice.residual_norm().unwrap()
        };
        let one = residual_after(1);
        let four = residual_after(4);
        assert_ne!(one, four);
        assert!(four < one, "1 iteration: {one}, 4 iterations: {four}");
    }

    #[test]
    fn zero_iterations_are_rejected() {
        let mut orifice = HydraulicTurbulentOrificeQ::new();
        Bench::new(1e-3).configure(&mut orifice);
        assert!(
            orifice
                .core_mut()
                .parameters_mut()
                .set("iterations", 0_i64)
                .is_err()
        );
    }

    #[test]
    fn turbulent_with_line_impedance_stays_consistent() {
        let (bench, _, ids) =
            between_sources(HydraulicTurbulentOrificeQ::new(), 10e5, 1e5, 1e9, 200);
        let q1 = bench.get(ids[0], hydraulic::FLOW);
        let p1 = bench.get(ids[0], hydraulic::PRESSURE);
        let p2 = bench.get(ids[1], hydraulic::PRESSURE);
        assert!(q1 < 0.0);
        assert!((p1 - (10e5 + 1e9 * q1)).abs() < 1.0);
        assert!((p2 - (1e5 - 1e9 * q1)).abs() < 1.0);
    }

    proptest! {
        #[test]
        fn turbulent_characteristic_is_odd_and_monotonic(dp in 1.0..1e7_f64) {
            let o = HydraulicTurbulentOrificeQ::new();
            prop_assert_eq!(o.flow(-dp), -o.flow(dp));
            prop_assert!(o.flow(dp * 1.5) > o.flow(dp));
            let (_, dg) = HydraulicTurbulentOrificeQ::g(o.a, o.b, dp);
            prop_assert!(dg > 0.0);
        }
    }
}
