//! Small components used by the system tests.

#![allow(dead_code)]

use tlm_graph::{NodeType, SlotRef, hydraulic, signal};
use tlm_numeric::FirstOrderFilter;
use tlm_sim::{
    Component, ComponentCore, ComponentFactory, CqsType, Parameter, SimContext, SimError,
    SimResult, register_subsystem,
};

fn bound<T>(slots: Option<T>, core: &ComponentCore) -> SimResult<T> {
    slots.ok_or_else(|| SimError::Lifecycle {
        component: core.name().to_string(),
        what: "simulated before initialize".to_string(),
    })
}

/// Writes `start` before `step_time` and `start + size` after.
pub struct Step {
    core: ComponentCore,
    out: Option<SlotRef>,
    start: f64,
    size: f64,
    step_time: f64,
}

impl Step {
    pub fn boxed() -> Box<dyn Component> {
        Box::new(Self {
            core: ComponentCore::new("Step", CqsType::S),
            out: None,
            start: 0.0,
            size: 1.0,
            step_time: 0.0,
        })
    }
}

impl Component for Step {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_write_port("out", NodeType::Signal)?;
        self.core.add_parameter(Parameter::real("start", 0.0))?;
        self.core.add_parameter(Parameter::real("size", 1.0))?;
        self.core.add_parameter(Parameter::real("step_time", 0.0))?;
        Ok(())
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let p = self.core.parameters();
        self.start = p.real("start")?;
        self.size = p.real("size")?;
        self.step_time = p.real("step_time")?;
        let out = self.core.slot("out", signal::VALUE)?;
        ctx.write(out, self.start);
        self.out = Some(out);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let value = if ctx.time < self.step_time {
            self.start
        } else {
            self.start + self.size
        };
        ctx.write(bound(self.out, &self.core)?, value);
        Ok(())
    }
}

/// Identity transfer function `1 / 1` through a first order filter.
pub struct Lag {
    core: ComponentCore,
    input: Option<SlotRef>,
    out: Option<SlotRef>,
    filter: FirstOrderFilter,
}

impl Lag {
    pub fn boxed() -> Box<dyn Component> {
        Box::new(Self {
            core: ComponentCore::new("Lag", CqsType::S),
            input: None,
            out: None,
            filter: FirstOrderFilter::new(),
        })
    }
}

impl Component for Lag {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_optional_input("in", 0.0)?;
        self.core.add_optional_output("out")
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let input = self.core.slot("in", signal::VALUE)?;
        let out = self.core.slot("out", signal::VALUE)?;
        let u0 = ctx.read(input);
        self.filter.initialize(
            ctx.timestep,
            [0.0, 1.0],
            [0.0, 1.0],
            u0,
            u0,
            f64::NEG_INFINITY,
            f64::INFINITY,
        )?;
        ctx.write(out, u0);
        self.input = Some(input);
        self.out = Some(out);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let (input, out) = bound(self.input.zip(self.out), &self.core)?;
        let y = self.filter.value_with(ctx.time, ctx.read(input));
        ctx.write(out, y);
        Ok(())
    }
}

/// `out = k * in`; posts a fatal message when the output exceeds `limit`.
pub struct Gain {
    core: ComponentCore,
    input: Option<SlotRef>,
    out: Option<SlotRef>,
    k: f64,
    limit: f64,
}

impl Gain {
    pub fn boxed() -> Box<dyn Component> {
        Box::new(Self {
            core: ComponentCore::new("Gain", CqsType::S),
            input: None,
            out: None,
            k: 1.0,
            limit: f64::INFINITY,
        })
    }
}

impl Component for Gain {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_read_port("in", NodeType::Signal)?;
        self.core.add_optional_output("out")?;
        self.core.add_parameter(Parameter::real("k", 1.0))?;
        self.core
            .add_parameter(Parameter::real("limit", f64::MAX).range(0.0, f64::MAX))
    }

    fn initialize(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.k = self.core.parameters().real("k")?;
        self.limit = self.core.parameters().real("limit")?;
        self.input = Some(self.core.slot("in", signal::VALUE)?);
        self.out = Some(self.core.slot("out", signal::VALUE)?);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let (input, out) = bound(self.input.zip(self.out), &self.core)?;
        let y = self.k * ctx.read(input);
        if y > self.limit {
            ctx.messages
                .fatal(self.core.name(), format!("output {y} above limit"));
        }
        ctx.write(out, y);
        Ok(())
    }
}

/// Returns a numerical error from the given step on.
pub struct Broken {
    core: ComponentCore,
    fail_at: f64,
}

impl Broken {
    pub fn boxed(fail_at: f64) -> Box<dyn Component> {
        Box::new(Self {
            core: ComponentCore::new("Broken", CqsType::S),
            fail_at,
        })
    }
}

impl Component for Broken {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn configure(&mut self) -> SimResult<()> {
        Ok(())
    }

    fn initialize(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        if ctx.time >= self.fail_at - 1e-12 {
            return Err(SimError::numerical(self.core.name(), "value became NaN"));
        }
        Ok(())
    }
}

/// Fixed pressure source: `c = p`, `Zc = 0`.
pub struct Tank {
    core: ComponentCore,
    port: Option<(SlotRef, SlotRef)>,
}

impl Tank {
    pub fn boxed() -> Box<dyn Component> {
        Box::new(Self {
            core: ComponentCore::new("Tank", CqsType::C),
            port: None,
        })
    }
}

impl Component for Tank {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_power_port("P1", NodeType::Hydraulic)?;
        self.core.add_parameter(Parameter::real("p", 1e5))
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let (c, zc) = self.core.wave_slots("P1")?;
        self.port = Some((c, zc));
        self.simulate_one_timestep(ctx)
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let (c, zc) = bound(self.port, &self.core)?;
        let p = self.core.parameters().real("p")?;
        ctx.write(c, p);
        ctx.write(zc, 0.0);
        Ok(())
    }
}

/// Laminar orifice between two C nodes.
pub struct Orifice {
    core: ComponentCore,
    slots: Option<[SlotRef; 8]>,
    kc: f64,
}

impl Orifice {
    pub fn boxed() -> Box<dyn Component> {
        Box::new(Self {
            core: ComponentCore::new("Orifice", CqsType::Q),
            slots: None,
            kc: 1e-11,
        })
    }
}

impl Component for Orifice {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_power_port("P1", NodeType::Hydraulic)?;
        self.core.add_power_port("P2", NodeType::Hydraulic)?;
        self.core.add_parameter(Parameter::real("Kc", 1e-11))
    }

    fn initialize(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.kc = self.core.parameters().real("Kc")?;
        let s = |port: &str, slot: usize| self.core.slot(port, slot);
        self.slots = Some([
            s("P1", hydraulic::WAVE_VARIABLE)?,
            s("P1", hydraulic::CHAR_IMPEDANCE)?,
            s("P1", hydraulic::FLOW)?,
            s("P1", hydraulic::PRESSURE)?,
            s("P2", hydraulic::WAVE_VARIABLE)?,
            s("P2", hydraulic::CHAR_IMPEDANCE)?,
            s("P2", hydraulic::FLOW)?,
            s("P2", hydraulic::PRESSURE)?,
        ]);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let [c1, z1, q1, p1, c2, z2, q2, p2] = bound(self.slots, &self.core)?;
        let (vc1, vz1, vc2, vz2) = (ctx.read(c1), ctx.read(z1), ctx.read(c2), ctx.read(z2));
        let flow = self.kc * (vc1 - vc2) / (1.0 + self.kc * (vz1 + vz2));
        ctx.write(q2, flow);
        ctx.write(q1, -flow);
        ctx.write(p1, vc1 - vz1 * flow);
        ctx.write(p2, vc2 + vz2 * flow);
        Ok(())
    }
}

pub fn factory() -> ComponentFactory {
    let mut factory = ComponentFactory::new();
    factory.register_creator("Step".to_string(), Step::boxed);
    factory.register_creator("Lag".to_string(), Lag::boxed);
    factory.register_creator("Gain".to_string(), Gain::boxed);
    factory.register_creator("Tank".to_string(), Tank::boxed);
    factory.register_creator("Orifice".to_string(), Orifice::boxed);
    register_subsystem(&mut factory);
    factory
}
