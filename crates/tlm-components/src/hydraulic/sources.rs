//! Ideal pressure and flow sources.

use crate::common::{ParamInput, bound, check_finite, core_accessors};
use tlm_graph::{NodeType, SlotRef, hydraulic};
use tlm_sim::{Component, ComponentCore, CqsType, Parameter, SimContext, SimResult};

/// Stiff pressure source: `c = p`, `Zc = 0`. The pressure comes from `in`
/// when it is connected and from the parameter `p` otherwise.
#[derive(Debug)]
pub struct HydraulicPressureSourceC {
    core: ComponentCore,
    slots: Option<(ParamInput, SlotRef, SlotRef)>,
}

impl HydraulicPressureSourceC {
    pub const TYPE_NAME: &'static str = "HydraulicPressureSourceC";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::C),
            slots: None,
        }
    }
}

impl Default for HydraulicPressureSourceC {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for HydraulicPressureSourceC {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_optional_input("in", 1e5)?;
        self.core.add_power_port("P1", NodeType::Hydraulic)?;
        self.core.add_parameter(
            Parameter::real("p", 1e5)
                .description("Source pressure")
                .unit("Pa"),
        )
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let pressure = ParamInput::resolve(&self.core, ctx, "in", "p")?;
        let (c, zc) = self.core.wave_slots("P1")?;
        self.slots = Some((pressure, c, zc));
        self.simulate_one_timestep(ctx)
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let (pressure, c, zc) = bound(self.slots, &self.core)?;
        let p = check_finite(self.core.name(), pressure.read(ctx), "source pressure")?;
        ctx.write(c, p);
        ctx.write(zc, 0.0);
        Ok(())
    }
}

/// Prescribed flow into the connected node: `q` from `in` or the parameter,
/// `p = c + Zc * q`.
#[derive(Debug)]
pub struct HydraulicFlowSourceQ {
    core: ComponentCore,
    slots: Option<(ParamInput, [SlotRef; 4])>,
}

impl HydraulicFlowSourceQ {
    pub const TYPE_NAME: &'static str = "HydraulicFlowSourceQ";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::Q),
            slots: None,
        }
    }
}

impl Default for HydraulicFlowSourceQ {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for HydraulicFlowSourceQ {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_optional_input("in", 1e-3)?;
        self.core.add_power_port("P1", NodeType::Hydraulic)?;
        self.core.add_parameter(
            Parameter::real("q", 1e-3)
                .description("Source flow")
                .unit("m^3/s"),
        )
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let flow = ParamInput::resolve(&self.core, ctx, "in", "q")?;
        self.slots = Some((
            flow,
            [
                self.core.slot("P1", hydraulic::WAVE_VARIABLE)?,
                self.core.slot("P1", hydraulic::CHAR_IMPEDANCE)?,
                self.core.slot("P1", hydraulic::FLOW)?,
                self.core.slot("P1", hydraulic::PRESSURE)?,
            ],
        ));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let (flow, [c, zc, q, p]) = bound(self.slots, &self.core)?;
        let flow = flow.read(ctx);
        let pressure = check_finite(
            self.core.name(),
            ctx.read(c) + ctx.read(zc) * flow,
            "source pressure",
        )?;
        ctx.write(q, flow);
        ctx.write(p, pressure);
        Ok(())
    }
}
