//! Signal components with state: a first order filter and an integrator.

use crate::common::{bound, check_finite, core_accessors};
use tlm_graph::{SlotRef, signal};
use tlm_numeric::{FirstOrderFilter, Integrator};
use tlm_sim::{Component, ComponentCore, CqsType, Parameter, SimContext, SimResult};

/// `G(s) = k (1 + s/wnum) / (1 + s/wden)` with output limits.
#[derive(Debug)]
pub struct SignalFirstOrderFilter {
    core: ComponentCore,
    slots: Option<(SlotRef, SlotRef)>,
    filter: FirstOrderFilter,
}

impl SignalFirstOrderFilter {
    pub const TYPE_NAME: &'static str = "SignalFirstOrderFilter";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::S),
            slots: None,
            filter: FirstOrderFilter::new(),
        }
    }
}

impl Default for SignalFirstOrderFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for SignalFirstOrderFilter {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_optional_input("in", 0.0)?;
        self.core.add_optional_output("out")?;
        self.core
            .add_parameter(Parameter::real("k", 1.0).description("Gain"))?;
        self.core.add_parameter(
            Parameter::real("wnum", 1e10)
                .description("Numerator break frequency")
                .unit("rad/s")
                .range(f64::MIN_POSITIVE, f64::MAX),
        )?;
        self.core.add_parameter(
            Parameter::real("wden", 1e3)
                .description("Denominator break frequency")
                .unit("rad/s")
                .range(f64::MIN_POSITIVE, f64::MAX),
        )?;
        self.core.add_parameter(
            Parameter::real("y_min", -1.5e300).description("Lower output limit"),
        )?;
        self.core
            .add_parameter(Parameter::real("y_max", 1.5e300).description("Upper output limit"))
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let p = self.core.parameters();
        let k = p.real("k")?;
        let wnum = p.real("wnum")?;
        let wden = p.real("wden")?;
        let (min, max) = (p.real("y_min")?, p.real("y_max")?);
        let input = self.core.slot("in", signal::VALUE)?;
        let out = self.core.slot("out", signal::VALUE)?;
        self.filter.initialize(
            ctx.timestep,
            [k / wnum, k],
            [1.0 / wden, 1.0],
            ctx.read(input),
            ctx.read(out),
            min,
            max,
        )?;
        ctx.write(out, self.filter.value());
        self.slots = Some((input, out));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let (input, out) = bound(self.slots, &self.core)?;
        let y = self.filter.value_with(ctx.time, ctx.read(input));
        ctx.write(out, check_finite(self.core.name(), y, "filter output")?);
        Ok(())
    }
}

/// Trapezoidal integral of the input, starting from the output's start value.
#[derive(Debug)]
pub struct SignalIntegrator {
    core: ComponentCore,
    slots: Option<(SlotRef, SlotRef)>,
    integrator: Integrator,
}

impl SignalIntegrator {
    pub const TYPE_NAME: &'static str = "SignalIntegrator";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::S),
            slots: None,
            integrator: Integrator::new(),
        }
    }
}

impl Default for SignalIntegrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for SignalIntegrator {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_optional_input("in", 0.0)?;
        self.core.add_optional_output("out")
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let input = self.core.slot("in", signal::VALUE)?;
        let out = self.core.slot("out", signal::VALUE)?;
        self.integrator
            .initialize(ctx.timestep, ctx.read(input), ctx.read(out));
        self.slots = Some((input, out));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let (input, out) = bound(self.slots, &self.core)?;
        let y = self.integrator.value_with(ctx.time, ctx.read(input));
        ctx.write(out, check_finite(self.core.name(), y, "integrator output")?);
        Ok(())
    }
}
