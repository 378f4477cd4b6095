//! Static signal arithmetic.

use crate::common::{bound, check_finite, core_accessors};
use tlm_graph::{SlotRef, signal};
use tlm_sim::{Component, ComponentCore, CqsType, Parameter, SimContext, SimResult};

/// `out = k * in`
#[derive(Debug)]
pub struct SignalGain {
    core: ComponentCore,
    slots: Option<(SlotRef, SlotRef)>,
    k: f64,
}

impl SignalGain {
    pub const TYPE_NAME: &'static str = "SignalGain";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::S),
            slots: None,
            k: 1.0,
        }
    }
}

impl Default for SignalGain {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for SignalGain {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_optional_input("in", 0.0)?;
        self.core.add_optional_output("out")?;
        self.core
            .add_parameter(Parameter::real("k", 1.0).description("Gain"))
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.k = self.core.parameters().real("k")?;
        let input = self.core.slot("in", signal::VALUE)?;
        let out = self.core.slot("out", signal::VALUE)?;
        self.slots = Some((input, out));
        ctx.write(out, self.k * ctx.read(input));
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let (input, out) = bound(self.slots, &self.core)?;
        let y = check_finite(self.core.name(), self.k * ctx.read(input), "gain output")?;
        ctx.write(out, y);
        Ok(())
    }
}

/// `out = in1 + in2`
#[derive(Debug)]
pub struct SignalSum {
    core: ComponentCore,
    slots: Option<[SlotRef; 3]>,
}

impl SignalSum {
    pub const TYPE_NAME: &'static str = "SignalSum";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::S),
            slots: None,
        }
    }
}

impl Default for SignalSum {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for SignalSum {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_optional_input("in1", 0.0)?;
        self.core.add_optional_input("in2", 0.0)?;
        self.core.add_optional_output("out")
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.slots = Some([
            self.core.slot("in1", signal::VALUE)?,
            self.core.slot("in2", signal::VALUE)?,
            self.core.slot("out", signal::VALUE)?,
        ]);
        self.simulate_one_timestep(ctx)
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let [in1, in2, out] = bound(self.slots, &self.core)?;
        ctx.write(out, ctx.read(in1) + ctx.read(in2));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::bench::Bench;

    #[test]
    fn gain_scales_and_rejects_nan() {
        let mut bench = Bench::new(0.01);
        let mut gain = SignalGain::new();
        let ids = bench.configure(&mut gain);
        gain.core_mut().parameters_mut().set("k", -2.0).unwrap();
        bench.set(ids[0], signal::VALUE, 1.5);
        bench.initialize(&mut gain).unwrap();
        assert_eq!(bench.get(ids[1], signal::VALUE), -3.0);

        bench.set(ids[0], signal::VALUE, f64::NAN);
        let err = bench.step(&mut gain).unwrap_err();
        assert_eq!(err.class(), tlm_sim::ErrorClass::Numerical);
    }

    #[test]
    fn sum_uses_defaults_for_open_inputs() {
        let mut bench = Bench::new(0.01);
        let mut sum = SignalSum::new();
        let ids = bench.configure(&mut sum);
        bench.set(ids[0], signal::VALUE, 2.0);
        bench.initialize(&mut sum).unwrap();
        assert_eq!(bench.get(ids[2], signal::VALUE), 2.0);
        bench.set(ids[1], signal::VALUE, 0.5);
        bench.step(&mut sum).unwrap();
        assert_eq!(bench.get(ids[2], signal::VALUE), 2.5);
    }
}
