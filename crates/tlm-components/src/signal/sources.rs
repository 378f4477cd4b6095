//! Signal sources and the recording sink.

use crate::common::{bound, core_accessors};
use tlm_graph::{NodeType, SlotRef, signal};
use tlm_sim::{Component, ComponentCore, CqsType, Parameter, SimContext, SimResult};

/// Writes the parameter `y` every step.
#[derive(Debug)]
pub struct SignalConstant {
    core: ComponentCore,
    out: Option<SlotRef>,
    value: f64,
}

impl SignalConstant {
    pub const TYPE_NAME: &'static str = "SignalConstant";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::S),
            out: None,
            value: 1.0,
        }
    }
}

impl Default for SignalConstant {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for SignalConstant {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_optional_output("out")?;
        self.core
            .add_parameter(Parameter::real("y", 1.0).description("Constant value"))
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.value = self.core.parameters().real("y")?;
        let out = self.core.slot("out", signal::VALUE)?;
        ctx.write(out, self.value);
        self.out = Some(out);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let out = bound(self.out, &self.core)?;
        ctx.write(out, self.value);
        Ok(())
    }
}

/// `StartValue` before `StepTime`, `StartValue + StepSize` from then on.
#[derive(Debug)]
pub struct SignalStep {
    core: ComponentCore,
    out: Option<SlotRef>,
    start: f64,
    size: f64,
    step_time: f64,
}

impl SignalStep {
    pub const TYPE_NAME: &'static str = "SignalStep";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::S),
            out: None,
            start: 0.0,
            size: 1.0,
            step_time: 1.0,
        }
    }

    fn value_at(&self, time: f64) -> f64 {
        if time < self.step_time {
            self.start
        } else {
            self.start + self.size
        }
    }
}

impl Default for SignalStep {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for SignalStep {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_optional_output("out")?;
        self.core.add_parameter(
            Parameter::real("StartValue", 0.0).description("Value before the step"),
        )?;
        self.core
            .add_parameter(Parameter::real("StepSize", 1.0).description("Height of the step"))?;
        self.core.add_parameter(
            Parameter::real("StepTime", 1.0)
                .description("Time of the step")
                .unit("s"),
        )
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let p = self.core.parameters();
        self.start = p.real("StartValue")?;
        self.size = p.real("StepSize")?;
        self.step_time = p.real("StepTime")?;
        let out = self.core.slot("out", signal::VALUE)?;
        ctx.write(out, self.value_at(ctx.time));
        self.out = Some(out);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let out = bound(self.out, &self.core)?;
        ctx.write(out, self.value_at(ctx.time));
        Ok(())
    }
}

/// Records `(time, value)` of its input every `log_every` steps.
#[derive(Debug)]
pub struct SignalSink {
    core: ComponentCore,
    input: Option<SlotRef>,
    every: u64,
    steps: u64,
    samples: Vec<(f64, f64)>,
}

impl SignalSink {
    pub const TYPE_NAME: &'static str = "SignalSink";

    pub fn new() -> Self {
        Self {
            core: ComponentCore::new(Self::TYPE_NAME, CqsType::S),
            input: None,
            every: 1,
            steps: 0,
            samples: Vec::new(),
        }
    }

    pub fn samples(&self) -> &[(f64, f64)] {
        &self.samples
    }
}

impl Default for SignalSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for SignalSink {
    core_accessors!();

    fn configure(&mut self) -> SimResult<()> {
        self.core.add_read_port("in", NodeType::Signal)?;
        self.core.add_parameter(
            Parameter::int("log_every", 1)
                .description("Record every n-th step")
                .range(1.0, f64::MAX),
        )
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.every = self.core.parameters().int("log_every")?.max(1) as u64;
        let input = self.core.slot("in", signal::VALUE)?;
        self.samples.clear();
        self.samples.push((ctx.time, ctx.read(input)));
        self.steps = 0;
        self.input = Some(input);
        Ok(())
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let input = bound(self.input, &self.core)?;
        self.steps += 1;
        if self.steps % self.every == 0 {
            self.samples.push((ctx.time, ctx.read(input)));
        }
        Ok(())
    }

    fn finalize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        if let Some(&(time, value)) = self.samples.last() {
            ctx.messages.info(
                self.core.name(),
                format!(
                    "recorded {} samples, last {value} at t = {time}",
                    self.samples.len()
                ),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::bench::Bench;

    #[test]
    fn step_switches_at_step_time() {
        let mut bench = Bench::new(0.1);
        let mut step = SignalStep::new();
        let ids = bench.configure(&mut step);
        step.core_mut()
            .parameters_mut()
            .set("StepTime", 0.25)
            .unwrap();
        bench.initialize(&mut step).unwrap();
        assert_eq!(bench.get(ids[0], signal::VALUE), 0.0);

        let mut seen = Vec::new();
        for _ in 0..4 {
            bench.step(&mut step).unwrap();
            seen.push(bench.get(ids[0], signal::VALUE));
        }
        assert_eq!(seen, vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn sink_decimates_and_reports() {
        let mut bench = Bench::new(0.1);
        let mut sink = SignalSink::new();
        let ids = bench.configure(&mut sink);
        sink.core_mut()
            .parameters_mut()
            .set("log_every", 2_i64)
            .unwrap();
        bench.initialize(&mut sink).unwrap();
        for i in 0..4 {
            bench.set(ids[0], signal::VALUE, i as f64);
            bench.step(&mut sink).unwrap();
        }
        let values: Vec<f64> = sink.samples().iter().map(|s| s.1).collect();
        assert_eq!(values, vec![0.0, 1.0, 3.0]);

        let mut ctx = SimContext {
            time: bench.time,
            timestep: bench.dt,
            nodes: &mut bench.nodes,
            messages: &mut bench.messages,
        };
        sink.finalize(&mut ctx).unwrap();
        assert_eq!(bench.messages.len(), 1);
    }

    #[test]
    fn stepping_before_initialize_is_refused() {
        let mut bench = Bench::new(0.1);
        let mut constant = SignalConstant::new();
        bench.configure(&mut constant);
        assert!(bench.step(&mut constant).is_err());
    }
}
