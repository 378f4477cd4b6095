//! Running a demo model and collecting a trace.

use crate::error::{CliError, CliResult};
use crate::models::DemoModel;
use serde::Serialize;
use tlm_sim::{
    ComponentFactory, ComponentSystem, Message, NodeSnapshot, RunOutcome, SimOptions,
};
use tracing::{debug, info};

/// Node values at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    pub time: f64,
    pub nodes: Vec<NodeSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub model: String,
    pub options: SimOptions,
    pub steps: u64,
    pub execution_order: Vec<String>,
    pub algebraic_loop: Vec<String>,
    pub samples: Vec<Sample>,
    #[serde(rename = "final")]
    pub final_nodes: Vec<NodeSnapshot>,
    pub messages: Vec<Message>,
}

/// Build `model` under a fresh root system and run it with `options`.
///
/// With `log_every > 0` node values are recorded at the start and after every
/// `log_every`-th step.
pub fn run_model(
    model: &DemoModel,
    factory: &mut ComponentFactory,
    options: &SimOptions,
) -> CliResult<RunReport> {
    let mut root = ComponentSystem::with_options("Root", options)?;
    model.build(&mut root, factory)?;
    info!(model = model.name, components = root.component_names().len(), "model built");

    root.initialize(options.start_time, options.stop_time)?;
    let execution_order = root.execution_order();
    let algebraic_loop = root.algebraic_loop();
    if !algebraic_loop.is_empty() {
        debug!(components = ?algebraic_loop, "algebraic loop among signal components");
    }

    let mut samples = Vec::new();
    let steps = if options.log_every == 0 {
        match root.simulate(options.stop_time)? {
            RunOutcome::Completed { steps } => steps,
            RunOutcome::Stopped { steps } => return Err(CliError::Stopped { steps }),
        }
    } else {
        record(&mut root, options, &mut samples)?
    };

    let final_nodes = root.node_snapshots();
    root.finalize()?;
    info!(model = model.name, steps, samples = samples.len(), "run finished");

    Ok(RunReport {
        model: model.name.to_string(),
        options: options.clone(),
        steps,
        execution_order,
        algebraic_loop,
        samples,
        final_nodes,
        messages: root.messages().messages().cloned().collect(),
    })
}

fn record(
    root: &mut ComponentSystem,
    options: &SimOptions,
    samples: &mut Vec<Sample>,
) -> CliResult<u64> {
    let every = options.log_every as u64;
    let total = options.step_count();
    samples.push(Sample {
        time: root.time(),
        nodes: root.node_snapshots(),
    });
    for step in 1..=total {
        root.simulate_one_timestep()?;
        if step % every == 0 || step == total {
            samples.push(Sample {
                time: root.time(),
                nodes: root.node_snapshots(),
            });
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models;
    use tlm_components::register_default_library;

    fn factory() -> ComponentFactory {
        let mut factory = ComponentFactory::new();
        register_default_library(&mut factory);
        factory
    }

    #[test]
    fn recording_takes_first_last_and_every_nth_step() {
        let options = SimOptions {
            stop_time: 0.1,
            log_every: 30,
            ..SimOptions::default()
        };
        let model = models::find("orifice-volume").unwrap();
        let report = run_model(model, &mut factory(), &options).unwrap();
        assert_eq!(report.steps, 100);
        let times: Vec<f64> = report.samples.iter().map(|s| s.time).collect();
        assert_eq!(times.len(), 5);
        assert_eq!(times[0], 0.0);
        assert!((times[4] - 0.1).abs() < 1e-9);
    }

    #[test]
    fn without_recording_only_final_values_are_kept() {
        let options = SimOptions {
            stop_time: 0.05,
            ..SimOptions::default()
        };
        let model = models::find("pid-loop").unwrap();
        let report = run_model(model, &mut factory(), &options).unwrap();
        assert_eq!(report.steps, 50);
        assert!(report.samples.is_empty());
        assert!(!report.final_nodes.is_empty());
        assert!(!report.algebraic_loop.is_empty());
    }
}
