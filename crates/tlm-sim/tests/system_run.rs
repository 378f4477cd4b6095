//! Running systems: ordering, stepping, subsystems and abort handling.

mod common;

use common::{Broken, Gain, Lag, Orifice, Step, Tank, factory};
use std::sync::atomic::Ordering;
use tlm_graph::NodeType;
use tlm_sim::{
    ComponentSystem, CqsType, Endpoint, LifecycleState, MessageLevel, RunOutcome, SimError,
    SimOptions,
};

fn step_into_lag(dt: f64) -> ComponentSystem {
    let mut root = ComponentSystem::new("Root");
    root.set_timestep(dt).unwrap();
    // Added reader first; ordering must still run the writer first.
    root.add_component("Lag", Lag::boxed()).unwrap();
    root.add_component("Step", Step::boxed()).unwrap();
    root.set_parameter("Step", "size", 5.0).unwrap();
    root.connect(("Step", "out"), ("Lag", "in")).unwrap();
    root
}

#[test]
fn step_through_identity_filter() {
    let mut root = step_into_lag(0.1);
    root.initialize(0.0, 1.0).unwrap();
    assert_eq!(root.execution_order(), vec!["Step", "Lag"]);

    let outcome = root.simulate(1.0).unwrap();
    assert_eq!(outcome, RunOutcome::Completed { steps: 10 });
    assert!((root.time() - 1.0).abs() < 1e-12);
    let y = root.port_value(("Lag", "out"), "Value").unwrap();
    assert!((y - 5.0).abs() < 1e-12, "got {y}");

    root.finalize().unwrap();
    assert_eq!(root.state(), LifecycleState::Finalized);
}

#[test]
fn c_then_q_then_s() {
    let mut root = ComponentSystem::new("Root");
    root.add_component("Gain", Gain::boxed()).unwrap();
    root.add_component("Orifice", Orifice::boxed()).unwrap();
    root.add_component("Tank", Tank::boxed()).unwrap();
    root.add_component("Tank", Tank::boxed()).unwrap();
    root.add_component("Step", Step::boxed()).unwrap();
    root.connect(("Tank", "P1"), ("Orifice", "P1")).unwrap();
    root.connect(("Tank_1", "P1"), ("Orifice", "P2")).unwrap();
    root.connect(("Step", "out"), ("Gain", "in")).unwrap();

    root.initialize(0.0, 0.01).unwrap();
    assert_eq!(
        root.execution_order(),
        vec!["Tank", "Tank_1", "Orifice", "Step", "Gain"]
    );
}

#[test]
fn laminar_orifice_between_tanks() {
    let mut root = ComponentSystem::new("Root");
    root.add_component("High", Tank::boxed()).unwrap();
    root.add_component("Low", Tank::boxed()).unwrap();
    root.add_component("Orifice", Orifice::boxed()).unwrap();
    root.set_parameter("High", "p", 2e5).unwrap();
    root.set_parameter("Orifice", "Kc", 1e-10).unwrap();
    root.connect(("High", "P1"), ("Orifice", "P1")).unwrap();
    root.connect(("Orifice", "P2"), ("Low", "P1")).unwrap();

    root.initialize(0.0, 0.01).unwrap();
    root.simulate(0.01).unwrap();

    let q = root.port_value(("Orifice", "P2"), "Flow").unwrap();
    assert!((q - 1e-10 * 1e5).abs() < 1e-15);
    let p = root.port_value(("Low", "P1"), "Pressure").unwrap();
    assert_eq!(p, 1e5);
}

#[test]
fn optional_ports_read_their_default() {
    let mut root = ComponentSystem::new("Root");
    root.add_component("Lag", Lag::boxed()).unwrap();
    root.set_start_value("Lag", "in", "Value", 3.0).unwrap();
    root.initialize(0.0, 0.1).unwrap();
    root.simulate(0.1).unwrap();
    assert_eq!(root.port_value(("Lag", "out"), "Value").unwrap(), 3.0);

    // The private nodes are gone once the run is over.
    root.finalize().unwrap();
    assert!(root.port_value(("Lag", "out"), "Value").is_err());
}

#[test]
fn required_port_must_be_connected() {
    let mut root = ComponentSystem::new("Root");
    root.add_component("Gain", Gain::boxed()).unwrap();
    let err = root.initialize(0.0, 1.0).unwrap_err();
    assert!(matches!(err, SimError::RequiredPortUnconnected { .. }));
    assert_eq!(root.state(), LifecycleState::Configured);
    assert_eq!(root.messages().count(MessageLevel::Error), 1);
}

#[test]
fn step_error_aborts_the_run() {
    let mut root = ComponentSystem::new("Root");
    root.set_timestep(0.1).unwrap();
    root.add_component("Broken", Broken::boxed(0.3)).unwrap();
    root.initialize(0.0, 1.0).unwrap();

    let err = root.simulate(1.0).unwrap_err();
    match err {
        SimError::InComponent { component, source } => {
            assert_eq!(component, "Broken");
            assert!(matches!(*source, SimError::Numerical { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!((root.time() - 0.3).abs() < 1e-12);
    assert!(matches!(
        root.simulate_one_timestep(),
        Err(SimError::Lifecycle { .. })
    ));

    root.finalize().unwrap();
    root.initialize(0.0, 1.0).unwrap();
    assert_eq!(root.time(), 0.0);
}

#[test]
fn fatal_message_stops_after_the_component() {
    let mut root = ComponentSystem::new("Root");
    root.set_timestep(0.1).unwrap();
    root.add_component("Step", Step::boxed()).unwrap();
    root.add_component("Gain", Gain::boxed()).unwrap();
    root.set_parameter("Step", "size", 10.0).unwrap();
    root.set_parameter("Gain", "limit", 5.0).unwrap();
    root.connect(("Step", "out"), ("Gain", "in")).unwrap();
    root.initialize(0.0, 1.0).unwrap();

    let err = root.simulate_one_timestep().unwrap_err();
    assert!(matches!(err, SimError::Fatal { ref component, .. } if component == "Gain"));
    assert_eq!(root.messages().count(MessageLevel::Fatal), 1);
}

#[test]
fn stop_handle_interrupts_simulate() {
    let mut root = step_into_lag(0.1);
    root.initialize(0.0, 1.0).unwrap();
    root.simulate_one_timestep().unwrap();

    let stop = root.stop_handle();
    stop.store(true, Ordering::Release);
    assert_eq!(root.simulate(1.0).unwrap(), RunOutcome::Stopped { steps: 0 });

    stop.store(false, Ordering::Release);
    assert_eq!(
        root.simulate(1.0).unwrap(),
        RunOutcome::Completed { steps: 9 }
    );
}

#[test]
fn cannot_simulate_before_initialize() {
    let mut root = step_into_lag(0.1);
    assert!(matches!(
        root.simulate_one_timestep(),
        Err(SimError::Lifecycle { .. })
    ));
    assert!(matches!(root.finalize(), Err(SimError::Lifecycle { .. })));
}

#[test]
fn no_edits_while_simulating() {
    let mut root = step_into_lag(0.1);
    root.initialize(0.0, 1.0).unwrap();
    root.simulate_one_timestep().unwrap();
    assert!(matches!(
        root.add_component("Other", Step::boxed()),
        Err(SimError::Lifecycle { .. })
    ));
    assert!(matches!(
        root.disconnect(("Step", "out"), ("Lag", "in")),
        Err(SimError::Lifecycle { .. })
    ));
    root.finalize().unwrap();
    root.disconnect(("Step", "out"), ("Lag", "in")).unwrap();
}

/// `Step -> Sub.in`, inside `Sub`: `in -> Lag -> out`, then `Sub.out -> Gain`.
fn with_signal_subsystem(sub_dt: Option<f64>) -> ComponentSystem {
    let mut f = factory();
    let mut root = ComponentSystem::new("Root");
    root.set_timestep(0.1).unwrap();
    root.add_new(&mut f, "Gain", "Gain").unwrap();
    root.add_new(&mut f, "Subsystem", "Sub").unwrap();
    root.add_new(&mut f, "Step", "Step").unwrap();
    root.set_parameter("Step", "size", 2.0).unwrap();

    let sub = root.subsystem_mut("Sub").unwrap();
    match sub_dt {
        Some(dt) => sub.set_timestep(dt).unwrap(),
        None => sub.inherit_timestep(),
    }
    sub.add_system_port("in", NodeType::Signal).unwrap();
    sub.add_system_port("out", NodeType::Signal).unwrap();
    sub.add_new(&mut f, "Lag", "Lag").unwrap();
    sub.connect(Endpoint::system("in"), ("Lag", "in")).unwrap();
    sub.connect(("Lag", "out"), Endpoint::system("out")).unwrap();

    root.connect(("Step", "out"), ("Sub", "in")).unwrap();
    root.connect(("Sub", "out"), ("Gain", "in")).unwrap();
    root
}

#[test]
fn subsystem_passes_signals_through() {
    let mut root = with_signal_subsystem(None);
    root.initialize(0.0, 0.5).unwrap();
    assert_eq!(root.execution_order(), vec!["Step", "Sub", "Gain"]);
    assert_eq!(root.component("Sub").unwrap().cqs_type(), CqsType::S);

    root.simulate(0.5).unwrap();
    assert_eq!(root.port_value(("Gain", "out"), "Value").unwrap(), 2.0);
    let sub = root.subsystem("Sub").unwrap();
    assert!((sub.time() - 0.5).abs() < 1e-12);
}

#[test]
fn subsystem_substeps() {
    let mut root = with_signal_subsystem(Some(0.025));
    root.initialize(0.0, 0.2).unwrap();
    root.simulate(0.2).unwrap();
    let sub = root.subsystem("Sub").unwrap();
    assert!((sub.timestep() - 0.025).abs() < 1e-15);
    assert!((sub.time() - 0.2).abs() < 1e-12);
    assert_eq!(root.port_value(("Gain", "out"), "Value").unwrap(), 2.0);
}

#[test]
fn subsystem_timestep_must_divide_parent() {
    let mut root = with_signal_subsystem(Some(0.03));
    assert!(matches!(
        root.initialize(0.0, 1.0),
        Err(SimError::InComponent { ref source, .. })
            if matches!(**source, SimError::InvalidTimestep { .. })
    ));
}

#[test]
fn mixed_boundary_is_rejected() {
    let mut f = factory();
    let mut root = ComponentSystem::new("Root");
    root.add_new(&mut f, "Subsystem", "Sub").unwrap();
    root.add_new(&mut f, "Tank", "A").unwrap();
    root.add_new(&mut f, "Orifice", "B").unwrap();
    root.add_new(&mut f, "Tank", "C").unwrap();
    {
        let sub = root.subsystem_mut("Sub").unwrap();
        sub.add_system_port("p1", NodeType::Hydraulic).unwrap();
        sub.add_system_port("p2", NodeType::Hydraulic).unwrap();
        sub.add_new(&mut f, "Tank", "InnerC").unwrap();
        sub.add_new(&mut f, "Orifice", "InnerQ").unwrap();
        sub.add_new(&mut f, "Tank", "Other").unwrap();
        sub.connect(Endpoint::system("p1"), ("InnerC", "P1")).unwrap();
        sub.connect(Endpoint::system("p2"), ("InnerQ", "P1")).unwrap();
        sub.connect(("InnerQ", "P2"), ("Other", "P1")).unwrap();
    }
    root.connect(("Sub", "p1"), ("B", "P1")).unwrap();
    root.connect(("Sub", "p2"), ("C", "P1")).unwrap();
    root.connect(("A", "P1"), ("B", "P2")).unwrap();

    let err = root.initialize(0.0, 1.0).unwrap_err();
    assert!(matches!(
        err,
        SimError::InComponent { ref source, .. }
            if matches!(**source, SimError::CqsUndetermined { .. })
    ));
}

#[test]
fn parallel_subsystems_match_sequential() {
    fn model(parallel: bool) -> ComponentSystem {
        let mut f = factory();
        let mut root = ComponentSystem::with_options(
            "Root",
            &SimOptions {
                timestep: 0.05,
                parallel,
                ..SimOptions::default()
            },
        )
        .unwrap();
        for i in 0..4 {
            let name = root.add_new(&mut f, "Subsystem", &format!("Sub{i}")).unwrap();
            let sub = root.subsystem_mut(&name).unwrap();
            sub.add_system_port("out", NodeType::Signal).unwrap();
            sub.add_new(&mut f, "Step", "Step").unwrap();
            sub.add_new(&mut f, "Lag", "Lag").unwrap();
            sub.set_parameter("Step", "size", i as f64 + 1.0).unwrap();
            sub.set_parameter("Step", "step_time", 0.2).unwrap();
            sub.connect(("Step", "out"), ("Lag", "in")).unwrap();
            sub.connect(("Lag", "out"), Endpoint::system("out")).unwrap();
        }
        for i in 0..4 {
            let gain = root.add_new(&mut f, "Gain", &format!("Gain{i}")).unwrap();
            root.connect((format!("Sub{i}").as_str(), "out"), (gain.as_str(), "in"))
                .unwrap();
        }
        root
    }

    let mut results = Vec::new();
    for parallel in [false, true] {
        let mut root = model(parallel);
        root.initialize(0.0, 1.0).unwrap();
        root.simulate(1.0).unwrap();
        let outs: Vec<f64> = (0..4)
            .map(|i| {
                root.port_value((format!("Gain{i}").as_str(), "out"), "Value")
                    .unwrap()
            })
            .collect();
        results.push(outs);
    }
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0], vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn algebraic_loop_is_reported() {
    let mut root = ComponentSystem::new("Root");
    root.add_component("A", Gain::boxed()).unwrap();
    root.add_component("B", Gain::boxed()).unwrap();
    root.connect(("A", "out"), ("B", "in")).unwrap();
    root.connect(("B", "out"), ("A", "in")).unwrap();
    root.initialize(0.0, 0.01).unwrap();
    assert_eq!(root.algebraic_loop(), vec!["A", "B"]);
    assert_eq!(root.execution_order(), vec!["A", "B"]);
    assert_eq!(root.messages().count(MessageLevel::Warning), 1);
}

#[test]
fn stepping_before_initialize_is_a_lifecycle_error() {
    let mut nodes = tlm_graph::NodeArena::new();
    let mut messages = tlm_sim::MessageHandler::new();
    for mut component in [Lag::boxed(), Gain::boxed(), Orifice::boxed(), Tank::boxed()] {
        component.configure().unwrap();
        let mut ctx = tlm_sim::SimContext {
            time: 0.0,
            timestep: 1e-3,
            nodes: &mut nodes,
            messages: &mut messages,
        };
        let err = component.simulate_one_timestep(&mut ctx).unwrap_err();
        assert!(matches!(err, SimError::Lifecycle { .. }), "{err}");
    }
    assert!(messages.is_empty());
}
