//! Building and editing models: names, connections and reconfiguration.

mod common;

use common::{Gain, Lag, Orifice, Step, Tank, factory};
use tlm_graph::{GraphError, NodeType, signal};
use tlm_sim::{Component, ComponentSystem, Endpoint, ErrorClass, ParameterValue, SimError};

fn graph_err(result: Result<(), SimError>) -> GraphError {
    match result {
        Err(SimError::Graph(e)) => e,
        other => panic!("expected a graph error, got {other:?}"),
    }
}

#[test]
fn names_are_made_unique() {
    let mut root = ComponentSystem::new("Root");
    assert_eq!(root.add_component("Gain", Gain::boxed()).unwrap(), "Gain");
    assert_eq!(root.add_component("Gain", Gain::boxed()).unwrap(), "Gain_1");
    assert_eq!(root.add_component("Gain_1", Gain::boxed()).unwrap(), "Gain_2");
    assert_eq!(root.add_component("", Gain::boxed()).unwrap(), "noName");
    // System ports share the namespace.
    assert_eq!(
        root.add_system_port("Gain", NodeType::Signal).unwrap(),
        "Gain_3"
    );
    assert_eq!(
        root.component_names(),
        vec!["Gain", "Gain_1", "Gain_2", "noName"]
    );
}

#[test]
fn rename_keeps_connections() {
    let mut root = ComponentSystem::new("Root");
    root.add_component("Step", Step::boxed()).unwrap();
    root.add_component("Gain", Gain::boxed()).unwrap();
    root.connect(("Step", "out"), ("Gain", "in")).unwrap();

    assert_eq!(root.rename_component("Gain", "Step").unwrap(), "Step_1");
    assert!(root.component("Gain").is_none());
    assert_eq!(root.component("Step_1").unwrap().name(), "Step_1");
    assert!(root.is_connected(("Step", "out"), ("Step_1", "in")));
    assert_eq!(
        root.connections(),
        vec![(Endpoint::child("Step", "out"), Endpoint::child("Step_1", "in"))]
    );
}

#[test]
fn connection_rules() {
    let mut root = ComponentSystem::new("Root");
    root.add_component("S1", Step::boxed()).unwrap();
    root.add_component("S2", Step::boxed()).unwrap();
    root.add_component("G1", Gain::boxed()).unwrap();
    root.add_component("G2", Gain::boxed()).unwrap();
    root.add_component("T", Tank::boxed()).unwrap();

    assert!(matches!(
        graph_err(root.connect(("S1", "out"), ("T", "P1"))),
        GraphError::NodeTypeMismatch { .. }
    ));
    assert_eq!(
        graph_err(root.connect(("G1", "in"), ("G2", "in"))),
        GraphError::ReadOnlyNode
    );
    assert!(matches!(
        graph_err(root.connect(("S1", "out"), ("S1", "out"))),
        GraphError::AlreadyConnected { .. }
    ));

    root.connect(("S1", "out"), ("G1", "in")).unwrap();
    // A third port joins the existing node.
    root.connect(("G2", "in"), ("S1", "out")).unwrap();
    assert!(matches!(
        graph_err(root.connect(("S2", "out"), ("G1", "in"))),
        GraphError::MultipleWriters { .. }
    ));
    assert!(matches!(
        graph_err(root.connect(("G1", "in"), ("G2", "in"))),
        GraphError::AlreadyConnected { .. }
    ));

    // Both already connected to different nodes.
    root.connect(("S2", "out"), ("G2", "out")).unwrap_err();
    root.add_component("G3", Gain::boxed()).unwrap();
    root.connect(("G1", "out"), ("G3", "in")).unwrap();
    assert!(matches!(
        graph_err(root.connect(("G3", "in"), ("S1", "out"))),
        GraphError::BothConnected { .. }
    ));

    assert!(matches!(
        root.connect(("Nope", "out"), ("G1", "in")),
        Err(SimError::UnknownComponent { .. })
    ));
    assert!(matches!(
        root.connect(("S1", "nope"), ("G1", "in")),
        Err(SimError::UnknownPort { .. })
    ));
}

#[test]
fn power_ports_limit() {
    let mut root = ComponentSystem::new("Root");
    root.add_component("A", Tank::boxed()).unwrap();
    root.add_component("O", Orifice::boxed()).unwrap();
    root.add_component("B", Tank::boxed()).unwrap();
    root.connect(("A", "P1"), ("O", "P1")).unwrap();
    let err = root.connect(("B", "P1"), ("O", "P1")).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Structural);
    assert!(matches!(
        err,
        SimError::Graph(GraphError::TooManyPowerPorts { .. })
    ));
    // The failed attempt left nothing behind.
    assert_eq!(root.connections().len(), 1);
    root.connect(("B", "P1"), ("O", "P2")).unwrap();
}

#[test]
fn disconnect_removes_the_node_when_two_ports_remain() {
    let mut root = ComponentSystem::new("Root");
    root.add_component("S", Step::boxed()).unwrap();
    root.add_component("G1", Gain::boxed()).unwrap();
    root.add_component("G2", Gain::boxed()).unwrap();
    root.connect(("S", "out"), ("G1", "in")).unwrap();
    root.connect(("S", "out"), ("G2", "in")).unwrap();
    assert_eq!(root.node_snapshots().len(), 1);

    root.disconnect(("S", "out"), ("G1", "in")).unwrap();
    assert_eq!(root.node_snapshots()[0].ports, vec!["S.out", "G2.in"]);
    assert!(root.is_connected(("S", "out"), ("G2", "in")));

    root.disconnect(("S", "out"), ("G2", "in")).unwrap();
    assert!(root.node_snapshots().is_empty());
    assert!(root.connections().is_empty());
    // Both ends are free again.
    root.connect(("G2", "in"), ("S", "out")).unwrap();

    assert!(matches!(
        graph_err(root.disconnect(("S", "out"), ("G1", "in"))),
        GraphError::NotConnected { .. }
    ));
}

#[test]
fn remove_component_disconnects_it() {
    let mut root = ComponentSystem::new("Root");
    root.add_component("S", Step::boxed()).unwrap();
    root.add_component("G", Gain::boxed()).unwrap();
    root.add_component("L", Lag::boxed()).unwrap();
    root.connect(("S", "out"), ("G", "in")).unwrap();
    root.connect(("S", "out"), ("L", "in")).unwrap();

    let removed = root.remove_component("S").unwrap();
    assert_eq!(removed.name(), "S");
    assert!(removed.core().ports().iter().all(|p| !p.is_connected()));
    assert!(root.connections().is_empty());
    assert!(root.node_snapshots().is_empty());
    assert_eq!(root.component_names(), vec!["G", "L"]);

    // The name is free again.
    assert_eq!(root.add_component("S", Step::boxed()).unwrap(), "S");
}

#[test]
fn parameters_through_the_system() {
    let mut root = ComponentSystem::new("Root");
    root.add_component("G", Gain::boxed()).unwrap();
    root.set_parameter_str("G", "k", "2.5").unwrap();
    assert_eq!(root.parameter("G", "k").unwrap(), ParameterValue::Real(2.5));

    let err = root.set_parameter("G", "missing", 1.0).unwrap_err();
    assert_eq!(err.class(), ErrorClass::Configuration);
    assert!(matches!(
        root.set_parameter("Nope", "k", 1.0),
        Err(SimError::UnknownComponent { .. })
    ));
}

#[test]
fn reconfigure_keeps_values_and_connections() {
    let mut root = ComponentSystem::new("Root");
    root.add_component("S", Step::boxed()).unwrap();
    root.add_component("G", Gain::boxed()).unwrap();
    root.connect(("S", "out"), ("G", "in")).unwrap();
    root.set_parameter("G", "k", 3.0).unwrap();
    root.set_start_value("G", "out", "Value", 0.25).unwrap();

    root.reconfigure("G").unwrap();
    assert_eq!(root.parameter("G", "k").unwrap(), ParameterValue::Real(3.0));
    let out = root.component("G").unwrap().core().port("out").unwrap();
    assert_eq!(out.start_value(signal::VALUE), Some(0.25));
    assert!(root.is_connected(("S", "out"), ("G", "in")));
    assert!(root.messages().is_empty());
}

#[test]
fn system_ports() {
    let mut f = factory();
    let mut root = ComponentSystem::new("Root");
    root.add_new(&mut f, "Subsystem", "Sub").unwrap();
    root.add_new(&mut f, "Step", "S").unwrap();
    let sub = root.subsystem_mut("Sub").unwrap();
    sub.add_system_port("in", NodeType::Signal).unwrap();
    sub.add_new(&mut f, "Gain", "G").unwrap();
    sub.connect(Endpoint::system("in"), ("G", "in")).unwrap();
    root.connect(("S", "out"), ("Sub", "in")).unwrap();

    let sub = root.subsystem_mut("Sub").unwrap();
    assert!(matches!(
        sub.remove_system_port("in"),
        Err(SimError::PortInUse { .. })
    ));

    root.disconnect(("S", "out"), ("Sub", "in")).unwrap();
    let sub = root.subsystem_mut("Sub").unwrap();
    sub.remove_system_port("in").unwrap();
    assert!(sub.connections().is_empty());
    assert!(sub.component("G").unwrap().core().port("in").unwrap().node().is_none());
}

#[test]
fn node_snapshots_serialize() {
    let mut root = ComponentSystem::new("Root");
    root.add_component("A", Tank::boxed()).unwrap();
    root.add_component("O", Orifice::boxed()).unwrap();
    root.connect(("A", "P1"), ("O", "P1")).unwrap();

    let json = serde_json::to_value(root.node_snapshots()).unwrap();
    assert_eq!(json[0]["node_type"], "Hydraulic");
    assert_eq!(json[0]["ports"][1], "O.P1");
    assert_eq!(json[0]["values"][1][0], "Pressure");
}

#[test]
fn unknown_factory_type() {
    let mut f = factory();
    let mut root = ComponentSystem::new("Root");
    let err = root.add_new(&mut f, "Missing", "X").unwrap_err();
    assert!(matches!(err, SimError::UnknownType { .. }));
    assert!(root.component_names().is_empty());
}
