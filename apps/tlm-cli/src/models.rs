//! Built-in demo models.

use tlm_graph::NodeType;
use tlm_sim::{ComponentFactory, ComponentSystem, Endpoint, SimError, SimResult};

type Builder = fn(&mut ComponentSystem, &mut ComponentFactory) -> SimResult<()>;

pub struct DemoModel {
    pub name: &'static str,
    pub summary: &'static str,
    build: Builder,
}

impl DemoModel {
    pub fn build(
        &self,
        root: &mut ComponentSystem,
        factory: &mut ComponentFactory,
    ) -> SimResult<()> {
        (self.build)(root, factory)
    }
}

pub const MODELS: &[DemoModel] = &[
    DemoModel {
        name: "orifice-volume",
        summary: "Pump -> laminar orifice -> volume -> laminar orifice -> tank",
        build: orifice_volume,
    },
    DemoModel {
        name: "turbulent-line",
        summary: "Pump -> turbulent orifice -> volume -> laminar orifice -> tank",
        build: turbulent_line,
    },
    DemoModel {
        name: "nested-volume",
        summary: "Two pressure-driven lines, each volume inside its own subsystem",
        build: nested_volume,
    },
    DemoModel {
        name: "pid-loop",
        summary: "PID controller driving an integrator plant to a constant reference",
        build: pid_loop,
    },
    DemoModel {
        name: "motor-shaft",
        summary: "Hydraulic motor driving a second motor through a torsional spring",
        build: motor_shaft,
    },
];

pub fn find(name: &str) -> Option<&'static DemoModel> {
    MODELS.iter().find(|m| m.name == name)
}

fn pressure_source(
    root: &mut ComponentSystem,
    f: &mut ComponentFactory,
    name: &str,
    p: f64,
) -> SimResult<String> {
    let name = root.add_new(f, "HydraulicPressureSourceC", name)?;
    root.set_parameter(&name, "p", p)?;
    Ok(name)
}

fn orifice_volume(root: &mut ComponentSystem, f: &mut ComponentFactory) -> SimResult<()> {
    pressure_source(root, f, "Pump", 10e5)?;
    pressure_source(root, f, "Tank", 1e5)?;
    root.add_new(f, "HydraulicLaminarOrificeQ", "In")?;
    root.add_new(f, "HydraulicVolumeC", "Volume")?;
    root.add_new(f, "HydraulicLaminarOrificeQ", "Out")?;
    root.connect(("Pump", "P1"), ("In", "P1"))?;
    root.connect(("In", "P2"), ("Volume", "P1"))?;
    root.connect(("Volume", "P2"), ("Out", "P1"))?;
    root.connect(("Out", "P2"), ("Tank", "P1"))
}

fn turbulent_line(root: &mut ComponentSystem, f: &mut ComponentFactory) -> SimResult<()> {
    pressure_source(root, f, "Pump", 50e5)?;
    pressure_source(root, f, "Tank", 1e5)?;
    root.add_new(f, "HydraulicTurbulentOrificeQ", "Valve")?;
    root.add_new(f, "HydraulicVolumeC", "Volume")?;
    root.add_new(f, "HydraulicLaminarOrificeQ", "Leak")?;
    root.set_parameter("Leak", "Kc", 1e-9)?;
    root.connect(("Pump", "P1"), ("Valve", "P1"))?;
    root.connect(("Valve", "P2"), ("Volume", "P1"))?;
    root.connect(("Volume", "P2"), ("Leak", "P1"))?;
    root.connect(("Leak", "P2"), ("Tank", "P1"))
}

fn nested_volume(root: &mut ComponentSystem, f: &mut ComponentFactory) -> SimResult<()> {
    let lines = [("A", 10e5), ("B", 20e5)];
    for (line, p) in lines {
        pressure_source(root, f, &format!("Pump{line}"), p)?;
        pressure_source(root, f, &format!("Tank{line}"), 1e5)?;
        root.add_new(f, "HydraulicLaminarOrificeQ", &format!("In{line}"))?;
        root.add_new(f, "HydraulicLaminarOrificeQ", &format!("Out{line}"))?;
    }
    // Subsystems added back to back so they can be stepped in parallel.
    for (line, _) in lines {
        let sub = root.add_new(f, "Subsystem", &format!("Line{line}"))?;
        let inner = root
            .subsystem_mut(&sub)
            .ok_or_else(|| SimError::UnknownComponent { name: sub.clone() })?;
        inner.add_system_port("P1", NodeType::Hydraulic)?;
        inner.add_system_port("P2", NodeType::Hydraulic)?;
        inner.add_new(f, "HydraulicVolumeC", "Volume")?;
        inner.connect(Endpoint::system("P1"), ("Volume", "P1"))?;
        inner.connect(Endpoint::system("P2"), ("Volume", "P2"))?;

        let (pump, tank) = (format!("Pump{line}"), format!("Tank{line}"));
        let (inlet, outlet) = (format!("In{line}"), format!("Out{line}"));
        root.connect((pump.as_str(), "P1"), (inlet.as_str(), "P1"))?;
        root.connect((inlet.as_str(), "P2"), (sub.as_str(), "P1"))?;
        root.connect((sub.as_str(), "P2"), (outlet.as_str(), "P1"))?;
        root.connect((outlet.as_str(), "P2"), (tank.as_str(), "P1"))?;
    }
    Ok(())
}

fn pid_loop(root: &mut ComponentSystem, f: &mut ComponentFactory) -> SimResult<()> {
    root.add_new(f, "SignalConstant", "Reference")?;
    root.add_new(f, "SignalPID", "Controller")?;
    root.add_new(f, "SignalIntegrator", "Plant")?;
    root.add_new(f, "SignalSink", "Recorder")?;
    root.set_parameter("Reference", "y", 0.5)?;
    root.set_parameter("Controller", "Kd", 0.0)?;
    root.connect(("Reference", "out"), ("Controller", "yref"))?;
    root.connect(("Controller", "u"), ("Plant", "in"))?;
    root.connect(("Plant", "out"), ("Controller", "y"))?;
    root.connect(("Plant", "out"), ("Recorder", "in"))
}

fn motor_shaft(root: &mut ComponentSystem, f: &mut ComponentFactory) -> SimResult<()> {
    pressure_source(root, f, "Pump", 10e5)?;
    for tank in ["TankA", "TankB1", "TankB2"] {
        pressure_source(root, f, tank, 1e5)?;
    }
    root.add_new(f, "HydraulicVariableDisplacementMotorQ", "Drive")?;
    root.add_new(f, "HydraulicVariableDisplacementMotorQ", "Load")?;
    root.add_new(f, "MechanicTorsionalSpringC", "Shaft")?;
    root.connect(("Pump", "P1"), ("Drive", "P1"))?;
    root.connect(("Drive", "P2"), ("TankA", "P1"))?;
    root.connect(("Load", "P1"), ("TankB1", "P1"))?;
    root.connect(("Load", "P2"), ("TankB2", "P1"))?;
    root.connect(("Drive", "P3"), ("Shaft", "P1"))?;
    root.connect(("Shaft", "P2"), ("Load", "P3"))
}
