//! The component abstraction and the state every component carries.

use crate::error::{SimError, SimResult};
use crate::message::MessageHandler;
use crate::parameter::{Parameter, ParameterSet};
use crate::system::ComponentSystem;
use serde::Serialize;
use tlm_graph::{NodeArena, NodeType, Port, PortKind, SlotRef};

/// Solver role of a component within the TLM scheme.
///
/// C components compute wave variables and impedances, Q components compute
/// flows and efforts from them, S components process signals. A system steps
/// all C components, then all Q, then all S.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum CqsType {
    C,
    Q,
    S,
}

impl std::fmt::Display for CqsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CqsType::C => "C",
            CqsType::Q => "Q",
            CqsType::S => "S",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LifecycleState {
    Unconfigured,
    Configured,
    Initialized,
    Simulating,
    Finalized,
    Deconfigured,
}

/// What a component sees while it runs: the clock, the nodes of its parent
/// system and the parent's message channel.
pub struct SimContext<'a> {
    pub time: f64,
    pub timestep: f64,
    pub nodes: &'a mut NodeArena,
    pub messages: &'a mut MessageHandler,
}

impl SimContext<'_> {
    #[inline]
    pub fn read(&self, at: SlotRef) -> f64 {
        self.nodes.read(at)
    }

    #[inline]
    pub fn write(&mut self, at: SlotRef, value: f64) {
        self.nodes.write(at, value);
    }
}

/// Name, ports, parameters and lifecycle bookkeeping shared by all components.
#[derive(Debug, Clone)]
pub struct ComponentCore {
    name: String,
    type_name: String,
    cqs: CqsType,
    ports: Vec<Port>,
    parameters: ParameterSet,
    timestep: f64,
    state: LifecycleState,
}

impl ComponentCore {
    pub fn new(type_name: &str, cqs: CqsType) -> Self {
        Self {
            name: type_name.to_string(),
            type_name: type_name.to_string(),
            cqs,
            ports: Vec::new(),
            parameters: ParameterSet::new(),
            timestep: 1e-3,
            state: LifecycleState::Unconfigured,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn cqs(&self) -> CqsType {
        self.cqs
    }

    pub(crate) fn set_cqs(&mut self, cqs: CqsType) {
        self.cqs = cqs;
    }

    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    pub(crate) fn set_timestep(&mut self, timestep: f64) {
        self.timestep = timestep;
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: LifecycleState) {
        self.state = state;
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub(crate) fn ports_mut(&mut self) -> &mut [Port] {
        &mut self.ports
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name() == name)
    }

    pub fn port_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.name() == name)
    }

    /// Declare a port. Only allowed while configuring.
    pub fn add_port(&mut self, port: Port) -> SimResult<()> {
        if self.state != LifecycleState::Unconfigured {
            return Err(SimError::lifecycle(
                &self.name,
                "ports are fixed after configure",
            ));
        }
        self.push_port(port)
    }

    pub(crate) fn push_port(&mut self, port: Port) -> SimResult<()> {
        if self.port(port.name()).is_some() {
            return Err(SimError::DuplicatePort {
                component: self.name.clone(),
                port: port.name().to_string(),
            });
        }
        self.ports.push(port);
        Ok(())
    }

    pub(crate) fn remove_port(&mut self, name: &str) -> Option<Port> {
        let idx = self.ports.iter().position(|p| p.name() == name)?;
        Some(self.ports.remove(idx))
    }

    pub fn add_power_port(&mut self, name: &str, node_type: NodeType) -> SimResult<()> {
        self.add_port(Port::new(name, PortKind::Power, node_type))
    }

    pub fn add_read_port(&mut self, name: &str, node_type: NodeType) -> SimResult<()> {
        self.add_port(Port::new(name, PortKind::Read, node_type))
    }

    pub fn add_write_port(&mut self, name: &str, node_type: NodeType) -> SimResult<()> {
        self.add_port(Port::new(name, PortKind::Write, node_type))
    }

    /// Signal input that reads `default` when left unconnected.
    pub fn add_optional_input(&mut self, name: &str, default: f64) -> SimResult<()> {
        self.add_port(
            Port::new(name, PortKind::Read, NodeType::Signal)
                .not_required()
                .with_start_value(tlm_graph::signal::VALUE, default),
        )
    }

    /// Signal output that may be left unconnected.
    pub fn add_optional_output(&mut self, name: &str) -> SimResult<()> {
        self.add_port(Port::new(name, PortKind::Write, NodeType::Signal).not_required())
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }

    pub fn add_parameter(&mut self, parameter: Parameter) -> SimResult<()> {
        self.parameters.register(parameter)
    }

    /// Resolve a node slot behind one of this component's ports.
    pub fn slot(&self, port: &str, slot: usize) -> SimResult<SlotRef> {
        let p = self.port(port).ok_or_else(|| SimError::UnknownPort {
            component: self.name.clone(),
            port: port.to_string(),
        })?;
        Ok(p.slot(slot)?)
    }

    /// `(wave variable, impedance)` slots of a power port.
    pub fn wave_slots(&self, port: &str) -> SimResult<(SlotRef, SlotRef)> {
        let node_type = self
            .port(port)
            .map(Port::node_type)
            .ok_or_else(|| SimError::UnknownPort {
                component: self.name.clone(),
                port: port.to_string(),
            })?;
        let (c, zc) = node_type
            .wave_slots()
            .ok_or(tlm_graph::GraphError::NoWaveVariables { node_type })?;
        Ok((self.slot(port, c)?, self.slot(port, zc)?))
    }

    /// Drop ports and parameters so `configure` can run again.
    pub fn clear_configuration(&mut self) {
        self.ports.clear();
        self.parameters.clear();
        self.state = LifecycleState::Unconfigured;
    }
}

/// A simulation unit stepped by its owning [`ComponentSystem`].
///
/// Components declare ports and parameters in [`Component::configure`],
/// resolve node slots and read parameters in [`Component::initialize`], then
/// read and write node slots through the [`SimContext`] once per timestep.
/// Numerical failures are returned as errors; they abort the run.
pub trait Component: Send {
    fn core(&self) -> &ComponentCore;

    fn core_mut(&mut self) -> &mut ComponentCore;

    /// Declare ports and register parameters.
    fn configure(&mut self) -> SimResult<()>;

    /// Undo [`Component::configure`].
    fn deconfigure(&mut self) {
        self.core_mut().clear_configuration();
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()>;

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()>;

    fn finalize(&mut self, _ctx: &mut SimContext<'_>) -> SimResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    fn type_name(&self) -> &str {
        self.core().type_name()
    }

    fn cqs_type(&self) -> CqsType {
        self.core().cqs()
    }

    fn as_system(&self) -> Option<&ComponentSystem> {
        None
    }

    fn as_system_mut(&mut self) -> Option<&mut ComponentSystem> {
        None
    }
}
