//! Hierarchical container of components.
//!
//! A [`ComponentSystem`] owns its children, the nodes connecting them and the
//! inner side of its own system ports. The top-level system drives a run:
//! [`ComponentSystem::initialize`], repeated
//! [`ComponentSystem::simulate_one_timestep`] (or [`ComponentSystem::simulate`])
//! and [`ComponentSystem::finalize`]. A system nested in another one behaves
//! as a single component of its parent: it copies boundary node values in,
//! runs its own children for one or more sub-steps and copies them back out.

use crate::component::{Component, ComponentCore, CqsType, LifecycleState, SimContext};
use crate::error::{SimError, SimResult};
use crate::factory::{ComponentFactory, SUBSYSTEM_TYPE, create_component};
use crate::message::MessageHandler;
use crate::options::SimOptions;
use crate::order::{ChildInfo, ExecutionOrder, execution_order};
use crate::parameter::ParameterValue;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tlm_core::{CompId, NodeId, find_unique_name};
use tlm_graph::{
    Attachment, Detached, GraphError, NodeArena, NodeType, Port, PortKind, PortOwner, PortRef,
};
use tracing::debug;

/// One end of a connection, named from the point of view of a system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Port `port` of the child component `component`.
    Child { component: String, port: String },
    /// Inner side of one of the system's own ports.
    System { port: String },
}

impl Endpoint {
    pub fn child(component: impl Into<String>, port: impl Into<String>) -> Self {
        Endpoint::Child {
            component: component.into(),
            port: port.into(),
        }
    }

    pub fn system(port: impl Into<String>) -> Self {
        Endpoint::System { port: port.into() }
    }
}

impl From<(&str, &str)> for Endpoint {
    fn from((component, port): (&str, &str)) -> Self {
        Endpoint::child(component, port)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Child { component, port } => write!(f, "{component}.{port}"),
            Endpoint::System { port } => write!(f, "{port}"),
        }
    }
}

/// How a call to [`ComponentSystem::simulate`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { steps: u64 },
    /// The stop handle was raised; the run can be resumed.
    Stopped { steps: u64 },
}

/// Values of one node, for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub node_type: NodeType,
    pub ports: Vec<String>,
    pub values: Vec<(&'static str, f64)>,
}

#[derive(Debug, Clone)]
struct Boundary {
    port: String,
    /// Node on the inner side, if anything inside is connected.
    inner: Option<NodeId>,
}

struct Resolved {
    port_ref: PortRef,
    kind: PortKind,
    node_type: NodeType,
    node: Option<NodeId>,
    label: String,
}

pub struct ComponentSystem {
    core: ComponentCore,
    children: Vec<Option<Box<dyn Component>>>,
    names: HashMap<String, CompId>,
    nodes: NodeArena,
    boundary: Vec<Boundary>,
    connections: Vec<(PortRef, PortRef)>,
    /// Private nodes bound to unconnected optional ports for one run.
    dummies: Vec<(PortRef, NodeId)>,
    order: ExecutionOrder,
    messages: MessageHandler,
    parallel: bool,
    desired_timestep: Option<f64>,
    sub_steps: u64,
    start_time: f64,
    stop_time: f64,
    steps_taken: u64,
    stop: Arc<AtomicBool>,
    aborted: bool,
}

impl std::fmt::Debug for ComponentSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentSystem")
            .field("name", &self.core.name())
            .field("children", &self.component_names())
            .field("nodes", &self.nodes.len())
            .field("state", &self.core.state())
            .finish()
    }
}

impl ComponentSystem {
    pub fn new(name: &str) -> Self {
        let mut core = ComponentCore::new(SUBSYSTEM_TYPE, CqsType::S);
        core.set_name(name.to_string());
        core.set_state(LifecycleState::Configured);
        Self {
            core,
            children: Vec::new(),
            names: HashMap::new(),
            nodes: NodeArena::new(),
            boundary: Vec::new(),
            connections: Vec::new(),
            dummies: Vec::new(),
            order: ExecutionOrder::default(),
            messages: MessageHandler::new(),
            parallel: false,
            desired_timestep: None,
            sub_steps: 1,
            start_time: 0.0,
            stop_time: 0.0,
            steps_taken: 0,
            stop: Arc::new(AtomicBool::new(false)),
            aborted: false,
        }
    }

    pub fn with_options(name: &str, options: &SimOptions) -> SimResult<Self> {
        let mut system = Self::new(name);
        system.apply_options(options)?;
        Ok(system)
    }

    /// Take timestep, time span and parallelism from `options`.
    pub fn apply_options(&mut self, options: &SimOptions) -> SimResult<()> {
        options.validate()?;
        self.set_timestep(options.timestep)?;
        self.parallel = options.parallel;
        self.start_time = options.start_time;
        self.stop_time = options.stop_time;
        Ok(())
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn state(&self) -> LifecycleState {
        self.core.state()
    }

    pub fn timestep(&self) -> f64 {
        self.core.timestep()
    }

    /// Fixed timestep. A subsystem with its own timestep runs
    /// `parent timestep / timestep` sub-steps per parent step.
    pub fn set_timestep(&mut self, timestep: f64) -> SimResult<()> {
        if !(timestep.is_finite() && timestep > 0.0) {
            return Err(SimError::InvalidTimestep {
                what: format!("timestep must be positive, got {timestep}"),
            });
        }
        self.desired_timestep = Some(timestep);
        self.core.set_timestep(timestep);
        Ok(())
    }

    /// Run a subsystem at the timestep of its parent.
    pub fn inherit_timestep(&mut self) {
        self.desired_timestep = None;
    }

    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    pub fn time(&self) -> f64 {
        self.start_time + self.steps_taken as f64 * self.core.timestep()
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn stop_time(&self) -> f64 {
        self.stop_time
    }

    pub fn messages(&self) -> &MessageHandler {
        &self.messages
    }

    pub fn messages_mut(&mut self) -> &mut MessageHandler {
        &mut self.messages
    }

    /// Flag checked between steps by [`ComponentSystem::simulate`]; may be
    /// raised from another thread.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    // ---- model building ----

    /// Add a child, configuring it if needed. Returns the name it was given,
    /// which differs from `name` when that is already taken.
    pub fn add_component(
        &mut self,
        name: &str,
        mut component: Box<dyn Component>,
    ) -> SimResult<String> {
        self.ensure_editable()?;
        let unique = find_unique_name(&self.taken_names(), name);
        component.core_mut().set_name(unique.clone());
        if component.core().state() == LifecycleState::Unconfigured {
            component.configure().map_err(|e| e.in_component(&unique))?;
        }
        component.core_mut().set_state(LifecycleState::Configured);

        let id = CompId::from_usize(self.children.len());
        debug!(system = self.core.name(), component = %unique, type_name = component.type_name(), "add component");
        self.children.push(Some(component));
        self.names.insert(unique.clone(), id);
        self.invalidate();
        Ok(unique)
    }

    /// Create a component of a registered type and add it.
    pub fn add_new(
        &mut self,
        factory: &mut ComponentFactory,
        type_name: &str,
        name: &str,
    ) -> SimResult<String> {
        let component = create_component(factory, type_name)?;
        self.add_component(name, component)
    }

    /// Disconnect and remove a child, handing it back.
    pub fn remove_component(&mut self, name: &str) -> SimResult<Box<dyn Component>> {
        self.ensure_editable()?;
        let id = self.lookup(name)?;
        self.invalidate();
        for (a, b) in self.connections_of(id) {
            self.disconnect_refs(&a, &b)?;
        }
        self.names.remove(name);
        let component = self.children[id.slot()]
            .take()
            .ok_or_else(|| SimError::UnknownComponent {
                name: name.to_string(),
            })?;
        debug!(system = self.core.name(), component = name, "remove component");
        Ok(component)
    }

    pub fn rename_component(&mut self, old: &str, new: &str) -> SimResult<String> {
        self.ensure_editable()?;
        let id = self.lookup(old)?;
        if old == new {
            return Ok(old.to_string());
        }
        self.names.remove(old);
        let unique = find_unique_name(&self.taken_names(), new);
        self.names.insert(unique.clone(), id);
        if let Some(Some(child)) = self.children.get_mut(id.slot()) {
            child.core_mut().set_name(unique.clone());
        }
        Ok(unique)
    }

    /// Add a port on the system boundary. Returns its (unique) name.
    pub fn add_system_port(&mut self, name: &str, node_type: NodeType) -> SimResult<String> {
        self.ensure_editable()?;
        let unique = find_unique_name(&self.taken_names(), name);
        self.core
            .push_port(Port::new(unique.clone(), PortKind::System, node_type).not_required())?;
        self.boundary.push(Boundary {
            port: unique.clone(),
            inner: None,
        });
        self.invalidate();
        Ok(unique)
    }

    /// Remove a system port and its inner connections. The outer side must
    /// already be disconnected.
    pub fn remove_system_port(&mut self, name: &str) -> SimResult<()> {
        self.ensure_editable()?;
        let port = self.core.port(name).ok_or_else(|| SimError::UnknownPort {
            component: self.core.name().to_string(),
            port: name.to_string(),
        })?;
        if port.is_connected() {
            return Err(SimError::PortInUse {
                port: name.to_string(),
            });
        }
        self.invalidate();
        let me = PortRef::system(name);
        let inner: Vec<_> = self
            .connections
            .iter()
            .filter(|(a, b)| *a == me || *b == me)
            .cloned()
            .collect();
        for (a, b) in inner {
            self.disconnect_refs(&a, &b)?;
        }
        self.core.remove_port(name);
        self.boundary.retain(|b| b.port != name);
        Ok(())
    }

    pub fn component(&self, name: &str) -> Option<&dyn Component> {
        let id = self.names.get(name)?;
        let child = self.children.get(id.slot())?.as_ref()?;
        Some(child.as_ref())
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut dyn Component> {
        let id = self.names.get(name)?;
        let child = self.children.get_mut(id.slot())?.as_mut()?;
        let child: &mut dyn Component = child.as_mut();
        Some(child)
    }

    pub fn subsystem(&self, name: &str) -> Option<&ComponentSystem> {
        self.component(name)?.as_system()
    }

    pub fn subsystem_mut(&mut self, name: &str) -> Option<&mut ComponentSystem> {
        self.component_mut(name)?.as_system_mut()
    }

    /// Child names in insertion order.
    pub fn component_names(&self) -> Vec<&str> {
        self.children.iter().flatten().map(|c| c.name()).collect()
    }

    pub fn set_parameter(
        &mut self,
        component: &str,
        name: &str,
        value: impl Into<ParameterValue>,
    ) -> SimResult<()> {
        self.child_core_mut(component)?
            .parameters_mut()
            .set(name, value)
            .map_err(|e| e.in_component(component))
    }

    pub fn set_parameter_str(&mut self, component: &str, name: &str, text: &str) -> SimResult<()> {
        self.child_core_mut(component)?
            .parameters_mut()
            .set_from_str(name, text)
            .map_err(|e| e.in_component(component))
    }

    pub fn parameter(&self, component: &str, name: &str) -> SimResult<ParameterValue> {
        let child = self
            .component(component)
            .ok_or_else(|| SimError::UnknownComponent {
                name: component.to_string(),
            })?;
        child.core().parameters().value(name).cloned()
    }

    /// Value a node slot behind `component.port` starts from.
    pub fn set_start_value(
        &mut self,
        component: &str,
        port: &str,
        slot_name: &str,
        value: f64,
    ) -> SimResult<()> {
        let core = self.child_core_mut(component)?;
        let p = core.port_mut(port).ok_or_else(|| SimError::UnknownPort {
            component: component.to_string(),
            port: port.to_string(),
        })?;
        p.set_start_value_by_name(slot_name, value)?;
        Ok(())
    }

    /// Connect two ports. On error nothing changes.
    pub fn connect(&mut self, a: impl Into<Endpoint>, b: impl Into<Endpoint>) -> SimResult<()> {
        self.ensure_editable()?;
        let ra = self.resolve(&a.into())?;
        let rb = self.resolve(&b.into())?;
        if ra.node_type != rb.node_type {
            return Err(GraphError::NodeTypeMismatch {
                a: ra.node_type,
                b: rb.node_type,
            }
            .into());
        }
        if ra.port_ref == rb.port_ref {
            return Err(GraphError::AlreadyConnected { port: ra.label }.into());
        }

        let att_a = Attachment::new(ra.port_ref.clone(), ra.kind);
        let att_b = Attachment::new(rb.port_ref.clone(), rb.kind);
        let node = match (ra.node, rb.node) {
            (None, None) => self.nodes.connect_new(ra.node_type, att_a, att_b)?,
            (Some(n), None) => {
                self.nodes.attach(n, att_b)?;
                n
            }
            (None, Some(n)) => {
                self.nodes.attach(n, att_a)?;
                n
            }
            (Some(x), Some(y)) if x == y => {
                return Err(GraphError::AlreadyConnected { port: rb.label }.into());
            }
            (Some(_), Some(_)) => {
                return Err(GraphError::BothConnected {
                    a: ra.label,
                    b: rb.label,
                }
                .into());
            }
        };

        self.invalidate();
        self.bind(&ra.port_ref, Some(node));
        self.bind(&rb.port_ref, Some(node));
        debug!(system = self.core.name(), a = %ra.label, b = %rb.label, node = node.index(), "connect");
        self.connections.push((ra.port_ref, rb.port_ref));
        Ok(())
    }

    /// Remove a connection made with [`ComponentSystem::connect`].
    pub fn disconnect(&mut self, a: impl Into<Endpoint>, b: impl Into<Endpoint>) -> SimResult<()> {
        self.ensure_editable()?;
        let ra = self.resolve(&a.into())?;
        let rb = self.resolve(&b.into())?;
        self.disconnect_refs(&ra.port_ref, &rb.port_ref)?;
        self.invalidate();
        debug!(system = self.core.name(), a = %ra.label, b = %rb.label, "disconnect");
        Ok(())
    }

    pub fn is_connected(&self, a: impl Into<Endpoint>, b: impl Into<Endpoint>) -> bool {
        let (Ok(ra), Ok(rb)) = (self.resolve(&a.into()), self.resolve(&b.into())) else {
            return false;
        };
        self.connections.iter().any(|(x, y)| {
            (*x == ra.port_ref && *y == rb.port_ref) || (*x == rb.port_ref && *y == ra.port_ref)
        })
    }

    /// Connections in the order they were made.
    pub fn connections(&self) -> Vec<(Endpoint, Endpoint)> {
        self.connections
            .iter()
            .filter_map(|(a, b)| Some((self.endpoint(a)?, self.endpoint(b)?)))
            .collect()
    }

    /// Current value of a named slot of the node behind `endpoint`. Also
    /// works for unconnected optional ports while a run is initialized.
    pub fn port_value(&self, endpoint: impl Into<Endpoint>, slot_name: &str) -> SimResult<f64> {
        let r = self.resolve(&endpoint.into())?;
        let node = self
            .bound_node(&r.port_ref)
            .ok_or(GraphError::NotConnected { port: r.label })?;
        Ok(self.nodes.node(node)?.value_by_name(slot_name)?)
    }

    pub fn node_snapshots(&self) -> Vec<NodeSnapshot> {
        self.nodes
            .iter()
            .filter(|(_, node)| !node.attached().is_empty())
            .map(|(_, node)| {
                let node_type = node.node_type();
                NodeSnapshot {
                    node_type,
                    ports: node.attached().iter().map(|a| self.label(&a.port)).collect(),
                    values: node_type
                        .slots()
                        .iter()
                        .zip(node.data())
                        .map(|(s, v)| (s.name, *v))
                        .collect(),
                }
            })
            .collect()
    }

    /// Child names in the order they were last stepped.
    pub fn execution_order(&self) -> Vec<String> {
        self.order
            .flat()
            .filter_map(|id| self.children.get(id.slot())?.as_ref())
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Children that form an algebraic signal loop, as found by the last
    /// initialization.
    pub fn algebraic_loop(&self) -> Vec<String> {
        self.order
            .algebraic_loop
            .iter()
            .filter_map(|id| self.children.get(id.slot())?.as_ref())
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Run `configure` again on a child, keeping parameter values, start
    /// values and connections whose ports still exist.
    pub fn reconfigure(&mut self, name: &str) -> SimResult<()> {
        self.ensure_editable()?;
        let id = self.lookup(name)?;
        self.invalidate();

        let saved_connections = self.connections_of(id);
        let reconnect: Vec<(Endpoint, Endpoint)> = saved_connections
            .iter()
            .filter_map(|(a, b)| Some((self.endpoint(a)?, self.endpoint(b)?)))
            .collect();
        for (a, b) in &saved_connections {
            self.disconnect_refs(a, b)?;
        }

        let child = self.children[id.slot()]
            .as_mut()
            .ok_or_else(|| SimError::UnknownComponent {
                name: name.to_string(),
            })?;
        let values: Vec<(String, ParameterValue)> = child
            .core()
            .parameters()
            .iter()
            .map(|p| (p.name().to_string(), p.value().clone()))
            .collect();
        let starts: Vec<(String, NodeType, Vec<(usize, f64)>)> = child
            .core()
            .ports()
            .iter()
            .map(|p| (p.name().to_string(), p.node_type(), p.start_values().collect()))
            .collect();

        child.deconfigure();
        child.core_mut().set_state(LifecycleState::Unconfigured);
        child.configure().map_err(|e| e.in_component(name))?;
        child.core_mut().set_state(LifecycleState::Configured);

        let mut dropped = Vec::new();
        let core = child.core_mut();
        for (param, value) in values {
            if core.parameters_mut().set(&param, value).is_err() {
                dropped.push(format!("parameter {param}"));
            }
        }
        for (port, node_type, values) in starts {
            if let Some(p) = core.port_mut(&port)
                && p.node_type() == node_type
            {
                for (slot, v) in values {
                    if let Err(e) = p.set_start_value(slot, v) {
                        dropped.push(format!("start value {port}[{slot}] ({e})"));
                    }
                }
            }
        }
        for (a, b) in reconnect {
            if let Err(e) = self.connect(a.clone(), b.clone()) {
                dropped.push(format!("connection {a} -> {b} ({e})"));
            }
        }
        for what in dropped {
            self.messages
                .warning(name, format!("Dropped {what} after reconfigure"));
        }
        Ok(())
    }

    // ---- running ----

    /// Prepare a run from `start` to `stop`: bind unconnected optional ports,
    /// seed node values, order the children and initialize them.
    pub fn initialize(&mut self, start: f64, stop: f64) -> SimResult<()> {
        match self.core.state() {
            LifecycleState::Simulating => {
                return Err(SimError::lifecycle(
                    self.core.name(),
                    "finalize the running simulation before initializing again",
                ));
            }
            LifecycleState::Unconfigured | LifecycleState::Deconfigured => {
                return Err(SimError::lifecycle(self.core.name(), "system is not configured"));
            }
            _ => {}
        }
        SimOptions {
            start_time: start,
            stop_time: stop,
            timestep: self.core.timestep(),
            ..SimOptions::default()
        }
        .validate()?;

        self.stop_time = stop;
        self.stop.store(false, Ordering::Release);
        self.messages.take_fatal();

        let result = self
            .setup(start, None)
            .and_then(|()| self.initialize_children(start));
        match result {
            Ok(()) => {
                self.core.set_state(LifecycleState::Initialized);
                self.messages.info(
                    self.core.name(),
                    format!(
                        "Initialized at t = {start} with timestep {}",
                        self.core.timestep()
                    ),
                );
                Ok(())
            }
            Err(e) => {
                self.messages.error(self.core.name(), e.to_string());
                self.release_dummies();
                self.core.set_state(LifecycleState::Configured);
                Err(e)
            }
        }
    }

    /// Advance time by one timestep and step every child once, C then Q
    /// then S. The first error aborts the run.
    pub fn simulate_one_timestep(&mut self) -> SimResult<()> {
        match self.core.state() {
            LifecycleState::Initialized => {
                self.set_children_state(LifecycleState::Simulating);
                self.core.set_state(LifecycleState::Simulating);
            }
            LifecycleState::Simulating => {}
            _ => {
                return Err(SimError::lifecycle(
                    self.core.name(),
                    "initialize before simulating",
                ));
            }
        }
        if self.aborted {
            return Err(SimError::lifecycle(
                self.core.name(),
                "the run was aborted; finalize and initialize again",
            ));
        }
        if let Err(e) = self.step_inner() {
            self.aborted = true;
            self.messages.error(
                self.core.name(),
                format!("Aborted at t = {}: {e}", self.time()),
            );
            return Err(e);
        }
        Ok(())
    }

    /// Step until `stop` is reached or the stop handle is raised.
    pub fn simulate(&mut self, stop: f64) -> SimResult<RunOutcome> {
        let half = 0.5 * self.core.timestep();
        let mut steps = 0;
        while self.time() < stop - half {
            if self.stop.load(Ordering::Acquire) {
                self.messages
                    .info(self.core.name(), format!("Stopped at t = {}", self.time()));
                return Ok(RunOutcome::Stopped { steps });
            }
            self.simulate_one_timestep()?;
            steps += 1;
        }
        Ok(RunOutcome::Completed { steps })
    }

    /// Finalize all children and release per-run resources. Every child is
    /// finalized even if one fails; the first error is returned.
    pub fn finalize(&mut self) -> SimResult<()> {
        match self.core.state() {
            LifecycleState::Initialized | LifecycleState::Simulating => {}
            _ => {
                return Err(SimError::lifecycle(self.core.name(), "nothing to finalize"));
            }
        }
        let result = self.finalize_children();
        self.release_dummies();
        self.core.set_state(LifecycleState::Finalized);
        self.messages
            .info(self.core.name(), format!("Finalized at t = {}", self.time()));
        result
    }

    // ---- internals ----

    fn ensure_editable(&self) -> SimResult<()> {
        if self.core.state() == LifecycleState::Simulating {
            return Err(SimError::lifecycle(
                self.core.name(),
                "cannot edit the model while simulating",
            ));
        }
        Ok(())
    }

    /// Drop run state after a structural edit.
    fn invalidate(&mut self) {
        self.release_dummies();
        self.order = ExecutionOrder::default();
        if matches!(
            self.core.state(),
            LifecycleState::Initialized | LifecycleState::Finalized
        ) {
            self.core.set_state(LifecycleState::Configured);
        }
    }

    fn taken_names(&self) -> HashSet<String> {
        self.names
            .keys()
            .cloned()
            .chain(self.core.ports().iter().map(|p| p.name().to_string()))
            .collect()
    }

    fn lookup(&self, name: &str) -> SimResult<CompId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownComponent {
                name: name.to_string(),
            })
    }

    fn child_core_mut(&mut self, name: &str) -> SimResult<&mut ComponentCore> {
        let id = self.lookup(name)?;
        self.children[id.slot()]
            .as_mut()
            .map(|c| c.core_mut())
            .ok_or_else(|| SimError::UnknownComponent {
                name: name.to_string(),
            })
    }

    fn lookup_port(&self, r: &PortRef) -> Option<&Port> {
        match &r.owner {
            PortOwner::Component(id) => self.children.get(id.slot())?.as_ref()?.core().port(&r.port),
            PortOwner::System => self.core.port(&r.port),
        }
    }

    fn label(&self, r: &PortRef) -> String {
        match &r.owner {
            PortOwner::Component(id) => {
                let owner = self
                    .children
                    .get(id.slot())
                    .and_then(Option::as_ref)
                    .map_or("?", |c| c.name());
                format!("{owner}.{}", r.port)
            }
            PortOwner::System => format!("{}.{}", self.core.name(), r.port),
        }
    }

    fn endpoint(&self, r: &PortRef) -> Option<Endpoint> {
        match &r.owner {
            PortOwner::Component(id) => {
                let child = self.children.get(id.slot())?.as_ref()?;
                Some(Endpoint::child(child.name(), r.port.clone()))
            }
            PortOwner::System => Some(Endpoint::system(r.port.clone())),
        }
    }

    fn resolve(&self, endpoint: &Endpoint) -> SimResult<Resolved> {
        let port_ref = match endpoint {
            Endpoint::Child { component, port } => {
                let id = self.lookup(component)?;
                PortRef::child(id, port.clone())
            }
            Endpoint::System { port } => PortRef::system(port.clone()),
        };
        let port = self
            .lookup_port(&port_ref)
            .ok_or_else(|| SimError::UnknownPort {
                component: match endpoint {
                    Endpoint::Child { component, .. } => component.clone(),
                    Endpoint::System { .. } => self.core.name().to_string(),
                },
                port: port_ref.port.clone(),
            })?;
        Ok(Resolved {
            kind: port.kind(),
            node_type: port.node_type(),
            node: self.connected_node(&port_ref),
            label: self.label(&port_ref),
            port_ref,
        })
    }

    /// Node a port is bound to in this scope, including run-time dummies.
    fn bound_node(&self, r: &PortRef) -> Option<NodeId> {
        match &r.owner {
            PortOwner::Component(_) => self.lookup_port(r)?.node(),
            PortOwner::System => self.boundary.iter().find(|b| b.port == r.port)?.inner,
        }
    }

    /// Node a port shares with other ports of this scope.
    fn connected_node(&self, r: &PortRef) -> Option<NodeId> {
        if self.dummies.iter().any(|(d, _)| d == r) {
            return None;
        }
        self.bound_node(r)
    }

    fn bind(&mut self, r: &PortRef, node: Option<NodeId>) {
        match &r.owner {
            PortOwner::Component(id) => {
                if let Some(Some(child)) = self.children.get_mut(id.slot())
                    && let Some(port) = child.core_mut().port_mut(&r.port)
                {
                    match node {
                        Some(n) => port.bind(n),
                        None => port.unbind(),
                    }
                }
            }
            PortOwner::System => {
                if let Some(b) = self.boundary.iter_mut().find(|b| b.port == r.port) {
                    b.inner = node;
                }
            }
        }
    }

    fn connections_of(&self, id: CompId) -> Vec<(PortRef, PortRef)> {
        let owned = |r: &PortRef| r.owner == PortOwner::Component(id);
        self.connections
            .iter()
            .filter(|(a, b)| owned(a) || owned(b))
            .cloned()
            .collect()
    }

    fn disconnect_refs(&mut self, a: &PortRef, b: &PortRef) -> SimResult<()> {
        let pos = self
            .connections
            .iter()
            .position(|(x, y)| (x == a && y == b) || (x == b && y == a))
            .ok_or_else(|| GraphError::NotConnected {
                port: format!("{} -> {}", self.label(a), self.label(b)),
            })?;
        let node = self
            .connected_node(a)
            .ok_or_else(|| GraphError::NotConnected {
                port: self.label(a),
            })?;
        self.connections.remove(pos);

        for r in [a, b] {
            if self.connections.iter().any(|(x, y)| x == r || y == r) {
                continue;
            }
            let attached = self
                .nodes
                .node(node)
                .map(|n| n.is_attached(r))
                .unwrap_or(false);
            if attached
                && let Detached::Removed { orphan: Some(orphan) } = self.nodes.detach(node, r)?
            {
                self.bind(&orphan, None);
            }
            self.bind(r, None);
        }
        Ok(())
    }

    fn release_dummies(&mut self) {
        for (r, node) in std::mem::take(&mut self.dummies) {
            self.bind(&r, None);
            self.nodes.remove(node);
        }
    }

    fn set_children_state(&mut self, state: LifecycleState) {
        for child in self.children.iter_mut().flatten() {
            child.core_mut().set_state(state);
            if let Some(system) = child.as_system_mut() {
                system.set_children_state(state);
            }
        }
    }

    /// Per-run preparation, recursing into subsystems. `parent_timestep` is
    /// `None` for the top-level system.
    fn setup(&mut self, start: f64, parent_timestep: Option<f64>) -> SimResult<()> {
        match (parent_timestep, self.desired_timestep) {
            (Some(outer), Some(own)) => {
                let ratio = outer / own;
                let n = ratio.round();
                if n < 1.0 || (ratio - n).abs() > 1e-9 * n {
                    return Err(SimError::InvalidTimestep {
                        what: format!(
                            "{}: timestep {own} does not divide the parent timestep {outer}",
                            self.core.name()
                        ),
                    });
                }
                self.sub_steps = n as u64;
                self.core.set_timestep(outer / n);
            }
            (Some(outer), None) => {
                self.sub_steps = 1;
                self.core.set_timestep(outer);
            }
            (None, _) => self.sub_steps = 1,
        }
        self.start_time = start;
        self.steps_taken = 0;
        self.aborted = false;
        self.release_dummies();
        self.bind_unconnected_ports()?;

        let timestep = self.core.timestep();
        let parallel = self.parallel;
        for child in self.children.iter_mut().flatten() {
            match child.as_system_mut() {
                Some(system) => {
                    system.parallel |= parallel;
                    system
                        .setup(start, Some(timestep))
                        .map_err(|e| e.in_component(system.core.name()))?;
                }
                None => child.core_mut().set_timestep(timestep),
            }
        }

        self.seed_nodes();
        if parent_timestep.is_some() {
            let cqs = self.determine_cqs()?;
            self.core.set_cqs(cqs);
        }
        self.order = execution_order(&self.child_infos(), self.parallel);
        if !self.order.algebraic_loop.is_empty() {
            let names = self.algebraic_loop().join(", ");
            self.messages.warning(
                self.core.name(),
                format!("Algebraic loop among {names}; running them in insertion order"),
            );
        }
        Ok(())
    }

    fn bind_unconnected_ports(&mut self) -> SimResult<()> {
        for (i, slot) in self.children.iter_mut().enumerate() {
            let Some(child) = slot else { continue };
            let id = CompId::from_usize(i);
            let name = child.name().to_string();
            for port in child.core_mut().ports_mut() {
                if port.is_connected() {
                    continue;
                }
                if port.is_required() {
                    return Err(SimError::RequiredPortUnconnected {
                        component: name,
                        port: port.name().to_string(),
                    });
                }
                let node = self.nodes.alloc(port.node_type());
                port.bind(node);
                self.dummies.push((PortRef::child(id, port.name()), node));
            }
        }
        for b in &self.boundary {
            if b.inner.is_none() {
                self.messages.warning(
                    self.core.name(),
                    format!("System port {} is not connected inside", b.port),
                );
            }
        }
        Ok(())
    }

    /// Start values of the ports a node's values are reset from.
    fn start_values(&self, r: &PortRef) -> Vec<(usize, f64)> {
        self.lookup_port(r)
            .map(|p| p.start_values().collect())
            .unwrap_or_default()
    }

    /// Reset every node and apply port start values, readers first so that
    /// writer and power port values win.
    fn seed_nodes(&mut self) {
        let mut seeds: Vec<(NodeId, Vec<(usize, f64)>)> = Vec::new();
        for (id, node) in self.nodes.iter() {
            let mut attached: Vec<&Attachment> = node.attached().iter().collect();
            attached.sort_by_key(|a| a.kind != PortKind::Read);
            let values = attached
                .into_iter()
                .flat_map(|a| self.start_values(&a.port))
                .collect();
            seeds.push((id, values));
        }
        for (r, id) in &self.dummies {
            seeds.push((*id, self.start_values(r)));
        }
        for (id, values) in seeds {
            if let Ok(node) = self.nodes.node_mut(id) {
                node.reset_values();
                for (slot, v) in values {
                    node.set_value(slot, v);
                }
            }
        }
    }

    /// A subsystem takes the CQS type of the power components behind its
    /// boundary; it is a signal component when there are none.
    fn determine_cqs(&self) -> SimResult<CqsType> {
        let mut found: Option<CqsType> = None;
        for b in &self.boundary {
            let Some(node) = b.inner.and_then(|n| self.nodes.node(n).ok()) else {
                continue;
            };
            for a in node.attached() {
                let PortOwner::Component(id) = &a.port.owner else {
                    continue;
                };
                let Some(child) = self.children.get(id.slot()).and_then(Option::as_ref) else {
                    continue;
                };
                let power = match a.kind {
                    PortKind::Power => true,
                    PortKind::System => child.cqs_type() != CqsType::S,
                    _ => false,
                };
                if !power {
                    continue;
                }
                match found {
                    None => found = Some(child.cqs_type()),
                    Some(cqs) if cqs == child.cqs_type() => {}
                    Some(_) => {
                        return Err(SimError::CqsUndetermined {
                            system: self.core.name().to_string(),
                            what: "boundary power ports belong to both C and Q components",
                        });
                    }
                }
            }
        }
        Ok(found.unwrap_or(CqsType::S))
    }

    /// Direction signals flow through a system port, seen from outside.
    fn boundary_role(&self, port: &str) -> Option<PortKind> {
        let inner = self.boundary.iter().find(|b| b.port == port)?.inner?;
        let node = self.nodes.node(inner).ok()?;
        let mut role = None;
        for a in node.attached() {
            let kind = match (&a.port.owner, a.kind) {
                (PortOwner::Component(id), PortKind::System) => self
                    .children
                    .get(id.slot())?
                    .as_ref()?
                    .as_system()?
                    .boundary_role(&a.port.port),
                (_, kind) => Some(kind),
            };
            match kind {
                Some(PortKind::Write) => return Some(PortKind::Write),
                Some(PortKind::Power) => role = Some(PortKind::Power),
                Some(PortKind::Read) if role.is_none() => role = Some(PortKind::Read),
                _ => {}
            }
        }
        role
    }

    fn child_infos(&self) -> Vec<ChildInfo> {
        let mut infos = Vec::with_capacity(self.children.len());
        for (i, slot) in self.children.iter().enumerate() {
            let Some(child) = slot else { continue };
            let system = child.as_system();
            let mut info = ChildInfo {
                id: CompId::from_usize(i),
                cqs: child.cqs_type(),
                is_system: system.is_some(),
                nodes: Vec::new(),
                writes: Vec::new(),
                reads: Vec::new(),
            };
            for port in child.core().ports() {
                let Some(node) = port.node() else { continue };
                info.nodes.push(node);
                let role = match port.kind() {
                    PortKind::System => system.and_then(|s| s.boundary_role(port.name())),
                    kind => Some(kind),
                };
                match role {
                    Some(PortKind::Write) => info.writes.push(node),
                    Some(PortKind::Read) => info.reads.push(node),
                    _ => {}
                }
            }
            infos.push(info);
        }
        infos
    }

    fn check_fatal(&mut self) -> SimResult<()> {
        match self.messages.take_fatal() {
            Some(m) => Err(SimError::Fatal {
                component: m.source,
                message: m.text,
            }),
            None => Ok(()),
        }
    }

    fn initialize_children(&mut self, time: f64) -> SimResult<()> {
        let timestep = self.core.timestep();
        let order: Vec<CompId> = self.order.flat().collect();
        for id in order {
            let Some(child) = self.children.get_mut(id.slot()).and_then(Option::as_mut) else {
                continue;
            };
            let mut ctx = SimContext {
                time,
                timestep,
                nodes: &mut self.nodes,
                messages: &mut self.messages,
            };
            child
                .initialize(&mut ctx)
                .map_err(|e| e.in_component(child.name()))?;
            child.core_mut().set_state(LifecycleState::Initialized);
            self.check_fatal()?;
        }
        Ok(())
    }

    fn finalize_children(&mut self) -> SimResult<()> {
        let time = self.time();
        let timestep = self.core.timestep();
        let mut first = None;
        for child in self.children.iter_mut().flatten() {
            let result = {
                let mut ctx = SimContext {
                    time,
                    timestep,
                    nodes: &mut self.nodes,
                    messages: &mut self.messages,
                };
                child.finalize(&mut ctx)
            };
            if let Err(e) = result {
                let e = e.in_component(child.name());
                self.messages.error(child.name(), e.to_string());
                first.get_or_insert(e);
            }
            child.core_mut().set_state(LifecycleState::Finalized);
        }
        first.map_or(Ok(()), Err)
    }

    /// Run all sub-steps of one step of this system.
    fn step_inner(&mut self) -> SimResult<()> {
        let order = std::mem::take(&mut self.order);
        let mut result = Ok(());
        for _ in 0..self.sub_steps {
            self.steps_taken += 1;
            let time = self.time();
            result = self.run_passes(&order, time);
            if result.is_err() {
                break;
            }
        }
        self.order = order;
        result
    }

    fn run_passes(&mut self, order: &ExecutionOrder, time: f64) -> SimResult<()> {
        let timestep = self.core.timestep();
        for pass in &order.passes {
            match pass.as_slice() {
                [id] => self.step_child(*id, time, timestep)?,
                ids => self.step_concurrently(ids)?,
            }
        }
        Ok(())
    }

    fn step_child(&mut self, id: CompId, time: f64, timestep: f64) -> SimResult<()> {
        let child = self
            .children
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .ok_or_else(|| SimError::lifecycle(self.core.name(), "stepping a removed component"))?;
        let mut ctx = SimContext {
            time,
            timestep,
            nodes: &mut self.nodes,
            messages: &mut self.messages,
        };
        child
            .simulate_one_timestep(&mut ctx)
            .map_err(|e| e.in_component(child.name()))?;
        self.check_fatal()
    }

    /// Step subsystems that share no nodes on the rayon pool.
    fn step_concurrently(&mut self, ids: &[CompId]) -> SimResult<()> {
        let mut taken: Vec<(CompId, Box<dyn Component>)> = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(child) = self.children.get_mut(id.slot()).and_then(Option::take) {
                taken.push((id, child));
            }
        }
        let result = self.step_taken(&mut taken);
        for (id, child) in taken {
            self.children[id.slot()] = Some(child);
        }
        result
    }

    fn step_taken(&mut self, taken: &mut [(CompId, Box<dyn Component>)]) -> SimResult<()> {
        for (_, child) in taken.iter_mut() {
            if let Some(system) = child.as_system_mut() {
                system.pull_boundary(&self.nodes)?;
            }
        }
        let results: Vec<SimResult<()>> = taken
            .par_iter_mut()
            .map(|(_, child)| match child.as_system_mut() {
                Some(system) => system
                    .step_inner()
                    .map_err(|e| e.in_component(system.core.name())),
                None => Ok(()),
            })
            .collect();
        for (_, child) in taken.iter_mut() {
            if let Some(system) = child.as_system_mut() {
                system.push_boundary(&mut self.nodes)?;
                self.messages
                    .absorb(&mut system.messages, system.core.name());
            }
        }
        results.into_iter().collect::<SimResult<Vec<()>>>()?;
        self.check_fatal()
    }

    /// Copy outer node values onto the inner boundary nodes.
    fn pull_boundary(&mut self, outer: &NodeArena) -> SimResult<()> {
        for b in &self.boundary {
            let (Some(inner), Some(outer_id)) =
                (b.inner, self.core.port(&b.port).and_then(Port::node))
            else {
                continue;
            };
            let source = outer.node(outer_id)?;
            self.nodes.node_mut(inner)?.copy_values_from(source);
        }
        Ok(())
    }

    /// Copy inner boundary node values back to the outer nodes.
    fn push_boundary(&self, outer: &mut NodeArena) -> SimResult<()> {
        for b in &self.boundary {
            let (Some(inner), Some(outer_id)) =
                (b.inner, self.core.port(&b.port).and_then(Port::node))
            else {
                continue;
            };
            let source = self.nodes.node(inner)?;
            outer.node_mut(outer_id)?.copy_values_from(source);
        }
        Ok(())
    }
}

impl Component for ComponentSystem {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ComponentCore {
        &mut self.core
    }

    fn configure(&mut self) -> SimResult<()> {
        Ok(())
    }

    /// System ports are part of the model, not of the configuration.
    fn deconfigure(&mut self) {}

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.pull_boundary(ctx.nodes)?;
        let result = self.initialize_children(self.start_time);
        ctx.messages.absorb(&mut self.messages, self.core.name());
        result?;
        self.push_boundary(ctx.nodes)
    }

    fn simulate_one_timestep(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.pull_boundary(ctx.nodes)?;
        let result = self.step_inner();
        ctx.messages.absorb(&mut self.messages, self.core.name());
        result?;
        self.push_boundary(ctx.nodes)
    }

    fn finalize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        let result = self.finalize_children();
        self.release_dummies();
        ctx.messages.absorb(&mut self.messages, self.core.name());
        result
    }

    fn as_system(&self) -> Option<&ComponentSystem> {
        Some(self)
    }

    fn as_system_mut(&mut self) -> Option<&mut ComponentSystem> {
        Some(self)
    }
}
