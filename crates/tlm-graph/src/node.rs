//! Node types, slot tables and the node data bag.

use crate::error::{GraphError, GraphResult};
use crate::port::PortKind;
use tlm_core::CompId;

/// Name, unit and default value of one node slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotDescription {
    pub name: &'static str,
    pub unit: &'static str,
    pub default: f64,
}

const fn slot(name: &'static str, unit: &'static str, default: f64) -> SlotDescription {
    SlotDescription {
        name,
        unit,
        default,
    }
}

pub mod signal {
    pub const VALUE: usize = 0;
}

pub mod hydraulic {
    pub const FLOW: usize = 0;
    pub const PRESSURE: usize = 1;
    pub const TEMPERATURE: usize = 2;
    pub const WAVE_VARIABLE: usize = 3;
    pub const CHAR_IMPEDANCE: usize = 4;
    pub const HEAT_FLOW: usize = 5;
}

pub mod mechanic {
    pub const VELOCITY: usize = 0;
    pub const FORCE: usize = 1;
    pub const POSITION: usize = 2;
    pub const WAVE_VARIABLE: usize = 3;
    pub const CHAR_IMPEDANCE: usize = 4;
    pub const EQ_MASS: usize = 5;
}

pub mod mechanic_rotational {
    pub const ANGULAR_VELOCITY: usize = 0;
    pub const TORQUE: usize = 1;
    pub const ANGLE: usize = 2;
    pub const WAVE_VARIABLE: usize = 3;
    pub const CHAR_IMPEDANCE: usize = 4;
    pub const EQ_INERTIA: usize = 5;
}

pub mod electric {
    pub const VOLTAGE: usize = 0;
    pub const CURRENT: usize = 1;
    pub const WAVE_VARIABLE: usize = 2;
    pub const CHAR_IMPEDANCE: usize = 3;
}

const SIGNAL_SLOTS: &[SlotDescription] = &[slot("Value", "-", 0.0)];

const HYDRAULIC_SLOTS: &[SlotDescription] = &[
    slot("Flow", "m^3/s", 0.0),
    slot("Pressure", "Pa", 1.0e5),
    slot("Temperature", "K", 293.0),
    slot("WaveVariable", "Pa", 1.0e5),
    slot("CharImpedance", "Pa s/m^3", 0.0),
    slot("HeatFlow", "W", 0.0),
];

const MECHANIC_SLOTS: &[SlotDescription] = &[
    slot("Velocity", "m/s", 0.0),
    slot("Force", "N", 0.0),
    slot("Position", "m", 0.0),
    slot("WaveVariable", "N", 0.0),
    slot("CharImpedance", "N s/m", 0.0),
    slot("EquivalentMass", "kg", 1.0),
];

const MECHANIC_ROTATIONAL_SLOTS: &[SlotDescription] = &[
    slot("AngularVelocity", "rad/s", 0.0),
    slot("Torque", "Nm", 0.0),
    slot("Angle", "rad", 0.0),
    slot("WaveVariable", "Nm", 0.0),
    slot("CharImpedance", "Nm s/rad", 0.0),
    slot("EquivalentInertia", "kg m^2", 1.0),
];

const ELECTRIC_SLOTS: &[SlotDescription] = &[
    slot("Voltage", "V", 0.0),
    slot("Current", "A", 0.0),
    slot("WaveVariable", "V", 0.0),
    slot("CharImpedance", "V/A", 0.0),
];

/// Physical domain of a node; fixes its slot layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeType {
    Signal,
    Hydraulic,
    Mechanic,
    MechanicRotational,
    Electric,
}

impl NodeType {
    pub const ALL: [NodeType; 5] = [
        NodeType::Signal,
        NodeType::Hydraulic,
        NodeType::Mechanic,
        NodeType::MechanicRotational,
        NodeType::Electric,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NodeType::Signal => "NodeSignal",
            NodeType::Hydraulic => "NodeHydraulic",
            NodeType::Mechanic => "NodeMechanic",
            NodeType::MechanicRotational => "NodeMechanicRotational",
            NodeType::Electric => "NodeElectric",
        }
    }

    pub fn slots(self) -> &'static [SlotDescription] {
        match self {
            NodeType::Signal => SIGNAL_SLOTS,
            NodeType::Hydraulic => HYDRAULIC_SLOTS,
            NodeType::Mechanic => MECHANIC_SLOTS,
            NodeType::MechanicRotational => MECHANIC_ROTATIONAL_SLOTS,
            NodeType::Electric => ELECTRIC_SLOTS,
        }
    }

    pub fn slot_count(self) -> usize {
        self.slots().len()
    }

    pub fn slot_index(self, name: &str) -> Option<usize> {
        self.slots().iter().position(|s| s.name == name)
    }

    /// `(wave variable, characteristic impedance)` slot indices for power domains.
    pub fn wave_slots(self) -> Option<(usize, usize)> {
        match self {
            NodeType::Signal => None,
            NodeType::Hydraulic => Some((hydraulic::WAVE_VARIABLE, hydraulic::CHAR_IMPEDANCE)),
            NodeType::Mechanic => Some((mechanic::WAVE_VARIABLE, mechanic::CHAR_IMPEDANCE)),
            NodeType::MechanicRotational => Some((
                mechanic_rotational::WAVE_VARIABLE,
                mechanic_rotational::CHAR_IMPEDANCE,
            )),
            NodeType::Electric => Some((electric::WAVE_VARIABLE, electric::CHAR_IMPEDANCE)),
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Who owns a port attached to a node, seen from the scope owning the node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PortOwner {
    /// A child component of the system.
    Component(CompId),
    /// The system itself (one of its system ports, inner side).
    System,
}

/// Address of a port within one system scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub owner: PortOwner,
    pub port: String,
}

impl PortRef {
    pub fn child(comp: CompId, port: impl Into<String>) -> Self {
        Self {
            owner: PortOwner::Component(comp),
            port: port.into(),
        }
    }

    pub fn system(port: impl Into<String>) -> Self {
        Self {
            owner: PortOwner::System,
            port: port.into(),
        }
    }
}

/// A port as recorded on the node it is connected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub port: PortRef,
    pub kind: PortKind,
}

impl Attachment {
    pub fn new(port: PortRef, kind: PortKind) -> Self {
        Self { port, kind }
    }
}

/// Shared state of all ports connected together.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    node_type: NodeType,
    data: Vec<f64>,
    attached: Vec<Attachment>,
}

impl Node {
    /// A detached node with every slot at its default value.
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            data: node_type.slots().iter().map(|s| s.default).collect(),
            attached: Vec::new(),
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn attached(&self) -> &[Attachment] {
        &self.attached
    }

    pub fn is_attached(&self, port: &PortRef) -> bool {
        self.attached.iter().any(|a| &a.port == port)
    }

    pub(crate) fn attach(&mut self, attachment: Attachment) {
        self.attached.push(attachment);
    }

    pub(crate) fn detach(&mut self, port: &PortRef) -> bool {
        let before = self.attached.len();
        self.attached.retain(|a| &a.port != port);
        self.attached.len() != before
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// # Panics
    ///
    /// Panics if `slot` is outside the node type's slot table.
    #[inline]
    pub fn value(&self, slot: usize) -> f64 {
        self.data[slot]
    }

    /// # Panics
    ///
    /// Panics if `slot` is outside the node type's slot table.
    #[inline]
    pub fn set_value(&mut self, slot: usize, value: f64) {
        self.data[slot] = value;
    }

    pub fn try_value(&self, slot: usize) -> GraphResult<f64> {
        self.data
            .get(slot)
            .copied()
            .ok_or(GraphError::SlotOutOfRange {
                node_type: self.node_type,
                slot,
            })
    }

    pub fn value_by_name(&self, name: &str) -> GraphResult<f64> {
        let slot = self.slot_by_name(name)?;
        Ok(self.data[slot])
    }

    pub fn set_value_by_name(&mut self, name: &str, value: f64) -> GraphResult<()> {
        let slot = self.slot_by_name(name)?;
        self.data[slot] = value;
        Ok(())
    }

    fn slot_by_name(&self, name: &str) -> GraphResult<usize> {
        self.node_type
            .slot_index(name)
            .ok_or_else(|| GraphError::UnknownSlot {
                node_type: self.node_type,
                name: name.to_string(),
            })
    }

    /// `(c, Zc)` of a power node.
    pub fn wave_pair(&self) -> GraphResult<(f64, f64)> {
        let (c, zc) = self.wave_slots()?;
        Ok((self.data[c], self.data[zc]))
    }

    pub fn set_wave_pair(&mut self, c: f64, zc: f64) -> GraphResult<()> {
        let (ci, zci) = self.wave_slots()?;
        self.data[ci] = c;
        self.data[zci] = zc;
        Ok(())
    }

    fn wave_slots(&self) -> GraphResult<(usize, usize)> {
        self.node_type
            .wave_slots()
            .ok_or(GraphError::NoWaveVariables {
                node_type: self.node_type,
            })
    }

    /// Copy all slot values from a node of the same type.
    ///
    /// # Panics
    ///
    /// Panics if the node types differ.
    pub fn copy_values_from(&mut self, other: &Node) {
        assert_eq!(
            self.node_type, other.node_type,
            "cannot copy node values across node types"
        );
        self.data.copy_from_slice(&other.data);
    }

    /// Restore every slot to its default.
    pub fn reset_values(&mut self) {
        for (v, s) in self.data.iter_mut().zip(self.node_type.slots()) {
            *v = s.default;
        }
    }
}
