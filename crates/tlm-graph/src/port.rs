//! Ports: named connection points owned by components.

use crate::arena::SlotRef;
use crate::error::{GraphError, GraphResult};
use crate::node::NodeType;
use tlm_core::NodeId;

/// Role of a port with respect to the node it joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PortKind {
    /// Bidirectional TLM connection (hydraulic, mechanic, electric).
    Power,
    /// Signal input.
    Read,
    /// Signal output.
    Write,
    /// Boundary of a component system; bridges the outer and inner node.
    System,
}

/// A named connection point.
///
/// Ports are declared by a component during `configure` and bound to a node
/// when connected. A port that is not required may stay unconnected; it is
/// then given a private node seeded with its start values.
#[derive(Debug, Clone, PartialEq)]
pub struct Port {
    name: String,
    kind: PortKind,
    node_type: NodeType,
    required: bool,
    description: String,
    start_values: Vec<Option<f64>>,
    node: Option<NodeId>,
}

impl Port {
    pub fn new(name: impl Into<String>, kind: PortKind, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            kind,
            node_type,
            required: true,
            description: String::new(),
            start_values: vec![None; node_type.slot_count()],
            node: None,
        }
    }

    /// Mark the port as optional.
    pub fn not_required(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder form of [`Port::set_start_value`].
    ///
    /// # Panics
    ///
    /// Panics if `slot` is outside the node type's slot table.
    pub fn with_start_value(mut self, slot: usize, value: f64) -> Self {
        self.start_values[slot] = Some(value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PortKind {
        self.kind
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    pub fn is_connected(&self) -> bool {
        self.node.is_some()
    }

    pub fn bind(&mut self, node: NodeId) {
        self.node = Some(node);
    }

    pub fn unbind(&mut self) {
        self.node = None;
    }

    pub fn start_value(&self, slot: usize) -> Option<f64> {
        self.start_values.get(slot).copied().flatten()
    }

    pub fn set_start_value(&mut self, slot: usize, value: f64) -> GraphResult<()> {
        let node_type = self.node_type;
        let entry = self
            .start_values
            .get_mut(slot)
            .ok_or(GraphError::SlotOutOfRange { node_type, slot })?;
        *entry = Some(value);
        Ok(())
    }

    pub fn set_start_value_by_name(&mut self, name: &str, value: f64) -> GraphResult<()> {
        let slot = self
            .node_type
            .slot_index(name)
            .ok_or_else(|| GraphError::UnknownSlot {
                node_type: self.node_type,
                name: name.to_string(),
            })?;
        self.set_start_value(slot, value)
    }

    /// Slots that have an explicit start value.
    pub fn start_values(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.start_values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i, v)))
    }

    /// Start value if set, else the slot default.
    pub fn initial_value(&self, slot: usize) -> f64 {
        self.start_value(slot)
            .unwrap_or_else(|| self.node_type.slots()[slot].default)
    }

    /// Resolve a slot of the bound node for fast access during stepping.
    pub fn slot(&self, slot: usize) -> GraphResult<SlotRef> {
        let node = self.node.ok_or_else(|| GraphError::NotConnected {
            port: self.name.clone(),
        })?;
        if slot >= self.node_type.slot_count() {
            return Err(GraphError::SlotOutOfRange {
                node_type: self.node_type,
                slot,
            });
        }
        Ok(SlotRef { node, slot })
    }
}
