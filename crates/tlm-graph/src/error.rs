//! Graph-specific error types.

use crate::node::NodeType;
use tlm_core::NodeId;

pub type GraphResult<T> = Result<T, GraphError>;

/// Connection and node access errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two ports of different node types.
    NodeTypeMismatch { a: NodeType, b: NodeType },

    /// The port is already attached to this node.
    AlreadyConnected { port: String },

    /// Both ports already sit on (different) nodes.
    BothConnected { a: String, b: String },

    /// A node may carry at most two power ports.
    TooManyPowerPorts { node: Option<NodeId> },

    /// A node may carry at most one write port.
    MultipleWriters { node: Option<NodeId> },

    /// Power and write ports cannot share a node.
    PowerAndWrite { node: Option<NodeId> },

    /// A node made only of read ports would never receive a value.
    ReadOnlyNode,

    /// The port is not connected to anything.
    NotConnected { port: String },

    /// No live node with this id.
    UnknownNode { node: NodeId },

    /// No slot of that name in the node type.
    UnknownSlot { node_type: NodeType, name: String },

    /// Slot index beyond the node type's table.
    SlotOutOfRange { node_type: NodeType, slot: usize },

    /// Signal nodes have no wave variable / impedance pair.
    NoWaveVariables { node_type: NodeType },
}

fn node_label(node: &Option<NodeId>) -> String {
    match node {
        Some(id) => format!("Node {}", id),
        None => "The new node".to_string(),
    }
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::NodeTypeMismatch { a, b } => {
                write!(f, "Cannot connect a {} port to a {} port", a, b)
            }
            GraphError::AlreadyConnected { port } => {
                write!(f, "Port {} is already connected to this node", port)
            }
            GraphError::BothConnected { a, b } => {
                write!(f, "Ports {} and {} are both already connected", a, b)
            }
            GraphError::TooManyPowerPorts { node } => {
                write!(f, "{} would have more than two power ports", node_label(node))
            }
            GraphError::MultipleWriters { node } => {
                write!(f, "{} would have more than one write port", node_label(node))
            }
            GraphError::PowerAndWrite { node } => {
                write!(f, "{} would mix power and write ports", node_label(node))
            }
            GraphError::ReadOnlyNode => {
                write!(f, "Cannot connect read ports only; nothing would write the node")
            }
            GraphError::NotConnected { port } => {
                write!(f, "Port {} is not connected", port)
            }
            GraphError::UnknownNode { node } => {
                write!(f, "Node {} does not exist", node)
            }
            GraphError::UnknownSlot { node_type, name } => {
                write!(f, "{} has no slot named {}", node_type, name)
            }
            GraphError::SlotOutOfRange { node_type, slot } => {
                write!(f, "{} has no slot {}", node_type, slot)
            }
            GraphError::NoWaveVariables { node_type } => {
                write!(f, "{} has no wave variables", node_type)
            }
        }
    }
}

impl std::error::Error for GraphError {}
