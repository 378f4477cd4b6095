//! tlm-graph: nodes, ports and connection topology.
//!
//! Provides:
//! - Node types with their slot tables ([`NodeType`], [`SlotDescription`])
//! - Arena-owned nodes addressed by [`NodeId`](tlm_core::NodeId) ([`NodeArena`])
//! - Ports and their kinds ([`Port`], [`PortKind`])
//! - The connection rules enforced when ports join a node
//!
//! # Example
//!
//! ```
//! use tlm_graph::{Attachment, NodeArena, NodeType, PortKind, PortRef, hydraulic};
//! use tlm_core::CompId;
//!
//! let mut nodes = NodeArena::new();
//! let a = Attachment::new(PortRef::child(CompId::from_index(0), "P1"), PortKind::Power);
//! let b = Attachment::new(PortRef::child(CompId::from_index(1), "P1"), PortKind::Power);
//! let id = nodes.connect_new(NodeType::Hydraulic, a, b).unwrap();
//!
//! nodes.node_mut(id).unwrap().set_value(hydraulic::PRESSURE, 2e5);
//! assert_eq!(nodes.node(id).unwrap().value_by_name("Pressure").unwrap(), 2e5);
//! ```

pub mod arena;
pub mod error;
pub mod node;
pub mod port;
pub(crate) mod rules;

// Re-exports for ergonomics
pub use arena::{Detached, NodeArena, SlotRef};
pub use error::{GraphError, GraphResult};
pub use node::{
    Attachment, Node, NodeType, PortOwner, PortRef, SlotDescription, electric, hydraulic,
    mechanic, mechanic_rotational, signal,
};
pub use port::{Port, PortKind};
