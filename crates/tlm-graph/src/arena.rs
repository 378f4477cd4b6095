//! Arena storage for the nodes of one system scope.

use crate::error::{GraphError, GraphResult};
use crate::node::{Attachment, Node, NodeType, PortRef};
use crate::rules::check_kinds;
use tlm_core::NodeId;

/// Resolved `(node, slot)` address used on the stepping hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRef {
    pub node: NodeId,
    pub slot: usize,
}

/// Outcome of removing a port from a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detached {
    /// The node still connects two or more ports.
    Kept,
    /// The node was dropped; the port left behind on it, if any, must be unbound.
    Removed { orphan: Option<PortRef> },
}

/// Owner of all nodes in a system; ports hold [`NodeId`] handles into it.
///
/// Freed slots are reused by later allocations.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a detached node with default slot values.
    pub fn alloc(&mut self, node_type: NodeType) -> NodeId {
        let node = Node::new(node_type);
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId::from_usize(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId::from_usize(self.nodes.len() - 1)
            }
        }
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.get_mut(id.slot())?.take()?;
        self.free.push(id.slot());
        Some(node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.slot()), Some(Some(_)))
    }

    pub fn node(&self, id: NodeId) -> GraphResult<&Node> {
        self.nodes
            .get(id.slot())
            .and_then(Option::as_ref)
            .ok_or(GraphError::UnknownNode { node: id })
    }

    pub fn node_mut(&mut self, id: NodeId) -> GraphResult<&mut Node> {
        self.nodes
            .get_mut(id.slot())
            .and_then(Option::as_mut)
            .ok_or(GraphError::UnknownNode { node: id })
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, n)| n.as_ref().map(|n| (NodeId::from_usize(i), n)))
    }

    /// # Panics
    ///
    /// Panics if the node was removed or the slot is out of range.
    #[inline]
    pub fn read(&self, at: SlotRef) -> f64 {
        self.live(at.node).value(at.slot)
    }

    /// # Panics
    ///
    /// Panics if the node was removed or the slot is out of range.
    #[inline]
    pub fn write(&mut self, at: SlotRef, value: f64) {
        self.live_mut(at.node).set_value(at.slot, value);
    }

    fn live(&self, id: NodeId) -> &Node {
        match self.nodes.get(id.slot()) {
            Some(Some(node)) => node,
            _ => panic!("node {id} accessed after removal"),
        }
    }

    fn live_mut(&mut self, id: NodeId) -> &mut Node {
        match self.nodes.get_mut(id.slot()) {
            Some(Some(node)) => node,
            _ => panic!("node {id} accessed after removal"),
        }
    }

    /// Create a node joining two unconnected ports.
    pub fn connect_new(
        &mut self,
        node_type: NodeType,
        a: Attachment,
        b: Attachment,
    ) -> GraphResult<NodeId> {
        if a.port == b.port {
            return Err(GraphError::AlreadyConnected { port: a.port.port });
        }
        check_kinds(None, [a.kind, b.kind])?;
        let id = self.alloc(node_type);
        let node = self.live_mut(id);
        node.attach(a);
        node.attach(b);
        Ok(id)
    }

    /// Add a port to an existing node.
    pub fn attach(&mut self, id: NodeId, attachment: Attachment) -> GraphResult<()> {
        let node = self.node(id)?;
        if node.is_attached(&attachment.port) {
            return Err(GraphError::AlreadyConnected {
                port: attachment.port.port,
            });
        }
        check_kinds(
            Some(id),
            node.attached()
                .iter()
                .map(|a| a.kind)
                .chain(std::iter::once(attachment.kind)),
        )?;
        self.live_mut(id).attach(attachment);
        Ok(())
    }

    /// Remove a port from a node, dropping the node when fewer than two
    /// ports remain.
    pub fn detach(&mut self, id: NodeId, port: &PortRef) -> GraphResult<Detached> {
        let node = self.node_mut(id)?;
        if !node.detach(port) {
            return Err(GraphError::NotConnected {
                port: port.port.clone(),
            });
        }
        if node.attached().len() >= 2 {
            return Ok(Detached::Kept);
        }
        let orphan = node.attached().first().map(|a| a.port.clone());
        self.remove(id);
        Ok(Detached::Removed { orphan })
    }
}
