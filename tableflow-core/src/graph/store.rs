//! Graph Store
//!
//! The arena that owns every node and edge and enforces the structural
//! invariants of the pipeline:
//!
//! - edges connect two distinct, existing nodes
//! - at most one edge per ordered node pair
//! - every edge pair is legal in the transform registry
//! - the edge relation stays acyclic
//!
//! Mutations never recompute anything. They mark the affected nodes dirty
//! and leave it to the caller to run a propagation pass.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use tracing::debug;

use super::config::NodeConfig;
use super::node::{Edge, EdgeId, Node, NodeId, NodeKind, Position};
use crate::error::GraphError;
use crate::table::TableValue;
use crate::transform::TransformRegistry;

/// The pipeline graph.
///
/// Nodes and edges live in flat id-keyed maps. Insertion order is kept, so
/// iteration (and therefore propagation and snapshots) is deterministic.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    registry: TransformRegistry,
}

impl Graph {
    /// Create an empty graph using the built-in transform registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph with a custom transform registry.
    pub fn with_registry(registry: TransformRegistry) -> Self {
        Self {
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            registry,
        }
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    /// Add an empty node. Always succeeds.
    pub fn add_node(&mut self, config: NodeConfig) -> NodeId {
        let node = Node::new(config);
        let id = node.id();
        debug!(node = %id, kind = %node.kind(), "node added");
        self.nodes.insert(id, node);
        id
    }

    /// Remove a node and every edge touching it.
    ///
    /// Unknown ids are ignored. Returns the former neighbours, which are
    /// marked maybe-dirty.
    pub fn remove_node(&mut self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.shift_remove(&id) else {
            return Vec::new();
        };

        let mut neighbours = Vec::new();
        for edge_id in node.inputs().iter().chain(node.outputs()) {
            if let Some(edge) = self.edges.shift_remove(edge_id) {
                let other = if edge.from_id == id { edge.to_id } else { edge.from_id };
                if let Some(other_node) = self.nodes.get_mut(&other) {
                    other_node.remove_edge(edge.id);
                    other_node.mark_maybe_dirty();
                }
                if !neighbours.contains(&other) {
                    neighbours.push(other);
                }
            }
        }

        debug!(node = %id, neighbours = neighbours.len(), "node removed");
        neighbours
    }

    /// Connect `from` to `to`.
    ///
    /// Checks run in this order: both nodes exist, no self loop, no
    /// duplicate, no cycle, legal kind pair. On failure nothing changes.
    /// On success both endpoints are marked maybe-dirty.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> Result<EdgeId, GraphError> {
        let from_kind = self.node(from).ok_or(GraphError::UnknownNode(from))?.kind();
        let to_kind = self.node(to).ok_or(GraphError::UnknownNode(to))?.kind();

        if from == to {
            return Err(GraphError::SelfLoop(from));
        }
        if let Some(existing) = self.find_edge(from, to) {
            return Err(GraphError::DuplicateEdge { from, to, existing });
        }
        if self.reaches(to, from) {
            return Err(GraphError::CycleDetected { from, to });
        }
        if !self.registry.is_legal(from_kind, to_kind) {
            return Err(GraphError::IllegalPair {
                from: from_kind,
                to: to_kind,
            });
        }

        let id = self.insert_edge(from, to);
        debug!(edge = %id, from = %from, to = %to, "edge added");
        Ok(id)
    }

    /// Insert an edge without any validation.
    pub(crate) fn insert_edge(&mut self, from: NodeId, to: NodeId) -> EdgeId {
        let edge = Edge {
            id: EdgeId::new(),
            from_id: from,
            to_id: to,
        };
        self.edges.insert(edge.id, edge);
        if let Some(node) = self.nodes.get_mut(&from) {
            node.add_output(edge.id);
            node.mark_maybe_dirty();
        }
        if let Some(node) = self.nodes.get_mut(&to) {
            node.add_input(edge.id);
            node.mark_maybe_dirty();
        }
        edge.id
    }

    /// Remove an edge. Unknown ids are ignored.
    ///
    /// Both former endpoints are marked maybe-dirty.
    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.shift_remove(&id)?;
        for endpoint in [edge.from_id, edge.to_id] {
            if let Some(node) = self.nodes.get_mut(&endpoint) {
                node.remove_edge(id);
                node.mark_maybe_dirty();
            }
        }
        debug!(edge = %id, "edge removed");
        Some(edge)
    }

    /// Replace a node's configuration.
    ///
    /// The new configuration must be of the node's kind and, for
    /// aggregators, its selection must fit the node's current input.
    pub fn set_node_config(&mut self, id: NodeId, config: NodeConfig) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))?;

        if config.kind() != node.kind() {
            return Err(GraphError::InvalidConfig {
                node: id,
                reason: format!("{} configuration given to a {} node", config.kind(), node.kind()),
            });
        }
        if let Some(agg) = config.as_aggregator() {
            agg.validate(node.input())
                .map_err(|reason| GraphError::InvalidConfig { node: id, reason })?;
        }

        node.set_config(config);
        node.mark_dirty();
        Ok(())
    }

    /// Set the output of a source node directly.
    ///
    /// The node is marked dirty only if the table actually differs.
    pub fn set_source_output(&mut self, id: NodeId, table: TableValue) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))?;
        if node.kind() != NodeKind::Source {
            return Err(GraphError::WrongKind {
                node: id,
                expected: NodeKind::Source,
                actual: node.kind(),
            });
        }

        if node.replace_output(Some(table)) {
            node.mark_dirty();
        } else {
            node.mark_maybe_dirty();
        }
        Ok(())
    }

    /// Move a node on the canvas. Does not affect data.
    pub fn set_position(&mut self, id: NodeId, position: Position) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))?;
        node.set_position(position);
        Ok(())
    }

    /// Rename a node. Does not affect data.
    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))?;
        node.set_label(label.into());
        Ok(())
    }

    /// Get a reference to a node.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    /// All edges in creation order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    /// The edge connecting `from` to `to`, if any.
    pub fn find_edge(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        let node = self.nodes.get(&from)?;
        node.outputs()
            .iter()
            .copied()
            .find(|e| self.edges.get(e).is_some_and(|edge| edge.to_id == to))
    }

    /// Producers feeding `id`, in connection order.
    pub fn predecessors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(&id)
            .map(Node::inputs)
            .unwrap_or_default()
            .iter()
            .filter_map(|e| self.edges.get(e).map(|edge| edge.from_id))
    }

    /// Consumers fed by `id`, in connection order.
    pub fn successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .get(&id)
            .map(Node::outputs)
            .unwrap_or_default()
            .iter()
            .filter_map(|e| self.edges.get(e).map(|edge| edge.to_id))
    }

    /// Whether `target` is reachable from `start` by following edges
    /// forward. A node reaches itself.
    pub fn reaches(&self, start: NodeId, target: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([start]);

        while let Some(id) = queue.pop_front() {
            if id == target {
                return true;
            }
            if visited.insert(id) {
                queue.extend(self.successors(id));
            }
        }
        false
    }

    /// Nodes that are not clean, in creation order.
    pub fn dirty_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| !n.is_clean())
            .map(Node::id)
            .collect()
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
