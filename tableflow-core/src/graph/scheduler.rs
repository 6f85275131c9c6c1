//! Propagation Engine
//!
//! The engine brings node outputs back in line with the graph after an edit.
//! It ensures that producers are always recomputed before their consumers.
//!
//! # Algorithm
//!
//! 1. Seed the pass with the dirty nodes
//! 2. Collect every node reachable forward from the seeds
//! 3. Sort them topologically (producers before consumers), with Kahn's
//!    algorithm restricted to edges inside the reachable set
//! 4. Walk the order. A node is recomputed if it is a seed or if one of its
//!    producers changed earlier in this pass:
//!    - sources are never recomputed; a dirty source counts as changed
//!    - every other node derives one contribution per inbound edge through
//!      the transform registry, merges them, then applies its own transform
//!    - if the output differs from the previous one, the node joins the
//!      changed set and its consumers join the wave
//!
//! The graph rejects cycles when edges are added, so step 3 always succeeds.
//! A failed sort means that invariant was broken and is reported as
//! [`GraphError::InternalInvariantViolation`].

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use tracing::{error, trace};

use super::node::{DirtyState, NodeId, NodeKind};
use super::store::Graph;
use crate::error::GraphError;
use crate::table::TableValue;
use crate::transform;

/// Result of one propagation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Propagation {
    /// Nodes whose output changed, in the order they were processed.
    pub changed: IndexSet<NodeId>,

    /// Output of every changed node after the pass.
    pub outputs: IndexMap<NodeId, Option<TableValue>>,

    /// Number of nodes that were recomputed, changed or not.
    pub recomputed: usize,
}

impl Propagation {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }
}

/// Recomputes node outputs in dependency order.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagationEngine;

impl PropagationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run a propagation pass seeded with `dirty`.
    ///
    /// Unknown ids in the seed are ignored. Every node visited by the pass is
    /// left clean.
    pub fn propagate<I>(&self, graph: &mut Graph, dirty: I) -> Result<Propagation, GraphError>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let seeds: IndexSet<NodeId> = dirty
            .into_iter()
            .filter(|id| graph.contains_node(*id))
            .collect();

        let span = tracing::debug_span!("propagate", seeds = seeds.len());
        let _enter = span.enter();

        let order = self.schedule(graph, &seeds)?;

        let mut result = Propagation::default();
        let mut wave: HashSet<NodeId> = seeds.iter().copied().collect();

        for &id in &order {
            if !wave.contains(&id) {
                continue;
            }

            let Some(node) = graph.node(id) else {
                continue;
            };
            let updated = if node.kind() == NodeKind::Source {
                seeds.contains(&id) && node.dirty_state() == DirtyState::Dirty
            } else {
                result.recomputed += 1;
                self.recompute(graph, id)?
            };

            if updated {
                trace!(node = %id, "output changed");
                result.changed.insert(id);
                wave.extend(graph.successors(id));
            }
        }

        for &id in &order {
            if let Some(node) = graph.node_mut(id) {
                node.mark_clean();
            }
        }

        result.outputs = result
            .changed
            .iter()
            .map(|&id| (id, graph.node(id).and_then(|n| n.output().cloned())))
            .collect();

        tracing::debug!(
            visited = order.len(),
            recomputed = result.recomputed,
            changed = result.changed.len(),
            "propagation complete"
        );
        Ok(result)
    }

    /// Run a pass over every dirty node in the graph.
    pub fn propagate_dirty(&self, graph: &mut Graph) -> Result<Propagation, GraphError> {
        let dirty = graph.dirty_nodes();
        self.propagate(graph, dirty)
    }

    /// Collect the nodes reachable from `seeds` and return them in
    /// topological order.
    pub fn schedule(&self, graph: &Graph, seeds: &IndexSet<NodeId>) -> Result<Vec<NodeId>, GraphError> {
        let mut reachable: IndexSet<NodeId> = IndexSet::new();
        let mut queue: VecDeque<NodeId> = seeds.iter().copied().collect();

        // BFS forward from the seeds
        while let Some(id) = queue.pop_front() {
            if reachable.insert(id) {
                queue.extend(graph.successors(id));
            }
        }

        let order = self.topological_sort(graph, &reachable);
        if order.len() != reachable.len() {
            let stuck: Vec<String> = reachable
                .iter()
                .filter(|id| !order.contains(id))
                .map(ToString::to_string)
                .collect();
            error!(nodes = ?stuck, "no topological order for the reachable subgraph");
            return Err(GraphError::InternalInvariantViolation(format!(
                "cycle among {}",
                stuck.join(", ")
            )));
        }
        Ok(order)
    }

    /// Perform a topological sort of the given nodes.
    ///
    /// Returns nodes in order such that producers come before consumers.
    /// Nodes on a cycle are left out of the result.
    fn topological_sort(&self, graph: &Graph, nodes: &IndexSet<NodeId>) -> Vec<NodeId> {
        let mut in_degree: HashMap<NodeId, usize> = HashMap::new();
        let mut result = Vec::with_capacity(nodes.len());
        let mut queue = VecDeque::new();

        // Calculate in-degrees (only counting edges within the node set)
        for &id in nodes {
            let degree = graph.predecessors(id).filter(|p| nodes.contains(p)).count();
            in_degree.insert(id, degree);
            if degree == 0 {
                queue.push_back(id);
            }
        }

        // Kahn's algorithm
        while let Some(id) = queue.pop_front() {
            result.push(id);

            for successor in graph.successors(id) {
                if let Some(degree) = in_degree.get_mut(&successor) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        queue.push_back(successor);
                    }
                }
            }
        }

        result
    }

    /// Recompute one non-source node. Returns whether its output changed.
    fn recompute(&self, graph: &mut Graph, id: NodeId) -> Result<bool, GraphError> {
        let node = graph
            .node(id)
            .ok_or_else(|| GraphError::InternalInvariantViolation(format!("{} vanished", id)))?;
        let kind = node.kind();

        let mut merged: Option<TableValue> = None;
        for edge_id in node.inputs() {
            let edge = graph.edge(*edge_id).ok_or_else(|| {
                GraphError::InternalInvariantViolation(format!("{} lists missing {}", id, edge_id))
            })?;
            let producer = graph.node(edge.from_id).ok_or_else(|| {
                GraphError::InternalInvariantViolation(format!("{} has no producer", edge_id))
            })?;
            let Some(produced) = producer.output() else {
                continue;
            };
            let derive = graph.registry().get(producer.kind(), kind).ok_or_else(|| {
                GraphError::InternalInvariantViolation(format!(
                    "{} connects {} to {}, which is not a legal pair",
                    edge_id,
                    producer.kind(),
                    kind
                ))
            })?;

            let contribution = derive(produced, node.config());
            match merged.as_mut() {
                Some(table) => table.merge(&contribution),
                None => merged = Some(contribution),
            }
        }

        let output = if node.inputs().is_empty() {
            Some(TableValue::new())
        } else {
            merged.as_ref().map(|input| transform::apply(node.config(), input))
        };

        trace!(node = %id, kind = %kind, rows = output.as_ref().map_or(0, TableValue::len), "recomputed");

        let node = graph
            .node_mut(id)
            .ok_or_else(|| GraphError::InternalInvariantViolation(format!("{} vanished", id)))?;
        node.set_input(merged);
        Ok(node.replace_output(output))
    }
}
