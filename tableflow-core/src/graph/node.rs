//! Graph Nodes
//!
//! This module defines the node and edge types that live in the pipeline
//! graph.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::config::NodeConfig;
use crate::table::TableValue;

/// Unique identifier for a node in the pipeline graph.
///
/// Identifiers come from a process-wide counter and are never reused, so an
/// id that refers to a deleted node stays dangling instead of aliasing a
/// newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Unique identifier for an edge. Same allocation rules as [`NodeId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(u64);

impl EdgeId {
    /// Generate a new unique edge ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for EdgeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edge-{}", self.0)
    }
}

/// The role a node plays in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// File input. Its output is set by ingestion, never computed.
    Source,

    /// Replaces blank cells with the `"NIL"` sentinel.
    Cleaner,

    /// Row or column means over a selection.
    Aggregator,

    /// Tabular display sink.
    SinkTable,

    /// Chart sink (line, scatter, box or bar). All charts share one input
    /// contract, so they are a single kind for graph purposes.
    SinkVisual,
}

impl NodeKind {
    pub const ALL: [NodeKind; 5] = [
        NodeKind::Source,
        NodeKind::Cleaner,
        NodeKind::Aggregator,
        NodeKind::SinkTable,
        NodeKind::SinkVisual,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Source => "source",
            NodeKind::Cleaner => "cleaner",
            NodeKind::Aggregator => "aggregator",
            NodeKind::SinkTable => "sink-table",
            NodeKind::SinkVisual => "sink-visual",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown node kind '{}'", s))
    }
}

/// Dirty state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyState {
    /// The node's output is up-to-date.
    Clean,

    /// The node's wiring changed. It must be recomputed, but its output may
    /// turn out identical.
    MaybeDirty,

    /// The node's own data or configuration changed.
    Dirty,
}

/// Canvas coordinates. Presentation only; the engine never reads them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A directed link from a producer node to a consumer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub from_id: NodeId,
    pub to_id: NodeId,
}

/// A node in the pipeline graph.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier for this node.
    id: NodeId,

    /// Kind-specific configuration. The kind itself is derived from it and
    /// never changes after creation.
    config: NodeConfig,

    /// Display label shown on the canvas.
    label: String,

    position: Position,

    /// Current dirty state.
    dirty: DirtyState,

    /// Inbound edges, in the order they were connected. Fan-in merging
    /// follows this order.
    inputs: SmallVec<[EdgeId; 4]>,

    /// Outbound edges.
    outputs: SmallVec<[EdgeId; 4]>,

    /// Merged input from all producers as of the last recompute.
    input: Option<TableValue>,

    /// Last computed (or ingested, for sources) table.
    output: Option<TableValue>,
}

impl Node {
    /// Create a new, empty node with the given configuration.
    pub fn new(config: NodeConfig) -> Self {
        Self {
            id: NodeId::new(),
            config,
            label: String::new(),
            position: Position::default(),
            dirty: DirtyState::Clean,
            inputs: SmallVec::new(),
            outputs: SmallVec::new(),
            input: None,
            output: None,
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub(crate) fn set_config(&mut self, config: NodeConfig) {
        self.config = config;
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = label;
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    /// Get the current dirty state.
    pub fn dirty_state(&self) -> DirtyState {
        self.dirty
    }

    /// Check if the node needs any processing.
    pub fn is_clean(&self) -> bool {
        self.dirty == DirtyState::Clean
    }

    /// Mark the node as clean.
    pub fn mark_clean(&mut self) {
        self.dirty = DirtyState::Clean;
    }

    /// Mark the node as maybe dirty (its wiring changed).
    pub fn mark_maybe_dirty(&mut self) {
        if self.dirty == DirtyState::Clean {
            self.dirty = DirtyState::MaybeDirty;
        }
    }

    /// Mark the node as definitely dirty (its data or config changed).
    pub fn mark_dirty(&mut self) {
        self.dirty = DirtyState::Dirty;
    }

    /// Inbound edge IDs in connection order.
    pub fn inputs(&self) -> &[EdgeId] {
        &self.inputs
    }

    /// Outbound edge IDs in connection order.
    pub fn outputs(&self) -> &[EdgeId] {
        &self.outputs
    }

    pub(crate) fn add_input(&mut self, edge: EdgeId) {
        self.inputs.push(edge);
    }

    pub(crate) fn add_output(&mut self, edge: EdgeId) {
        self.outputs.push(edge);
    }

    pub(crate) fn remove_edge(&mut self, edge: EdgeId) {
        self.inputs.retain(|e| *e != edge);
        self.outputs.retain(|e| *e != edge);
    }

    /// The merged table received from producers during the last recompute.
    pub fn input(&self) -> Option<&TableValue> {
        self.input.as_ref()
    }

    pub(crate) fn set_input(&mut self, input: Option<TableValue>) {
        self.input = input;
    }

    /// The node's current output, `None` if it was never computed.
    pub fn output(&self) -> Option<&TableValue> {
        self.output.as_ref()
    }

    /// Replace the output. Returns whether the value actually changed.
    pub(crate) fn replace_output(&mut self, output: Option<TableValue>) -> bool {
        if self.output == output {
            return false;
        }
        self.output = output;
        true
    }
}
