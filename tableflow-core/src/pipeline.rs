//! Pipeline
//!
//! The edit surface used by the presentation layer. Each edit event mutates
//! the graph and then runs a propagation pass before returning, so callers
//! always observe a consistent graph.
//!
//! # Example
//!
//! ```rust
//! use tableflow_core::graph::NodeKind;
//! use tableflow_core::pipeline::Pipeline;
//! use tableflow_core::table::{row, TableValue};
//!
//! let mut pipeline = Pipeline::new();
//! let source = pipeline.create_node(NodeKind::Source).value;
//! let cleaner = pipeline.create_node(NodeKind::Cleaner).value;
//! let sink = pipeline.create_node(NodeKind::SinkTable).value;
//! pipeline.connect(source, cleaner).unwrap();
//! pipeline.connect(cleaner, sink).unwrap();
//!
//! let table: TableValue = vec![row([("v", "")]), row([("v", "5")])].into();
//! let outcome = pipeline.ingest_complete(source, table).unwrap();
//! assert!(outcome.changed.contains(&sink));
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::PipelineConfig;
use crate::error::{Error, GraphError, Result};
use crate::graph::{
    AggregateMode, Edge, EdgeId, Graph, Node, NodeConfig, NodeId, NodeKind, Position,
    PropagationEngine, VisualKind,
};
use crate::table::{box_stats, BoxStats, TableValue};
use crate::transform::TransformRegistry;

/// Result of an accepted edit: the edit's own value plus the nodes whose
/// output changed, in propagation order.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome<T> {
    pub value: T,
    pub changed: Vec<NodeId>,
}

#[derive(Debug, Default)]
pub struct Pipeline {
    graph: Graph,
    engine: PropagationEngine,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Build a pipeline over a custom set of legal edge pairs.
    pub fn with_registry(config: PipelineConfig, registry: TransformRegistry) -> Self {
        Self {
            graph: Graph::with_registry(registry),
            engine: PropagationEngine::new(),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.graph.node(id)
    }

    pub fn output(&self, id: NodeId) -> Option<&TableValue> {
        self.graph.node(id)?.output()
    }

    /// Create an empty node of the given kind.
    ///
    /// New nodes have no output until a propagation pass reaches them, so
    /// nothing is recomputed here.
    pub fn create_node(&mut self, kind: NodeKind) -> EditOutcome<NodeId> {
        let config = match NodeConfig::for_kind(kind) {
            NodeConfig::Aggregator(agg) => {
                NodeConfig::Aggregator(agg.with_precision(self.config.mean_precision))
            }
            other => other,
        };
        self.create_configured(config)
    }

    /// Create a node from a canvas palette identifier such as `box-plot`.
    pub fn create_widget(&mut self, widget: &str) -> Result<EditOutcome<NodeId>> {
        let config = NodeConfig::from_widget_type(widget).ok_or_else(|| {
            warn!(widget, "rejected unknown widget type");
            Error::UnknownWidget(widget.to_string())
        })?;
        let config = match config {
            NodeConfig::Aggregator(agg) => {
                NodeConfig::Aggregator(agg.with_precision(self.config.mean_precision))
            }
            other => other,
        };
        Ok(self.create_configured(config))
    }

    fn create_configured(&mut self, config: NodeConfig) -> EditOutcome<NodeId> {
        EditOutcome {
            value: self.graph.add_node(config),
            changed: Vec::new(),
        }
    }

    /// Delete a node and its edges. Deleting an unknown node is a no-op.
    pub fn delete_node(&mut self, id: NodeId) -> Result<EditOutcome<()>> {
        self.graph.remove_node(id);
        self.commit(())
    }

    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<EditOutcome<EdgeId>> {
        let edge = self.graph.add_edge(from, to).map_err(rejected("connect"))?;
        self.commit(edge)
    }

    /// Remove an edge. Returns the removed edge, or `None` if it was
    /// already gone.
    pub fn disconnect(&mut self, id: EdgeId) -> Result<EditOutcome<Option<Edge>>> {
        let edge = self.graph.remove_edge(id);
        self.commit(edge)
    }

    pub fn update_config(&mut self, id: NodeId, config: NodeConfig) -> Result<EditOutcome<()>> {
        self.graph
            .set_node_config(id, config)
            .map_err(rejected("update config"))?;
        self.commit(())
    }

    /// Same as [`Pipeline::update_config`] with the configuration given as
    /// JSON. A parse failure is reported as an invalid configuration.
    pub fn update_config_json(&mut self, id: NodeId, json: &str) -> Result<EditOutcome<()>> {
        let config = NodeConfig::from_json(json).map_err(|e| {
            rejected("update config")(GraphError::InvalidConfig {
                node: id,
                reason: e.to_string(),
            })
        })?;
        self.update_config(id, config)
    }

    /// Toggle one row or column of an aggregator's selection.
    ///
    /// Toggling in the other mode clears the existing selection first.
    /// Indices the current input no longer has are dropped, so only the
    /// toggled index can make the edit fail.
    pub fn toggle_selection(
        &mut self,
        id: NodeId,
        mode: AggregateMode,
        index: usize,
    ) -> Result<EditOutcome<()>> {
        let node = self
            .graph
            .node(id)
            .ok_or(GraphError::UnknownNode(id))
            .map_err(rejected("toggle selection"))?;
        let mut agg = node
            .config()
            .as_aggregator()
            .cloned()
            .ok_or(GraphError::WrongKind {
                node: id,
                expected: NodeKind::Aggregator,
                actual: node.kind(),
            })
            .map_err(rejected("toggle selection"))?;

        agg.retain_in_range(node.input());
        match mode {
            AggregateMode::Row => agg.toggle_row(index),
            AggregateMode::Column => agg.toggle_column(index),
        }
        self.update_config(id, NodeConfig::Aggregator(agg))
    }

    /// Store decoded upload data on a source node and propagate it.
    pub fn ingest_complete(&mut self, id: NodeId, table: TableValue) -> Result<EditOutcome<()>> {
        self.graph
            .set_source_output(id, table)
            .map_err(rejected("ingest"))?;
        self.commit(())
    }

    /// Move a node on the canvas. Presentation only, nothing is recomputed.
    pub fn move_node(&mut self, id: NodeId, position: Position) -> Result<()> {
        self.graph
            .set_position(id, position)
            .map_err(rejected("move node"))?;
        Ok(())
    }

    /// Rename a node. Presentation only, nothing is recomputed.
    pub fn rename_node(&mut self, id: NodeId, label: impl Into<String>) -> Result<()> {
        self.graph
            .set_label(id, label)
            .map_err(rejected("rename node"))?;
        Ok(())
    }

    /// Five-number summaries for a box-plot sink's current output.
    pub fn box_stats(&self, id: NodeId) -> Result<Vec<BoxStats>> {
        let node = self.graph.node(id).ok_or(GraphError::UnknownNode(id))?;
        match node.config().visual_kind() {
            Some(VisualKind::Box) => Ok(node.output().map(box_stats).unwrap_or_default()),
            Some(_) => Err(GraphError::InvalidConfig {
                node: id,
                reason: "not a box plot".to_string(),
            }
            .into()),
            None => Err(GraphError::WrongKind {
                node: id,
                expected: NodeKind::SinkVisual,
                actual: node.kind(),
            }
            .into()),
        }
    }

    /// Read-only view of the whole graph.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.graph.nodes().map(NodeView::from).collect(),
            edges: self.graph.edges().copied().collect(),
        }
    }

    fn commit<T>(&mut self, value: T) -> Result<EditOutcome<T>> {
        let propagation = self.engine.propagate_dirty(&mut self.graph)?;
        Ok(EditOutcome {
            value,
            changed: propagation.changed.into_iter().collect(),
        })
    }
}

fn rejected(edit: &'static str) -> impl Fn(GraphError) -> Error {
    move |e| {
        warn!(edit, error = %e, "edit rejected");
        Error::Graph(e)
    }
}

/// One node as seen by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub id: NodeId,
    pub kind: NodeKind,
    pub label: String,
    pub position: Position,
    pub config: NodeConfig,
    pub output: Option<TableValue>,
}

impl From<&Node> for NodeView {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id(),
            kind: node.kind(),
            label: node.label().to_string(),
            position: node.position(),
            config: node.config().clone(),
            output: node.output().cloned(),
        }
    }
}

/// Nodes, edges and current outputs after an edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<Edge>,
}

impl Snapshot {
    pub fn node(&self, id: NodeId) -> Option<&NodeView> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(self)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, rmp_serde::decode::Error> {
        rmp_serde::from_slice(bytes)
    }
}

/// A pipeline shared between threads.
///
/// All edits and propagation passes run under one lock, so a pass always
/// finishes before the next edit is applied.
#[derive(Debug, Clone, Default)]
pub struct SharedPipeline {
    inner: Arc<Mutex<Pipeline>>,
}

impl SharedPipeline {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pipeline)),
        }
    }

    /// Run `f` with exclusive access to the pipeline.
    pub fn edit<T>(&self, f: impl FnOnce(&mut Pipeline) -> T) -> T {
        f(&mut self.inner.lock())
    }

    pub fn read<T>(&self, f: impl FnOnce(&Pipeline) -> T) -> T {
        f(&self.inner.lock())
    }

    pub fn config(&self) -> PipelineConfig {
        self.read(|p| p.config().clone())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.read(Pipeline::snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AggregatorConfig;
    use crate::table::{row, Scalar};
    use crate::transform::AVERAGE_COLUMN;

    fn sample() -> TableValue {
        TableValue::from_rows(vec![
            row([("id", "a"), ("x", "2"), ("y", "4")]),
            row([("id", "b"), ("x", "6"), ("y", "NIL")]),
        ])
    }

    #[test]
    fn create_node_uses_configured_precision() {
        let mut pipeline = Pipeline::with_config(PipelineConfig {
            mean_precision: 3,
            ..PipelineConfig::default()
        });
        let agg = pipeline.create_node(NodeKind::Aggregator);

        assert!(agg.changed.is_empty());
        let config = pipeline.node(agg.value).unwrap().config().as_aggregator().unwrap();
        assert_eq!(config.precision, 3);
        assert!(pipeline.output(agg.value).is_none());
    }

    #[test]
    fn create_widget_maps_palette_names() {
        let mut pipeline = Pipeline::new();
        let id = pipeline.create_widget("scatter-plot").unwrap().value;
        assert_eq!(
            pipeline.node(id).unwrap().config().visual_kind(),
            Some(VisualKind::Scatter)
        );

        let err = pipeline.create_widget("pie-chart").unwrap_err();
        assert!(matches!(err, Error::UnknownWidget(_)));
    }

    #[test]
    fn connect_reports_changed_nodes() {
        let mut pipeline = Pipeline::new();
        let source = pipeline.create_node(NodeKind::Source).value;
        let sink = pipeline.create_node(NodeKind::SinkTable).value;
        pipeline.ingest_complete(source, sample()).unwrap();

        let outcome = pipeline.connect(source, sink).unwrap();
        assert_eq!(outcome.changed, vec![sink]);
        assert_eq!(pipeline.output(sink), Some(&sample()));
    }

    #[test]
    fn rejected_connect_leaves_graph_untouched() {
        let mut pipeline = Pipeline::new();
        let sink = pipeline.create_node(NodeKind::SinkTable).value;
        let cleaner = pipeline.create_node(NodeKind::Cleaner).value;
        let before = pipeline.snapshot();

        let err = pipeline.connect(sink, cleaner).unwrap_err();
        assert!(matches!(err.as_graph(), Some(GraphError::IllegalPair { .. })));
        assert_eq!(pipeline.snapshot(), before);
    }

    #[test]
    fn toggle_selection_switches_modes() {
        let mut pipeline = Pipeline::new();
        let source = pipeline.create_node(NodeKind::Source).value;
        let agg = pipeline.create_node(NodeKind::Aggregator).value;
        pipeline.connect(source, agg).unwrap();
        pipeline.ingest_complete(source, sample()).unwrap();

        pipeline.toggle_selection(agg, AggregateMode::Row, 0).unwrap();
        assert_eq!(pipeline.output(agg).unwrap().rows()[0][AVERAGE_COLUMN], Scalar::from("3.00"));

        pipeline.toggle_selection(agg, AggregateMode::Column, 1).unwrap();
        let config = pipeline.node(agg).unwrap().config().as_aggregator().unwrap().clone();
        assert_eq!(config.mode, AggregateMode::Column);
        assert_eq!(config.selected_indices.iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(pipeline.output(agg).unwrap().rows()[0][AVERAGE_COLUMN], Scalar::from("6.00"));

        let err = pipeline.toggle_selection(source, AggregateMode::Row, 0).unwrap_err();
        assert!(matches!(err.as_graph(), Some(GraphError::WrongKind { .. })));
    }

    #[test]
    fn toggle_after_input_shrinks_drops_stale_indices() {
        let mut pipeline = Pipeline::new();
        let source = pipeline.create_node(NodeKind::Source).value;
        let agg = pipeline.create_node(NodeKind::Aggregator).value;
        pipeline.connect(source, agg).unwrap();

        let five: TableValue = (0..5)
            .map(|i| row([("id", format!("r{}", i)), ("x", i.to_string())]))
            .collect();
        pipeline.ingest_complete(source, five).unwrap();
        pipeline.toggle_selection(agg, AggregateMode::Row, 4).unwrap();

        pipeline.ingest_complete(source, sample()).unwrap();
        pipeline.toggle_selection(agg, AggregateMode::Row, 0).unwrap();

        let config = pipeline.node(agg).unwrap().config().as_aggregator().unwrap().clone();
        assert_eq!(config.selected_indices.iter().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(pipeline.output(agg).unwrap().len(), 1);
        assert_eq!(pipeline.output(agg).unwrap().rows()[0][AVERAGE_COLUMN], Scalar::from("3.00"));

        // The toggled index itself is still checked
        let err = pipeline.toggle_selection(agg, AggregateMode::Row, 9).unwrap_err();
        assert!(matches!(err.as_graph(), Some(GraphError::InvalidConfig { .. })));
    }

    #[test]
    fn out_of_range_selection_is_rejected() {
        let mut pipeline = Pipeline::new();
        let source = pipeline.create_node(NodeKind::Source).value;
        let agg = pipeline.create_node(NodeKind::Aggregator).value;
        pipeline.connect(source, agg).unwrap();
        pipeline.ingest_complete(source, sample()).unwrap();

        let err = pipeline
            .update_config(agg, NodeConfig::Aggregator(AggregatorConfig::rows([7])))
            .unwrap_err();
        assert!(matches!(err.as_graph(), Some(GraphError::InvalidConfig { .. })));
    }

    #[test]
    fn update_config_json_parses_configs() {
        let mut pipeline = Pipeline::new();
        let agg = pipeline.create_node(NodeKind::Aggregator).value;

        pipeline
            .update_config_json(agg, r#"{"kind":"aggregator","mode":"column","selectedIndices":[2,1,2]}"#)
            .unwrap();
        let config = pipeline.node(agg).unwrap().config().as_aggregator().unwrap().clone();
        assert_eq!(config.selected_indices.len(), 2);

        let err = pipeline.update_config_json(agg, r#"{"kind":"aggregator","mode":"diagonal"}"#);
        assert!(matches!(
            err.unwrap_err().as_graph(),
            Some(GraphError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn presentation_edits_do_not_propagate() {
        let mut pipeline = Pipeline::new();
        let node = pipeline.create_node(NodeKind::SinkTable).value;

        pipeline.move_node(node, Position::new(10.0, 20.0)).unwrap();
        pipeline.rename_node(node, "Results").unwrap();

        let view = pipeline.snapshot();
        let view = view.node(node).unwrap();
        assert_eq!(view.position, Position::new(10.0, 20.0));
        assert_eq!(view.label, "Results");
        assert!(view.output.is_none());
        assert!(pipeline.move_node(NodeId::new(), Position::default()).is_err());
    }

    #[test]
    fn box_stats_require_box_sink() {
        let mut pipeline = Pipeline::new();
        let source = pipeline.create_node(NodeKind::Source).value;
        let chart = pipeline.create_widget("box-plot").unwrap().value;
        let line = pipeline.create_widget("line-chart").unwrap().value;
        pipeline.connect(source, chart).unwrap();
        pipeline
            .ingest_complete(
                source,
                TableValue::from_rows(vec![
                    row([("v", "1")]),
                    row([("v", "2")]),
                    row([("v", "3")]),
                    row([("v", "4")]),
                ]),
            )
            .unwrap();

        let stats = pipeline.box_stats(chart).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].median, 3.0);

        assert!(pipeline.box_stats(line).unwrap_err().as_graph().is_some());
        assert!(pipeline.box_stats(source).is_err());
    }

    #[test]
    fn snapshot_survives_msgpack() {
        let mut pipeline = Pipeline::new();
        let source = pipeline.create_node(NodeKind::Source).value;
        let agg = pipeline.create_node(NodeKind::Aggregator).value;
        pipeline.connect(source, agg).unwrap();
        pipeline.ingest_complete(source, sample()).unwrap();
        pipeline
            .update_config(agg, NodeConfig::Aggregator(AggregatorConfig::rows([0, 1])))
            .unwrap();

        let snapshot = pipeline.snapshot();
        let bytes = snapshot.to_msgpack().unwrap();
        assert_eq!(Snapshot::from_msgpack(&bytes).unwrap(), snapshot);
        assert!(snapshot.to_json().unwrap().contains("\"fromId\""));
    }

    #[test]
    fn shared_pipeline_serializes_edits() {
        let shared = SharedPipeline::default();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.edit(|p| p.create_node(NodeKind::Cleaner).value))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.snapshot().nodes.len(), 4);
        assert_eq!(shared.config(), PipelineConfig::default());
    }
}
