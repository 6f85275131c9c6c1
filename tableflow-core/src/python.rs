//! Python bindings.
//!
//! Configurations and tables cross the boundary as JSON strings. Node and
//! edge ids are plain integers. Every error is raised as `ValueError`.

use std::fmt::Display;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::PipelineConfig;
use crate::graph::{EdgeId, NodeId, NodeKind, Position};
use crate::ingest::UploadRecord;
use crate::pipeline::{EditOutcome, Pipeline, SharedPipeline};
use crate::table::TableValue;

fn value_error(e: impl Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn changed<T>(outcome: EditOutcome<T>) -> Vec<u64> {
    outcome.changed.iter().map(NodeId::raw).collect()
}

/// Python-exposed pipeline.
#[pyclass(name = "Pipeline")]
pub struct PyPipeline {
    inner: SharedPipeline,
}

#[pymethods]
impl PyPipeline {
    /// Create a pipeline, optionally from a JSON configuration.
    #[new]
    #[pyo3(signature = (config=None))]
    fn new(config: Option<&str>) -> PyResult<Self> {
        let config = match config {
            Some(json) => PipelineConfig::from_json(json).map_err(value_error)?,
            None => PipelineConfig::default(),
        };
        Ok(Self {
            inner: SharedPipeline::new(Pipeline::with_config(config)),
        })
    }

    /// Create a node of the given kind (`source`, `cleaner`, ...).
    fn create_node(&self, kind: &str) -> PyResult<u64> {
        let kind: NodeKind = kind.parse().map_err(value_error)?;
        Ok(self.inner.edit(|p| p.create_node(kind).value.raw()))
    }

    /// Create a node from a palette widget type (`file-upload`, `box-plot`, ...).
    fn create_widget(&self, widget: &str) -> PyResult<u64> {
        self.inner
            .edit(|p| p.create_widget(widget))
            .map(|outcome| outcome.value.raw())
            .map_err(value_error)
    }

    fn delete_node(&self, id: u64) -> PyResult<Vec<u64>> {
        self.inner
            .edit(|p| p.delete_node(NodeId::from(id)))
            .map(changed)
            .map_err(value_error)
    }

    /// Connect two nodes. Returns the edge id and the changed nodes.
    fn connect(&self, from_id: u64, to_id: u64) -> PyResult<(u64, Vec<u64>)> {
        let outcome = self
            .inner
            .edit(|p| p.connect(NodeId::from(from_id), NodeId::from(to_id)))
            .map_err(value_error)?;
        Ok((outcome.value.raw(), changed(outcome)))
    }

    fn disconnect(&self, edge_id: u64) -> PyResult<Vec<u64>> {
        self.inner
            .edit(|p| p.disconnect(EdgeId::from(edge_id)))
            .map(changed)
            .map_err(value_error)
    }

    fn update_config(&self, id: u64, config: &str) -> PyResult<Vec<u64>> {
        self.inner
            .edit(|p| p.update_config_json(NodeId::from(id), config))
            .map(changed)
            .map_err(value_error)
    }

    /// Store a decoded table (JSON array of row objects) on a source node.
    fn ingest_complete(&self, id: u64, table: &str) -> PyResult<Vec<u64>> {
        let table = TableValue::from_json(table).map_err(value_error)?;
        self.inner
            .edit(|p| p.ingest_complete(NodeId::from(id), table))
            .map(changed)
            .map_err(value_error)
    }

    /// Decode an uploaded file and store its rows on a source node.
    fn ingest_file(&self, id: u64, filename: &str, content: &[u8]) -> PyResult<Vec<u64>> {
        let options = self.inner.config().ingest;
        let record = UploadRecord::decode(filename, content, &options).map_err(value_error)?;
        self.inner
            .edit(|p| p.ingest_complete(NodeId::from(id), record.rows))
            .map(changed)
            .map_err(value_error)
    }

    fn move_node(&self, id: u64, x: f64, y: f64) -> PyResult<()> {
        self.inner
            .edit(|p| p.move_node(NodeId::from(id), Position::new(x, y)))
            .map_err(value_error)
    }

    fn rename_node(&self, id: u64, label: String) -> PyResult<()> {
        self.inner
            .edit(|p| p.rename_node(NodeId::from(id), label))
            .map_err(value_error)
    }

    /// Current output of a node as JSON, or `None` if it has none yet.
    fn output(&self, id: u64) -> PyResult<Option<String>> {
        self.inner
            .read(|p| p.output(NodeId::from(id)).map(TableValue::to_json).transpose())
            .map_err(value_error)
    }

    fn box_stats(&self, id: u64) -> PyResult<String> {
        let stats = self
            .inner
            .read(|p| p.box_stats(NodeId::from(id)))
            .map_err(value_error)?;
        serde_json::to_string(&stats).map_err(value_error)
    }

    /// The whole graph with every node's output, as JSON.
    fn snapshot(&self) -> PyResult<String> {
        self.inner.snapshot().to_json().map_err(value_error)
    }

    fn __repr__(&self) -> String {
        self.inner.read(|p| {
            format!(
                "Pipeline(nodes={}, edges={})",
                p.graph().node_count(),
                p.graph().edge_count()
            )
        })
    }
}
