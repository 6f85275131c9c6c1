//! Tableflow Core
//!
//! This crate provides the dataflow graph engine behind the Tableflow visual
//! table pipeline. It implements:
//!
//! - The row-oriented table exchanged between nodes
//! - Per-edge transforms (blank cleaning, row and column means)
//! - The node/edge graph and its structural rules
//! - Incremental propagation of outputs after every edit
//!
//! The crate is designed to be used both as a native Rust library and as a
//! Python extension module via PyO3 (feature `python`).
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `table`: Table values, cells and column statistics
//! - `transform`: The transform registry and the node transforms
//! - `graph`: Node/edge store and the propagation engine
//! - `pipeline`: Edit events, snapshots and the shared handle
//! - `ingest`: File decoding and asynchronous upload ingestion
//!
//! # Example
//!
//! ```rust
//! use tableflow_core::graph::{AggregatorConfig, NodeConfig, NodeKind};
//! use tableflow_core::pipeline::Pipeline;
//! use tableflow_core::table::{row, Scalar, TableValue};
//!
//! let mut pipeline = Pipeline::new();
//! let source = pipeline.create_node(NodeKind::Source).value;
//! let mean = pipeline.create_node(NodeKind::Aggregator).value;
//! pipeline.connect(source, mean).unwrap();
//!
//! let table: TableValue = vec![
//!     row([("id", "a"), ("x", "2"), ("y", "4")]),
//!     row([("id", "b"), ("x", "6"), ("y", "NIL")]),
//! ]
//! .into();
//! pipeline.ingest_complete(source, table).unwrap();
//!
//! // Select row 0: mean of x and y, the id column is a label
//! pipeline
//!     .update_config(mean, NodeConfig::Aggregator(AggregatorConfig::rows([0])))
//!     .unwrap();
//! let output = pipeline.output(mean).unwrap();
//! assert_eq!(output.rows()[0]["Average"], Scalar::from("3.00"));
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod pipeline;
pub mod table;
pub mod transform;

#[cfg(feature = "python")]
mod python;

pub use config::{IngestOptions, PipelineConfig};
pub use error::{DecodeError, Error, GraphError, Result};
pub use pipeline::{EditOutcome, Pipeline, SharedPipeline, Snapshot};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// Python module definition.
///
/// This function is called by Python when importing the module.
/// It registers all Python-exposed types and functions.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyPipeline>()?;

    // Add version info
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
