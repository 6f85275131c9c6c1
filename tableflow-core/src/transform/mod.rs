//! Transforms
//!
//! Pure table functions used during propagation.
//!
//! Two layers are involved when a node is recomputed:
//!
//! 1. For every inbound edge, the [`TransformRegistry`] derives the node's
//!    input contribution from that producer's output.
//! 2. The node's own transform turns the merged input into its output:
//!    cleaners replace blanks, aggregators compute means, sinks keep the
//!    input as is.

mod aggregator;
mod cleaner;
mod registry;

pub use aggregator::{aggregate, AVERAGE_COLUMN, COLUMN_COLUMN};
pub use cleaner::{clean, NIL};
pub use registry::{identity, DeriveFn, TransformRegistry};

use crate::graph::NodeConfig;
use crate::table::TableValue;

/// Apply a node's own transform to its merged input.
pub fn apply(config: &NodeConfig, input: &TableValue) -> TableValue {
    match config {
        NodeConfig::Cleaner => clean(input),
        NodeConfig::Aggregator(agg) => aggregate(input, agg),
        NodeConfig::Source | NodeConfig::SinkTable | NodeConfig::SinkVisual { .. } => input.clone(),
    }
}
