//! Tabular Data
//!
//! The in-memory table representation shared by every node in the graph,
//! plus the numeric helpers the transforms and chart sinks use.

mod stats;
mod value;

pub use stats::{box_stats, format_mean, mean, BoxStats};
pub use value::{row, Row, Scalar, TableValue};
