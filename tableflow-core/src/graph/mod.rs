//! Pipeline Graph
//!
//! The directed acyclic graph of pipeline nodes and the engine that keeps
//! their outputs current.
//!
//! # Overview
//!
//! - Nodes carry a kind, a configuration, and the tables they last consumed
//!   and produced
//! - An edge from A to B means B consumes A's output
//!
//! Edits go through [`Graph`], which validates them and marks affected nodes
//! dirty. [`PropagationEngine`] then recomputes everything downstream of the
//! dirty nodes in topological order.
//!
//! # Design Decisions
//!
//! 1. Nodes and edges live in one arena keyed by id. Nodes hold edge ids,
//!    never references to each other.
//!
//! 2. Arenas keep insertion order, so traversal and propagation order are
//!    reproducible across runs.
//!
//! 3. Acyclicity is enforced when an edge is added, not discovered during
//!    propagation.

mod config;
mod node;
mod scheduler;
mod store;

pub use config::{AggregateMode, AggregatorConfig, NodeConfig, VisualKind, DEFAULT_PRECISION, MAX_PRECISION};
pub use node::{DirtyState, Edge, EdgeId, Node, NodeId, NodeKind, Position};
pub use scheduler::{Propagation, PropagationEngine};
pub use store::Graph;
