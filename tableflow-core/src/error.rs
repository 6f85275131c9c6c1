//! Error types for the pipeline engine.

use thiserror::Error;

use crate::graph::{EdgeId, NodeId, NodeKind};

/// A rejected graph mutation.
///
/// Every variant except [`GraphError::InternalInvariantViolation`] is a user
/// facing rejection: the graph is left exactly as it was before the call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    #[error("cannot connect {0} to itself")]
    SelfLoop(NodeId),

    #[error("{from} is already connected to {to} by {existing}")]
    DuplicateEdge {
        from: NodeId,
        to: NodeId,
        existing: EdgeId,
    },

    #[error("a {from} node cannot feed a {to} node")]
    IllegalPair { from: NodeKind, to: NodeKind },

    #[error("cannot connect {from} to {to}: would create a cycle")]
    CycleDetected { from: NodeId, to: NodeId },

    #[error("invalid configuration for {node}: {reason}")]
    InvalidConfig { node: NodeId, reason: String },

    #[error("{node} is a {actual} node, expected {expected}")]
    WrongKind {
        node: NodeId,
        expected: NodeKind,
        actual: NodeKind,
    },

    /// The graph reached a state its mutation checks should have made
    /// impossible. This is a bug, not a user error.
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

/// Failure to turn uploaded bytes into a table.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("unexpected data shape: {0}")]
    InvalidShape(String),
}

/// Top-level error type of the crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("cannot decode upload: {0}")]
    Decode(#[from] DecodeError),

    #[error("ingestion task failed: {0}")]
    Ingest(String),

    #[error("invalid pipeline configuration: {0}")]
    Config(String),

    #[error("unknown widget type: {0}")]
    UnknownWidget(String),
}

impl Error {
    /// The graph error behind this error, if any.
    pub fn as_graph(&self) -> Option<&GraphError> {
        match self {
            Error::Graph(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_lowercase_fragments() {
        let err = Error::from(DecodeError::UnsupportedFormat("notes.txt".to_string()));
        assert_eq!(err.to_string(), "cannot decode upload: unsupported file type: notes.txt");
        assert_eq!(
            Error::UnknownWidget("dial".to_string()).to_string(),
            "unknown widget type: dial"
        );
        assert_eq!(
            Error::Config("bad".to_string()).to_string(),
            "invalid pipeline configuration: bad"
        );
    }
}
