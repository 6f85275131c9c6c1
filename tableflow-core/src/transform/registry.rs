//! Transform Registry
//!
//! Maps each legal `(producer kind, consumer kind)` pair to the function that
//! derives the consumer's input from the producer's output. A pair missing
//! from the registry is an illegal edge.

use indexmap::IndexMap;

use crate::graph::{NodeConfig, NodeKind};
use crate::table::TableValue;

/// Derive a consumer's input contribution from one producer's output.
///
/// Implementations must be pure and must accept empty tables.
pub type DeriveFn = fn(&TableValue, &NodeConfig) -> TableValue;

/// Table of derive functions keyed by ordered kind pair.
#[derive(Clone)]
pub struct TransformRegistry {
    entries: IndexMap<(NodeKind, NodeKind), DeriveFn>,
}

/// Pass the producer's output through unchanged.
///
/// Every built-in pair is an identity copy: the producer already holds its
/// own transformed result (a cleaner's output is cleaned, an aggregator's
/// output is its result table).
pub fn identity(producer: &TableValue, _consumer: &NodeConfig) -> TableValue {
    producer.clone()
}

impl TransformRegistry {
    /// A registry with no legal pairs.
    pub fn empty() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// The built-in pipeline pairs.
    pub fn builtin() -> Self {
        use NodeKind::*;

        let mut registry = Self::empty();
        for pair in [
            (Source, Cleaner),
            (Source, Aggregator),
            (Source, SinkTable),
            (Source, SinkVisual),
            (Cleaner, Aggregator),
            (Cleaner, SinkTable),
            (Aggregator, SinkTable),
        ] {
            registry.register(pair.0, pair.1, identity);
        }
        registry
    }

    /// Register (or replace) the derive function for a pair.
    ///
    /// Returns the previously registered function, if any.
    pub fn register(&mut self, producer: NodeKind, consumer: NodeKind, derive: DeriveFn) -> Option<DeriveFn> {
        self.entries.insert((producer, consumer), derive)
    }

    /// Look up the derive function for a pair.
    pub fn get(&self, producer: NodeKind, consumer: NodeKind) -> Option<DeriveFn> {
        self.entries.get(&(producer, consumer)).copied()
    }

    /// Whether an edge from `producer` to `consumer` is allowed.
    pub fn is_legal(&self, producer: NodeKind, consumer: NodeKind) -> bool {
        self.entries.contains_key(&(producer, consumer))
    }

    /// All legal pairs, in registration order.
    pub fn pairs(&self) -> impl Iterator<Item = (NodeKind, NodeKind)> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::row;
    use NodeKind::*;

    #[test]
    fn builtin_pairs_are_legal() {
        let registry = TransformRegistry::builtin();
        assert_eq!(registry.len(), 7);
        assert!(registry.is_legal(Source, Cleaner));
        assert!(registry.is_legal(Source, SinkVisual));
        assert!(registry.is_legal(Aggregator, SinkTable));
    }

    #[test]
    fn unlisted_pairs_are_illegal() {
        let registry = TransformRegistry::builtin();
        assert!(!registry.is_legal(Cleaner, SinkVisual));
        assert!(!registry.is_legal(Aggregator, SinkVisual));
        assert!(!registry.is_legal(Aggregator, Cleaner));
        assert!(!registry.is_legal(SinkTable, Source));
        for kind in NodeKind::ALL {
            assert!(!registry.is_legal(kind, Source));
            assert!(!registry.is_legal(SinkVisual, kind));
        }
    }

    #[test]
    fn derive_copies_producer_output() {
        let registry = TransformRegistry::builtin();
        let table = TableValue::from_rows(vec![row([("v", "")])]);
        let derive = registry.get(Source, Cleaner).unwrap();

        assert_eq!(derive(&table, &NodeConfig::Cleaner), table);
        assert_eq!(derive(&TableValue::new(), &NodeConfig::Cleaner), TableValue::new());
    }

    #[test]
    fn custom_pairs_can_be_registered() {
        fn first_row(t: &TableValue, _: &NodeConfig) -> TableValue {
            t.rows().iter().take(1).cloned().collect()
        }

        let mut registry = TransformRegistry::empty();
        assert!(registry.register(Cleaner, SinkVisual, first_row).is_none());
        assert!(registry.is_legal(Cleaner, SinkVisual));
        assert!(registry.register(Cleaner, SinkVisual, identity).is_some());
    }
}
