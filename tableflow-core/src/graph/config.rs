//! Node Configuration
//!
//! Every node carries a configuration record whose variant determines the
//! node's [`NodeKind`]. Only aggregators have parameters the engine reads;
//! the chart sub-kind of a visual sink is carried for the presentation layer.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::node::NodeKind;
use crate::table::TableValue;

/// Decimal places used for aggregator means unless configured otherwise.
pub const DEFAULT_PRECISION: usize = 2;

/// Upper bound for configured precision.
pub const MAX_PRECISION: usize = 12;

/// Chart flavour of a visual sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualKind {
    #[default]
    Line,
    Scatter,
    Box,
    Bar,
}

/// Which axis an aggregator averages along.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateMode {
    /// Average each selected row across its columns (first column excluded).
    #[default]
    Row,

    /// Average each selected column down its rows (first row excluded).
    Column,
}

/// Committed selection of an aggregator node.
///
/// The selection holds row indices in [`AggregateMode::Row`] and column
/// indices in [`AggregateMode::Column`]; the two can never be selected at
/// the same time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorConfig {
    pub mode: AggregateMode,

    /// Ordered, duplicate-free selection.
    #[serde(default)]
    pub selected_indices: IndexSet<usize>,

    /// Decimal places of the rendered mean.
    #[serde(default = "default_precision")]
    pub precision: usize,
}

fn default_precision() -> usize {
    DEFAULT_PRECISION
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            mode: AggregateMode::Row,
            selected_indices: IndexSet::new(),
            precision: DEFAULT_PRECISION,
        }
    }
}

impl AggregatorConfig {
    /// Select the given rows.
    pub fn rows<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        Self {
            mode: AggregateMode::Row,
            selected_indices: indices.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Select the given columns.
    pub fn columns<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        Self {
            mode: AggregateMode::Column,
            selected_indices: indices.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// Toggle a row index. Switching from column mode drops every column
    /// selection first.
    pub fn toggle_row(&mut self, index: usize) {
        self.toggle(AggregateMode::Row, index);
    }

    /// Toggle a column index. Switching from row mode drops every row
    /// selection first.
    pub fn toggle_column(&mut self, index: usize) {
        self.toggle(AggregateMode::Column, index);
    }

    fn toggle(&mut self, mode: AggregateMode, index: usize) {
        if self.mode != mode {
            self.mode = mode;
            self.selected_indices.clear();
        }
        if !self.selected_indices.shift_remove(&index) {
            self.selected_indices.insert(index);
        }
    }

    /// Drop selected indices that no longer fit `input`.
    ///
    /// An upstream change can shrink the table after a selection was made.
    /// Does nothing while the node has no input.
    pub fn retain_in_range(&mut self, input: Option<&TableValue>) {
        let Some(input) = input else {
            return;
        };
        let limit = match self.mode {
            AggregateMode::Row => input.len(),
            AggregateMode::Column => input.column_count(),
        };
        self.selected_indices.retain(|&i| i < limit);
    }

    /// Check the selection against the aggregator's current input.
    ///
    /// Column 0 is the label column and never selectable. Range checks only
    /// apply once the node has received data.
    pub fn validate(&self, input: Option<&TableValue>) -> Result<(), String> {
        if self.precision > MAX_PRECISION {
            return Err(format!(
                "precision {} exceeds the maximum of {}",
                self.precision, MAX_PRECISION
            ));
        }

        if self.mode == AggregateMode::Column && self.selected_indices.contains(&0) {
            return Err("column 0 is the label column and cannot be averaged".to_string());
        }

        let Some(input) = input else {
            return Ok(());
        };

        let (limit, what) = match self.mode {
            AggregateMode::Row => (input.len(), "row"),
            AggregateMode::Column => (input.column_count(), "column"),
        };
        match self.selected_indices.iter().find(|&&i| i >= limit) {
            Some(i) => Err(format!("{} index {} out of range (have {})", what, i, limit)),
            None => Ok(()),
        }
    }
}

/// Kind-specific configuration of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NodeConfig {
    Source,
    Cleaner,
    Aggregator(AggregatorConfig),
    SinkTable,
    SinkVisual {
        #[serde(default)]
        chart: VisualKind,
    },
}

impl NodeConfig {
    /// Default configuration for a node of the given kind.
    pub fn for_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Source => NodeConfig::Source,
            NodeKind::Cleaner => NodeConfig::Cleaner,
            NodeKind::Aggregator => NodeConfig::Aggregator(AggregatorConfig::default()),
            NodeKind::SinkTable => NodeConfig::SinkTable,
            NodeKind::SinkVisual => NodeConfig::SinkVisual {
                chart: VisualKind::default(),
            },
        }
    }

    /// Default configuration for a canvas palette widget identifier.
    pub fn from_widget_type(widget: &str) -> Option<Self> {
        let config = match widget {
            "file-upload" => NodeConfig::Source,
            "blank-remover" => NodeConfig::Cleaner,
            "mean-average" => NodeConfig::Aggregator(AggregatorConfig::default()),
            "data-table" => NodeConfig::SinkTable,
            "line-chart" => NodeConfig::SinkVisual { chart: VisualKind::Line },
            "scatter-plot" => NodeConfig::SinkVisual { chart: VisualKind::Scatter },
            "box-plot" => NodeConfig::SinkVisual { chart: VisualKind::Box },
            "bar-chart" => NodeConfig::SinkVisual { chart: VisualKind::Bar },
            _ => return None,
        };
        Some(config)
    }

    /// Parse a configuration from JSON, e.g.
    /// `{"kind":"aggregator","mode":"row","selectedIndices":[0]}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeConfig::Source => NodeKind::Source,
            NodeConfig::Cleaner => NodeKind::Cleaner,
            NodeConfig::Aggregator(_) => NodeKind::Aggregator,
            NodeConfig::SinkTable => NodeKind::SinkTable,
            NodeConfig::SinkVisual { .. } => NodeKind::SinkVisual,
        }
    }

    pub fn as_aggregator(&self) -> Option<&AggregatorConfig> {
        match self {
            NodeConfig::Aggregator(config) => Some(config),
            _ => None,
        }
    }

    pub fn visual_kind(&self) -> Option<VisualKind> {
        match self {
            NodeConfig::SinkVisual { chart } => Some(*chart),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::row;

    fn two_by_three() -> TableValue {
        TableValue::from_rows(vec![
            row([("id", "a"), ("x", "2"), ("y", "4")]),
            row([("id", "b"), ("x", "6"), ("y", "NIL")]),
        ])
    }

    #[test]
    fn parses_aggregator_json() {
        let config =
            NodeConfig::from_json(r#"{"kind":"aggregator","mode":"column","selectedIndices":[2,1,2]}"#)
                .unwrap();
        let agg = config.as_aggregator().unwrap();
        assert_eq!(agg.mode, AggregateMode::Column);
        // Duplicates are ignored, order is kept
        assert_eq!(agg.selected_indices.iter().copied().collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(agg.precision, DEFAULT_PRECISION);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(NodeConfig::from_json(r#"{"kind":"aggregator","mode":"diagonal"}"#).is_err());
    }

    #[test]
    fn unit_configs_parse() {
        assert_eq!(NodeConfig::from_json(r#"{"kind":"cleaner"}"#).unwrap(), NodeConfig::Cleaner);
        assert_eq!(
            NodeConfig::from_json(r#"{"kind":"sink-visual","chart":"box"}"#).unwrap(),
            NodeConfig::SinkVisual { chart: VisualKind::Box }
        );
    }

    #[test]
    fn toggling_switches_modes_exclusively() {
        let mut config = AggregatorConfig::default();
        config.toggle_row(0);
        config.toggle_row(1);
        assert_eq!(config.selected_indices.len(), 2);

        config.toggle_column(2);
        assert_eq!(config.mode, AggregateMode::Column);
        assert_eq!(config.selected_indices.iter().copied().collect::<Vec<_>>(), vec![2]);

        config.toggle_column(2);
        assert!(config.selected_indices.is_empty());
    }

    #[test]
    fn retain_in_range_drops_stale_indices() {
        let input = two_by_three();

        let mut rows = AggregatorConfig::rows([4, 1, 2]);
        rows.retain_in_range(Some(&input));
        assert_eq!(rows.selected_indices.iter().copied().collect::<Vec<_>>(), vec![1]);

        let mut columns = AggregatorConfig::columns([2, 3]);
        columns.retain_in_range(Some(&input));
        assert_eq!(columns.selected_indices.iter().copied().collect::<Vec<_>>(), vec![2]);

        let mut untouched = AggregatorConfig::rows([9]);
        untouched.retain_in_range(None);
        assert_eq!(untouched.selected_indices.len(), 1);
    }

    #[test]
    fn validate_checks_ranges_against_input() {
        let input = two_by_three();

        assert!(AggregatorConfig::rows([0, 1]).validate(Some(&input)).is_ok());
        assert!(AggregatorConfig::rows([2]).validate(Some(&input)).is_err());
        assert!(AggregatorConfig::columns([1, 2]).validate(Some(&input)).is_ok());
        assert!(AggregatorConfig::columns([3]).validate(Some(&input)).is_err());
        assert!(AggregatorConfig::columns([0]).validate(None).is_err());
        assert!(AggregatorConfig::rows([40]).validate(None).is_ok());
        assert!(AggregatorConfig::default().with_precision(99).validate(None).is_err());
    }

    #[test]
    fn widget_types_map_to_kinds() {
        assert_eq!(NodeConfig::from_widget_type("file-upload").unwrap().kind(), NodeKind::Source);
        assert_eq!(
            NodeConfig::from_widget_type("box-plot").unwrap().visual_kind(),
            Some(VisualKind::Box)
        );
        assert!(NodeConfig::from_widget_type("pie-chart").is_none());

        for kind in NodeKind::ALL {
            assert_eq!(NodeConfig::for_kind(kind).kind(), kind);
        }
    }
}
