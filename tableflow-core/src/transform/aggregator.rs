//! Mean Aggregation
//!
//! Computes row or column means over the selection of an aggregator node.
//!
//! # Exclusions
//!
//! - Row mode skips the first column, which holds the row label.
//! - Column mode skips the first row and never averages column 0.
//!
//! Cells that do not parse as a finite number are ignored. A selection with
//! no numeric cell gets the missing marker as its mean, not zero.
//!
//! Selected indices that fall outside the current input are skipped, so an
//! upstream change that shrinks the table never fails a recompute.

use crate::graph::{AggregateMode, AggregatorConfig};
use crate::table::{format_mean, mean, Row, Scalar, TableValue};

/// Name of the synthetic column holding the computed mean.
pub const AVERAGE_COLUMN: &str = "Average";

/// Name of the column holding the source column name in column mode.
pub const COLUMN_COLUMN: &str = "Column";

/// Run the aggregation described by `config` over `input`.
pub fn aggregate(input: &TableValue, config: &AggregatorConfig) -> TableValue {
    match config.mode {
        AggregateMode::Row => row_means(input, config),
        AggregateMode::Column => column_means(input, config),
    }
}

fn row_means(input: &TableValue, config: &AggregatorConfig) -> TableValue {
    let columns = input.columns();
    let value_columns = columns.get(1..).unwrap_or_default();

    config
        .selected_indices
        .iter()
        .filter_map(|&index| input.row(index))
        .map(|source| {
            let values = value_columns
                .iter()
                .filter_map(|col| source.get(*col)?.as_number());
            let mut out = source.clone();
            out.insert(
                AVERAGE_COLUMN.to_string(),
                format_mean(mean(values), config.precision),
            );
            out
        })
        .collect()
}

fn column_means(input: &TableValue, config: &AggregatorConfig) -> TableValue {
    let body = input.rows().get(1..).unwrap_or_default();

    config
        .selected_indices
        .iter()
        .filter(|&&index| index != 0)
        .filter_map(|&index| input.column_name(index))
        .map(|name| {
            let values = body.iter().filter_map(|r| r.get(name)?.as_number());
            let mut out = Row::new();
            out.insert(COLUMN_COLUMN.to_string(), Scalar::from(name));
            out.insert(
                AVERAGE_COLUMN.to_string(),
                format_mean(mean(values), config.precision),
            );
            out
        })
        .collect()
}
