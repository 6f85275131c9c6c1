//! Table Values
//!
//! This module defines the scalar cell type and the row-oriented table that
//! flows along every edge of the pipeline.
//!
//! # Layout
//!
//! A table is an ordered list of rows. Each row maps a column name to a
//! scalar. Rows are `IndexMap`s so that the key order of the first row gives
//! the table a stable column order, which the aggregator relies on when it
//! addresses columns by index.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single cell value.
///
/// Serializes without a tag: `Missing` is `null`, numbers are JSON numbers
/// and text is a JSON string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// An explicit missing marker (null / undefined in the source data).
    #[default]
    Missing,

    /// A numeric cell.
    Number(f64),

    /// A text cell. Decoded files produce text cells only.
    Text(String),
}

impl Scalar {
    /// Whether this cell counts as blank for cleaning purposes.
    ///
    /// Missing cells and text that is empty after trimming are blank.
    /// Numbers are never blank, zero included.
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Missing => true,
            Scalar::Number(_) => false,
            Scalar::Text(s) => s.trim().is_empty(),
        }
    }

    /// Interpret the cell as a finite number, if possible.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            Scalar::Missing => return None,
            Scalar::Number(n) => *n,
            Scalar::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }

    /// Get the text content, if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Scalar::Missing)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Missing => Ok(()),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Number(n)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Number(n as f64)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Scalar::Missing)
    }
}

/// One table row: column name to cell, in column order.
pub type Row = IndexMap<String, Scalar>;

/// Build a row from `(column, value)` pairs.
///
/// ```rust
/// use tableflow_core::table::{row, Scalar};
///
/// let r = row([("id", "a"), ("x", "2")]);
/// assert_eq!(r["x"], Scalar::from("2"));
/// ```
pub fn row<K, V, I>(cells: I) -> Row
where
    K: Into<String>,
    V: Into<Scalar>,
    I: IntoIterator<Item = (K, V)>,
{
    cells
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Tabular data exchanged between nodes.
///
/// An empty table (zero rows) is a valid value. Nodes that have not been
/// computed yet hold no table at all (`Option<TableValue>::None`), which is
/// a different state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableValue {
    rows: Vec<Row>,
}

impl TableValue {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table from rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Parse a table from a JSON array of flat objects.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Column names, taken from the key order of the first row.
    pub fn columns(&self) -> Vec<&str> {
        self.rows
            .first()
            .map(|r| r.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Name of the column at `index`, if the table has that many columns.
    pub fn column_name(&self, index: usize) -> Option<&str> {
        self.rows
            .first()
            .and_then(|r| r.get_index(index))
            .map(|(k, _)| k.as_str())
    }

    /// Number of columns (keys of the first row).
    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Row::len)
    }

    /// Apply `f` to every cell, keeping the shape of the table.
    pub fn map_cells<F>(&self, mut f: F) -> TableValue
    where
        F: FnMut(&str, &Scalar) -> Scalar,
    {
        let rows = self
            .rows
            .iter()
            .map(|r| r.iter().map(|(k, v)| (k.clone(), f(k, v))).collect())
            .collect();
        Self { rows }
    }

    /// Merge another table into this one, row by row.
    ///
    /// Row `i` of the result is the union of both rows `i`. Where both rows
    /// carry the same column the value from `other` wins. Extra rows of
    /// `other` are appended.
    pub fn merge(&mut self, other: &TableValue) {
        for (index, incoming) in other.rows.iter().enumerate() {
            match self.rows.get_mut(index) {
                Some(existing) => {
                    for (k, v) in incoming {
                        existing.insert(k.clone(), v.clone());
                    }
                }
                None => self.rows.push(incoming.clone()),
            }
        }
    }

    /// Mean of every column over all rows.
    ///
    /// Non-numeric cells are not counted. A column without any numeric cell
    /// maps to `None`.
    pub fn column_means(&self) -> IndexMap<String, Option<f64>> {
        self.columns()
            .into_iter()
            .map(|col| {
                let values = self.rows.iter().filter_map(|r| r.get(col)?.as_number());
                (col.to_string(), super::stats::mean(values))
            })
            .collect()
    }
}

impl FromIterator<Row> for TableValue {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Row>> for TableValue {
    fn from(rows: Vec<Row>) -> Self {
        Self::from_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TableValue {
        TableValue::from_rows(vec![
            row([("id", "a"), ("x", "2"), ("y", "4")]),
            row([("id", "b"), ("x", "6"), ("y", "NIL")]),
        ])
    }

    #[test]
    fn columns_follow_first_row_order() {
        let table = sample();
        assert_eq!(table.columns(), vec!["id", "x", "y"]);
        assert_eq!(table.column_name(2), Some("y"));
        assert_eq!(table.column_name(3), None);
        assert_eq!(table.column_count(), 3);
    }

    #[test]
    fn empty_table_has_no_columns() {
        let table = TableValue::new();
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn scalar_blankness() {
        assert!(Scalar::Missing.is_blank());
        assert!(Scalar::from("   ").is_blank());
        assert!(Scalar::from("").is_blank());
        assert!(!Scalar::from("0").is_blank());
        assert!(!Scalar::Number(0.0).is_blank());
    }

    #[test]
    fn scalar_numbers() {
        assert_eq!(Scalar::from(" 2.5 ").as_number(), Some(2.5));
        assert_eq!(Scalar::Number(4.0).as_number(), Some(4.0));
        assert_eq!(Scalar::from("NIL").as_number(), None);
        assert_eq!(Scalar::from("").as_number(), None);
        assert_eq!(Scalar::from("inf").as_number(), None);
        assert_eq!(Scalar::Number(f64::NAN).as_number(), None);
        assert_eq!(Scalar::Missing.as_number(), None);
    }

    #[test]
    fn merge_overwrites_overlapping_columns() {
        let mut left = TableValue::from_rows(vec![row([("a", "1"), ("b", "2")])]);
        let right = TableValue::from_rows(vec![
            row([("b", "20"), ("c", "30")]),
            row([("b", "21")]),
        ]);

        left.merge(&right);

        assert_eq!(left.len(), 2);
        assert_eq!(left.columns(), vec!["a", "b", "c"]);
        assert_eq!(left.rows()[0]["b"], Scalar::from("20"));
        assert_eq!(left.rows()[1]["b"], Scalar::from("21"));
    }

    #[test]
    fn column_means_skip_non_numeric_cells() {
        let means = sample().column_means();
        assert_eq!(means["id"], None);
        assert_eq!(means["x"], Some(4.0));
        assert_eq!(means["y"], Some(4.0));
    }

    #[test]
    fn json_round_trip_keeps_null_and_order() {
        let json = r#"[{"v":null,"n":1.5,"s":"x"}]"#;
        let table = TableValue::from_json(json).unwrap();
        assert_eq!(table.rows()[0]["v"], Scalar::Missing);
        assert_eq!(table.rows()[0]["n"], Scalar::Number(1.5));
        assert_eq!(table.columns(), vec!["v", "n", "s"]);
        assert_eq!(table.to_json().unwrap(), json);
    }
}
