//! Numeric summaries over table columns.

use serde::{Deserialize, Serialize};

use super::value::{Scalar, TableValue};

/// Arithmetic mean of the given values, `None` when there are none.
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Render a mean as a cell with a fixed number of decimals.
///
/// An absent mean becomes the missing marker, never zero.
pub fn format_mean(value: Option<f64>, precision: usize) -> Scalar {
    match value {
        Some(v) => Scalar::Text(format!("{:.*}", precision, v)),
        None => Scalar::Missing,
    }
}

/// Five-number summary of one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxStats {
    pub column: String,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Compute box-plot statistics for every column that has numeric cells.
///
/// Quartiles are picked from the sorted values at index `floor(n * p)`,
/// without interpolation. Columns with no numeric cell are omitted.
pub fn box_stats(table: &TableValue) -> Vec<BoxStats> {
    table
        .columns()
        .into_iter()
        .filter_map(|col| {
            let mut values: Vec<f64> = table
                .rows()
                .iter()
                .filter_map(|r| r.get(col)?.as_number())
                .collect();
            if values.is_empty() {
                return None;
            }
            values.sort_by(f64::total_cmp);

            let at = |p: f64| values[(values.len() as f64 * p).floor() as usize];
            Some(BoxStats {
                column: col.to_string(),
                min: values[0],
                q1: at(0.25),
                median: at(0.5),
                q3: at(0.75),
                max: values[values.len() - 1],
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::row;

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean(std::iter::empty()), None);
        assert_eq!(mean([2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn format_mean_uses_precision() {
        assert_eq!(format_mean(Some(3.0), 2), Scalar::from("3.00"));
        assert_eq!(format_mean(Some(1.0 / 3.0), 3), Scalar::from("0.333"));
        assert_eq!(format_mean(None, 2), Scalar::Missing);
    }

    #[test]
    fn box_stats_per_numeric_column() {
        let table = TableValue::from_rows(
            ["5", "1", "4", "2", "3"]
                .iter()
                .map(|v| row([("label", "r"), ("v", *v)]))
                .collect(),
        );

        let stats = box_stats(&table);
        assert_eq!(stats.len(), 1);

        let v = &stats[0];
        assert_eq!(v.column, "v");
        assert_eq!((v.min, v.max), (1.0, 5.0));
        // floor(5 * 0.25) = 1, floor(5 * 0.5) = 2, floor(5 * 0.75) = 3
        assert_eq!((v.q1, v.median, v.q3), (2.0, 3.0, 4.0));
    }

    #[test]
    fn box_stats_of_empty_table() {
        assert!(box_stats(&TableValue::new()).is_empty());
    }
}
