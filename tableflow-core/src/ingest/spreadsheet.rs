//! Spreadsheet decoding.
//!
//! Reads the first worksheet of an `.xls`/`.xlsx` workbook. Its first row is
//! the header, like a CSV file.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::DecodeError;
use crate::table::{Row, Scalar, TableValue};

pub(super) fn decode(bytes: &[u8]) -> Result<TableValue, DecodeError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DecodeError::InvalidShape("workbook has no worksheet".to_string()))??;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(TableValue::new());
    };
    let headers: Vec<String> = header.iter().map(|cell| cell.to_string().trim().to_string()).collect();

    Ok(rows
        .filter(|cells| cells.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|cells| {
            headers
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), cells.get(i).map_or_else(|| Scalar::from(""), cell)))
                .collect::<Row>()
        })
        .collect())
}

fn cell(data: &Data) -> Scalar {
    match data {
        Data::Empty => Scalar::from(""),
        Data::Int(n) => Scalar::Number(*n as f64),
        Data::Float(n) => Scalar::Number(*n),
        Data::String(s) => Scalar::Text(s.clone()),
        other => Scalar::Text(other.to_string()),
    }
}
