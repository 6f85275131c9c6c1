//! JSON decoding.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::DecodeError;
use crate::table::{Row, Scalar, TableValue};

pub(super) fn decode(bytes: &[u8]) -> Result<TableValue, DecodeError> {
    // IndexMap keeps the document's key order, which becomes column order.
    let records: Vec<IndexMap<String, Value>> = serde_json::from_slice(bytes).map_err(|e| {
        if e.is_data() {
            DecodeError::InvalidShape(format!("expected an array of objects: {}", e))
        } else {
            DecodeError::Json(e)
        }
    })?;

    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            record
                .into_iter()
                .map(|(key, value)| {
                    let cell = cell(value).ok_or_else(|| {
                        DecodeError::InvalidShape(format!("row {} column {:?} is nested", index, key))
                    })?;
                    Ok((key, cell))
                })
                .collect::<Result<Row, DecodeError>>()
        })
        .collect()
}

fn cell(value: Value) -> Option<Scalar> {
    match value {
        Value::Null => Some(Scalar::Missing),
        Value::Bool(b) => Some(Scalar::Text(b.to_string())),
        Value::Number(n) => n.as_f64().map(Scalar::Number),
        Value::String(s) => Some(Scalar::Text(s)),
        Value::Array(_) | Value::Object(_) => None,
    }
}
