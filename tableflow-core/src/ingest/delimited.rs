//! CSV decoding.

use csv::{ReaderBuilder, Trim};

use crate::config::IngestOptions;
use crate::error::DecodeError;
use crate::table::{Row, Scalar, TableValue};

pub(super) fn decode(bytes: &[u8], options: &IngestOptions) -> Result<TableValue, DecodeError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .flexible(true)
        .trim(if options.trim_headers { Trim::Headers } else { Trim::None })
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut table = TableValue::new();
    for record in reader.records() {
        let record = record?;

        // The reader already drops blank lines
        if options.skip_records_with_empty_values && record.iter().all(str::is_empty) {
            continue;
        }

        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), Scalar::from(record.get(i).unwrap_or(""))))
            .collect();
        table.push(row);
    }
    Ok(table)
}
