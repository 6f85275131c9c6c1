//! Ingestion
//!
//! Turns uploaded files into tables and hands them to source nodes.
//!
//! Decoding never touches the graph. A file that fails to decode is
//! reported to the caller and the source node keeps its previous output.
//!
//! # Formats
//!
//! - CSV: the first record is the header. Every cell stays text, short
//!   records are padded with empty strings.
//! - JSON: an array of flat objects. Numbers, strings, booleans and `null`
//!   are accepted as cells.
//! - Spreadsheets (`.xls`, `.xlsx`): the first worksheet, with its first row
//!   as the header. Numeric cells stay numbers.

mod delimited;
mod json;
mod spreadsheet;
mod upload;

use std::path::Path;

pub use upload::{ingest_upload, UploadRecord};

use crate::config::IngestOptions;
use crate::error::DecodeError;
use crate::table::TableValue;

/// File formats recognised by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Json,
    Spreadsheet,
}

impl FileKind {
    /// Pick the format from a file name's extension, ignoring case.
    pub fn from_filename(filename: &str) -> Result<Self, DecodeError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("csv") => Ok(FileKind::Csv),
            Some("json") => Ok(FileKind::Json),
            Some("xls" | "xlsx") => Ok(FileKind::Spreadsheet),
            _ => Err(DecodeError::UnsupportedFormat(filename.to_string())),
        }
    }
}

/// Decode file contents into a table.
pub fn decode(bytes: &[u8], kind: FileKind, options: &IngestOptions) -> Result<TableValue, DecodeError> {
    match kind {
        FileKind::Csv => delimited::decode(bytes, options),
        FileKind::Json => json::decode(bytes),
        FileKind::Spreadsheet => spreadsheet::decode(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kind_from_extension() {
        assert_eq!(FileKind::from_filename("data.csv").unwrap(), FileKind::Csv);
        assert_eq!(FileKind::from_filename("DATA.JSON").unwrap(), FileKind::Json);
        assert_eq!(FileKind::from_filename("book.xlsx").unwrap(), FileKind::Spreadsheet);
        assert_eq!(FileKind::from_filename("old.xls").unwrap(), FileKind::Spreadsheet);
        assert!(matches!(
            FileKind::from_filename("notes.txt"),
            Err(DecodeError::UnsupportedFormat(_))
        ));
        assert!(FileKind::from_filename("csv").is_err());
    }

    #[test]
    fn spreadsheets_go_through_the_workbook_reader() {
        let err = decode(b"PK", FileKind::Spreadsheet, &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, DecodeError::Spreadsheet(_)));
    }
}
