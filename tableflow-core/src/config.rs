//! Pipeline configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::{DEFAULT_PRECISION, MAX_PRECISION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Decimal places aggregators created by the pipeline use for means.
    pub mean_precision: usize,

    pub ingest: IngestOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mean_precision: DEFAULT_PRECISION,
            ingest: IngestOptions::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.mean_precision > MAX_PRECISION {
            return Err(Error::Config(format!(
                "meanPrecision {} exceeds the limit of {}",
                self.mean_precision, MAX_PRECISION
            )));
        }
        if !self.ingest.delimiter.is_ascii() {
            return Err(Error::Config("ingest delimiter must be an ASCII byte".to_string()));
        }
        Ok(())
    }
}

/// How uploaded CSV files are read.
///
/// Blank lines are always skipped. Records with only empty fields are kept
/// by default so that row indices match the file and the cleaner sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IngestOptions {
    pub delimiter: u8,
    pub skip_records_with_empty_values: bool,
    pub trim_headers: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            skip_records_with_empty_values: false,
            trim_headers: true,
        }
    }
}
