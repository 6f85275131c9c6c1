//! Upload records and asynchronous ingestion.

use base64::engine::general_purpose;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{decode, FileKind};
use crate::config::IngestOptions;
use crate::error::{DecodeError, Error, Result};
use crate::graph::NodeId;
use crate::pipeline::{EditOutcome, SharedPipeline};
use crate::table::TableValue;

/// What the host keeps for every uploaded file.
///
/// `content` is the raw upload, base64 encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub filename: String,
    pub content: String,
    pub rows: TableValue,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadRecord {
    /// Decode an upload, picking the format from the file name.
    pub fn decode(
        filename: impl Into<String>,
        bytes: &[u8],
        options: &IngestOptions,
    ) -> Result<Self, DecodeError> {
        let filename = filename.into();
        let kind = FileKind::from_filename(&filename)?;
        let rows = decode(bytes, kind, options)?;

        Ok(Self {
            filename,
            content: general_purpose::STANDARD.encode(bytes),
            rows,
            uploaded_at: Utc::now(),
        })
    }
}

/// Decode an upload off the async runtime, then store the rows on `node`.
///
/// Decoding runs on the blocking pool without holding the pipeline lock.
/// The lock is taken once, for the store and its propagation pass.
pub async fn ingest_upload(
    pipeline: &SharedPipeline,
    node: NodeId,
    filename: impl Into<String>,
    bytes: Vec<u8>,
) -> Result<EditOutcome<UploadRecord>> {
    let filename = filename.into();
    let options = pipeline.config().ingest;

    let record = tokio::task::spawn_blocking(move || UploadRecord::decode(filename, &bytes, &options))
        .await
        .map_err(|e| Error::Ingest(e.to_string()))?
        .map_err(|e| {
            warn!(node = %node, error = %e, "upload rejected");
            e
        })?;
    debug!(node = %node, filename = %record.filename, rows = record.rows.len(), "upload decoded");

    let outcome = pipeline.edit(|p| p.ingest_complete(node, record.rows.clone()))?;
    Ok(EditOutcome {
        value: record,
        changed: outcome.changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;
    use crate::pipeline::Pipeline;
    use crate::table::Scalar;
    use crate::transform::NIL;

    #[test]
    fn record_keeps_file_and_rows() {
        let before = Utc::now();
        let record = UploadRecord::decode("scores.csv", b"id,v\na,1\n", &IngestOptions::default()).unwrap();

        assert_eq!(record.filename, "scores.csv");
        assert_eq!(record.content, general_purpose::STANDARD.encode(b"id,v\na,1\n"));
        assert_eq!(record.rows.len(), 1);
        assert!(record.uploaded_at >= before);
    }

    #[test]
    fn content_decodes_to_the_raw_bytes() {
        let bytes = "id,name\n1,Zoë\n".as_bytes();
        let record = UploadRecord::decode("names.csv", bytes, &IngestOptions::default()).unwrap();

        let raw = general_purpose::STANDARD.decode(&record.content).unwrap();
        assert_eq!(raw, bytes);
    }

    #[tokio::test]
    async fn upload_flows_to_consumers() {
        let shared = SharedPipeline::new(Pipeline::new());
        let (source, sink) = shared.edit(|p| {
            let source = p.create_node(NodeKind::Source).value;
            let cleaner = p.create_node(NodeKind::Cleaner).value;
            let sink = p.create_node(NodeKind::SinkTable).value;
            p.connect(source, cleaner).unwrap();
            p.connect(cleaner, sink).unwrap();
            (source, sink)
        });

        let outcome = ingest_upload(&shared, source, "data.csv", b"id,v\na,\nb,5\n".to_vec())
            .await
            .unwrap();

        assert_eq!(outcome.value.rows.len(), 2);
        assert!(outcome.changed.contains(&sink));
        let output = shared.read(|p| p.output(sink).cloned()).unwrap();
        assert_eq!(output.rows()[0]["v"], Scalar::from(NIL));
        assert_eq!(output.rows()[1]["v"], Scalar::from("5"));
    }

    #[tokio::test]
    async fn failed_decode_leaves_source_alone() {
        let shared = SharedPipeline::default();
        let source = shared.edit(|p| p.create_node(NodeKind::Source).value);

        let err = ingest_upload(&shared, source, "book.xlsx", vec![0x50, 0x4b])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::Spreadsheet(_))));

        let err = ingest_upload(&shared, source, "notes.txt", b"hello".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Decode(DecodeError::UnsupportedFormat(_))));
        assert!(shared.read(|p| p.output(source).is_none()));
    }
}
