use thiserror::Error;

/// Errors surfaced while normalizing a raw source record into a [`crate::types::NormalizedItem`].
/// Every variant here is recoverable at the per-record level: a normalizer returning
/// `Err` means "skip this record", never "poison the batch".
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("record is missing a stable external_id")]
    MissingExternalId,
    #[error("raw payload is not a JSON object or array")]
    UnexpectedShape,
    #[error("failed to deserialize raw record: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// Errors surfaced by the Ingest Worker. Transient variants are expected to propagate
/// out of the Lambda handler so the queue redelivers; `Row` errors are logged and do
/// not abort the enclosing batch.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("transient object store error: {0}")]
    ObjectStore(String),
    #[error("transient database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed input, skipping: {0}")]
    MalformedInput(String),
    #[error("row-level failure for external_id {external_id}: {source}")]
    Row {
        external_id: String,
        #[source]
        source: sqlx::Error,
    },
}
