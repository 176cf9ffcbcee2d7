/// Error Module
///
/// Typed failure taxonomy for the ingestion pipeline. Every stage failure is
/// fatal to the current book's pass and propagates unrecovered to the caller;
/// a failed run simply re-attempts from the last committed checkpoint on its
/// next invocation.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unknown network id {0}")]
    Config(String),

    #[error("checkpoint read failed for book {book_address}: {reason}")]
    CheckpointRead { book_address: String, reason: String },

    #[error("chain connector error: {0}")]
    Connector(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("checkpoint conflict for book {book_address}: expected last ingested block {expected}")]
    CheckpointConflict { book_address: String, expected: u64 },

    #[error("event decode error: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        IngestError::Connector(err.to_string())
    }
}
