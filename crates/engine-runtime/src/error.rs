use connectors::file::csv::error::FileError;
use engine_config::error::SettingsError;
use engine_core::error::StateStoreError;
use engine_processing::error::ChunkError;
use model::core::identifiers::BatchId;
use thiserror::Error;

/// Errors that stop a run. Batch and record failures are not among them;
/// they are reported per batch in the run report.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Initialization error: {0}")]
    InitializationError(String),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Chunking failed: {0}")]
    Chunk(#[from] ChunkError),

    #[error("Chunk storage error: {0}")]
    Store(#[from] FileError),

    #[error("State store error: {0}")]
    State(#[from] StateStoreError),

    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Losing a batch status would break the skip rule, so tracker writes
    /// are fatal to the run.
    #[error("Batch tracker write failed for {batch_id}: {source}")]
    Tracker {
        batch_id: BatchId,
        #[source]
        source: StateStoreError,
    },

    #[error(
        "Input changed since batches were materialized (manifest {expected}, input {found}); rerun with --rechunk to start over"
    )]
    DatasetChanged { expected: String, found: String },

    #[error("No batches to run")]
    NoBatches,
}
