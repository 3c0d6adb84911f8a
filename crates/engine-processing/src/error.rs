use connectors::file::csv::error::FileError;
use engine_core::error::StateStoreError;
use model::error::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("Chunk size must be a positive integer, got {0}")]
    InvalidChunkSize(usize),

    #[error("No input records to chunk")]
    MissingInput,

    #[error("Record at position {position} has no usable identifier: {source}")]
    MissingIdentifier {
        position: usize,
        #[source]
        source: ModelError,
    },

    #[error("Identifier '{0}' appears on more than one record")]
    DuplicateIdentifier(String),

    #[error("Failed to store batch payload: {0}")]
    Store(#[from] FileError),
}

/// Failure of a single step invocation.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Request to {url} failed: {reason}")]
    Transport {
        url: String,
        reason: String,
        retryable: bool,
    },

    #[error("Service responded with status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Required context value '{0}' is missing")]
    MissingValue(String),

    #[error("Step failed: {0}")]
    Failed(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        last: Box<StepError>,
    },
}

/// Unrecovered failure of a record's step pipeline.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Step '{step}' failed for record '{record_id}': {source}")]
    Step {
        record_id: String,
        step: String,
        #[source]
        source: StepError,
    },

    #[error("Checkpoint write failed for record '{record_id}' step '{step}': {source}")]
    Ledger {
        record_id: String,
        step: String,
        #[source]
        source: StateStoreError,
    },
}

impl RecordError {
    pub fn record_id(&self) -> &str {
        match self {
            RecordError::Step { record_id, .. } | RecordError::Ledger { record_id, .. } => {
                record_id
            }
        }
    }

    pub fn step(&self) -> &str {
        match self {
            RecordError::Step { step, .. } | RecordError::Ledger { step, .. } => step,
        }
    }
}
