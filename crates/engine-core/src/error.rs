use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Failed to encode state: {0}")]
    Encode(String),

    #[error("Failed to decode state: {0}")]
    Decode(String),

    #[error("Failed to save checkpoint for record '{record_id}' step '{step}': {reason}")]
    SaveCheckpoint {
        record_id: String,
        step: String,
        reason: String,
    },

    #[error("Failed to save batch '{batch_id}': {reason}")]
    SaveBatch { batch_id: String, reason: String },
}

#[derive(Error, Debug)]
pub enum ProgressError {
    #[error("Failed to load batches: {0}")]
    LoadBatches(String),

    #[error("Failed to load checkpoints: {0}")]
    LoadCheckpoint(String),
}
