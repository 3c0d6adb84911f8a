use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Record has no identifier field '{field}'")]
    MissingIdentifier { field: String },

    #[error("Record has an empty identifier field '{field}'")]
    EmptyIdentifier { field: String },

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Invalid batch id: {0}")]
    InvalidBatchId(String),
}
