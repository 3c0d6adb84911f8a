use thiserror::Error;

/// Errors raised while loading or validating the engine settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("Failed to read settings file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for the expected shape.
    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Batch size must be a positive integer, got {0}")]
    InvalidBatchSize(i64),

    #[error("Concurrency must be a positive integer, got {0}")]
    InvalidConcurrency(i64),

    #[error("Identifier field name must not be empty")]
    EmptyIndexName,

    /// Without steps every batch would be tracked as succeeded untouched.
    #[error("At least one step must be configured")]
    NoSteps,

    #[error("Step '{0}' is defined more than once")]
    DuplicateStepName(String),

    #[error("Invalid step definition '{step}': {reason}")]
    InvalidStep { step: String, reason: String },

    /// An environment override carried a value of the wrong type.
    #[error("Invalid value '{value}' for override {key}")]
    InvalidOverride { key: String, value: String },

    #[error("Could not determine a state directory; set state_dir explicitly")]
    NoStateDir,
}
