use engine_config::error::SettingsError;
use engine_core::error::ProgressError;
use engine_runtime::error::ExecutorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Settings(#[from] SettingsError),

    #[error("Environment error: {0}")]
    Config(String),

    #[error("Run failed: {0}")]
    Runner(#[from] ExecutorError),

    #[error("Failed to load progress: {0}")]
    Progress(#[from] ProgressError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),
}
