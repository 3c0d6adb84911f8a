use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf};
use step::StepSettings;
use tracing::debug;
use validated::ValidatedSettings;

pub mod overrides;
pub mod step;
pub mod validated;

pub const DEFAULT_INDEX_NAME: &str = "email";
pub const DEFAULT_BATCH_SIZE: i64 = 100;
pub const DEFAULT_BATCH_DIR: &str = "batches";
pub const DEFAULT_INPUT: &str = "input/input.csv";

/// Whether the record runner consults the checkpoint ledger before invoking a step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepResume {
    /// Every step of every record in a re-run batch is invoked again.
    #[default]
    Off,
    /// Steps already recorded as `Success` for a record are skipped.
    Ledger,
}

/// Settings as read from the JSON file, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub index_name: String,
    pub batch_size: i64,
    pub concurrency: Option<i64>,
    pub input: PathBuf,
    pub batch_dir: PathBuf,
    pub state_dir: Option<PathBuf>,
    pub step_resume: StepResume,
    pub steps: Vec<StepSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_INDEX_NAME.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: None,
            input: PathBuf::from(DEFAULT_INPUT),
            batch_dir: PathBuf::from(DEFAULT_BATCH_DIR),
            state_dir: None,
            step_resume: StepResume::Off,
            steps: Vec::new(),
        }
    }
}

impl Settings {
    pub fn from_json(source: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let source = std::fs::read_to_string(&path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "Loaded settings file");
        Self::from_json(&source)
    }

    /// Load the file, apply `ONBOARDER_*` overrides from `vars`, then validate.
    pub fn load(
        path: impl Into<PathBuf>,
        vars: &HashMap<String, String>,
    ) -> Result<ValidatedSettings, SettingsError> {
        let mut settings = Self::from_file(path)?;
        settings.apply_overrides(vars)?;
        settings.validate()
    }

    pub fn validate(self) -> Result<ValidatedSettings, SettingsError> {
        ValidatedSettings::try_from(self)
    }
}
