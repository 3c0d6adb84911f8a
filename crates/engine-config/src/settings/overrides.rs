use super::{Settings, StepResume};
use crate::error::SettingsError;
use std::{collections::HashMap, path::PathBuf, str::FromStr};
use tracing::info;

pub const ENV_PREFIX: &str = "ONBOARDER_";

impl Settings {
    /// Overlay `ONBOARDER_*` variables onto the file settings. Unknown keys
    /// with the prefix are ignored.
    pub fn apply_overrides(&mut self, vars: &HashMap<String, String>) -> Result<(), SettingsError> {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };

            match name {
                "BATCH_SIZE" => self.batch_size = parse(key, value)?,
                "CONCURRENCY" => self.concurrency = Some(parse(key, value)?),
                "INDEX_NAME" => self.index_name = value.clone(),
                "INPUT" => self.input = PathBuf::from(value),
                "BATCH_DIR" => self.batch_dir = PathBuf::from(value),
                "STATE_DIR" => self.state_dir = Some(PathBuf::from(value)),
                "STEP_RESUME" => self.step_resume = parse_resume(key, value)?,
                _ => continue,
            }

            info!(key = %key, "Applied settings override");
        }

        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
    value.trim().parse().map_err(|_| SettingsError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_resume(key: &str, value: &str) -> Result<StepResume, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "off" | "false" | "0" => Ok(StepResume::Off),
        "ledger" | "true" | "1" => Ok(StepResume::Ledger),
        _ => Err(SettingsError::InvalidOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
