use super::{Settings, StepResume, step::StepSettings};
use crate::error::SettingsError;
use std::{collections::HashSet, path::PathBuf};

/// Immutable, validated configuration handed to every component at startup.
#[derive(Debug, Clone)]
pub struct ValidatedSettings {
    /// Field of each record holding its unique identifier
    pub index_name: String,
    /// Number of records per batch
    pub batch_size: usize,
    /// Upper bound on records of one batch running at the same time
    pub concurrency: usize,
    /// Input CSV file
    pub input: PathBuf,
    /// Directory holding materialized batch payloads
    pub batch_dir: PathBuf,
    /// Directory of the durable checkpoint/batch state
    pub state_dir: PathBuf,
    pub step_resume: StepResume,
    pub steps: Vec<StepSettings>,
}

impl ValidatedSettings {
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }
}

impl TryFrom<Settings> for ValidatedSettings {
    type Error = SettingsError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        if settings.batch_size <= 0 {
            return Err(SettingsError::InvalidBatchSize(settings.batch_size));
        }
        let batch_size = settings.batch_size as usize;

        let concurrency = match settings.concurrency {
            Some(n) if n <= 0 => return Err(SettingsError::InvalidConcurrency(n)),
            Some(n) => n as usize,
            None => batch_size,
        };

        if settings.index_name.trim().is_empty() {
            return Err(SettingsError::EmptyIndexName);
        }

        validate_steps(&settings.steps)?;

        let state_dir = match settings.state_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .ok_or(SettingsError::NoStateDir)?
                .join(".onboarder/state"),
        };

        Ok(Self {
            index_name: settings.index_name,
            batch_size,
            concurrency,
            input: settings.input,
            batch_dir: settings.batch_dir,
            state_dir,
            step_resume: settings.step_resume,
            steps: settings.steps,
        })
    }
}

fn validate_steps(steps: &[StepSettings]) -> Result<(), SettingsError> {
    if steps.is_empty() {
        return Err(SettingsError::NoSteps);
    }

    let mut seen = HashSet::new();

    for step in steps {
        let invalid = |reason: &str| SettingsError::InvalidStep {
            step: step.name.clone(),
            reason: reason.to_string(),
        };

        if step.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if !seen.insert(step.name.as_str()) {
            return Err(SettingsError::DuplicateStepName(step.name.clone()));
        }
        if !(step.url.starts_with("http://") || step.url.starts_with("https://")) {
            return Err(invalid("url must be http:// or https://"));
        }
        if step
            .already_done_statuses
            .iter()
            .any(|code| !(100..=599).contains(code))
        {
            return Err(invalid("already_done_statuses must be HTTP status codes"));
        }
        if step.timeout_ms == 0 {
            return Err(invalid("timeout_ms must be positive"));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SETTINGS_JSON: &str = r#"{
        "index_name": "email",
        "batch_size": 3,
        "state_dir": "/tmp/onboarder-state",
        "steps": [
            { "name": "identity-signup", "url": "https://idp.local/users" },
            { "name": "identity-confirm", "url": "https://idp.local/users/{record_id}/confirm", "method": "PUT" }
        ]
    }"#;

    #[test]
    fn concurrency_defaults_to_batch_size() {
        let settings = Settings::from_json(SETTINGS_JSON).unwrap().validate().unwrap();
        assert_eq!(settings.batch_size(), 3);
        assert_eq!(settings.concurrency(), 3);
        assert_eq!(settings.steps.len(), 2);
        assert_eq!(settings.steps[0].already_done_statuses, vec![409]);
        assert_eq!(settings.step_resume, StepResume::Off);
    }

    #[test]
    fn rejects_non_positive_batch_size() {
        for size in [0, -4] {
            let settings = Settings {
                batch_size: size,
                state_dir: Some("/tmp/s".into()),
                ..Settings::default()
            };
            assert!(matches!(
                settings.validate(),
                Err(SettingsError::InvalidBatchSize(n)) if n == size
            ));
        }
    }

    #[test]
    fn rejects_duplicate_step_names() {
        let json = r#"{
            "state_dir": "/tmp/s",
            "steps": [
                { "name": "signup", "url": "http://a" },
                { "name": "signup", "url": "http://b" }
            ]
        }"#;
        let err = Settings::from_json(json).unwrap().validate().unwrap_err();
        assert!(matches!(err, SettingsError::DuplicateStepName(name) if name == "signup"));
    }

    #[test]
    fn rejects_missing_steps() {
        let json = r#"{ "state_dir": "/tmp/s", "batch_size": 2 }"#;
        let err = Settings::from_json(json).unwrap().validate().unwrap_err();
        assert!(matches!(err, SettingsError::NoSteps));

        let json = r#"{ "state_dir": "/tmp/s", "steps": [] }"#;
        let err = Settings::from_json(json).unwrap().validate().unwrap_err();
        assert!(matches!(err, SettingsError::NoSteps));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let settings = Settings {
            concurrency: Some(0),
            state_dir: Some("/tmp/s".into()),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidConcurrency(0))
        ));
    }

    #[test]
    fn load_reads_file_and_applies_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SETTINGS_JSON.as_bytes()).unwrap();

        let vars = [("ONBOARDER_CONCURRENCY".to_string(), "2".to_string())]
            .into_iter()
            .collect();
        let settings = Settings::load(file.path(), &vars).unwrap();
        assert_eq!(settings.concurrency(), 2);
        assert_eq!(settings.state_dir, PathBuf::from("/tmp/onboarder-state"));
    }
}
