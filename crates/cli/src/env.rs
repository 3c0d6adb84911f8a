use crate::error::CliError;
use std::{collections::HashMap, fs, path::Path};

/// Process environment plus an optional `.env` file. Variables already set
/// in the process environment take precedence over the file.
#[derive(Debug, Clone)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn new() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        self.parse_env_content(&content)
    }

    pub fn all(&self) -> &HashMap<String, String> {
        &self.vars
    }

    fn parse_env_content(&mut self, content: &str) -> Result<(), CliError> {
        for (line_num, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").unwrap_or(line);
            let Some((key, value)) = line.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid env file: malformed line {} (expected KEY=VALUE)",
                    line_num + 1
                )));
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(CliError::Config(format!(
                    "Invalid env file: empty key at line {}",
                    line_num + 1
                )));
            }

            self.vars
                .entry(key.to_string())
                .or_insert_with(|| unquote(value));
        }

        Ok(())
    }
}

impl Default for EnvManager {
    fn default() -> Self {
        Self::new()
    }
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn empty() -> EnvManager {
        EnvManager {
            vars: HashMap::new(),
        }
    }

    #[test]
    fn parses_overrides_and_quotes() {
        let mut env = empty();
        let content = r#"
# batch tuning
ONBOARDER_BATCH_SIZE=25
export ONBOARDER_INDEX_NAME="user_email"
ONBOARDER_STATE_DIR='/var/lib/onboarder'
        "#;

        env.parse_env_content(content).unwrap();
        assert_eq!(env.all()["ONBOARDER_BATCH_SIZE"], "25");
        assert_eq!(env.all()["ONBOARDER_INDEX_NAME"], "user_email");
        assert_eq!(env.all()["ONBOARDER_STATE_DIR"], "/var/lib/onboarder");
    }

    #[test]
    fn process_environment_wins_over_file() {
        let mut env = empty();
        env.vars
            .insert("ONBOARDER_BATCH_SIZE".into(), "50".into());
        env.parse_env_content("ONBOARDER_BATCH_SIZE=10").unwrap();
        assert_eq!(env.all()["ONBOARDER_BATCH_SIZE"], "50");
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(empty().parse_env_content("NOT A PAIR").is_err());
        assert!(empty().parse_env_content("=value").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ONBOARDER_CONCURRENCY=4").unwrap();

        let mut env = empty();
        env.load_from_file(file.path()).unwrap();
        assert_eq!(env.all()["ONBOARDER_CONCURRENCY"], "4");
        assert!(empty().load_from_file("/nonexistent/.env").is_err());
    }
}
