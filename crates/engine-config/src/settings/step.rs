use serde::{Deserialize, Serialize};

pub const DEFAULT_ALREADY_DONE_STATUSES: [u16; 1] = [409];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Post,
    Put,
    Patch,
    Get,
}

/// Backoff applied by a step around its own external call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

/// One entry of the ordered step pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSettings {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    /// Human readable checkpoint label; the step name is used when absent.
    #[serde(default)]
    pub label: Option<String>,
    /// Response statuses meaning "the effect already exists".
    #[serde(default = "default_already_done")]
    pub already_done_statuses: Vec<u16>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retry: RetrySettings,
}

fn default_already_done() -> Vec<u16> {
    DEFAULT_ALREADY_DONE_STATUSES.to_vec()
}

fn default_timeout_ms() -> u64 {
    10_000
}
