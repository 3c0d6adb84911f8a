use crate::error::StateStoreError;
use chrono::{DateTime, Utc};
use model::core::{identifiers::BatchId, status::Status};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Latest known outcome of one step for one record.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CheckpointEntry {
    pub record_id: String,
    pub step_name: String,
    pub status: Status,
    /// Human readable checkpoint label, e.g. "identity-signup failed".
    pub label: String,
    /// Context values the step produced, stored as a JSON object string.
    pub output_json: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl CheckpointEntry {
    pub fn new(
        record_id: impl Into<String>,
        step_name: impl Into<String>,
        status: Status,
        label: impl Into<String>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            step_name: step_name.into(),
            status,
            label: label.into(),
            output_json: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_output(mut self, output: &Map<String, Value>) -> Self {
        if !output.is_empty() {
            self.output_json = serde_json::to_string(output).ok();
        }
        self
    }

    pub fn output(&self) -> Map<String, Value> {
        self.output_json
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

/// A row of the batch tracker.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BatchRecord {
    pub batch_id: BatchId,
    /// JSON array of the record identifiers the batch covers.
    pub records_json: String,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BatchRecord {
    pub fn record_ids(&self) -> Result<Vec<String>, StateStoreError> {
        serde_json::from_str(&self.records_json).map_err(|e| {
            StateStoreError::Decode(format!(
                "record snapshot of batch '{}': {e}",
                self.batch_id
            ))
        })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(records_json: &str) -> BatchRecord {
        BatchRecord {
            batch_id: BatchId::from_index(0),
            records_json: records_json.to_string(),
            status: Status::Success,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn corrupt_snapshot_is_an_error_not_an_empty_batch() {
        assert_eq!(row(r#"["a","b"]"#).record_ids().unwrap(), vec!["a", "b"]);

        let err = row(r#"["a","#).record_ids().unwrap_err();
        assert!(matches!(err, StateStoreError::Decode(msg) if msg.contains("batch_0")));
    }
}
