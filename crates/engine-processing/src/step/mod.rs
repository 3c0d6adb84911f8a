use crate::error::StepError;
use async_trait::async_trait;
use model::{core::status::Status, records::record::Record};
use serde_json::{Map, Value};
use std::sync::Arc;

pub mod http;
pub mod pipeline;
pub mod runner;

/// Values accumulated while one record moves through the pipeline. Steps
/// read the record and what earlier steps produced; they never mutate it.
#[derive(Debug, Clone)]
pub struct StepContext {
    record_id: String,
    record: Arc<Record>,
    values: Map<String, Value>,
}

impl StepContext {
    pub fn new(record_id: impl Into<String>, record: Arc<Record>) -> Self {
        Self {
            record_id: record_id.into(),
            record,
            values: Map::new(),
        }
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Like [`get`](Self::get) but a missing value is a step error.
    pub fn require(&self, key: &str) -> Result<&Value, StepError> {
        self.get(key)
            .ok_or_else(|| StepError::MissingValue(key.to_string()))
    }

    pub fn merge(&mut self, values: Map<String, Value>) {
        self.values.extend(values);
    }

    /// Record fields overlaid with produced values, as sent to services.
    pub fn payload(&self) -> Map<String, Value> {
        let mut payload = self.record.to_json();
        payload.extend(self.values.clone());
        payload
    }
}

/// What a successful step hands back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutput {
    /// The effect already existed and the call was a no-op.
    pub already_done: bool,
    /// Additional context for later steps.
    pub values: Map<String, Value>,
}

impl StepOutput {
    pub fn completed() -> Self {
        Self::default()
    }

    pub fn completed_with(values: Map<String, Value>) -> Self {
        Self {
            already_done: false,
            values,
        }
    }

    pub fn already_done() -> Self {
        Self {
            already_done: true,
            values: Map::new(),
        }
    }
}

/// One named, idempotent unit of per-record work.
///
/// Implementations must treat "the effect already exists" as success
/// (returning [`StepOutput::already_done`]) so that re-running a batch does
/// not duplicate side effects.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    /// Checkpoint label recorded alongside `status`.
    fn label(&self, status: Status) -> String {
        match status {
            Status::Pending => format!("{} started", self.name()),
            Status::Success => format!("{} succeeded", self.name()),
            Status::Failed => format!("{} failed", self.name()),
        }
    }

    async fn execute(&self, ctx: &StepContext) -> Result<StepOutput, StepError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_overlays_values_on_record_fields() {
        let record = Arc::new(Record::from_pairs([("email", "a@x.io"), ("plan", "basic")]));
        let mut ctx = StepContext::new("a@x.io", record);
        ctx.merge(json!({ "plan": "pro", "user_id": "u-1" }).as_object().cloned().unwrap());

        let payload = ctx.payload();
        assert_eq!(payload["email"], json!("a@x.io"));
        assert_eq!(payload["plan"], json!("pro"));
        assert_eq!(payload["user_id"], json!("u-1"));
        assert!(ctx.require("missing").is_err());
    }
}
