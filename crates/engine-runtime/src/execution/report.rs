use engine_core::metrics::MetricsSnapshot;
use model::core::identifiers::{BatchId, RunId};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchDisposition {
    /// Already `Success` from an earlier run; no step was invoked.
    Skipped,
    Success,
    Failed {
        failed_records: Vec<String>,
        cause: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub batch_id: BatchId,
    #[serde(flatten)]
    pub disposition: BatchDisposition,
}

impl BatchOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self.disposition, BatchDisposition::Failed { .. })
    }
}

/// What a single run did, batch by batch.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub outcomes: Vec<BatchOutcome>,
    pub metrics: MetricsSnapshot,
    /// Cancellation stopped the run before every batch was attempted.
    pub interrupted: bool,
}

impl RunReport {
    pub fn failed(&self) -> impl Iterator<Item = &BatchOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    pub fn outcome(&self, batch_id: &BatchId) -> Option<&BatchDisposition> {
        self.outcomes
            .iter()
            .find(|o| &o.batch_id == batch_id)
            .map(|o| &o.disposition)
    }
}
