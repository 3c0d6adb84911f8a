use crate::{
    error::ProgressError,
    state::{BatchTracker, CheckpointLedger, models::CheckpointEntry},
};
use chrono::{DateTime, Utc};
use model::core::{identifiers::BatchId, status::Status};
use serde::Serialize;
use std::sync::Arc;

/// Read-only views over the batch tracker and checkpoint ledger.
#[derive(Clone)]
pub struct ProgressService {
    tracker: Arc<dyn BatchTracker>,
    ledger: Arc<dyn CheckpointLedger>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub batch_id: BatchId,
    pub status: Status,
    pub record_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Latest checkpoint of one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView {
    pub record_id: String,
    pub batch_id: BatchId,
    pub step: String,
    pub last_checkpoint: String,
    pub status: Status,
    pub updated_at: DateTime<Utc>,
}

impl ProgressService {
    pub fn new(tracker: Arc<dyn BatchTracker>, ledger: Arc<dyn CheckpointLedger>) -> Self {
        ProgressService { tracker, ledger }
    }

    pub async fn batch_summaries(&self) -> Result<Vec<BatchSummary>, ProgressError> {
        let rows = self
            .tracker
            .list_batches()
            .await
            .map_err(|e| ProgressError::LoadBatches(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let record_ids = row
                    .record_ids()
                    .map_err(|e| ProgressError::LoadBatches(e.to_string()))?;
                Ok(BatchSummary {
                    record_count: record_ids.len(),
                    batch_id: row.batch_id,
                    status: row.status,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                })
            })
            .collect()
    }

    /// One row per tracked record that has at least one checkpoint.
    pub async fn record_views(&self) -> Result<Vec<RecordView>, ProgressError> {
        let rows = self
            .tracker
            .list_batches()
            .await
            .map_err(|e| ProgressError::LoadBatches(e.to_string()))?;

        let mut views = Vec::new();
        for row in rows {
            let record_ids = row
                .record_ids()
                .map_err(|e| ProgressError::LoadBatches(e.to_string()))?;
            for record_id in record_ids {
                let history = self.record_history(&record_id).await?;
                let Some(last) = history.into_iter().last() else {
                    continue;
                };
                views.push(RecordView {
                    record_id,
                    batch_id: row.batch_id.clone(),
                    step: last.step_name,
                    last_checkpoint: last.label,
                    status: last.status,
                    updated_at: last.updated_at,
                });
            }
        }

        Ok(views)
    }

    /// Checkpoints of a record, oldest first.
    pub async fn record_history(
        &self,
        record_id: &str,
    ) -> Result<Vec<CheckpointEntry>, ProgressError> {
        let mut entries = self
            .ledger
            .record_checkpoints(record_id)
            .await
            .map_err(|e| ProgressError::LoadCheckpoint(e.to_string()))?;
        entries.sort_by_key(|e| e.updated_at);
        Ok(entries)
    }
}
