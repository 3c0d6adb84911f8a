use crate::{
    error::StateStoreError,
    state::models::{BatchRecord, CheckpointEntry},
};
use async_trait::async_trait;
use model::core::{identifiers::BatchId, status::Status};

pub mod models;
pub mod sled_store;

/// Per `(record, step)` outcome ledger. The latest write for a key wins.
#[async_trait]
pub trait CheckpointLedger: Send + Sync {
    async fn write_checkpoint(&self, entry: &CheckpointEntry) -> Result<(), StateStoreError>;

    async fn load_checkpoint(
        &self,
        record_id: &str,
        step_name: &str,
    ) -> Result<Option<CheckpointEntry>, StateStoreError>;

    /// All live checkpoints of one record, one per step name.
    async fn record_checkpoints(
        &self,
        record_id: &str,
    ) -> Result<Vec<CheckpointEntry>, StateStoreError>;
}

/// Per-batch lifecycle table. Transitions are not validated here; the
/// executor decides which status a batch moves to.
#[async_trait]
pub trait BatchTracker: Send + Sync {
    /// Prepare storage. Safe to call any number of times.
    async fn initialize(&self) -> Result<(), StateStoreError>;

    async fn upsert_batch(
        &self,
        batch_id: &BatchId,
        record_ids: &[String],
        status: Status,
    ) -> Result<BatchRecord, StateStoreError>;

    async fn get_batch(&self, batch_id: &BatchId) -> Result<Option<BatchRecord>, StateStoreError>;

    /// Every tracked batch in batch order.
    async fn list_batches(&self) -> Result<Vec<BatchRecord>, StateStoreError>;
}
