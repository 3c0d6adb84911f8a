use crate::{
    error::StateStoreError,
    state::{
        BatchTracker, CheckpointLedger,
        models::{BatchRecord, CheckpointEntry},
    },
};
use async_trait::async_trait;
use model::core::{identifiers::BatchId, status::Status};
use serde::{Serialize, de::DeserializeOwned};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;
use tracing::{debug, info};

const CHECKPOINTS_TREE: &str = "checkpoints";
const BATCHES_TREE: &str = "batches";
const SCHEMA_KEY: &str = "schema_version";
const SCHEMA_VERSION: &str = "1";

/// Sled-backed checkpoint ledger and batch tracker sharing one database.
pub struct SledStateStore {
    db: sled::Db,
    checkpoints: sled::Tree,
    batches: sled::Tree,
}

impl SledStateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        let checkpoints = db.open_tree(CHECKPOINTS_TREE)?;
        let batches = db.open_tree(BATCHES_TREE)?;
        Ok(Self {
            db,
            checkpoints,
            batches,
        })
    }

    /// Ledger key: `record_id \0 step_name`. The separator keeps a record's
    /// rows contiguous so they can be scanned by prefix.
    #[inline]
    fn chk_key(record_id: &str, step_name: &str) -> Vec<u8> {
        let mut key = Self::chk_prefix(record_id);
        key.extend_from_slice(step_name.as_bytes());
        key
    }

    #[inline]
    fn chk_prefix(record_id: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(record_id.len() + 1);
        key.extend_from_slice(record_id.as_bytes());
        key.push(0);
        key
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StateStoreError> {
    bincode::serialize(value).map_err(|e| StateStoreError::Encode(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StateStoreError> {
    bincode::deserialize(bytes).map_err(|e| StateStoreError::Decode(e.to_string()))
}

#[async_trait]
impl CheckpointLedger for SledStateStore {
    async fn write_checkpoint(&self, entry: &CheckpointEntry) -> Result<(), StateStoreError> {
        let key = Self::chk_key(&entry.record_id, &entry.step_name);
        let bytes = encode(entry)?;

        self.checkpoints
            .insert(key, bytes)
            .map_err(|e| StateStoreError::SaveCheckpoint {
                record_id: entry.record_id.clone(),
                step: entry.step_name.clone(),
                reason: e.to_string(),
            })?;

        debug!(
            record_id = %entry.record_id,
            step = %entry.step_name,
            status = %entry.status,
            "Checkpoint saved"
        );
        Ok(())
    }

    async fn load_checkpoint(
        &self,
        record_id: &str,
        step_name: &str,
    ) -> Result<Option<CheckpointEntry>, StateStoreError> {
        match self.checkpoints.get(Self::chk_key(record_id, step_name))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn record_checkpoints(
        &self,
        record_id: &str,
    ) -> Result<Vec<CheckpointEntry>, StateStoreError> {
        let mut entries = Vec::new();
        for item in self.checkpoints.scan_prefix(Self::chk_prefix(record_id)) {
            let (_key, value) = item?;
            entries.push(decode(&value)?);
        }
        Ok(entries)
    }
}

#[async_trait]
impl BatchTracker for SledStateStore {
    async fn initialize(&self) -> Result<(), StateStoreError> {
        if self.db.get(SCHEMA_KEY)?.is_none() {
            self.db.insert(SCHEMA_KEY, SCHEMA_VERSION.as_bytes())?;
            self.db.flush_async().await?;
            info!(version = SCHEMA_VERSION, "Batch tracker created");
        } else {
            debug!("Batch tracker already initialized");
        }
        Ok(())
    }

    async fn upsert_batch(
        &self,
        batch_id: &BatchId,
        record_ids: &[String],
        status: Status,
    ) -> Result<BatchRecord, StateStoreError> {
        let records_json =
            serde_json::to_string(record_ids).map_err(|e| StateStoreError::Encode(e.to_string()))?;
        let key = batch_id.as_str().as_bytes();

        // Read-modify-write in a transaction so `created_at` survives the replace.
        let result = self
            .batches
            .transaction::<_, _, StateStoreError>(|tx| {
                let now = chrono::Utc::now();
                let created_at = match tx.get(key)? {
                    Some(existing) => {
                        decode::<BatchRecord>(&existing)
                            .map_err(ConflictableTransactionError::Abort)?
                            .created_at
                    }
                    None => now,
                };

                let row = BatchRecord {
                    batch_id: batch_id.clone(),
                    records_json: records_json.clone(),
                    status,
                    created_at,
                    updated_at: now,
                };
                let bytes = encode(&row).map_err(ConflictableTransactionError::Abort)?;
                tx.insert(key, bytes)?;
                Ok(row)
            });

        let row = match result {
            Ok(row) => row,
            Err(TransactionError::Abort(e)) => return Err(e),
            Err(TransactionError::Storage(e)) => {
                return Err(StateStoreError::SaveBatch {
                    batch_id: batch_id.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        // Batch status is the resume authority; make it durable before moving on.
        self.db.flush_async().await?;

        debug!(batch_id = %batch_id, status = %status, "Batch tracker updated");
        Ok(row)
    }

    async fn get_batch(&self, batch_id: &BatchId) -> Result<Option<BatchRecord>, StateStoreError> {
        match self.batches.get(batch_id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn list_batches(&self) -> Result<Vec<BatchRecord>, StateStoreError> {
        let mut rows = Vec::new();
        for item in self.batches.iter() {
            let (_key, value) = item?;
            rows.push(decode::<BatchRecord>(&value)?);
        }
        rows.sort_by(|a, b| a.batch_id.cmp(&b.batch_id));
        Ok(rows)
    }
}
