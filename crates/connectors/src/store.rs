use crate::{file::csv::error::FileError, manifest::ChunkManifest};
use async_trait::async_trait;
use model::{core::identifiers::BatchId, records::record::Record};

/// Addressable storage for materialized batch payloads.
///
/// Payloads are write-once per chunking pass and read many times by the
/// executor; writing index `i` again replaces the previous payload.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn write(&self, index: usize, records: &[Record]) -> Result<BatchId, FileError>;

    /// Batch ids in chunk order.
    async fn list_batch_ids(&self) -> Result<Vec<BatchId>, FileError>;

    async fn read(&self, batch_id: &BatchId) -> Result<Vec<Record>, FileError>;

    /// Remove payloads whose index is `>= keep`, left over from a larger chunk set.
    async fn prune(&self, keep: usize) -> Result<usize, FileError>;

    async fn read_manifest(&self) -> Result<Option<ChunkManifest>, FileError>;

    async fn write_manifest(&self, manifest: &ChunkManifest) -> Result<(), FileError>;
}
