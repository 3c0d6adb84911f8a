use crate::error::ExecutorError;
use connectors::{manifest::ChunkManifest, source::RecordSource, store::ChunkStore};
use engine_processing::chunker::Chunker;
use model::core::identifiers::BatchId;
use std::sync::Arc;
use tracing::{info, warn};

/// Batch ids ready for execution and whether they were just produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedBatches {
    pub batch_ids: Vec<BatchId>,
    pub chunked: bool,
}

/// Chunk the input once per dataset version.
///
/// Existing payloads are reused when the manifest next to them matches the
/// current input, batch size and identifier field. A mismatch is an error
/// unless `rechunk` is set, since batch statuses from the earlier chunk set
/// would otherwise be applied to different records.
pub async fn prepare_batches(
    source: &dyn RecordSource,
    store: Arc<dyn ChunkStore>,
    batch_size: usize,
    index_name: &str,
    rechunk: bool,
) -> Result<PreparedBatches, ExecutorError> {
    let fingerprint = source.fingerprint().await?;

    match store.read_manifest().await? {
        Some(manifest) if manifest.matches(&fingerprint, batch_size, index_name) && !rechunk => {
            let batch_ids = store.list_batch_ids().await?;
            if batch_ids.len() == manifest.batch_count {
                info!(
                    batches = batch_ids.len(),
                    "Input unchanged, reusing materialized batches"
                );
                return Ok(PreparedBatches {
                    batch_ids,
                    chunked: false,
                });
            }
            warn!(
                expected = manifest.batch_count,
                found = batch_ids.len(),
                "Batch payloads incomplete, chunking again"
            );
        }
        Some(manifest) if !rechunk => {
            return Err(ExecutorError::DatasetChanged {
                expected: describe(&manifest),
                found: format!("{fingerprint}/{batch_size}/{index_name}"),
            });
        }
        Some(_) => warn!("Discarding existing batches on request"),
        None => {}
    }

    let records = source.read_all().await?;
    let chunker = Chunker::new(store.clone(), batch_size, index_name);
    let batch_ids = chunker.materialize(records).await?;

    store
        .write_manifest(&ChunkManifest::new(
            fingerprint,
            batch_size,
            batch_ids.len(),
            index_name,
        ))
        .await?;

    Ok(PreparedBatches {
        batch_ids,
        chunked: true,
    })
}

fn describe(manifest: &ChunkManifest) -> String {
    format!(
        "{}/{}/{}",
        manifest.source_fingerprint, manifest.batch_size, manifest.index_name
    )
}
