use crate::error::ChunkError;
use connectors::store::ChunkStore;
use model::{
    core::identifiers::BatchId,
    records::{batch::BatchPayload, record::Record},
};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, info};

/// Split `records` into consecutive batches of `size` records, preserving
/// source order. Only the last batch may be shorter.
pub fn chunk_records(records: Vec<Record>, size: usize) -> Result<Vec<BatchPayload>, ChunkError> {
    if size == 0 {
        return Err(ChunkError::InvalidChunkSize(size));
    }
    if records.is_empty() {
        return Err(ChunkError::MissingInput);
    }

    let mut batches = Vec::with_capacity(records.len().div_ceil(size));
    let mut iter = records.into_iter().peekable();
    while iter.peek().is_some() {
        let chunk: Vec<Record> = iter.by_ref().take(size).collect();
        batches.push(BatchPayload::new(BatchId::from_index(batches.len()), chunk));
    }

    Ok(batches)
}

/// Every record needs a non-empty identifier that no other record shares,
/// since checkpoints are keyed by it.
pub fn validate_identifiers(records: &[Record], index_name: &str) -> Result<(), ChunkError> {
    let mut seen = HashSet::with_capacity(records.len());
    for (position, record) in records.iter().enumerate() {
        let id = record
            .id(index_name)
            .map_err(|source| ChunkError::MissingIdentifier { position, source })?;
        if !seen.insert(id) {
            return Err(ChunkError::DuplicateIdentifier(id.to_string()));
        }
    }
    Ok(())
}

/// Materializes chunked batches into a [`ChunkStore`].
pub struct Chunker {
    store: Arc<dyn ChunkStore>,
    batch_size: usize,
    index_name: String,
}

impl Chunker {
    pub fn new(store: Arc<dyn ChunkStore>, batch_size: usize, index_name: impl Into<String>) -> Self {
        Self {
            store,
            batch_size,
            index_name: index_name.into(),
        }
    }

    /// Validate, split and persist `records`, returning the batch ids in
    /// execution order. Re-running replaces earlier payloads.
    pub async fn materialize(&self, records: Vec<Record>) -> Result<Vec<BatchId>, ChunkError> {
        if records.is_empty() {
            return Err(ChunkError::MissingInput);
        }
        validate_identifiers(&records, &self.index_name)?;

        let total = records.len();
        let batches = chunk_records(records, self.batch_size)?;

        let mut ids = Vec::with_capacity(batches.len());
        for (index, batch) in batches.iter().enumerate() {
            let id = self.store.write(index, &batch.records).await?;
            debug!(batch_id = %id, records = batch.len(), "Batch materialized");
            ids.push(id);
        }
        self.store.prune(ids.len()).await?;

        info!(
            records = total,
            batches = ids.len(),
            batch_size = self.batch_size,
            "Batching complete"
        );
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connectors::file::csv::store::CsvChunkStore;
    use tempfile::tempdir;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::from_pairs([("email", format!("user{i}@x.io"))]))
            .collect()
    }

    #[test]
    fn ten_records_by_three_gives_3_3_3_1() {
        let batches = chunk_records(records(10), 3).unwrap();
        let sizes: Vec<usize> = batches.iter().map(BatchPayload::len).collect();
        assert_eq!(sizes, vec![3, 3, 3, 1]);

        let ids: Vec<&str> = batches.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["batch_0", "batch_1", "batch_2", "batch_3"]);
    }

    #[test]
    fn concatenated_batches_reconstruct_input() {
        for total in [1, 2, 7, 12, 31] {
            for size in [1, 2, 5, 12, 40] {
                let input = records(total);
                let batches = chunk_records(input.clone(), size).unwrap();

                assert_eq!(batches.len(), total.div_ceil(size));
                let (last, rest) = batches.split_last().unwrap();
                assert!(rest.iter().all(|b| b.len() == size));
                assert!(last.len() <= size && !last.is_empty());

                let rebuilt: Vec<Record> = batches.into_iter().flat_map(|b| b.records).collect();
                assert_eq!(rebuilt, input);
            }
        }
    }

    #[test]
    fn zero_size_and_empty_input_are_errors() {
        assert!(matches!(
            chunk_records(records(3), 0),
            Err(ChunkError::InvalidChunkSize(0))
        ));
        assert!(matches!(
            chunk_records(Vec::new(), 3),
            Err(ChunkError::MissingInput)
        ));
    }

    #[test]
    fn rejects_missing_and_duplicate_identifiers() {
        let mut input = records(3);
        input.push(Record::from_pairs([("name", "no email")]));
        assert!(matches!(
            validate_identifiers(&input, "email"),
            Err(ChunkError::MissingIdentifier { position: 3, .. })
        ));

        let dupes = vec![
            Record::from_pairs([("email", "a@x.io")]),
            Record::from_pairs([("email", "a@x.io")]),
        ];
        assert!(matches!(
            validate_identifiers(&dupes, "email"),
            Err(ChunkError::DuplicateIdentifier(id)) if id == "a@x.io"
        ));
    }

    #[tokio::test]
    async fn materialize_writes_payloads_and_prunes_stale_ones() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn ChunkStore> = Arc::new(CsvChunkStore::new(dir.path()));

        let chunker = Chunker::new(store.clone(), 2, "email");
        assert_eq!(chunker.materialize(records(7)).await.unwrap().len(), 4);

        let chunker = Chunker::new(store.clone(), 5, "email");
        let ids = chunker.materialize(records(7)).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(store.list_batch_ids().await.unwrap(), ids);
        assert_eq!(store.read(&ids[1]).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_input_writes_nothing() {
        let dir = tempdir().unwrap();
        let store: Arc<dyn ChunkStore> = Arc::new(CsvChunkStore::new(dir.path()));
        let chunker = Chunker::new(store.clone(), 2, "user_id");

        assert!(chunker.materialize(records(4)).await.is_err());
        assert!(store.list_batch_ids().await.unwrap().is_empty());
    }
}
