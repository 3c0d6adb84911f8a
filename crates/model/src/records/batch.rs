use crate::{core::identifiers::BatchId, error::ModelError, records::record::Record};

/// The record list that belongs to one batch, as materialized by the chunker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPayload {
    pub id: BatchId,
    pub records: Vec<Record>,
}

impl BatchPayload {
    pub fn new(id: BatchId, records: Vec<Record>) -> Self {
        BatchPayload { id, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Identifier snapshot in record order.
    pub fn record_ids(&self, index_name: &str) -> Result<Vec<String>, ModelError> {
        self.records
            .iter()
            .map(|r| r.id(index_name).map(str::to_string))
            .collect()
    }
}
