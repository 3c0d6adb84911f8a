use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Describes the chunk set currently on disk so a later run can tell
/// whether the payloads still correspond to the input it was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkManifest {
    pub source_fingerprint: String,
    pub batch_size: usize,
    pub batch_count: usize,
    pub index_name: String,
    pub created_at: DateTime<Utc>,
}

impl ChunkManifest {
    pub fn new(
        source_fingerprint: impl Into<String>,
        batch_size: usize,
        batch_count: usize,
        index_name: impl Into<String>,
    ) -> Self {
        Self {
            source_fingerprint: source_fingerprint.into(),
            batch_size,
            batch_count,
            index_name: index_name.into(),
            created_at: Utc::now(),
        }
    }

    pub fn matches(&self, fingerprint: &str, batch_size: usize, index_name: &str) -> bool {
        self.source_fingerprint == fingerprint
            && self.batch_size == batch_size
            && self.index_name == index_name
    }
}
