use crate::file::csv::error::FileError;
use async_trait::async_trait;
use model::records::record::Record;

/// Produces the ordered input record sequence.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn read_all(&self) -> Result<Vec<Record>, FileError>;

    /// Content hash of the source, used to detect a changed dataset between runs.
    async fn fingerprint(&self) -> Result<String, FileError>;
}
