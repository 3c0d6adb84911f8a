use crate::{
    file::csv::{error::FileError, source::read_records},
    manifest::ChunkManifest,
    store::ChunkStore,
};
use async_trait::async_trait;
use model::{core::identifiers::BatchId, records::record::Record};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const MANIFEST_FILE: &str = "manifest.json";
const EXTENSION: &str = "csv";

/// Stores each batch as `<dir>/batch_<index>.csv`.
pub struct CsvChunkStore {
    dir: PathBuf,
}

impl CsvChunkStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvChunkStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn batch_path(&self, batch_id: &BatchId) -> PathBuf {
        self.dir.join(format!("{batch_id}.{EXTENSION}"))
    }

    fn batch_files(&self) -> Result<Vec<(BatchId, PathBuf)>, FileError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let id = BatchId::from(stem);
            if id.index().is_some() {
                files.push((id, path));
            }
        }

        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}

#[async_trait]
impl ChunkStore for CsvChunkStore {
    async fn write(&self, index: usize, records: &[Record]) -> Result<BatchId, FileError> {
        std::fs::create_dir_all(&self.dir)?;

        let batch_id = BatchId::from_index(index);
        let path = self.batch_path(&batch_id);
        let mut writer = csv::Writer::from_path(&path)?;

        if let Some(first) = records.first() {
            let headers: Vec<&str> = first.field_names().collect();
            writer.write_record(&headers)?;
            for record in records {
                writer.write_record(headers.iter().map(|h| record.get(h).unwrap_or("")))?;
            }
        }
        writer.flush()?;

        debug!(batch_id = %batch_id, records = records.len(), path = %path.display(), "Batch payload written");
        Ok(batch_id)
    }

    async fn list_batch_ids(&self) -> Result<Vec<BatchId>, FileError> {
        let ids: Vec<BatchId> = self.batch_files()?.into_iter().map(|(id, _)| id).collect();
        info!(count = ids.len(), "Batches identified");
        Ok(ids)
    }

    async fn read(&self, batch_id: &BatchId) -> Result<Vec<Record>, FileError> {
        if batch_id.index().is_none() {
            return Err(FileError::InvalidBatchId(batch_id.to_string()));
        }
        let path = self.batch_path(batch_id);
        if !path.exists() {
            return Err(FileError::NotFound(path.display().to_string()));
        }
        read_records(&path)
    }

    async fn prune(&self, keep: usize) -> Result<usize, FileError> {
        let mut removed = 0;
        for (id, path) in self.batch_files()? {
            if id.index().is_some_and(|i| i >= keep) {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, keep, "Removed stale batch payloads");
        }
        Ok(removed)
    }

    async fn read_manifest(&self) -> Result<Option<ChunkManifest>, FileError> {
        let path = self.dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn write_manifest(&self, manifest: &ChunkManifest) -> Result<(), FileError> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(manifest)?;
        std::fs::write(self.dir.join(MANIFEST_FILE), json)?;
        Ok(())
    }
}
