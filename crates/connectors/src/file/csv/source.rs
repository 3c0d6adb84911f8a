use crate::{file::csv::error::FileError, source::RecordSource};
use async_trait::async_trait;
use model::records::record::{Field, Record};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads every row of a headered CSV file as a [`Record`].
pub struct CsvRecordSource {
    path: PathBuf,
}

impl CsvRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvRecordSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RecordSource for CsvRecordSource {
    async fn read_all(&self) -> Result<Vec<Record>, FileError> {
        if !self.path.exists() {
            return Err(FileError::NotFound(self.path.display().to_string()));
        }
        let records = read_records(&self.path)?;
        debug!(path = %self.path.display(), rows = records.len(), "Data loaded");
        Ok(records)
    }

    async fn fingerprint(&self) -> Result<String, FileError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FileError::NotFound(self.path.display().to_string()),
            _ => FileError::IoError(e),
        })?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}

/// Parse a headered CSV file, keeping header order in every record.
pub(crate) fn read_records(path: &Path) -> Result<Vec<Record>, FileError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_path(path)?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(FileError::InvalidFormat(format!(
            "{} has no header row",
            path.display()
        )));
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let fields = headers
            .iter()
            .zip(row.iter())
            .map(|(name, value)| Field {
                name: name.clone(),
                value: value.to_string(),
            })
            .collect();
        records.push(Record::new(fields));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_rows_in_file_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "email, name").unwrap();
        writeln!(file, "a@x.io,Ann").unwrap();
        writeln!(file, "b@x.io,Bo").unwrap();

        let source = CsvRecordSource::new(file.path());
        let records = source.read_all().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("email"), Some("a@x.io"));
        assert_eq!(records[1].get("name"), Some("Bo"));
    }

    #[tokio::test]
    async fn fingerprint_changes_with_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "email\na@x.io").unwrap();
        let source = CsvRecordSource::new(file.path());
        let before = source.fingerprint().await.unwrap();

        writeln!(file, "b@x.io").unwrap();
        let after = source.fingerprint().await.unwrap();
        assert_ne!(before, after);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let source = CsvRecordSource::new("/nonexistent/input.csv");
        assert!(matches!(
            source.read_all().await,
            Err(FileError::NotFound(_))
        ));
    }
}
