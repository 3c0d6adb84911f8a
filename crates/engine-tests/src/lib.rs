#![allow(dead_code)]

use connectors::{file::csv::store::CsvChunkStore, store::ChunkStore};
use engine_config::settings::StepResume;
use engine_core::state::{BatchTracker, CheckpointLedger, sled_store::SledStateStore};
use engine_processing::{
    chunker::Chunker,
    step::{Step, pipeline::StepPipeline},
};
use engine_runtime::execution::executor::{ExecutorParams, PipelineExecutor};
use model::{core::identifiers::BatchId, records::record::Record};
use std::{
    fs,
    ops::RangeInclusive,
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use utils::ScriptedStep;

pub mod integration;
pub mod utils;

pub const INDEX_NAME: &str = "email";

/// Identifier of the `n`th input record, counting from 1.
pub fn email(n: usize) -> String {
    format!("user{n}@x.io")
}

pub fn records(count: usize) -> Vec<Record> {
    records_in(1..=count)
}

pub fn records_in(range: RangeInclusive<usize>) -> Vec<Record> {
    range
        .map(|n| {
            Record::from_pairs([
                ("email", email(n)),
                ("name", format!("User {n}")),
                ("plan", "basic".to_string()),
            ])
        })
        .collect()
}

/// Input CSV with `count` users in the same shape as [`records`].
pub fn write_input(path: &Path, count: usize) {
    let mut body = String::from("email,name,plan\n");
    for n in 1..=count {
        body.push_str(&format!("{},User {n},basic\n", email(n)));
    }
    fs::write(path, body).unwrap();
}

/// Chunk store and state store rooted in one temporary directory.
pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<CsvChunkStore>,
    pub state: Arc<SledStateStore>,
    pub cancel: CancellationToken,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(CsvChunkStore::new(dir.path().join("batches")));
        let state = Arc::new(SledStateStore::open(dir.path().join("state")).unwrap());
        Self {
            dir,
            store,
            state,
            cancel: CancellationToken::new(),
        }
    }

    pub fn batch_file(&self, batch_id: &BatchId) -> PathBuf {
        self.store.dir().join(format!("{batch_id}.csv"))
    }

    pub async fn chunk(&self, count: usize, batch_size: usize) -> Vec<BatchId> {
        self.chunk_range(1..=count, batch_size).await
    }

    /// Chunk the users numbered `range`, replacing any earlier chunk set.
    pub async fn chunk_range(
        &self,
        range: RangeInclusive<usize>,
        batch_size: usize,
    ) -> Vec<BatchId> {
        Chunker::new(self.store.clone(), batch_size, INDEX_NAME)
            .materialize(records_in(range))
            .await
            .unwrap()
    }

    pub fn executor(
        &self,
        steps: &[Arc<ScriptedStep>],
        concurrency: usize,
        step_resume: StepResume,
    ) -> PipelineExecutor {
        self.executor_with(
            self.state.clone(),
            self.state.clone(),
            steps,
            concurrency,
            step_resume,
        )
    }

    /// Executor over the harness chunk store with the given state backends.
    pub fn executor_with(
        &self,
        tracker: Arc<dyn BatchTracker>,
        ledger: Arc<dyn CheckpointLedger>,
        steps: &[Arc<ScriptedStep>],
        concurrency: usize,
        step_resume: StepResume,
    ) -> PipelineExecutor {
        let pipeline: StepPipeline = steps
            .iter()
            .map(|s| s.clone() as Arc<dyn Step>)
            .collect();

        PipelineExecutor::new(ExecutorParams {
            store: self.store.clone() as Arc<dyn ChunkStore>,
            tracker,
            ledger,
            pipeline: Arc::new(pipeline),
            index_name: INDEX_NAME.to_string(),
            concurrency,
            step_resume,
            cancel: self.cancel.clone(),
        })
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
