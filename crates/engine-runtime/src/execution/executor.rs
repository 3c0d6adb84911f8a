use crate::{
    error::ExecutorError,
    execution::{
        factory,
        prepare::prepare_batches,
        report::{BatchDisposition, BatchOutcome, RunReport},
    },
};
use connectors::store::ChunkStore;
use engine_config::{ValidatedSettings, settings::StepResume};
use engine_core::{
    metrics::Metrics,
    state::{BatchTracker, CheckpointLedger, models::BatchRecord},
};
use engine_processing::{
    error::RecordError,
    step::{
        pipeline::StepPipeline,
        runner::{RecordReport, RecordRunner},
    },
};
use futures::{StreamExt, stream};
use model::{
    core::{
        identifiers::{BatchId, RunId},
        status::Status,
    },
    records::{batch::BatchPayload, record::Record},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Prepare batches from the configured input and drive them through the
/// configured step pipeline.
pub async fn run(
    settings: &ValidatedSettings,
    rechunk: bool,
    cancel: CancellationToken,
) -> Result<RunReport, ExecutorError> {
    let source = factory::create_source(settings);
    let store = factory::create_store(settings);
    let state = factory::open_state(settings)?;
    let pipeline = factory::create_pipeline(settings)?;

    let prepared = prepare_batches(
        source.as_ref(),
        store.clone(),
        settings.batch_size(),
        settings.index_name(),
        rechunk,
    )
    .await?;

    let executor = PipelineExecutor::new(ExecutorParams {
        store,
        tracker: state.clone(),
        ledger: state,
        pipeline: Arc::new(pipeline),
        index_name: settings.index_name().to_string(),
        concurrency: settings.concurrency(),
        step_resume: settings.step_resume,
        cancel,
    });

    executor.run(&prepared.batch_ids).await
}

pub struct ExecutorParams {
    pub store: Arc<dyn ChunkStore>,
    pub tracker: Arc<dyn BatchTracker>,
    pub ledger: Arc<dyn CheckpointLedger>,
    pub pipeline: Arc<StepPipeline>,
    pub index_name: String,
    pub concurrency: usize,
    pub step_resume: StepResume,
    pub cancel: CancellationToken,
}

/// Runs batches one after another; records within a batch run concurrently,
/// at most `concurrency` at a time.
pub struct PipelineExecutor {
    run_id: RunId,
    store: Arc<dyn ChunkStore>,
    tracker: Arc<dyn BatchTracker>,
    runner: RecordRunner,
    index_name: String,
    concurrency: usize,
    metrics: Metrics,
    cancel: CancellationToken,
}

impl PipelineExecutor {
    pub fn new(params: ExecutorParams) -> Self {
        let metrics = Metrics::new();
        let runner = RecordRunner::new(
            params.pipeline,
            params.ledger,
            params.step_resume,
            metrics.clone(),
        );

        Self {
            run_id: RunId::generate(),
            store: params.store,
            tracker: params.tracker,
            runner,
            index_name: params.index_name,
            concurrency: params.concurrency.max(1),
            metrics,
            cancel: params.cancel,
        }
    }

    /// Process `batch_ids` in order. A failed batch never stops the run; a
    /// batch tracker write failure does.
    pub async fn run(&self, batch_ids: &[BatchId]) -> Result<RunReport, ExecutorError> {
        if batch_ids.is_empty() {
            return Err(ExecutorError::NoBatches);
        }

        info!(run_id = %self.run_id, batches = batch_ids.len(), "Starting run");
        self.tracker.initialize().await?;

        let total = batch_ids.len();
        let mut outcomes = Vec::with_capacity(total);
        let mut interrupted = false;

        for (idx, batch_id) in batch_ids.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(
                    "Shutdown requested before starting batch {}/{}: {}",
                    idx + 1,
                    total,
                    batch_id
                );
                interrupted = true;
                break;
            }

            info!("Processing batch {}/{}: {}", idx + 1, total, batch_id);
            let disposition = self.run_batch(batch_id).await?;
            outcomes.push(BatchOutcome {
                batch_id: batch_id.clone(),
                disposition,
            });
        }

        let report = RunReport {
            run_id: self.run_id.clone(),
            outcomes,
            metrics: self.metrics.snapshot(),
            interrupted,
        };

        info!(
            run_id = %self.run_id,
            attempted = report.outcomes.len(),
            failed = report.failed().count(),
            interrupted,
            "Run finished"
        );
        Ok(report)
    }

    async fn run_batch(&self, batch_id: &BatchId) -> Result<BatchDisposition, ExecutorError> {
        let existing = self
            .tracker
            .get_batch(batch_id)
            .await
            .map_err(|source| ExecutorError::Tracker {
                batch_id: batch_id.clone(),
                source,
            })?;
        let tracked = existing.as_ref().and_then(tracked_ids);
        let loaded = self.load(batch_id).await;

        // Success only holds for the records it was recorded against; a
        // rechunked batch keeps its id but may carry different records.
        if let Some(previous) = &existing {
            match previous.status {
                Status::Success => match &loaded {
                    Ok((record_ids, _)) if tracked.as_ref() == Some(record_ids) => {
                        return Ok(self.skip(batch_id));
                    }
                    Err(cause) => {
                        warn!(
                            batch_id = %batch_id,
                            error = %cause,
                            "Payload of a succeeded batch is unreadable"
                        );
                        return Ok(self.skip(batch_id));
                    }
                    Ok(_) => warn!(
                        batch_id = %batch_id,
                        "Batch succeeded for a different set of records, reprocessing"
                    ),
                },
                Status::Pending => {
                    info!(batch_id = %batch_id, "Resuming batch left pending by an earlier run")
                }
                Status::Failed => info!(batch_id = %batch_id, "Retrying failed batch"),
            }
        }

        let (record_ids, records) = match loaded {
            Ok(payload) => payload,
            Err(cause) => {
                error!(batch_id = %batch_id, error = %cause, "Batch payload unusable");
                let known = tracked.unwrap_or_default();
                return self.fail(batch_id, &known, Vec::new(), cause).await;
            }
        };

        if let Some(previous) = &existing
            && !previous.is_success()
            && tracked.as_ref() != Some(&record_ids)
        {
            warn!(
                batch_id = %batch_id,
                "Batch membership differs from the tracked snapshot, replacing it"
            );
        }

        self.mark(batch_id, &record_ids, Status::Pending).await?;

        let runner = &self.runner;
        let results: Vec<Result<RecordReport, RecordError>> = stream::iter(
            record_ids.iter().cloned().zip(records.into_iter().map(Arc::new)),
        )
        .map(|(record_id, record)| async move { runner.run(record_id, record).await })
        .buffer_unordered(self.concurrency)
        .collect()
        .await;

        let mut first_failure: Option<RecordError> = None;
        let mut failed_records = Vec::new();
        let mut succeeded = 0u64;
        for result in results {
            match result {
                Ok(_) => succeeded += 1,
                Err(err) => {
                    failed_records.push(err.record_id().to_string());
                    first_failure.get_or_insert(err);
                }
            }
        }
        self.metrics.increment_records(succeeded);
        self.metrics
            .increment_record_failures(failed_records.len() as u64);

        match first_failure {
            None => {
                self.mark(batch_id, &record_ids, Status::Success).await?;
                self.metrics.increment_batch_success();
                info!(batch_id = %batch_id, records = record_ids.len(), "Batch succeeded");
                Ok(BatchDisposition::Success)
            }
            Some(cause) => {
                error!(
                    batch_id = %batch_id,
                    failed = failed_records.len(),
                    error = %cause,
                    "Batch failed"
                );
                self.fail(batch_id, &record_ids, failed_records, cause.to_string())
                    .await
            }
        }
    }

    fn skip(&self, batch_id: &BatchId) -> BatchDisposition {
        info!(batch_id = %batch_id, "Batch already succeeded, skipping");
        self.metrics.increment_batch_skipped();
        BatchDisposition::Skipped
    }

    /// Read the batch payload and its identifier snapshot.
    async fn load(
        &self,
        batch_id: &BatchId,
    ) -> Result<(Vec<String>, Vec<Record>), String> {
        let records = self
            .store
            .read(batch_id)
            .await
            .map_err(|e| e.to_string())?;
        let payload = BatchPayload::new(batch_id.clone(), records);
        let record_ids = payload
            .record_ids(&self.index_name)
            .map_err(|e| e.to_string())?;
        Ok((record_ids, payload.records))
    }

    async fn fail(
        &self,
        batch_id: &BatchId,
        record_ids: &[String],
        failed_records: Vec<String>,
        cause: String,
    ) -> Result<BatchDisposition, ExecutorError> {
        self.mark(batch_id, record_ids, Status::Failed).await?;
        self.metrics.increment_batch_failure();
        Ok(BatchDisposition::Failed {
            failed_records,
            cause,
        })
    }

    async fn mark(
        &self,
        batch_id: &BatchId,
        record_ids: &[String],
        status: Status,
    ) -> Result<(), ExecutorError> {
        self.tracker
            .upsert_batch(batch_id, record_ids, status)
            .await
            .map(|_| ())
            .map_err(|source| ExecutorError::Tracker {
                batch_id: batch_id.clone(),
                source,
            })
    }
}

/// Identifiers the tracker recorded for a batch, or `None` when the stored
/// snapshot cannot be decoded.
fn tracked_ids(row: &BatchRecord) -> Option<Vec<String>> {
    match row.record_ids() {
        Ok(ids) => Some(ids),
        Err(e) => {
            warn!(batch_id = %row.batch_id, error = %e, "Tracked batch snapshot is unreadable");
            None
        }
    }
}
