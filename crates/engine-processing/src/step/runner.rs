use crate::{
    error::RecordError,
    step::{Step, StepContext, pipeline::StepPipeline},
};
use engine_config::settings::StepResume;
use engine_core::{
    metrics::Metrics,
    state::{CheckpointLedger, models::CheckpointEntry},
};
use model::{core::status::Status, records::record::Record};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Per-record tally of what the pipeline did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordReport {
    pub record_id: String,
    pub executed: usize,
    pub already_done: usize,
    pub skipped: usize,
}

/// Drives one record through the step pipeline and writes a checkpoint
/// under each step's name as it starts, succeeds or fails.
#[derive(Clone)]
pub struct RecordRunner {
    pipeline: Arc<StepPipeline>,
    ledger: Arc<dyn CheckpointLedger>,
    resume: StepResume,
    metrics: Metrics,
}

impl RecordRunner {
    pub fn new(
        pipeline: Arc<StepPipeline>,
        ledger: Arc<dyn CheckpointLedger>,
        resume: StepResume,
        metrics: Metrics,
    ) -> Self {
        Self {
            pipeline,
            ledger,
            resume,
            metrics,
        }
    }

    /// Run every step for the record in order. The first unrecovered step
    /// error stops the record's remaining steps.
    pub async fn run(
        &self,
        record_id: String,
        record: Arc<Record>,
    ) -> Result<RecordReport, RecordError> {
        debug!(record_id = %record_id, "Inside processor");

        let mut ctx = StepContext::new(record_id.clone(), record);
        let mut report = RecordReport {
            record_id,
            ..RecordReport::default()
        };

        for step in self.pipeline.steps() {
            if self.already_succeeded(&mut ctx, step.as_ref()).await? {
                report.skipped += 1;
                self.metrics.increment_steps_skipped();
                continue;
            }

            self.checkpoint(&ctx, step.as_ref(), Status::Pending, None)
                .await?;
            self.metrics.increment_steps_executed();

            match step.execute(&ctx).await {
                Ok(output) => {
                    if output.already_done {
                        info!(
                            record_id = %ctx.record_id(),
                            step = step.name(),
                            "Effect already present, treating as success"
                        );
                        report.already_done += 1;
                    }
                    self.checkpoint(&ctx, step.as_ref(), Status::Success, Some(&output.values))
                        .await?;
                    ctx.merge(output.values);
                    report.executed += 1;
                }
                Err(source) => {
                    error!(
                        record_id = %ctx.record_id(),
                        step = step.name(),
                        error = %source,
                        "Step failed"
                    );
                    if let Err(e) = self
                        .checkpoint(&ctx, step.as_ref(), Status::Failed, None)
                        .await
                    {
                        warn!(error = %e, "Could not record step failure");
                    }
                    return Err(RecordError::Step {
                        record_id: ctx.record_id().to_string(),
                        step: step.name().to_string(),
                        source,
                    });
                }
            }
        }

        Ok(report)
    }

    /// With ledger resume on, a step already `Success` for this record is
    /// skipped and its recorded output restored into the context.
    async fn already_succeeded(
        &self,
        ctx: &mut StepContext,
        step: &dyn Step,
    ) -> Result<bool, RecordError> {
        if self.resume != StepResume::Ledger {
            return Ok(false);
        }

        let existing = self
            .ledger
            .load_checkpoint(ctx.record_id(), step.name())
            .await
            .map_err(|source| RecordError::Ledger {
                record_id: ctx.record_id().to_string(),
                step: step.name().to_string(),
                source,
            })?;

        match existing {
            Some(entry) if entry.status.is_success() => {
                debug!(
                    record_id = %ctx.record_id(),
                    step = step.name(),
                    "Step already succeeded, skipping"
                );
                ctx.merge(entry.output());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn checkpoint(
        &self,
        ctx: &StepContext,
        step: &dyn Step,
        status: Status,
        output: Option<&Map<String, Value>>,
    ) -> Result<(), RecordError> {
        let mut entry = CheckpointEntry::new(ctx.record_id(), step.name(), status, step.label(status));
        if let Some(values) = output {
            entry = entry.with_output(values);
        }

        self.ledger
            .write_checkpoint(&entry)
            .await
            .map_err(|source| RecordError::Ledger {
                record_id: ctx.record_id().to_string(),
                step: step.name().to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::StepError,
        step::{StepOutput, pipeline::StepPipeline},
    };
    use async_trait::async_trait;
    use engine_core::state::sled_store::SledStateStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Produces `{ <key>: "<name>-<record>" }`, optionally requiring `needs`.
    struct Produce {
        name: &'static str,
        key: &'static str,
        needs: Option<&'static str>,
        calls: AtomicUsize,
    }

    impl Produce {
        fn new(name: &'static str, key: &'static str, needs: Option<&'static str>) -> Self {
            Self {
                name,
                key,
                needs,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Step for Produce {
        fn name(&self) -> &str {
            self.name
        }

        async fn execute(&self, ctx: &StepContext) -> Result<StepOutput, StepError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(needed) = self.needs {
                ctx.require(needed)?;
            }
            let value = json!(format!("{}-{}", self.name, ctx.record_id()));
            Ok(StepOutput::completed_with(
                [(self.key.to_string(), value)].into_iter().collect(),
            ))
        }
    }

    struct Duplicate;

    #[async_trait]
    impl Step for Duplicate {
        fn name(&self) -> &str {
            "signup"
        }

        async fn execute(&self, _ctx: &StepContext) -> Result<StepOutput, StepError> {
            Ok(StepOutput::already_done())
        }
    }

    struct Broken;

    #[async_trait]
    impl Step for Broken {
        fn name(&self) -> &str {
            "confirm"
        }

        fn label(&self, status: Status) -> String {
            format!("Confirm {status}")
        }

        async fn execute(&self, _ctx: &StepContext) -> Result<StepOutput, StepError> {
            Err(StepError::Failed("identity provider rejected".into()))
        }
    }

    fn record(id: &str) -> Arc<Record> {
        Arc::new(Record::from_pairs([("email", id)]))
    }

    fn runner(
        store: Arc<SledStateStore>,
        pipeline: StepPipeline,
        resume: StepResume,
    ) -> RecordRunner {
        RecordRunner::new(Arc::new(pipeline), store, resume, Metrics::new())
    }

    #[tokio::test]
    async fn values_flow_into_later_steps() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SledStateStore::open(dir.path()).unwrap());
        let pipeline = StepPipeline::new()
            .with_step(Produce::new("create-user", "user_id", None))
            .with_step(Produce::new("create-profile", "profile_id", Some("user_id")));

        let report = runner(store.clone(), pipeline, StepResume::Off)
            .run("a@x.io".into(), record("a@x.io"))
            .await
            .unwrap();

        assert_eq!(report.executed, 2);
        let cp = store.load_checkpoint("a@x.io", "create-user").await.unwrap().unwrap();
        assert_eq!(cp.status, Status::Success);
        assert_eq!(cp.label, "create-user succeeded");
        assert_eq!(cp.output()["user_id"], json!("create-user-a@x.io"));
    }

    #[tokio::test]
    async fn failure_stops_remaining_steps_and_is_checkpointed() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SledStateStore::open(dir.path()).unwrap());
        let pipeline = StepPipeline::new()
            .with_step(Produce::new("signup", "user_id", None))
            .with_step(Broken)
            .with_step(Produce::new("grant", "grant_id", None));

        let err = runner(store.clone(), pipeline, StepResume::Off)
            .run("b@x.io".into(), record("b@x.io"))
            .await
            .unwrap_err();

        assert_eq!(err.record_id(), "b@x.io");
        assert_eq!(err.step(), "confirm");

        let signup = store.load_checkpoint("b@x.io", "signup").await.unwrap().unwrap();
        let confirm = store.load_checkpoint("b@x.io", "confirm").await.unwrap().unwrap();
        assert_eq!(signup.status, Status::Success);
        assert_eq!(confirm.status, Status::Failed);
        assert_eq!(confirm.label, "Confirm Failed");
        assert!(store.load_checkpoint("b@x.io", "grant").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn already_done_is_recorded_as_success() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SledStateStore::open(dir.path()).unwrap());

        let report = runner(store.clone(), StepPipeline::new().with_step(Duplicate), StepResume::Off)
            .run("c@x.io".into(), record("c@x.io"))
            .await
            .unwrap();

        assert_eq!(report.already_done, 1);
        let cp = store.load_checkpoint("c@x.io", "signup").await.unwrap().unwrap();
        assert_eq!(cp.status, Status::Success);
    }

    #[tokio::test]
    async fn ledger_resume_skips_succeeded_steps_and_restores_output() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SledStateStore::open(dir.path()).unwrap());
        store
            .write_checkpoint(
                &CheckpointEntry::new("d@x.io", "create-user", Status::Success, "done")
                    .with_output(json!({ "user_id": "u-9" }).as_object().unwrap()),
            )
            .await
            .unwrap();

        let create = Arc::new(Produce::new("create-user", "user_id", None));
        let profile = Arc::new(Produce::new("create-profile", "profile_id", Some("user_id")));
        let pipeline: StepPipeline = [create.clone() as Arc<dyn Step>, profile.clone() as Arc<dyn Step>]
            .into_iter()
            .collect();

        let report = runner(store.clone(), pipeline, StepResume::Ledger)
            .run("d@x.io".into(), record("d@x.io"))
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.executed, 1);
        assert_eq!(create.calls.load(Ordering::SeqCst), 0);
        assert_eq!(profile.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resume_off_reinvokes_succeeded_steps() {
        let dir = tempdir().unwrap();
        let store = Arc::new(SledStateStore::open(dir.path()).unwrap());
        store
            .write_checkpoint(&CheckpointEntry::new("e@x.io", "create-user", Status::Success, "done"))
            .await
            .unwrap();

        let create = Arc::new(Produce::new("create-user", "user_id", None));
        let pipeline: StepPipeline = [create.clone() as Arc<dyn Step>].into_iter().collect();

        runner(store, pipeline, StepResume::Off)
            .run("e@x.io".into(), record("e@x.io"))
            .await
            .unwrap();
        assert_eq!(create.calls.load(Ordering::SeqCst), 1);
    }
}
