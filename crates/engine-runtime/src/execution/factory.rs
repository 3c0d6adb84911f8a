use crate::error::ExecutorError;
use connectors::{
    file::csv::{source::CsvRecordSource, store::CsvChunkStore},
    source::RecordSource,
    store::ChunkStore,
};
use engine_config::ValidatedSettings;
use engine_core::state::sled_store::SledStateStore;
use engine_processing::step::{Step, http::HttpStep, pipeline::StepPipeline};
use reqwest::Client;
use std::sync::Arc;
use tracing::debug;

pub fn create_source(settings: &ValidatedSettings) -> Arc<dyn RecordSource> {
    Arc::new(CsvRecordSource::new(&settings.input))
}

pub fn create_store(settings: &ValidatedSettings) -> Arc<dyn ChunkStore> {
    Arc::new(CsvChunkStore::new(&settings.batch_dir))
}

pub fn open_state(settings: &ValidatedSettings) -> Result<Arc<SledStateStore>, ExecutorError> {
    debug!(path = %settings.state_dir.display(), "Opening state store");
    Ok(Arc::new(SledStateStore::open(&settings.state_dir)?))
}

/// One [`HttpStep`] per configured step, sharing a single HTTP client.
pub fn create_pipeline(settings: &ValidatedSettings) -> Result<StepPipeline, ExecutorError> {
    let client = Client::builder()
        .user_agent(concat!("onboarder/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ExecutorError::InitializationError(e.to_string()))?;

    Ok(settings
        .steps
        .iter()
        .map(|step| Arc::new(HttpStep::new(client.clone(), step)) as Arc<dyn Step>)
        .collect())
}
