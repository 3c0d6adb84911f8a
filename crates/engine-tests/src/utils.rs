use async_trait::async_trait;
use engine_core::{
    error::StateStoreError,
    state::{
        BatchTracker, CheckpointLedger,
        models::{BatchRecord, CheckpointEntry},
        sled_store::SledStateStore,
    },
};
use engine_processing::{
    error::StepError,
    step::{Step, StepContext, StepOutput},
};
use model::core::{identifiers::BatchId, status::Status};
use serde_json::{Value, json};
use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};
use tokio_util::sync::CancellationToken;

/// A step whose behaviour per record is set up by the test.
pub struct ScriptedStep {
    name: String,
    produces: Option<String>,
    needs: Option<String>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    cancel_on: Option<(String, CancellationToken)>,
}

impl ScriptedStep {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            produces: None,
            needs: None,
            failing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            cancel_on: None,
        }
    }

    /// Output `{ key: "<name>:<record_id>" }` on success.
    pub fn producing(mut self, key: &str) -> Self {
        self.produces = Some(key.to_string());
        self
    }

    /// Fail with a missing value error unless an earlier step produced `key`.
    pub fn needing(mut self, key: &str) -> Self {
        self.needs = Some(key.to_string());
        self
    }

    pub fn failing_for(self, record_ids: &[String]) -> Self {
        self.failing
            .lock()
            .unwrap()
            .extend(record_ids.iter().cloned());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Cancel `token` when invoked for `record_id`.
    pub fn cancelling_on(mut self, record_id: String, token: CancellationToken) -> Self {
        self.cancel_on = Some((record_id, token));
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// The downstream service recovered; every record succeeds from now on.
    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn calls(&self) -> Vec<String> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort();
        calls
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Step for ScriptedStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &StepContext) -> Result<StepOutput, StepError> {
        self.calls.lock().unwrap().push(ctx.record_id().to_string());
        if let Some((record_id, token)) = &self.cancel_on
            && record_id == ctx.record_id()
        {
            token.cancel();
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(key) = &self.needs {
            ctx.require(key)?;
        }
        if self.failing.lock().unwrap().contains(ctx.record_id()) {
            return Err(StepError::Failed(format!(
                "{} rejected {}",
                self.name,
                ctx.record_id()
            )));
        }

        Ok(match &self.produces {
            Some(key) => StepOutput::completed_with(
                [(
                    key.clone(),
                    json!(format!("{}:{}", self.name, ctx.record_id())),
                )]
                .into_iter()
                .collect(),
            ),
            None => StepOutput::completed(),
        })
    }
}

/// Batch tracker backed by sled that refuses to record one status for one
/// batch, as a full disk would.
pub struct FailingTracker {
    inner: Arc<SledStateStore>,
    batch_id: BatchId,
    status: Status,
}

impl FailingTracker {
    pub fn new(inner: Arc<SledStateStore>, batch_id: BatchId, status: Status) -> Arc<Self> {
        Arc::new(Self {
            inner,
            batch_id,
            status,
        })
    }
}

#[async_trait]
impl BatchTracker for FailingTracker {
    async fn initialize(&self) -> Result<(), StateStoreError> {
        self.inner.initialize().await
    }

    async fn upsert_batch(
        &self,
        batch_id: &BatchId,
        record_ids: &[String],
        status: Status,
    ) -> Result<BatchRecord, StateStoreError> {
        if *batch_id == self.batch_id && status == self.status {
            return Err(StateStoreError::SaveBatch {
                batch_id: batch_id.to_string(),
                reason: "no space left on device".into(),
            });
        }
        self.inner.upsert_batch(batch_id, record_ids, status).await
    }

    async fn get_batch(&self, batch_id: &BatchId) -> Result<Option<BatchRecord>, StateStoreError> {
        self.inner.get_batch(batch_id).await
    }

    async fn list_batches(&self) -> Result<Vec<BatchRecord>, StateStoreError> {
        self.inner.list_batches().await
    }
}

/// Checkpoint ledger backed by sled that refuses to record one status for
/// one record.
pub struct FailingLedger {
    inner: Arc<SledStateStore>,
    record_id: String,
    status: Status,
}

impl FailingLedger {
    pub fn new(inner: Arc<SledStateStore>, record_id: String, status: Status) -> Arc<Self> {
        Arc::new(Self {
            inner,
            record_id,
            status,
        })
    }
}

#[async_trait]
impl CheckpointLedger for FailingLedger {
    async fn write_checkpoint(&self, entry: &CheckpointEntry) -> Result<(), StateStoreError> {
        if entry.record_id == self.record_id && entry.status == self.status {
            return Err(StateStoreError::SaveCheckpoint {
                record_id: entry.record_id.clone(),
                step: entry.step_name.clone(),
                reason: "no space left on device".into(),
            });
        }
        self.inner.write_checkpoint(entry).await
    }

    async fn load_checkpoint(
        &self,
        record_id: &str,
        step_name: &str,
    ) -> Result<Option<CheckpointEntry>, StateStoreError> {
        self.inner.load_checkpoint(record_id, step_name).await
    }

    async fn record_checkpoints(
        &self,
        record_id: &str,
    ) -> Result<Vec<CheckpointEntry>, StateStoreError> {
        self.inner.record_checkpoints(record_id).await
    }
}

pub async fn batch_status(state: &SledStateStore, batch_id: &BatchId) -> Option<Status> {
    state
        .get_batch(batch_id)
        .await
        .unwrap()
        .map(|b| b.status)
}

pub async fn step_status(state: &SledStateStore, record_id: &str, step: &str) -> Option<Status> {
    state
        .load_checkpoint(record_id, step)
        .await
        .unwrap()
        .map(|c| c.status)
}

/// Minimal HTTP/1.1 responder for exercising HTTP steps. The handler gets
/// `(method, path, body)` and returns `(status, body)`.
pub struct TestService {
    pub base_url: String,
    hits: Arc<Mutex<Vec<String>>>,
}

pub type Handler = Arc<dyn Fn(&str, &str, &Value) -> (u16, String) + Send + Sync>;

impl TestService {
    pub async fn spawn(handler: Handler) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(Mutex::new(Vec::new()));

        let recorded = hits.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let handler = handler.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = serve(socket, handler, recorded).await;
                });
            }
        });

        Self { base_url, hits }
    }

    /// Requests received so far as `"METHOD path"`.
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    pub fn hit_count(&self, request: &str) -> usize {
        self.hits().iter().filter(|h| h.as_str() == request).count()
    }
}

async fn serve(
    mut socket: TcpStream,
    handler: Handler,
    hits: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let mut request_line = head.lines().next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();
    let body: Value = serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);
    hits.lock().unwrap().push(format!("{method} {path}"));

    let (status, payload) = handler(&method, &path, &body);
    let response = format!(
        "HTTP/1.1 {status} Test\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{payload}",
        payload.len()
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}
