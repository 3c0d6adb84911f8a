use engine_runtime::execution::report::RunReport;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Listens for SIGINT and SIGTERM and cancels the run. The executor checks
/// the token between batches, so the batch in flight is finished first.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    cancel_token: CancellationToken,
    shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new(cancel_token: CancellationToken) -> Self {
        Self {
            cancel_token,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn register_handlers(&self) {
        let cancel_token = self.cancel_token.clone();
        let shutdown_flag = self.shutdown_requested.clone();

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = signal::ctrl_c().await {
                    warn!(error = %e, "Could not install SIGINT handler");
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminate = async {
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        warn!(error = %e, "Could not install SIGTERM handler");
                        std::future::pending::<()>().await;
                    }
                }
            };

            #[cfg(not(unix))]
            let terminate = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received SIGINT (Ctrl+C), finishing current batch before stopping");
                }
                _ = terminate => {
                    info!("Received SIGTERM, finishing current batch before stopping");
                }
            }

            shutdown_flag.store(true, Ordering::SeqCst);
            cancel_token.cancel();
        });
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }
}

/// Exit codes for the CLI application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    BatchFailed = 2,
    ShutdownRequested = 130, // Standard exit code for SIGINT
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<&RunReport> for ExitCode {
    fn from(report: &RunReport) -> Self {
        if report.interrupted {
            ExitCode::ShutdownRequested
        } else if report.has_failures() {
            ExitCode::BatchFailed
        } else {
            ExitCode::Success
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_runtime::execution::report::{BatchDisposition, BatchOutcome};
    use model::core::identifiers::RunId;

    fn report(dispositions: Vec<BatchDisposition>, interrupted: bool) -> RunReport {
        RunReport {
            run_id: RunId::new("run-1"),
            outcomes: dispositions
                .into_iter()
                .enumerate()
                .map(|(i, disposition)| BatchOutcome {
                    batch_id: format!("batch_{i}").into(),
                    disposition,
                })
                .collect(),
            metrics: Default::default(),
            interrupted,
        }
    }

    #[test]
    fn exit_code_reflects_run_outcome() {
        let failed = BatchDisposition::Failed {
            failed_records: vec!["e@x.io".into()],
            cause: "boom".into(),
        };

        assert_eq!(
            ExitCode::from(&report(vec![BatchDisposition::Skipped, BatchDisposition::Success], false)),
            ExitCode::Success
        );
        assert_eq!(
            ExitCode::from(&report(vec![BatchDisposition::Success, failed.clone()], false)),
            ExitCode::BatchFailed
        );
        assert_eq!(
            ExitCode::from(&report(vec![failed], true)),
            ExitCode::ShutdownRequested
        );
    }

    #[tokio::test]
    async fn cancel_token_is_shared() {
        let coordinator = ShutdownCoordinator::new(CancellationToken::new());
        let token = coordinator.cancel_token();
        assert!(!coordinator.is_shutdown_requested());
        coordinator.cancel_token().cancel();
        assert!(token.is_cancelled());
    }
}
