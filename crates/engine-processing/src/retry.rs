use crate::error::StepError;
use engine_core::retry::RetryDisposition;

/// Transient transport failures, throttling and server errors are retried;
/// everything else is a definitive answer from the service.
pub fn classify_step_error(err: &StepError) -> RetryDisposition {
    match err {
        StepError::Transport { retryable, .. } => {
            if *retryable {
                RetryDisposition::Retry
            } else {
                RetryDisposition::Stop
            }
        }
        StepError::Http { status, .. } => classify_status(*status),
        StepError::MissingValue(_) => RetryDisposition::Stop,
        StepError::Failed(_) => RetryDisposition::Stop,
        StepError::RetriesExhausted { .. } => RetryDisposition::Stop,
    }
}

fn classify_status(status: u16) -> RetryDisposition {
    match status {
        408 | 425 | 429 => RetryDisposition::Retry,
        500..=599 => RetryDisposition::Retry,
        _ => RetryDisposition::Stop,
    }
}
