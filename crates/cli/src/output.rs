use crate::error::CliError;
use engine_core::progress::{BatchSummary, RecordView};
use engine_runtime::execution::report::{BatchDisposition, RunReport};
use serde::Serialize;

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub async fn write_report(report: &RunReport, path: &str) -> Result<(), CliError> {
    tokio::fs::write(path, to_json(report)?).await?;
    Ok(())
}

pub fn print_run_summary(report: &RunReport) {
    println!("Run {}", report.run_id);
    println!("-----------------------------");
    for outcome in &report.outcomes {
        match &outcome.disposition {
            BatchDisposition::Skipped => println!("{:<16} skipped", outcome.batch_id),
            BatchDisposition::Success => println!("{:<16} success", outcome.batch_id),
            BatchDisposition::Failed {
                failed_records,
                cause,
            } => println!(
                "{:<16} failed   records: {}  cause: {}",
                outcome.batch_id,
                failed_records.join(", "),
                cause
            ),
        }
    }

    let m = &report.metrics;
    println!("-----------------------------");
    println!(
        "batches: {} succeeded, {} failed, {} skipped",
        m.batches_succeeded, m.batches_failed, m.batches_skipped
    );
    println!(
        "records: {} processed, {} failed; steps: {} executed, {} skipped",
        m.records_processed, m.records_failed, m.steps_executed, m.steps_skipped
    );
    if report.interrupted {
        println!("Run interrupted; rerun to continue with the remaining batches");
    }
}

pub fn print_batches(batches: &[BatchSummary], as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", to_json(batches)?);
        return Ok(());
    }

    if batches.is_empty() {
        println!("No batches tracked yet");
        return Ok(());
    }

    println!("{:<16} {:<8} {:>7}  {}", "Batch", "Status", "Records", "Updated");
    for batch in batches {
        println!(
            "{:<16} {:<8} {:>7}  {}",
            batch.batch_id,
            batch.status,
            batch.record_count,
            batch.updated_at.to_rfc3339()
        );
    }
    Ok(())
}

pub fn print_records(records: &[RecordView], as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", to_json(records)?);
        return Ok(());
    }

    println!(
        "{:<32} {:<12} {:<8} {}",
        "Record", "Batch", "Status", "Last checkpoint"
    );
    for view in records {
        println!(
            "{:<32} {:<12} {:<8} {}",
            view.record_id, view.batch_id, view.status, view.last_checkpoint
        );
    }
    Ok(())
}
