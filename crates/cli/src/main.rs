use crate::{
    env::EnvManager,
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use commands::Commands;
use engine_config::{Settings, ValidatedSettings};
use engine_core::progress::ProgressService;
use engine_runtime::execution::{executor, factory, prepare::prepare_batches};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod env;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "onboarder",
    version = "0.1.0",
    about = "Checkpointed batch onboarding pipeline"
)]
struct Cli {
    #[arg(short, long, global = true, help = "Log at debug level")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match execute(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            ExitCode::GeneralError
        }
    };

    std::process::exit(code.as_i32());
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn execute(command: Commands) -> Result<ExitCode, CliError> {
    match command {
        Commands::Run {
            config,
            env_file,
            rechunk,
            report,
        } => {
            let settings = load_settings(&config, env_file.as_deref())?;
            let shutdown = ShutdownCoordinator::new(CancellationToken::new());
            shutdown.register_handlers();

            let run_report = executor::run(&settings, rechunk, shutdown.cancel_token()).await?;
            if shutdown.is_shutdown_requested() {
                warn!("Stopped early on request; completed batches are recorded");
            }

            output::print_run_summary(&run_report);
            if let Some(path) = report {
                output::write_report(&run_report, &path).await?;
                info!("Run report written to {path}");
            }

            Ok(ExitCode::from(&run_report))
        }
        Commands::Chunk {
            config,
            env_file,
            force,
        } => {
            let settings = load_settings(&config, env_file.as_deref())?;
            let source = factory::create_source(&settings);
            let store = factory::create_store(&settings);

            let prepared = prepare_batches(
                source.as_ref(),
                store,
                settings.batch_size(),
                settings.index_name(),
                force,
            )
            .await?;

            if prepared.chunked {
                println!(
                    "Wrote {} batches to {}",
                    prepared.batch_ids.len(),
                    settings.batch_dir.display()
                );
            } else {
                println!(
                    "Input unchanged; {} batches already in {}",
                    prepared.batch_ids.len(),
                    settings.batch_dir.display()
                );
            }
            Ok(ExitCode::Success)
        }
        Commands::Status {
            config,
            env_file,
            records,
            json,
        } => {
            let settings = load_settings(&config, env_file.as_deref())?;
            show_status(&settings, records, json).await?;
            Ok(ExitCode::Success)
        }
    }
}

fn load_settings(config: &str, env_file: Option<&str>) -> Result<ValidatedSettings, CliError> {
    let mut env = EnvManager::new();
    if let Some(path) = env_file {
        env.load_from_file(path)?;
    }
    Ok(Settings::load(config, env.all())?)
}

async fn show_status(
    settings: &ValidatedSettings,
    records: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let state = factory::open_state(settings)?;
    let service = ProgressService::new(state.clone(), state);

    if records {
        output::print_records(&service.record_views().await?, as_json)
    } else {
        output::print_batches(&service.batch_summaries().await?, as_json)
    }
}
