use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Chunk the input if needed, then run every batch through the step pipeline
    Run {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(long, help = "Read ONBOARDER_* overrides from this .env file")]
        env_file: Option<String>,

        #[arg(
            long,
            help = "Discard existing batches and chunk the input again even if it changed"
        )]
        rechunk: bool,

        #[arg(long, help = "If specified, writes the JSON run report to this file")]
        report: Option<String>,
    },
    /// Materialize batch payloads without running any step
    Chunk {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(long, help = "Read ONBOARDER_* overrides from this .env file")]
        env_file: Option<String>,

        #[arg(long, help = "Replace batches written for a different input")]
        force: bool,
    },
    /// Show tracked batch statuses and, optionally, each record's latest checkpoint
    Status {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(long, help = "Read ONBOARDER_* overrides from this .env file")]
        env_file: Option<String>,

        #[arg(long, help = "List the latest checkpoint of every record")]
        records: bool,

        #[arg(
            long,
            help = "If set, prints the status information as JSON instead of a table"
        )]
        json: bool,
    },
}
