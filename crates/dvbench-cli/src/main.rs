mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dvbench_types::Technology;

use commands::benchmark::BenchmarkArgs;
use commands::generate::GenerateShape;

#[derive(Parser)]
#[command(
    name = "dvbench",
    version,
    about = "Upload benchmarks for data versioning and storage backends"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Also write logs to a daily file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Ledger file (.jsonl, or .db for SQLite)
    #[arg(long, default_value = "output/stats.jsonl", global = true)]
    ledger: PathBuf,

    /// Technology YAML file (default: built-in table)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a benchmark workflow
    Benchmark(BenchmarkArgs),
    /// Smoke-test every technology with one ten-row append step
    Test {
        /// Technologies to test (default: every upload backend)
        #[arg(short, long = "tech", value_delimiter = ',')]
        technologies: Vec<Technology>,
    },
    /// Show the latest run, or the last N rows
    Latest {
        /// Number of rows (default: every row of the latest run)
        n: Option<usize>,
        /// Also export the rows (.csv or .jsonl)
        #[arg(long, num_args = 0..=1, default_missing_value = "output/latest.csv")]
        export: Option<PathBuf>,
    },
    /// Per-step totals of the latest run
    Summary {
        /// Summarize every run in the ledger
        #[arg(long)]
        all: bool,
    },
    /// Write a standalone dataset
    Generate {
        #[arg(value_enum)]
        shape: GenerateShape,
        /// Output file, or directory for `mock`
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 1000, allow_negative_numbers = true)]
        rows: i64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Files to write for `mock`
        #[arg(long, default_value_t = 10)]
        file_count: usize,
    },
    /// Validate the technology table and local prerequisites
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level, cli.log_dir.as_deref())?;

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Benchmark(args) => {
            commands::benchmark::execute(&args.to_params()?, &cli.ledger, config)
        }
        Commands::Test { technologies } => commands::benchmark::execute(
            &commands::benchmark::smoke_params(technologies),
            &cli.ledger,
            config,
        ),
        Commands::Latest { n, export } => {
            commands::latest::execute(&cli.ledger, n, export.as_deref())
        }
        Commands::Summary { all } => commands::summary::execute(&cli.ledger, all),
        Commands::Generate {
            shape,
            output,
            rows,
            seed,
            file_count,
        } => commands::generate::execute(shape, rows, seed, &output, file_count),
        Commands::Check => commands::check::execute(config),
    };
    if let Err(err) = &result {
        tracing::error!(error = %format!("{err:#}"), "Command failed");
    }
    result
}
