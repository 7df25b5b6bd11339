mod config;
mod pipeline;
pub mod results;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pipeline::{BaselineArgs, SearchArgs, SummaryArgs};

/// gavel: clause-selection search over an external saturation prover.
#[derive(Parser)]
#[command(name = "gavel", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands for tree search, random baselines, and record inspection.
#[derive(Subcommand)]
enum Command {
    /// Run MCTS over problem files and export training graphs to Parquet.
    Search {
        /// Path to a gavel config TOML file ([atp] and [search] sections).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Problem files, or directories scanned for .p/.tptp files.
        #[arg(long, required = true, num_args = 1..)]
        problems: Vec<PathBuf>,
        /// Path for the output graph Parquet file.
        #[arg(long)]
        output: PathBuf,
        /// Override the iteration budget per problem.
        #[arg(long)]
        iterations: Option<u32>,
        /// Override the number of concurrent prover processes.
        #[arg(long)]
        num_workers: Option<usize>,
        /// Override the prover deadline in milliseconds.
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Play random-policy episodes and report outcome statistics.
    Baseline {
        /// Path to a gavel config TOML file ([atp] and [search] sections).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Problem files, or directories scanned for .p/.tptp files.
        #[arg(long, required = true, num_args = 1..)]
        problems: Vec<PathBuf>,
        /// Number of episodes to play.
        #[arg(long, default_value_t = 256)]
        episodes: usize,
        /// Override the step limit per episode.
        #[arg(long)]
        max_steps: Option<usize>,
        /// Number of episodes in flight at once.
        #[arg(long, default_value_t = 8)]
        concurrency: usize,
        /// Path to write the JSON report.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Seed for reproducible runs.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print statistics from a graph Parquet file.
    Summary {
        /// Path to the graph Parquet file.
        #[arg(long)]
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Search {
            config,
            problems,
            output,
            iterations,
            num_workers,
            timeout_ms,
        } => {
            pipeline::run_search(SearchArgs {
                config,
                problems,
                output,
                iterations,
                num_workers,
                timeout_ms,
            })
            .await
        }
        Command::Baseline {
            config,
            problems,
            episodes,
            max_steps,
            concurrency,
            output,
            seed,
        } => {
            pipeline::run_baseline(BaselineArgs {
                config,
                problems,
                episodes,
                max_steps,
                concurrency,
                output,
                seed,
            })
            .await
        }
        Command::Summary { input } => pipeline::run_summary(SummaryArgs { input }),
    }
}
