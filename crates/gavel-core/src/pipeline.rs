//! Search, baseline, and summary pipelines behind the CLI.

use std::path::{Path, PathBuf};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};

use atp::{AtpError, AtpPool};
use graphs::{GraphReader, GraphWriter};
use search::{run_episode, EpisodeReport, RandomPolicy, SearchError, TreeSearch};

use crate::config::{apply_atp_overrides, load_gavel_toml};
use crate::results::BaselineReport;

/// Arguments for the `search` subcommand.
#[derive(Debug)]
pub struct SearchArgs {
    /// Path to the gavel config TOML file.
    pub config: Option<PathBuf>,
    /// Problem files, or directories scanned for `.p` files.
    pub problems: Vec<PathBuf>,
    /// Path for the output graph Parquet file.
    pub output: PathBuf,
    /// Optional CLI override for the iteration budget.
    pub iterations: Option<u32>,
    /// Optional CLI override for the prover pool width.
    pub num_workers: Option<usize>,
    /// Optional CLI override for the prover deadline in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Arguments for the `baseline` subcommand.
#[derive(Debug)]
pub struct BaselineArgs {
    /// Path to the gavel config TOML file.
    pub config: Option<PathBuf>,
    /// Problem files, or directories scanned for `.p` files.
    pub problems: Vec<PathBuf>,
    /// Episodes to play, spread round-robin over the problems.
    pub episodes: usize,
    /// Optional CLI override for the step limit per episode.
    pub max_steps: Option<usize>,
    /// Episodes in flight at once.
    pub concurrency: usize,
    /// Path for the JSON report.
    pub output: Option<PathBuf>,
    /// Seed for reproducible runs; each episode offsets it by its index.
    pub seed: Option<u64>,
}

/// Arguments for the `summary` subcommand.
#[derive(Debug)]
pub struct SummaryArgs {
    /// Path to the graph Parquet file.
    pub input: PathBuf,
}

/// One row of the per-problem summary table.
struct SearchRow {
    problem: String,
    proved: bool,
    iterations: u32,
    tree_size: usize,
    records: usize,
}

/// Run MCTS over each problem and write the exported graphs to Parquet.
pub async fn run_search(args: SearchArgs) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut toml = load_gavel_toml(args.config.as_deref())?;
    apply_atp_overrides(&mut toml.atp, args.num_workers, args.timeout_ms);
    if let Some(iterations) = args.iterations {
        toml.search.iterations = iterations;
    }

    let problems = collect_problems(&args.problems)?;
    anyhow::ensure!(!problems.is_empty(), "no problem files found");
    tracing::info!(count = problems.len(), "Loaded problems");

    let pool = AtpPool::new(toml.atp)?;
    let mut writer = GraphWriter::new(args.output.clone());
    let mut rows: Vec<SearchRow> = Vec::new();

    let pb = progress_bar(problems.len() as u64);
    for problem in &problems {
        pb.set_message(problem.display().to_string());
        match TreeSearch::new(&pool, problem, toml.search.clone()).await {
            Ok(mut tree) => {
                let iterations = tree.run().await;
                let mut records = 0;
                match tree.export() {
                    Ok(exported) => {
                        records = exported.len();
                        writer.record_all(exported);
                    }
                    Err(error) => {
                        tracing::warn!(problem = tree.problem(), %error, "Export failed");
                    }
                }
                if tree.proved() {
                    tracing::info!(
                        problem = tree.problem(),
                        iterations,
                        tree_size = tree.root().tree_size(),
                        "Proved"
                    );
                }
                rows.push(SearchRow {
                    problem: tree.problem().to_string(),
                    proved: tree.proved(),
                    iterations,
                    tree_size: tree.root().tree_size(),
                    records,
                });
            }
            // The conjectures refute on their own: nothing to search.
            Err(SearchError::Atp(AtpError::ProvedIt)) => {
                rows.push(SearchRow {
                    problem: problem_label(problem),
                    proved: true,
                    iterations: 0,
                    tree_size: 1,
                    records: 0,
                });
            }
            Err(error) => {
                tracing::warn!(problem = %problem.display(), %error, "Search failed, skipping");
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("done");

    let record_count = writer.len();
    writer.finish()?;

    let proved_count = rows.iter().filter(|row| row.proved).count();
    println!("\n--- Search Summary ---");
    println!(
        "{:<28} {:>7} {:>11} {:>9} {:>8}",
        "problem", "proved", "iterations", "tree", "records"
    );
    for row in &rows {
        println!(
            "{:<28} {:>7} {:>11} {:>9} {:>8}",
            row.problem, row.proved, row.iterations, row.tree_size, row.records
        );
    }
    println!("Proved: {proved_count}/{}", problems.len());
    println!("Records: {record_count}");
    println!("Output: {}", args.output.display());
    println!("Elapsed: {:.1}s", start.elapsed().as_secs_f64());

    Ok(())
}

/// Play random-policy episodes with bounded concurrency over one shared
/// prover pool, then print and optionally write the aggregate report.
pub async fn run_baseline(args: BaselineArgs) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut toml = load_gavel_toml(args.config.as_deref())?;
    if let Some(max_steps) = args.max_steps {
        toml.search.episode_steps = max_steps;
    }
    let max_steps = toml.search.episode_steps;

    let problems = collect_problems(&args.problems)?;
    anyhow::ensure!(!problems.is_empty(), "no problem files found");
    tracing::info!(
        problems = problems.len(),
        episodes = args.episodes,
        max_steps,
        "Starting baseline"
    );

    let pool = AtpPool::new(toml.atp)?;
    let pool = &pool;

    let pb = progress_bar(args.episodes as u64);
    let reports: Vec<EpisodeReport> = stream::iter(0..args.episodes)
        .map(|i| {
            let problem = problems[i % problems.len()].clone();
            let seed = args.seed.map(|seed| seed.wrapping_add(i as u64));
            let pb = pb.clone();
            async move {
                let mut policy = match seed {
                    Some(seed) => RandomPolicy::new(seed),
                    None => RandomPolicy::from_entropy(),
                };
                let report = run_episode(pool, &problem, &mut policy, max_steps).await;
                pb.inc(1);
                report
            }
        })
        .buffer_unordered(args.concurrency.max(1))
        .collect()
        .await;
    pb.finish_with_message("done");

    let report = BaselineReport::from_episodes(max_steps, reports);

    println!("\n--- Baseline Summary ---");
    println!("Episodes: {}", report.episodes);
    println!("Proved: {} ({:.1}%)", report.proved, report.prove_rate * 100.0);
    for (outcome, count) in report.outcome_counts() {
        println!("  {outcome:?}: {count}");
    }
    println!("Mean total reward: {:.3}", report.mean_total);
    println!("Median total reward: {:.3}", report.median_total);
    println!("Mean steps: {:.1}", report.mean_steps);
    if let Some(output) = &args.output {
        std::fs::write(output, serde_json::to_string_pretty(&report)?)?;
        println!("Report: {}", output.display());
    }
    println!("Elapsed: {:.1}s", start.elapsed().as_secs_f64());

    Ok(())
}

/// Print statistics from a graph Parquet file.
pub fn run_summary(args: SummaryArgs) -> anyhow::Result<()> {
    let summary = GraphReader::read_summary(&args.input)?;

    println!("--- Graph Summary ---");
    println!("File: {}", args.input.display());
    println!("Total records: {}", summary.total_records);
    println!("Unique problems: {}", summary.unique_problems);
    println!("Total nodes: {}", summary.total_nodes);
    println!("Total edges: {}", summary.total_edges);
    println!("Total actions: {}", summary.total_actions);
    if summary.total_records > 0 {
        println!(
            "Avg nodes/record: {:.1}",
            summary.total_nodes as f64 / summary.total_records as f64
        );
        println!(
            "Avg actions/record: {:.1}",
            summary.total_actions as f64 / summary.total_records as f64
        );
    }

    let records = GraphReader::read_all(&args.input)?;
    let labels = records.iter().flat_map(|record| record.y.iter().copied());
    let (min, max) = labels.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
        (lo.min(y), hi.max(y))
    });
    if min.is_finite() {
        println!("Label range: [{min:.3}, {max:.3}]");
    }

    Ok(())
}

fn progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .expect("valid progress bar template")
            .progress_chars("=> "),
    );
    pb
}

fn problem_label(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Expand the argument list: files pass through, directories contribute
/// their `.p` and `.tptp` entries. Sorted for stable ordering.
fn collect_problems(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut problems = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in std::fs::read_dir(path)? {
                let entry = entry?.path();
                let ext = entry.extension().and_then(|ext| ext.to_str());
                if matches!(ext, Some("p" | "tptp")) {
                    problems.push(entry);
                }
            }
        } else {
            problems.push(path.clone());
        }
    }
    problems.sort();
    Ok(problems)
}
