//! Result types for baseline runs.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use search::{EpisodeReport, Outcome};

/// Aggregate of one `baseline` run, written as the JSON report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaselineReport {
    /// Unix time in milliseconds when the run finished.
    pub timestamp_ms: u64,
    /// Episodes played.
    pub episodes: usize,
    /// Step limit per episode.
    pub max_steps: usize,
    /// Episodes ending in a refutation.
    pub proved: usize,
    /// Fraction of episodes proved.
    pub prove_rate: f64,
    /// Mean reward total across episodes.
    pub mean_total: f64,
    /// Median reward total across episodes.
    pub median_total: f64,
    /// Mean selections per episode.
    pub mean_steps: f64,
    /// Per-episode reports, in completion order.
    pub per_episode: Vec<EpisodeReport>,
}

impl BaselineReport {
    pub fn from_episodes(max_steps: usize, per_episode: Vec<EpisodeReport>) -> Self {
        let episodes = per_episode.len();
        let proved = per_episode
            .iter()
            .filter(|episode| episode.outcome == Outcome::Proved)
            .count();
        let mut totals: Vec<f64> = per_episode.iter().map(|episode| episode.total).collect();
        let steps: usize = per_episode.iter().map(|episode| episode.steps).sum();
        let denominator = episodes.max(1) as f64;
        BaselineReport {
            timestamp_ms: now_ms(),
            episodes,
            max_steps,
            proved,
            prove_rate: proved as f64 / denominator,
            mean_total: totals.iter().sum::<f64>() / denominator,
            median_total: median(&mut totals),
            mean_steps: steps as f64 / denominator,
            per_episode,
        }
    }

    /// Episode counts per outcome, in declaration order, zeros skipped.
    pub fn outcome_counts(&self) -> Vec<(Outcome, usize)> {
        [
            Outcome::Proved,
            Outcome::TimedOut,
            Outcome::Crashed,
            Outcome::Exhausted,
            Outcome::StepLimit,
            Outcome::GaveUp,
        ]
        .into_iter()
        .filter_map(|outcome| {
            let count = self
                .per_episode
                .iter()
                .filter(|episode| episode.outcome == outcome)
                .count();
            (count > 0).then_some((outcome, count))
        })
        .collect()
    }
}

/// Median of a slice, 0.0 when empty. Sorts in place.
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
