//! The training-record type shared by the writer and the reader.

use std::time::{SystemTime, UNIX_EPOCH};

use atp::Clause;

use crate::builder::GraphBuilder;
use crate::parse::ParseError;

#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{labels} labels for {actions} candidate actions")]
    LabelMismatch { labels: usize, actions: usize },
}

/// One training example: a proof state rendered as a term graph, plus
/// the relative score of each candidate action in that state.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRecord {
    /// Problem the state belongs to.
    pub problem: String,
    /// Node kinds in node-id order ([`crate::NodeKind`] discriminants).
    pub nodes: Vec<i32>,
    /// Edge source ids, parallel to `targets`.
    pub sources: Vec<i32>,
    /// Edge target ids.
    pub targets: Vec<i32>,
    /// Marker node ids: one per selected clause, then one per action.
    pub indices: Vec<i32>,
    /// Per-action labels, parallel to the action tail of `indices`.
    pub y: Vec<f64>,
    /// Unix time in milliseconds when the record was built.
    pub timestamp_ms: u64,
}

impl GraphRecord {
    /// Renders one proof state. `labels` must carry one score per
    /// candidate in `actions`.
    pub fn build(
        problem: &str,
        selected: &[Clause],
        actions: &[Clause],
        labels: &[f64],
    ) -> Result<Self, GraphError> {
        if labels.len() != actions.len() {
            return Err(GraphError::LabelMismatch {
                labels: labels.len(),
                actions: actions.len(),
            });
        }
        let mut builder = GraphBuilder::new();
        for clause in selected {
            builder.add_selected(clause)?;
        }
        for clause in actions {
            builder.add_action(clause)?;
        }
        let parts = builder.finish();
        Ok(GraphRecord {
            problem: problem.to_string(),
            nodes: parts.nodes,
            sources: parts.sources,
            targets: parts.targets,
            indices: parts.indices,
            y: labels.to_vec(),
            timestamp_ms: now_ms(),
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.sources.len()
    }
}

/// Aggregate statistics over a graph Parquet file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSummary {
    pub total_records: usize,
    pub unique_problems: usize,
    pub total_nodes: u64,
    pub total_edges: u64,
    /// Sum of candidate-action counts across all records.
    pub total_actions: u64,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
