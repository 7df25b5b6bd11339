//! Monte Carlo tree search over clause selections for one problem.

use std::path::Path;

use atp::Clause;
use graphs::GraphRecord;

use crate::config::SearchConfig;
use crate::environment::problem_name;
use crate::node::{derive_child_state, Node};
use crate::oracle::Oracle;

/// Errors that keep a search from starting or exporting.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The prover failed while preparing the root state.
    #[error("prover error: {0}")]
    Atp(#[from] atp::AtpError),
    /// A clause defeated the graph renderer during export.
    #[error("graph export error: {0}")]
    Export(#[from] graphs::GraphError),
}

/// One MCTS run over a clausified problem.
///
/// The root proof state (all axioms unselected, negated conjectures
/// selected) is fixed at construction; iterations grow a tree of
/// selection sequences below it. Once started, the search itself cannot
/// fail: oracle errors close branches instead of propagating.
pub struct TreeSearch<'a> {
    oracle: &'a dyn Oracle,
    problem: String,
    config: SearchConfig,
    axioms: Vec<Clause>,
    selected: Vec<Clause>,
    extras: Vec<Clause>,
    root: Node,
}

impl<'a> TreeSearch<'a> {
    /// Clausifies the problem, prices the root state to fix the
    /// baseline, and evaluates the root node.
    ///
    /// A scoring failure here is a construction error — including
    /// `ProvedIt`, when the conjectures refute on their own and there is
    /// nothing to search.
    pub async fn new(
        oracle: &'a dyn Oracle,
        problem: &Path,
        config: SearchConfig,
    ) -> Result<TreeSearch<'a>, SearchError> {
        let name = problem_name(problem);
        let clausified = oracle.clausify(problem).await?;
        let axioms = clausified.axioms;
        let selected = clausified.conjectures;
        let extras = clausified.extras;
        let baseline = oracle.score(&axioms, &selected, &extras).await?;
        tracing::info!(
            problem = %name,
            baseline,
            axioms = axioms.len(),
            conjectures = selected.len(),
            "tree search ready"
        );
        let root = Node::build(oracle, &axioms, &selected, &extras, baseline).await;
        Ok(TreeSearch {
            oracle,
            problem: name,
            config,
            axioms,
            selected,
            extras,
            root,
        })
    }

    /// Runs iterations up to the configured budget, stopping early once
    /// the root closes. Returns the number of iterations performed.
    pub async fn run(&mut self) -> u32 {
        let mut iterations = 0;
        while iterations < self.config.iterations {
            if self.root.closed() {
                tracing::info!(
                    problem = %self.problem,
                    iterations,
                    proved = self.proved(),
                    "root closed; stopping early"
                );
                break;
            }
            self.root
                .step(
                    self.oracle,
                    self.axioms.clone(),
                    self.selected.clone(),
                    &self.extras,
                )
                .await;
            iterations += 1;
            self.log_iteration(iterations);
        }
        iterations
    }

    fn log_iteration(&self, iteration: u32) {
        if iteration % 100 == 0 {
            tracing::info!(
                problem = %self.problem,
                iteration,
                tree_size = self.root.tree_size(),
                score = self.root.score(),
                "search progress"
            );
        }
        if tracing::enabled!(tracing::Level::DEBUG) {
            let children = self
                .root
                .children()
                .unwrap_or_default()
                .iter()
                .map(|child| {
                    format!(
                        "{:.3}/{}{}",
                        child.score(),
                        child.visits(),
                        if child.closed() { "x" } else { "" }
                    )
                })
                .collect::<Vec<_>>()
                .join(" ");
            tracing::debug!(problem = %self.problem, iteration, %children, "root children");
        }
    }

    /// Whether any explored branch closed on a refutation.
    pub fn proved(&self) -> bool {
        self.root.subtree_has_proof()
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn problem(&self) -> &str {
        &self.problem
    }

    /// Flattens the explored tree into training records: one per
    /// expanded node with children, labelling every candidate clause
    /// with its child's relative score, in candidate order.
    pub fn export(&self) -> Result<Vec<GraphRecord>, SearchError> {
        let mut records = Vec::new();
        self.collect_records(&self.root, &self.axioms, &self.selected, &mut records)?;
        tracing::debug!(
            problem = %self.problem,
            records = records.len(),
            "exported search tree"
        );
        Ok(records)
    }

    fn collect_records(
        &self,
        node: &Node,
        axioms: &[Clause],
        selected: &[Clause],
        records: &mut Vec<GraphRecord>,
    ) -> Result<(), SearchError> {
        let Some(children) = node.children() else {
            return Ok(());
        };
        if children.is_empty() {
            return Ok(());
        }
        let labels: Vec<f64> = children.iter().map(Node::score).collect();
        records.push(GraphRecord::build(
            &self.problem,
            selected,
            node.inferences(),
            &labels,
        )?);
        for (inference, child) in node.inferences().iter().zip(children) {
            let (child_axioms, child_selected) = derive_child_state(axioms, selected, inference);
            self.collect_records(child, &child_axioms, &child_selected, records)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use atp::{AtpError, Clausified};

    use super::*;
    use crate::mocks::{axiom, conjecture, MockOracle};

    fn problem() -> PathBuf {
        PathBuf::from("problems/pel47.p")
    }

    fn two_axiom_clausified() -> Clausified {
        Clausified {
            axioms: vec![axiom("p(a)"), axiom("q(a)")],
            conjectures: vec![conjecture("~r(a)")],
            extras: vec![],
        }
    }

    #[tokio::test]
    async fn construction_prices_the_root() {
        let oracle = MockOracle::new();
        oracle.push_clausify(Ok(two_axiom_clausified()));
        oracle.push_score(Ok(100.0)); // baseline
        oracle.push_score(Ok(40.0)); // root evaluation
        oracle.push_infer(Ok(vec![axiom("s(a)")]));

        let search = TreeSearch::new(&oracle, &problem(), SearchConfig::default())
            .await
            .unwrap();

        assert_eq!(search.problem(), "pel47");
        assert_eq!(search.root().baseline(), 100.0);
        assert_eq!(search.root().raw_score(), 60.0);
        assert_eq!(
            search.root().inferences(),
            &[axiom("p(a)"), axiom("q(a)"), axiom("s(a)")]
        );
        assert!(!search.proved());
    }

    #[tokio::test]
    async fn construction_fails_when_the_prover_rejects_the_problem() {
        let oracle = MockOracle::new();
        oracle.push_clausify(Err(AtpError::Crashed("parse error".into())));

        let error = TreeSearch::new(&oracle, &problem(), SearchConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(error, SearchError::Atp(AtpError::Crashed(_))));
    }

    #[tokio::test]
    async fn an_immediate_refutation_is_a_construction_error() {
        // The conjectures alone refute during baseline pricing.
        let oracle = MockOracle::new();
        oracle.push_clausify(Ok(two_axiom_clausified()));
        oracle.push_score(Err(AtpError::ProvedIt));

        let error = TreeSearch::new(&oracle, &problem(), SearchConfig::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(error, SearchError::Atp(AtpError::ProvedIt)));
    }

    #[tokio::test]
    async fn run_stops_when_the_root_closes() {
        let oracle = MockOracle::new();
        oracle.push_clausify(Ok(Clausified {
            axioms: vec![axiom("p(a)")],
            conjectures: vec![conjecture("~p(a)")],
            extras: vec![],
        }));
        oracle.push_score(Ok(100.0)); // baseline
        oracle.push_score(Ok(80.0)); // root evaluation
        oracle.push_infer(Ok(vec![]));
        // Expanding the single candidate finds the refutation.
        oracle.push_score(Err(AtpError::ProvedIt));

        let mut search = TreeSearch::new(&oracle, &problem(), SearchConfig::default())
            .await
            .unwrap();
        let iterations = search.run().await;

        assert_eq!(iterations, 1);
        assert!(search.root().closed());
        assert!(search.proved());
        assert_eq!(search.root().raw_score(), 0.99 * 100.0);
    }

    #[tokio::test]
    async fn run_honors_the_iteration_budget() {
        let mut oracle = MockOracle::new();
        oracle.set_default_score(50.0);
        oracle.set_default_infer(vec![]);
        oracle.push_clausify(Ok(two_axiom_clausified()));

        let config = SearchConfig {
            iterations: 3,
            ..SearchConfig::default()
        };
        let mut search = TreeSearch::new(&oracle, &problem(), config).await.unwrap();
        let iterations = search.run().await;

        assert_eq!(iterations, 3);
        assert!(!search.root().closed());
        assert_eq!(search.root().visits(), 4);
    }

    #[tokio::test]
    async fn export_labels_candidates_with_child_scores() {
        let oracle = MockOracle::new();
        oracle.push_clausify(Ok(two_axiom_clausified()));
        oracle.push_score(Ok(100.0)); // baseline
        oracle.push_score(Ok(40.0)); // root evaluation
        oracle.push_infer(Ok(vec![]));
        // Children of the root, in candidate order.
        oracle.push_score(Ok(10.0));
        oracle.push_infer(Ok(vec![]));
        oracle.push_score(Ok(20.0));
        oracle.push_infer(Ok(vec![]));

        let config = SearchConfig {
            iterations: 1,
            ..SearchConfig::default()
        };
        let mut search = TreeSearch::new(&oracle, &problem(), config).await.unwrap();
        assert_eq!(search.run().await, 1);

        let records = search.export().unwrap();
        // Only the root has children; both children are unexpanded.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].problem, "pel47");
        assert_eq!(records[0].y, vec![0.9, 0.8]);
        assert!(records[0].num_nodes() > 0);
        assert!(records[0].num_edges() > 0);
    }
}
