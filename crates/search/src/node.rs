//! The MCTS tree over clause-selection states.
//!
//! Every node prices its proof state through the oracle at construction
//! and discovers its candidate moves with one bounded inference round.
//! Nodes are owned exclusively by their parent; child proof states are
//! derived on the way down rather than stored, so memory grows with the
//! tree, not with state size times tree size.

use atp::{AtpError, Clause};
use futures::future::BoxFuture;
use futures::stream::{self, StreamExt};
use ordered_float::OrderedFloat;

use crate::oracle::Oracle;

/// Decay applied when a child's best score is pulled up during backup.
const SCORE_DECAY: f64 = 0.99;

/// One node of the search tree.
///
/// `raw_score` is relative to `baseline` (the root state's cost): positive
/// means cheaper than the root, `+baseline` a refutation, `-baseline` a
/// crashed or timed-out branch.
#[derive(Debug)]
pub struct Node {
    baseline: f64,
    raw_score: f64,
    visits: u32,
    closed: bool,
    /// Candidate moves: remaining axioms first, then inferred lemmas.
    inferences: Vec<Clause>,
    /// One child per inference once expanded; `None` until then.
    children: Option<Vec<Node>>,
}

/// Proof state of the child reached by selecting `inference`: every
/// occurrence of the chosen clause leaves the remaining axioms, and the
/// clause is appended to the selected set. Inferred lemmas are absent
/// from `axioms` by construction, so selecting one only grows `selected`.
pub(crate) fn derive_child_state(
    axioms: &[Clause],
    selected: &[Clause],
    inference: &Clause,
) -> (Vec<Clause>, Vec<Clause>) {
    let child_axioms = axioms
        .iter()
        .filter(|axiom| *axiom != inference)
        .cloned()
        .collect();
    let mut child_selected = selected.to_vec();
    child_selected.push(inference.clone());
    (child_axioms, child_selected)
}

impl Node {
    /// Evaluates one proof state into a node: price the state, then run
    /// one inference round to discover candidate moves.
    ///
    /// Total: every oracle failure folds into a closed node. A
    /// refutation closes at `+baseline`; a crash or timeout closes at
    /// `-baseline` with no candidates.
    pub async fn build(
        oracle: &dyn Oracle,
        axioms: &[Clause],
        selected: &[Clause],
        extras: &[Clause],
        baseline: f64,
    ) -> Node {
        let cost = match oracle.score(axioms, selected, extras).await {
            Ok(cost) => cost,
            Err(AtpError::ProvedIt) => return Node::closed_leaf(baseline, baseline),
            Err(error) => {
                tracing::debug!(%error, "scoring failed; closing branch");
                return Node::closed_leaf(baseline, -baseline);
            }
        };
        let inferred = match oracle.infer(selected, extras).await {
            Ok(inferred) => inferred,
            Err(AtpError::ProvedIt) => return Node::closed_leaf(baseline, baseline),
            Err(error) => {
                tracing::debug!(%error, "inference failed; closing branch");
                return Node::closed_leaf(baseline, -baseline);
            }
        };
        let mut inferences = axioms.to_vec();
        inferences.extend(inferred);
        Node {
            baseline,
            raw_score: baseline - cost,
            visits: 1,
            closed: false,
            inferences,
            children: None,
        }
    }

    fn closed_leaf(baseline: f64, raw_score: f64) -> Node {
        Node {
            baseline,
            raw_score,
            visits: 1,
            closed: true,
            inferences: Vec::new(),
            children: None,
        }
    }

    /// Index of the most promising open child by UCT. Requires a prior
    /// `expand`; ties break toward the lowest index.
    pub fn select_child(&self) -> usize {
        let children = self
            .children
            .as_deref()
            .expect("select_child before expand");
        let ln_parent = f64::from(self.visits).ln();
        let mut best_index = 0;
        let mut best = f64::NEG_INFINITY;
        for (index, child) in children.iter().enumerate() {
            let uct = if child.closed {
                f64::NEG_INFINITY
            } else {
                child.score() + (2.0 * ln_parent / f64::from(child.visits)).sqrt()
            };
            if uct > best {
                best = uct;
                best_index = index;
            }
        }
        best_index
    }

    /// Builds one child per candidate inference, concurrently up to the
    /// oracle's width, stored in candidate order regardless of
    /// completion order. A node with no candidates closes here — not at
    /// construction.
    pub async fn expand(
        &mut self,
        oracle: &dyn Oracle,
        axioms: &[Clause],
        selected: &[Clause],
        extras: &[Clause],
    ) {
        debug_assert!(self.children.is_none(), "expand on an expanded node");
        let baseline = self.baseline;
        let width = oracle.width().max(1);
        let children: Vec<Node> = stream::iter(self.inferences.clone())
            .map(|inference| {
                let (child_axioms, child_selected) =
                    derive_child_state(axioms, selected, &inference);
                async move {
                    Node::build(oracle, &child_axioms, &child_selected, extras, baseline).await
                }
            })
            .buffered(width)
            .collect()
            .await;
        if children.is_empty() {
            self.closed = true;
        }
        self.children = Some(children);
    }

    /// Backup pass: bumps the visit count, pulls the decayed best child
    /// score into `raw_score`, and closes the node once every child is
    /// closed. With an empty child list the score is left unchanged and
    /// closure stands (vacuous conjunction).
    pub fn update(&mut self) {
        self.visits += 1;
        if let Some(children) = self.children.as_deref() {
            if let Some(best) = children
                .iter()
                .map(|child| OrderedFloat(child.raw_score))
                .max()
            {
                self.raw_score = SCORE_DECAY * best.into_inner();
            }
            self.closed = children.iter().all(|child| child.closed);
        }
    }

    /// One MCTS iteration from this node's proof state: expand a leaf,
    /// or descend into the UCT-selected child with the derived state,
    /// then back up.
    pub fn step<'a>(
        &'a mut self,
        oracle: &'a dyn Oracle,
        axioms: Vec<Clause>,
        selected: Vec<Clause>,
        extras: &'a [Clause],
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            if self.children.is_none() {
                self.expand(oracle, &axioms, &selected, extras).await;
            } else {
                let index = self.select_child();
                let inference = self.inferences[index].clone();
                let (child_axioms, child_selected) =
                    derive_child_state(&axioms, &selected, &inference);
                if let Some(children) = self.children.as_mut() {
                    children[index]
                        .step(oracle, child_axioms, child_selected, extras)
                        .await;
                }
            }
            self.update();
        })
    }

    /// Relative score in `[-1, 1]` for a positive baseline.
    pub fn score(&self) -> f64 {
        self.raw_score / self.baseline
    }

    pub fn raw_score(&self) -> f64 {
        self.raw_score
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn visits(&self) -> u32 {
        self.visits
    }

    pub fn closed(&self) -> bool {
        self.closed
    }

    pub fn inferences(&self) -> &[Clause] {
        &self.inferences
    }

    pub fn children(&self) -> Option<&[Node]> {
        self.children.as_deref()
    }

    /// True for a node closed by a refutation. Exact comparison is
    /// sound: `raw_score` is assigned `baseline` verbatim at
    /// construction and backup never touches childless nodes.
    pub fn is_proof(&self) -> bool {
        self.closed && self.children.is_none() && self.raw_score == self.baseline
    }

    /// Whether any node of this subtree closed on a refutation.
    pub fn subtree_has_proof(&self) -> bool {
        self.is_proof()
            || self
                .children
                .as_deref()
                .unwrap_or_default()
                .iter()
                .any(Node::subtree_has_proof)
    }

    /// Nodes in this subtree, this one included.
    pub fn tree_size(&self) -> usize {
        1 + self
            .children
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(Node::tree_size)
            .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{axiom, conjecture, MockOracle};

    const BASELINE: f64 = 100.0;

    fn open_leaf(raw_score: f64, visits: u32, inferences: Vec<Clause>) -> Node {
        Node {
            baseline: BASELINE,
            raw_score,
            visits,
            closed: false,
            inferences,
            children: None,
        }
    }

    fn closed_child(raw_score: f64) -> Node {
        Node::closed_leaf(BASELINE, raw_score)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[tokio::test]
    async fn build_prices_the_state_and_gathers_candidates() {
        let oracle = MockOracle::new();
        oracle.push_score(Ok(30.0));
        oracle.push_infer(Ok(vec![axiom("d")]));

        let axioms = vec![axiom("a"), axiom("b")];
        let selected = vec![conjecture("~n")];
        let node = Node::build(&oracle, &axioms, &selected, &[], BASELINE).await;

        assert_close(node.raw_score(), 70.0);
        assert_close(node.score(), 0.7);
        assert_eq!(node.visits(), 1);
        assert!(!node.closed());
        assert_eq!(node.inferences(), &[axiom("a"), axiom("b"), axiom("d")]);
        assert!(node.children().is_none());
    }

    #[tokio::test]
    async fn build_closes_at_plus_baseline_on_refutation() {
        let oracle = MockOracle::new();
        oracle.push_score(Err(AtpError::ProvedIt));

        let node = Node::build(&oracle, &[], &[], &[], BASELINE).await;
        assert!(node.closed());
        assert_close(node.raw_score(), BASELINE);
        assert!(node.inferences().is_empty());
        assert!(node.is_proof());

        // Refutation during the inference round closes the same way.
        let oracle = MockOracle::new();
        oracle.push_score(Ok(10.0));
        oracle.push_infer(Err(AtpError::ProvedIt));
        let node = Node::build(&oracle, &[], &[], &[], BASELINE).await;
        assert!(node.is_proof());
    }

    #[tokio::test]
    async fn build_closes_at_minus_baseline_on_crash_or_timeout() {
        let oracle = MockOracle::new();
        oracle.push_score(Err(AtpError::Crashed("exit status 1".into())));
        let node = Node::build(&oracle, &[axiom("a")], &[], &[], BASELINE).await;
        assert!(node.closed());
        assert_close(node.raw_score(), -BASELINE);
        assert!(node.inferences().is_empty());
        assert!(!node.is_proof());

        let oracle = MockOracle::new();
        oracle.push_score(Ok(5.0));
        oracle.push_infer(Err(AtpError::Timeout(300)));
        let node = Node::build(&oracle, &[axiom("a")], &[], &[], BASELINE).await;
        assert!(node.closed());
        assert_close(node.raw_score(), -BASELINE);
    }

    #[test]
    fn select_child_breaks_ties_toward_the_lowest_index() {
        let mut parent = open_leaf(0.0, 2, vec![axiom("a"), axiom("b")]);
        parent.children = Some(vec![open_leaf(50.0, 1, vec![]), open_leaf(50.0, 1, vec![])]);
        assert_eq!(parent.select_child(), 0);
    }

    #[test]
    fn select_child_never_picks_a_closed_child() {
        let mut parent = open_leaf(0.0, 2, vec![axiom("a"), axiom("b")]);
        parent.children = Some(vec![closed_child(99.0), open_leaf(-40.0, 1, vec![])]);
        assert_eq!(parent.select_child(), 1);
    }

    #[test]
    fn select_child_favors_the_underexplored() {
        // Child 0 scores better but has been visited five times; the
        // exploration term should pull selection to child 1.
        let mut parent = open_leaf(0.0, 6, vec![axiom("a"), axiom("b")]);
        parent.children = Some(vec![open_leaf(90.0, 5, vec![]), open_leaf(10.0, 1, vec![])]);
        assert_eq!(parent.select_child(), 1);
    }

    #[tokio::test]
    async fn expand_stores_children_in_candidate_order() {
        let oracle = MockOracle::new();
        // Child for candidate `a`, then for candidate `b`.
        oracle.push_score(Ok(10.0));
        oracle.push_infer(Ok(vec![]));
        oracle.push_score(Ok(20.0));
        oracle.push_infer(Ok(vec![]));

        let axioms = vec![axiom("a"), axiom("b")];
        let mut node = open_leaf(0.0, 1, axioms.clone());
        node.expand(&oracle, &axioms, &[conjecture("~n")], &[]).await;

        let children = node.children().unwrap();
        assert_eq!(children.len(), 2);
        assert_close(children[0].raw_score(), 90.0);
        assert_close(children[1].raw_score(), 80.0);
        assert!(!node.closed());
    }

    #[tokio::test]
    async fn expand_derives_disjoint_child_states() {
        let oracle = MockOracle::new();
        oracle.push_score(Ok(10.0));
        oracle.push_infer(Ok(vec![]));
        oracle.push_score(Ok(20.0));
        oracle.push_infer(Ok(vec![]));

        let axioms = vec![axiom("a"), axiom("b")];
        let selected = vec![conjecture("~n")];
        let mut node = open_leaf(0.0, 1, axioms.clone());
        node.expand(&oracle, &axioms, &selected, &[]).await;

        let calls = oracle.score_log();
        assert_eq!(calls.len(), 2);
        // Selecting `a` removes it from the remaining axioms and
        // appends it to the selected set.
        assert_eq!(calls[0].axioms, vec![axiom("b")]);
        assert_eq!(calls[0].selected, vec![conjecture("~n"), axiom("a")]);
        assert_eq!(calls[1].axioms, vec![axiom("a")]);
        assert_eq!(calls[1].selected, vec![conjecture("~n"), axiom("b")]);
    }

    #[tokio::test]
    async fn expand_with_no_candidates_closes_the_node() {
        let oracle = MockOracle::new();
        let mut node = open_leaf(35.0, 1, vec![]);
        node.expand(&oracle, &[], &[], &[]).await;

        assert!(node.closed());
        assert_eq!(node.children().map(<[Node]>::len), Some(0));
        // No oracle traffic for an empty candidate list.
        assert_eq!(oracle.score_log().len(), 0);
    }

    #[test]
    fn update_pulls_the_decayed_best_child_score() {
        let mut parent = open_leaf(0.0, 1, vec![axiom("a"), axiom("b")]);
        parent.children = Some(vec![open_leaf(50.0, 1, vec![]), open_leaf(80.0, 1, vec![])]);
        parent.update();

        assert_eq!(parent.visits(), 2);
        assert_close(parent.raw_score(), 0.99 * 80.0);
        assert!(!parent.closed());
    }

    #[test]
    fn update_with_an_empty_child_list_keeps_the_score() {
        let mut parent = open_leaf(35.0, 1, vec![]);
        parent.closed = true;
        parent.children = Some(vec![]);
        parent.update();

        assert_eq!(parent.visits(), 2);
        assert_close(parent.raw_score(), 35.0);
        assert!(parent.closed());
    }

    #[test]
    fn update_closes_only_when_every_child_is_closed() {
        let mut parent = open_leaf(0.0, 1, vec![axiom("a"), axiom("b")]);
        parent.children = Some(vec![closed_child(-100.0), open_leaf(10.0, 1, vec![])]);
        parent.update();
        assert!(!parent.closed());

        parent.children = Some(vec![closed_child(-100.0), closed_child(100.0)]);
        parent.update();
        assert!(parent.closed());
    }

    #[tokio::test]
    async fn step_expands_a_leaf_and_backs_up() {
        let oracle = MockOracle::new();
        oracle.push_score(Ok(40.0));
        oracle.push_infer(Ok(vec![]));

        let axioms = vec![axiom("a")];
        let selected = vec![conjecture("~n")];
        let mut root = open_leaf(0.0, 1, axioms.clone());
        root.step(&oracle, axioms, selected, &[]).await;

        assert_eq!(root.visits(), 2);
        assert_eq!(root.children().map(<[Node]>::len), Some(1));
        assert_close(root.raw_score(), 0.99 * 60.0);
    }

    #[tokio::test]
    async fn step_descends_into_the_selected_child() {
        let oracle = MockOracle::new();
        // The descent expands child 0, whose only candidate is `x`.
        oracle.push_score(Ok(50.0));
        oracle.push_infer(Ok(vec![]));

        let axioms = vec![axiom("a"), axiom("b")];
        let mut root = open_leaf(0.0, 2, axioms.clone());
        root.children = Some(vec![
            open_leaf(90.0, 1, vec![axiom("x")]),
            open_leaf(10.0, 1, vec![]),
        ]);

        root.step(&oracle, axioms, vec![conjecture("~n")], &[]).await;

        let children = root.children().unwrap();
        assert_eq!(children[0].visits(), 2);
        assert!(children[0].children().is_some());
        assert_eq!(children[1].visits(), 1);
        // Child 0 backed up its grandchild (100 - 50 decayed), and the
        // root pulled the decayed best child.
        assert_close(children[0].raw_score(), 0.99 * 50.0);
        assert_close(root.raw_score(), 0.99 * 0.99 * 50.0);
    }

    #[tokio::test]
    async fn closure_propagates_to_the_root() {
        let oracle = MockOracle::new();
        // Both children crash at construction.
        oracle.push_score(Err(AtpError::Crashed("boom".into())));
        oracle.push_score(Err(AtpError::Crashed("boom".into())));

        let axioms = vec![axiom("a"), axiom("b")];
        let mut root = open_leaf(0.0, 1, axioms.clone());
        root.step(&oracle, axioms, vec![], &[]).await;

        assert!(root.closed());
        assert_close(root.raw_score(), 0.99 * -BASELINE);
    }

    #[test]
    fn tree_size_counts_every_node() {
        let mut root = open_leaf(0.0, 1, vec![axiom("a"), axiom("b")]);
        let mut left = open_leaf(1.0, 1, vec![]);
        left.children = Some(vec![closed_child(0.0)]);
        root.children = Some(vec![left, closed_child(0.0)]);

        assert_eq!(root.tree_size(), 4);
    }

    #[test]
    fn subtree_has_proof_finds_a_buried_refutation() {
        let mut root = open_leaf(0.0, 1, vec![axiom("a")]);
        let mut child = open_leaf(1.0, 1, vec![]);
        child.children = Some(vec![closed_child(BASELINE)]);
        root.children = Some(vec![child]);

        assert!(!root.is_proof());
        assert!(root.subtree_has_proof());

        let mut unlucky = open_leaf(0.0, 1, vec![axiom("a")]);
        unlucky.children = Some(vec![closed_child(-BASELINE)]);
        assert!(!unlucky.subtree_has_proof());
    }
}
