//! Single-trajectory clause-selection environment.
//!
//! Holds the selected clause set and the currently available actions,
//! applies one selection per step, and refreshes score and candidates
//! through the oracle. Rewards are normalized by the initial score so
//! trajectories from different problems are comparable.

use std::path::Path;

use atp::{AtpError, Clause};

use crate::oracle::Oracle;

/// Where a trajectory currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Actions remain and no terminal event has occurred.
    Active,
    /// The prover refuted the selected set: the episode is won.
    Proved,
    /// No actions remain to select.
    Exhausted,
    /// The oracle crashed or timed out; the trajectory is abandoned.
    Failed,
}

/// Short display name for a problem file (its stem).
pub(crate) fn problem_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub struct Environment<'a> {
    oracle: &'a dyn Oracle,
    problem: String,
    actions: Vec<Clause>,
    selected: Vec<Clause>,
    extras: Vec<Clause>,
    /// Boundary index: `actions[..axioms_available]` are original
    /// axioms, the tail is inferred lemmas. Only ever decreases.
    axioms_available: usize,
    initial: f64,
    score: f64,
    status: Status,
}

impl std::fmt::Debug for Environment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("problem", &self.problem)
            .field("actions", &self.actions)
            .field("selected", &self.selected)
            .field("extras", &self.extras)
            .field("axioms_available", &self.axioms_available)
            .field("initial", &self.initial)
            .field("score", &self.score)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<'a> Environment<'a> {
    /// Clausifies the problem and establishes the starting state: the
    /// axioms become the action list and the negated conjectures the
    /// selected set. One inference round appends derivable lemmas, then
    /// the state is scored to fix the normalizing denominator.
    ///
    /// Any oracle failure — including `ProvedIt`, when the conjectures
    /// are refutable on their own — surfaces as a construction error.
    pub async fn new(oracle: &'a dyn Oracle, problem: &Path) -> Result<Environment<'a>, AtpError> {
        let clausified = oracle.clausify(problem).await?;
        let axioms_available = clausified.axioms.len();
        let mut env = Environment {
            oracle,
            problem: problem_name(problem),
            actions: clausified.axioms,
            selected: clausified.conjectures,
            extras: clausified.extras,
            axioms_available,
            initial: 0.0,
            score: 0.0,
            status: Status::Active,
        };
        env.refresh_actions().await?;
        env.refresh_score().await?;
        env.initial = env.score;
        if env.actions.is_empty() {
            env.status = Status::Exhausted;
        }
        tracing::debug!(
            problem = %env.problem,
            axioms = env.axioms_available,
            actions = env.actions.len(),
            initial = env.initial,
            "Environment ready"
        );
        Ok(env)
    }

    /// Moves `actions[index]` into the selected set, refreshes actions
    /// and score, and returns the normalized score drop as the reward.
    ///
    /// Terminal oracle outcomes (`ProvedIt`, `Timeout`, `Crashed`)
    /// propagate as errors exactly once and move the environment out of
    /// `Active`; calling again afterwards is a caller bug and panics,
    /// as is an out-of-range index.
    pub async fn perform_action(&mut self, index: usize) -> Result<f64, AtpError> {
        assert_eq!(
            self.status,
            Status::Active,
            "perform_action on a terminal environment"
        );
        assert!(
            index < self.actions.len(),
            "action index {index} out of range ({} available)",
            self.actions.len()
        );
        let old_score = self.score;
        let clause = self.actions.remove(index);
        self.selected.push(clause);
        if index < self.axioms_available {
            self.axioms_available -= 1;
        }
        if let Err(error) = self.refresh().await {
            self.status = match error {
                AtpError::ProvedIt => Status::Proved,
                _ => Status::Failed,
            };
            return Err(error);
        }
        if self.actions.is_empty() {
            self.status = Status::Exhausted;
        }
        Ok((old_score - self.score) / self.initial)
    }

    async fn refresh(&mut self) -> Result<(), AtpError> {
        self.refresh_actions().await?;
        self.refresh_score().await
    }

    /// Replaces the inferred tail of the action list with a fresh
    /// inference round; the original-axiom prefix stays put.
    async fn refresh_actions(&mut self) -> Result<(), AtpError> {
        let inferred = self.oracle.infer(&self.selected, &self.extras).await?;
        self.actions.truncate(self.axioms_available);
        self.actions.extend(inferred);
        Ok(())
    }

    async fn refresh_score(&mut self) -> Result<(), AtpError> {
        self.score = self
            .oracle
            .score(
                &self.actions[..self.axioms_available],
                &self.selected,
                &self.extras,
            )
            .await?;
        Ok(())
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn problem(&self) -> &str {
        &self.problem
    }

    pub fn available_actions(&self) -> &[Clause] {
        &self.actions
    }

    pub fn selected(&self) -> &[Clause] {
        &self.selected
    }

    pub fn extras(&self) -> &[Clause] {
        &self.extras
    }

    pub fn axioms_available(&self) -> usize {
        self.axioms_available
    }

    pub fn current_score(&self) -> f64 {
        self.score
    }

    pub fn initial_score(&self) -> f64 {
        self.initial
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use atp::Clausified;

    use super::*;
    use crate::mocks::{axiom, conjecture, MockOracle};

    fn problem() -> PathBuf {
        PathBuf::from("/problems/puz001.p")
    }

    fn abc_clausified() -> Clausified {
        Clausified {
            axioms: vec![axiom("a"), axiom("b"), axiom("c")],
            conjectures: vec![conjecture("~n")],
            extras: vec![],
        }
    }

    #[tokio::test]
    async fn construction_seeds_selected_and_appends_lemmas() {
        let oracle = MockOracle::new();
        oracle.push_clausify(Ok(abc_clausified()));
        oracle.push_infer(Ok(vec![axiom("d"), axiom("e")]));
        oracle.push_score(Ok(100.0));

        let env = Environment::new(&oracle, &problem()).await.unwrap();
        assert_eq!(env.problem(), "puz001");
        assert_eq!(env.selected(), &[conjecture("~n")]);
        assert_eq!(env.axioms_available(), 3);
        assert_eq!(
            env.available_actions(),
            &[axiom("a"), axiom("b"), axiom("c"), axiom("d"), axiom("e")]
        );
        assert_eq!(env.initial_score(), 100.0);
        assert_eq!(env.status(), Status::Active);
    }

    #[tokio::test]
    async fn construction_surfaces_proved_it() {
        let oracle = MockOracle::new();
        oracle.push_clausify(Ok(abc_clausified()));
        oracle.push_infer(Err(AtpError::ProvedIt));

        let err = Environment::new(&oracle, &problem()).await.unwrap_err();
        assert!(matches!(err, AtpError::ProvedIt));
    }

    #[tokio::test]
    async fn perform_action_moves_clause_and_normalizes_reward() {
        let oracle = MockOracle::new();
        oracle.push_clausify(Ok(abc_clausified()));
        oracle.push_infer(Ok(vec![axiom("d"), axiom("e")]));
        oracle.push_score(Ok(100.0));

        let mut env = Environment::new(&oracle, &problem()).await.unwrap();

        oracle.push_infer(Ok(vec![axiom("f")]));
        oracle.push_score(Ok(80.0));
        let reward = env.perform_action(0).await.unwrap();

        assert_eq!(reward, 0.2);
        assert_eq!(env.selected(), &[conjecture("~n"), axiom("a")]);
        assert_eq!(env.axioms_available(), 2);
        // Inferred tail (d, e) was replaced by the fresh round (f).
        assert_eq!(
            env.available_actions(),
            &[axiom("b"), axiom("c"), axiom("f")]
        );
        assert_eq!(env.status(), Status::Active);
    }

    #[tokio::test]
    async fn selecting_a_lemma_keeps_the_axiom_boundary() {
        let oracle = MockOracle::new();
        oracle.push_clausify(Ok(abc_clausified()));
        oracle.push_infer(Ok(vec![axiom("d")]));
        oracle.push_score(Ok(50.0));

        let mut env = Environment::new(&oracle, &problem()).await.unwrap();

        // Select the lemma `d` at index 3, past the boundary.
        oracle.push_infer(Ok(vec![]));
        oracle.push_score(Ok(40.0));
        let reward = env.perform_action(3).await.unwrap();

        assert_eq!(reward, 0.2);
        assert_eq!(env.axioms_available(), 3);
        assert_eq!(env.available_actions(), &[axiom("a"), axiom("b"), axiom("c")]);
    }

    #[tokio::test]
    async fn timeout_fails_the_trajectory() {
        let oracle = MockOracle::new();
        oracle.push_clausify(Ok(abc_clausified()));
        oracle.push_infer(Ok(vec![]));
        oracle.push_score(Ok(100.0));

        let mut env = Environment::new(&oracle, &problem()).await.unwrap();

        oracle.push_infer(Err(AtpError::Timeout(300)));
        let err = env.perform_action(0).await.unwrap_err();
        assert!(matches!(err, AtpError::Timeout(_)));
        assert_eq!(env.status(), Status::Failed);
    }

    #[tokio::test]
    async fn proof_during_a_step_marks_the_environment_proved() {
        let oracle = MockOracle::new();
        oracle.push_clausify(Ok(abc_clausified()));
        oracle.push_infer(Ok(vec![]));
        oracle.push_score(Ok(100.0));

        let mut env = Environment::new(&oracle, &problem()).await.unwrap();

        oracle.push_infer(Err(AtpError::ProvedIt));
        let err = env.perform_action(1).await.unwrap_err();
        assert!(matches!(err, AtpError::ProvedIt));
        assert_eq!(env.status(), Status::Proved);
    }

    #[tokio::test]
    #[should_panic(expected = "terminal environment")]
    async fn reusing_a_failed_environment_panics() {
        let oracle = MockOracle::new();
        oracle.push_clausify(Ok(abc_clausified()));
        oracle.push_infer(Ok(vec![]));
        oracle.push_score(Ok(100.0));

        let mut env = Environment::new(&oracle, &problem()).await.unwrap();

        oracle.push_infer(Err(AtpError::Crashed("boom".into())));
        let _ = env.perform_action(0).await;
        let _ = env.perform_action(0).await;
    }

    #[tokio::test]
    #[should_panic(expected = "out of range")]
    async fn out_of_range_index_panics() {
        let oracle = MockOracle::new();
        oracle.push_clausify(Ok(abc_clausified()));
        oracle.push_infer(Ok(vec![]));
        oracle.push_score(Ok(100.0));

        let mut env = Environment::new(&oracle, &problem()).await.unwrap();
        let _ = env.perform_action(10).await;
    }

    #[tokio::test]
    async fn consuming_the_last_action_exhausts_the_environment() {
        let oracle = MockOracle::new();
        oracle.push_clausify(Ok(Clausified {
            axioms: vec![axiom("a")],
            conjectures: vec![conjecture("~n")],
            extras: vec![],
        }));
        oracle.push_infer(Ok(vec![]));
        oracle.push_score(Ok(100.0));

        let mut env = Environment::new(&oracle, &problem()).await.unwrap();

        oracle.push_infer(Ok(vec![]));
        oracle.push_score(Ok(60.0));
        let reward = env.perform_action(0).await.unwrap();
        assert_eq!(reward, 0.4);
        assert_eq!(env.status(), Status::Exhausted);
        assert!(env.available_actions().is_empty());
    }
}
