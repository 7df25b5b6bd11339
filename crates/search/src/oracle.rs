//! The prover-facing seam of the search.

use std::path::Path;

use async_trait::async_trait;
use atp::{AtpError, AtpPool, Clause, Clausified};

/// Everything the search needs from the theorem prover.
///
/// [`AtpPool`] is the production implementation; tests swap in
/// [`crate::mocks::MockOracle`]. All three calls block the calling task
/// until the underlying process exits or its deadline fires.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Normalize a problem file into role-tagged clauses.
    async fn clausify(&self, problem: &Path) -> Result<Clausified, AtpError>;

    /// Price a proof state in prover instructions. Lower is better.
    async fn score(
        &self,
        axioms: &[Clause],
        selected: &[Clause],
        extras: &[Clause],
    ) -> Result<f64, AtpError>;

    /// One bounded inference round over the selected clauses, returning
    /// only clauses not already present in the input.
    async fn infer(&self, selected: &[Clause], extras: &[Clause])
        -> Result<Vec<Clause>, AtpError>;

    /// How many prover invocations may run at once. Tree expansion uses
    /// this as its concurrency bound.
    fn width(&self) -> usize;
}

#[async_trait]
impl Oracle for AtpPool {
    async fn clausify(&self, problem: &Path) -> Result<Clausified, AtpError> {
        AtpPool::clausify(self, problem).await
    }

    async fn score(
        &self,
        axioms: &[Clause],
        selected: &[Clause],
        extras: &[Clause],
    ) -> Result<f64, AtpError> {
        AtpPool::score(self, axioms, selected, extras).await
    }

    async fn infer(
        &self,
        selected: &[Clause],
        extras: &[Clause],
    ) -> Result<Vec<Clause>, AtpError> {
        AtpPool::infer(self, selected, extras).await
    }

    fn width(&self) -> usize {
        AtpPool::width(self)
    }
}
