//! A width-capped front door for prover invocations.
//!
//! The pool owns no worker processes — every operation spawns a fresh one —
//! but it owns the semaphore that caps how many may be alive at once. All
//! prover traffic for a search goes through one pool, so the cap holds
//! system-wide no matter how wide the tree fans out.

use std::path::Path;

use tokio::sync::{Semaphore, SemaphorePermit};

use crate::clause::{Clause, Clausified};
use crate::types::{AtpConfig, AtpError};
use crate::vampire;

pub struct AtpPool {
    config: AtpConfig,
    semaphore: Semaphore,
}

impl AtpPool {
    pub fn new(config: AtpConfig) -> Result<Self, AtpError> {
        if config.num_workers == 0 {
            return Err(AtpError::Config("num_workers must be at least 1".into()));
        }
        tracing::info!(
            num_workers = config.num_workers,
            vampire = %config.vampire_path.display(),
            timeout_ms = config.prover_timeout_ms,
            "ATP pool ready"
        );
        Ok(Self {
            semaphore: Semaphore::new(config.num_workers),
            config,
        })
    }

    /// Pool width: the hard cap on concurrently live prover processes, and
    /// the natural fan-out for concurrent tree expansion.
    pub fn width(&self) -> usize {
        self.config.num_workers
    }

    pub fn config(&self) -> &AtpConfig {
        &self.config
    }

    async fn checkout(&self) -> Result<SemaphorePermit<'_>, AtpError> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| AtpError::Config("Semaphore closed".into()))
    }

    /// See [`vampire::clausify`]. Holds one pool slot for the duration.
    pub async fn clausify(&self, problem: &Path) -> Result<Clausified, AtpError> {
        let _permit = self.checkout().await?;
        vampire::clausify(&self.config, problem).await
    }

    /// See [`vampire::score`]. Holds one pool slot for the duration.
    pub async fn score(
        &self,
        axioms: &[Clause],
        selected: &[Clause],
        extras: &[Clause],
    ) -> Result<f64, AtpError> {
        let _permit = self.checkout().await?;
        vampire::score(&self.config, axioms, selected, extras).await
    }

    /// See [`vampire::infer`]. Holds one pool slot for the duration.
    pub async fn infer(&self, selected: &[Clause], extras: &[Clause]) -> Result<Vec<Clause>, AtpError> {
        let _permit = self.checkout().await?;
        vampire::infer(&self.config, selected, extras).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_pool_is_rejected() {
        let config = AtpConfig {
            num_workers: 0,
            ..AtpConfig::default()
        };
        assert!(matches!(AtpPool::new(config), Err(AtpError::Config(_))));
    }

    #[test]
    fn width_reports_configured_cap() {
        let config = AtpConfig {
            num_workers: 2,
            ..AtpConfig::default()
        };
        let pool = AtpPool::new(config).unwrap();
        assert_eq!(pool.width(), 2);
    }
}
