use std::path::PathBuf;

/// Outcomes of a prover invocation that are not a plain answer.
#[derive(Debug, thiserror::Error)]
pub enum AtpError {
    /// The process outlived its deadline and was killed.
    #[error("prover timed out after {0}ms")]
    Timeout(u64),

    /// Nonzero exit status, or output we could not make sense of.
    #[error("prover crashed: {0}")]
    Crashed(String),

    /// Saturation refuted the clause set. A success signal, not a failure:
    /// callers decide whether it ends an episode or closes a branch.
    #[error("prover found a refutation")]
    ProvedIt,

    /// Invalid pool or invocation configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error from process communication.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration for prover invocations and the pool that caps them.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct AtpConfig {
    /// Path to the Vampire binary.
    #[serde(default = "default_vampire_path")]
    pub vampire_path: PathBuf,

    /// Path to the perf(1) binary used for instruction counting.
    #[serde(default = "default_perf_path")]
    pub perf_path: PathBuf,

    /// Pool width: hard cap on concurrently live prover processes.
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// Deadline in milliseconds for one score/infer invocation.
    #[serde(default = "default_prover_timeout_ms")]
    pub prover_timeout_ms: u64,

    /// Instructions the prover burns before reading any input, subtracted
    /// from every measurement. Calibrated per prover build.
    #[serde(default = "default_startup_instructions")]
    pub startup_instructions: f64,
}

fn default_vampire_path() -> PathBuf {
    PathBuf::from("vampire")
}
fn default_perf_path() -> PathBuf {
    PathBuf::from("perf")
}
fn default_num_workers() -> usize {
    4
}
fn default_prover_timeout_ms() -> u64 {
    1_000
}
fn default_startup_instructions() -> f64 {
    42.7e6
}

impl Default for AtpConfig {
    fn default() -> Self {
        Self {
            vampire_path: default_vampire_path(),
            perf_path: default_perf_path(),
            num_workers: default_num_workers(),
            prover_timeout_ms: default_prover_timeout_ms(),
            startup_instructions: default_startup_instructions(),
        }
    }
}
