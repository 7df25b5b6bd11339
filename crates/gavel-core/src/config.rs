//! TOML config loading for the gavel CLI.
//!
//! One file with `[atp]` and `[search]` sections; either may be omitted.
//! Priority chain: struct defaults < TOML values < CLI flags.

use std::path::Path;

use atp::AtpConfig;
use search::SearchConfig;
use serde::Deserialize;

/// Top-level structure matching `configs/gavel.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct GavelToml {
    /// Prover binary, pool width, deadlines.
    #[serde(default)]
    pub atp: AtpConfig,
    /// Search and episode budgets.
    #[serde(default)]
    pub search: SearchConfig,
}

/// Load a `GavelToml`; with no path every field keeps its default.
pub fn load_gavel_toml(path: Option<&Path>) -> anyhow::Result<GavelToml> {
    let Some(path) = path else {
        return Ok(GavelToml::default());
    };
    let contents = std::fs::read_to_string(path)?;
    let config: GavelToml = toml::from_str(&contents)?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Apply CLI prover overrides on top of the TOML values.
pub fn apply_atp_overrides(
    config: &mut AtpConfig,
    num_workers: Option<usize>,
    timeout_ms: Option<u64>,
) {
    if let Some(n) = num_workers {
        config.num_workers = n;
    }
    if let Some(ms) = timeout_ms {
        config.prover_timeout_ms = ms;
    }
}
