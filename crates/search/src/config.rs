/// Search configuration loaded from TOML.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SearchConfig {
    /// Iteration budget for one tree search.
    #[serde(default = "default_iterations")]
    pub iterations: u32,

    /// Step limit for one random-rollout episode.
    #[serde(default = "default_episode_steps")]
    pub episode_steps: usize,
}

fn default_iterations() -> u32 {
    10_000
}
fn default_episode_steps() -> usize {
    10
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            episode_steps: default_episode_steps(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budgets() {
        let config = SearchConfig::default();
        assert_eq!(config.iterations, 10_000);
        assert_eq!(config.episode_steps, 10);
    }

    #[test]
    fn partial_toml_keeps_defaults_elsewhere() {
        let toml_str = r#"
            iterations = 500
        "#;
        let config: SearchConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.iterations, 500);
        assert_eq!(config.episode_steps, 10);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config: SearchConfig = toml::from_str("").unwrap();
        assert_eq!(config.iterations, 10_000);
        assert_eq!(config.episode_steps, 10);
    }
}
