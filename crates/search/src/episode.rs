//! Single-trajectory episodes under a pluggable selection policy.
//!
//! The shipped baseline policy selects uniformly at random; anything
//! smarter plugs in through [`Policy`].

use std::path::Path;

use atp::{AtpError, Clause};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::environment::{problem_name, Environment, Status};
use crate::oracle::Oracle;

/// Reward credited for a refutation; its negation penalizes a timeout.
const TERMINAL_REWARD: f64 = 1.0;

/// An episode whose reward sum sinks to this floor is abandoned.
const REWARD_FLOOR: f64 = -1.0;

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The prover refuted the selected set.
    Proved,
    /// The prover ran out of time.
    TimedOut,
    /// The prover crashed; the trajectory carries no terminal reward.
    Crashed,
    /// Every available action was consumed without a refutation.
    Exhausted,
    /// The step limit was reached first.
    StepLimit,
    /// The running reward sum fell to the floor.
    GaveUp,
}

/// Result of one episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeReport {
    pub problem: String,
    pub outcome: Outcome,
    /// Per-step rewards, terminal bonus or penalty included.
    pub rewards: Vec<f64>,
    pub total: f64,
    /// Selections performed, the terminal one included.
    pub steps: usize,
}

impl EpisodeReport {
    fn new(problem: String, outcome: Outcome, rewards: Vec<f64>, steps: usize) -> Self {
        let total = rewards.iter().sum();
        EpisodeReport {
            problem,
            outcome,
            rewards,
            total,
            steps,
        }
    }
}

/// Chooses the next action index from a non-empty action list.
pub trait Policy: Send {
    fn choose(&mut self, actions: &[Clause]) -> usize;
}

/// Uniform-random clause selection.
pub struct RandomPolicy {
    rng: StdRng,
}

impl RandomPolicy {
    /// Deterministic policy for reproducible baselines.
    pub fn new(seed: u64) -> Self {
        RandomPolicy {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        RandomPolicy {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Policy for RandomPolicy {
    fn choose(&mut self, actions: &[Clause]) -> usize {
        self.rng.gen_range(0..actions.len())
    }
}

/// Plays one trajectory to its end and reports how it went.
///
/// Terminal oracle outcomes carry their reward convention: `ProvedIt`
/// appends `+1`, `Timeout` appends `-1`, a crash appends nothing. The
/// same mapping applies when the environment fails to construct — a
/// problem whose conjectures refute on their own counts as proved in
/// zero steps.
pub async fn run_episode(
    oracle: &dyn Oracle,
    problem: &Path,
    policy: &mut dyn Policy,
    max_steps: usize,
) -> EpisodeReport {
    let name = problem_name(problem);
    let mut env = match Environment::new(oracle, problem).await {
        Ok(env) => env,
        Err(error) => {
            let (outcome, rewards) = match error {
                AtpError::ProvedIt => (Outcome::Proved, vec![TERMINAL_REWARD]),
                AtpError::Timeout(_) => (Outcome::TimedOut, vec![-TERMINAL_REWARD]),
                _ => {
                    tracing::debug!(problem = %name, %error, "environment failed to construct");
                    (Outcome::Crashed, Vec::new())
                }
            };
            return EpisodeReport::new(name, outcome, rewards, 0);
        }
    };

    let mut rewards = Vec::new();
    let mut steps = 0;
    loop {
        if steps >= max_steps {
            return EpisodeReport::new(name, Outcome::StepLimit, rewards, steps);
        }
        if rewards.iter().sum::<f64>() <= REWARD_FLOOR {
            return EpisodeReport::new(name, Outcome::GaveUp, rewards, steps);
        }
        if env.status() == Status::Exhausted {
            return EpisodeReport::new(name, Outcome::Exhausted, rewards, steps);
        }
        let index = policy.choose(env.available_actions());
        steps += 1;
        match env.perform_action(index).await {
            Ok(reward) => rewards.push(reward),
            Err(AtpError::ProvedIt) => {
                rewards.push(TERMINAL_REWARD);
                return EpisodeReport::new(name, Outcome::Proved, rewards, steps);
            }
            Err(AtpError::Timeout(_)) => {
                rewards.push(-TERMINAL_REWARD);
                return EpisodeReport::new(name, Outcome::TimedOut, rewards, steps);
            }
            Err(error) => {
                tracing::debug!(problem = %name, %error, step = steps, "episode crashed");
                return EpisodeReport::new(name, Outcome::Crashed, rewards, steps);
            }
        }
    }
}
