//! Clause-selection search over an external saturation prover.
//!
//! Wires the `atp` oracle into two consumers: a Monte Carlo tree search
//! that scores whole selection subtrees, and a step-wise environment
//! for policy rollouts. Both talk to the prover through the [`Oracle`]
//! trait so every algorithm is testable against a scripted mock.
//!
//! # Key types
//!
//! - [`TreeSearch`] — the MCTS driver; [`Node`] — its tree
//! - [`Environment`] — one mutable trajectory, [`run_episode`] plays it
//! - [`Oracle`] — clausify/score/infer seam, implemented by `atp::AtpPool`
//! - [`SearchConfig`] — budgets loaded from TOML

pub mod config;
pub mod engine;
pub mod environment;
pub mod episode;
pub mod mocks;
pub mod node;
pub mod oracle;

pub use config::SearchConfig;
pub use engine::{SearchError, TreeSearch};
pub use environment::{Environment, Status};
pub use episode::{run_episode, EpisodeReport, Outcome, Policy, RandomPolicy};
pub use node::Node;
pub use oracle::Oracle;
