//! Client for driving Vampire as an external clause-selection oracle.
//!
//! Three operations, each one bounded prover process: `clausify` normalizes
//! a problem file into role-tagged clauses, `score` measures refutation
//! effort in retired instructions via `perf stat`, and `infer` runs a
//! single age-bounded generating round to discover candidate clauses. The
//! [`AtpPool`] caps how many prover processes are alive at once.
//!
//! ```rust,no_run
//! use atp::{AtpConfig, AtpPool};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), atp::AtpError> {
//! let pool = AtpPool::new(AtpConfig::default())?;
//! let clausified = pool.clausify(Path::new("problems/PUZ001-1.p")).await?;
//! let cost = pool
//!     .score(&clausified.axioms, &clausified.conjectures, &clausified.extras)
//!     .await?;
//! println!("baseline effort: {cost} instructions");
//! # Ok(())
//! # }
//! ```

pub mod clause;
pub mod pool;
pub mod types;
pub mod vampire;

pub use clause::{parse_listing, Clause, ClauseParseError, Clausified, Role};
pub use pool::AtpPool;
pub use types::{AtpConfig, AtpError};
pub use vampire::UNSAT_MARKER;
