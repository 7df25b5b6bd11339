//! Scripted oracle for exercising the search machinery without a prover.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use atp::{AtpError, Clause, Clausified, Role};

use crate::oracle::Oracle;

/// Shorthand for an axiom clause in tests.
pub fn axiom(body: &str) -> Clause {
    Clause::new(Role::Axiom, body)
}

/// Shorthand for a negated-conjecture clause in tests.
pub fn conjecture(body: &str) -> Clause {
    Clause::new(Role::NegatedConjecture, body)
}

/// Arguments of one recorded `score` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCall {
    pub axioms: Vec<Clause>,
    pub selected: Vec<Clause>,
}

/// Oracle that replays scripted responses in FIFO order.
///
/// Each call pops one entry from its queue; when a queue runs dry the
/// configured default (if any) is served, and without one the call fails
/// with a `Crashed` error so an under-scripted test fails loudly instead
/// of hanging on a half-built tree.
pub struct MockOracle {
    width: usize,
    clausify_queue: Mutex<VecDeque<Result<Clausified, AtpError>>>,
    score_queue: Mutex<VecDeque<Result<f64, AtpError>>>,
    infer_queue: Mutex<VecDeque<Result<Vec<Clause>, AtpError>>>,
    default_score: Option<f64>,
    default_infer: Option<Vec<Clause>>,
    score_calls: Mutex<Vec<ScoreCall>>,
}

impl Default for MockOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl MockOracle {
    pub fn new() -> Self {
        Self::with_width(1)
    }

    /// A mock claiming the given concurrency width. Width 1 keeps
    /// scripted expansion fully sequential; wider mocks exercise the
    /// buffered path.
    pub fn with_width(width: usize) -> Self {
        MockOracle {
            width,
            clausify_queue: Mutex::new(VecDeque::new()),
            score_queue: Mutex::new(VecDeque::new()),
            infer_queue: Mutex::new(VecDeque::new()),
            default_score: None,
            default_infer: None,
            score_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_clausify(&self, response: Result<Clausified, AtpError>) {
        self.clausify_queue.lock().unwrap().push_back(response);
    }

    pub fn push_score(&self, response: Result<f64, AtpError>) {
        self.score_queue.lock().unwrap().push_back(response);
    }

    pub fn push_infer(&self, response: Result<Vec<Clause>, AtpError>) {
        self.infer_queue.lock().unwrap().push_back(response);
    }

    /// Score served whenever the scripted queue is empty.
    pub fn set_default_score(&mut self, score: f64) {
        self.default_score = Some(score);
    }

    /// Inference round served whenever the scripted queue is empty.
    pub fn set_default_infer(&mut self, inferred: Vec<Clause>) {
        self.default_infer = Some(inferred);
    }

    /// Every `score` call seen so far, in call order.
    pub fn score_log(&self) -> Vec<ScoreCall> {
        self.score_calls.lock().unwrap().clone()
    }

    fn exhausted() -> AtpError {
        AtpError::Crashed("mock script exhausted".into())
    }
}

#[async_trait]
impl Oracle for MockOracle {
    async fn clausify(&self, _problem: &Path) -> Result<Clausified, AtpError> {
        self.clausify_queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::exhausted()))
    }

    async fn score(
        &self,
        axioms: &[Clause],
        selected: &[Clause],
        _extras: &[Clause],
    ) -> Result<f64, AtpError> {
        self.score_calls.lock().unwrap().push(ScoreCall {
            axioms: axioms.to_vec(),
            selected: selected.to_vec(),
        });
        match self.score_queue.lock().unwrap().pop_front() {
            Some(response) => response,
            None => self.default_score.ok_or_else(Self::exhausted),
        }
    }

    async fn infer(
        &self,
        _selected: &[Clause],
        _extras: &[Clause],
    ) -> Result<Vec<Clause>, AtpError> {
        match self.infer_queue.lock().unwrap().pop_front() {
            Some(response) => response,
            None => self.default_infer.clone().ok_or_else(Self::exhausted),
        }
    }

    fn width(&self) -> usize {
        self.width
    }
}
