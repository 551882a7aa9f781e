use std::path::PathBuf;

use rand::{rngs::StdRng, SeedableRng};

use crate::error::Result;
use crate::grid::GridState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: GridState,
    pub action_idx: usize,
    pub reward: f64,
    pub next_state: GridState,
    pub terminal: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePaths {
    pub values: PathBuf,
    pub policy: PathBuf,
}

/// Online tabular learner driven by the training loop.
pub trait Learner {
    fn select_action(&mut self, state: GridState) -> Result<usize>;

    /// Returns the TD error, or `None` when the transition was skipped.
    fn learn(&mut self, transition: &Transition) -> Option<f64>;

    fn end_episode(&mut self) {}

    /// Writes the learned tables to their configured storage, if any.
    fn flush(&self) -> Result<()>;
}

pub(crate) fn build_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
