use rustc_hash::FxHashSet;

use crate::grid::GridState;

/// Cells that end an episode when entered.
pub type TerminalSet = FxHashSet<GridState>;
