use serde::{Deserialize, Serialize};
use simple_error::SimpleError;

use crate::types::TerminalSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridState {
    pub x: usize,
    pub y: usize,
}

impl GridState {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Returns `None` when the move would leave `[0, width) × [0, height)`.
    pub fn offset(&self, dx: i64, dy: i64, dimensions: Dimensions) -> Option<GridState> {
        let x = self.x as i64 + dx;
        let y = self.y as i64 + dy;

        if x < 0 || y < 0 || x >= dimensions.width as i64 || y >= dimensions.height as i64 {
            None
        } else {
            Some(GridState::new(x as usize, y as usize))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

impl Dimensions {
    pub fn contains(&self, state: GridState) -> bool {
        state.x < self.width && state.y < self.height
    }

    pub fn num_cells(&self) -> usize {
        self.width * self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    North,
    East,
    South,
    West,
}

impl Action {
    pub fn delta(&self) -> (i64, i64) {
        match self {
            Action::North => (0, -1),
            Action::East => (1, 0),
            Action::South => (0, 1),
            Action::West => (-1, 0),
        }
    }
}

pub const FOUR_WAY_ACTIONS: [Action; 4] = [Action::North, Action::East, Action::South, Action::West];
pub const TWO_WAY_ACTIONS: [Action; 2] = [Action::West, Action::East];

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    name: String,
    rewards: Vec<Vec<f64>>,
    start: GridState,
    terminals: TerminalSet,
}

impl Layout {
    pub fn new(
        name: &str,
        rewards: Vec<Vec<f64>>,
        start: GridState,
        terminals: &[GridState],
    ) -> Result<Layout, SimpleError> {
        let width = rewards.first().map(|row| row.len()).unwrap_or(0);

        if width == 0 {
            return Err(SimpleError::new(format!("layout {}: empty reward grid", name)));
        }

        if rewards.iter().any(|row| row.len() != width) {
            return Err(SimpleError::new(format!(
                "layout {}: reward grid is not rectangular",
                name
            )));
        }

        let layout = Layout {
            name: name.to_string(),
            rewards,
            start,
            terminals: terminals.iter().copied().collect(),
        };

        let dimensions = layout.dimensions();

        if !dimensions.contains(start) {
            return Err(SimpleError::new(format!(
                "layout {}: start ({}, {}) outside of grid",
                name, start.x, start.y
            )));
        }

        if let Some(terminal) = terminals.iter().find(|t| !dimensions.contains(**t)) {
            return Err(SimpleError::new(format!(
                "layout {}: terminal ({}, {}) outside of grid",
                name, terminal.x, terminal.y
            )));
        }

        Ok(layout)
    }

    pub fn by_name(name: &str) -> Result<Layout, SimpleError> {
        match LAYOUT_NAMES.iter().position(|candidate| *candidate == name) {
            Some(index) => Layout::by_index(index),
            None => Err(SimpleError::new(format!("unknown layout: {}", name))),
        }
    }

    /// Layouts in catalogue order, so `by_index(0)` is the three-cell corridor.
    pub fn by_index(index: usize) -> Result<Layout, SimpleError> {
        let s = GridState::new;

        let (rewards, start, terminals): (Vec<Vec<f64>>, GridState, Vec<GridState>) = match index
        {
            0 => (vec![vec![1.0, 0.0, -1.0]], s(1, 0), vec![s(0, 0), s(2, 0)]),
            1 => (
                vec![vec![1.0, 0.0, 0.0, 0.0, -1.0]],
                s(2, 0),
                vec![s(0, 0), s(4, 0)],
            ),
            2 => (
                vec![vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0]],
                s(3, 0),
                vec![s(0, 0), s(6, 0)],
            ),
            3 => (vec![vec![0.0, 0.0, 0.0]], s(1, 0), vec![s(0, 0), s(2, 0)]),
            4 => (
                vec![vec![0.5, 0.0, 0.0, 0.0, 1.0]],
                s(2, 0),
                vec![s(0, 0), s(4, 0)],
            ),
            5 => (
                vec![vec![-1.0, 0.0, 0.0, 0.0, -1.0]],
                s(2, 0),
                vec![s(0, 0), s(4, 0)],
            ),
            6 => (vec![vec![0.0, 0.0], vec![0.0, 1.0]], s(0, 0), vec![s(1, 1)]),
            7 => (
                vec![
                    vec![0.0, 0.0, 0.0],
                    vec![0.0, 0.0, 0.0],
                    vec![0.0, 0.0, 1.0],
                ],
                s(0, 0),
                vec![s(2, 2)],
            ),
            8 => (
                vec![
                    vec![0.0, -1.0, 1.0],
                    vec![0.0, 0.0, 0.0],
                    vec![0.0, 0.0, 0.0],
                ],
                s(0, 0),
                vec![s(1, 0), s(2, 0)],
            ),
            9 => (cliff_rewards(4), s(0, 0), (1..4).map(|x| s(x, 0)).collect()),
            10 => (cliff_rewards(5), s(0, 0), (1..5).map(|x| s(x, 0)).collect()),
            _ => return Err(SimpleError::new(format!("unknown layout index: {}", index))),
        };

        Layout::new(LAYOUT_NAMES[index], rewards, start, &terminals)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.rewards[0].len(),
            height: self.rewards.len(),
        }
    }

    pub fn start(&self) -> GridState {
        self.start
    }

    pub fn is_terminal(&self, state: GridState) -> bool {
        self.terminals.contains(&state)
    }

    pub fn terminals(&self) -> impl Iterator<Item = &GridState> {
        self.terminals.iter()
    }

    /// Callers must have checked `state` against `dimensions()`.
    pub fn reward(&self, state: GridState) -> f64 {
        self.rewards[state.y][state.x]
    }

    pub fn rewards(&self) -> &[Vec<f64>] {
        &self.rewards
    }

    pub fn actions(&self) -> &'static [Action] {
        if self.rewards.len() == 1 {
            &TWO_WAY_ACTIONS
        } else {
            &FOUR_WAY_ACTIONS
        }
    }
}

pub const LAYOUT_NAMES: [&str; 11] = [
    "corridor3",
    "corridor5",
    "corridor7",
    "neutral3",
    "two_goals5",
    "punishing5",
    "square2",
    "square3",
    "cliff3",
    "cliff4",
    "cliff5",
];

// top row: start, pits, goal in the far corner; everything below is neutral
fn cliff_rewards(size: usize) -> Vec<Vec<f64>> {
    let mut rewards = vec![vec![0.0; size]; size];

    for x in 1..size - 1 {
        rewards[0][x] = -1.0;
    }
    rewards[0][size - 1] = 1.0;

    rewards
}
