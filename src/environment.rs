use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::{Action, Dimensions, GridState, Layout};

pub const OUT_OF_BOUNDS_REWARD: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub state: GridState,
    pub reward: f64,
    pub terminal: bool,
}

/// A turn-based world driven one action at a time. Actions are addressed by
/// their index into the environment's ordered action list.
pub trait Environment {
    fn dimensions(&self) -> Dimensions;

    fn num_actions(&self) -> usize;

    fn current_state(&self) -> GridState;

    fn is_terminal(&self) -> bool;

    fn step(&mut self, action_idx: usize) -> Result<Step>;

    fn start_new_episode(&mut self) -> Result<(GridState, bool)>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeCounters {
    pub reward_collected: f64,
    pub punishment_collected: f64,
    pub num_actions: usize,
    pub visits: Vec<Vec<usize>>,
}

#[derive(Debug, Clone)]
pub struct GridEnvironment {
    layout: Layout,
    current: GridState,
    terminal: bool,
    counters: EpisodeCounters,
}

impl GridEnvironment {
    pub fn new(layout: Layout) -> Self {
        let dimensions = layout.dimensions();
        let start = layout.start();

        let mut result = Self {
            current: start,
            terminal: layout.is_terminal(start),
            counters: EpisodeCounters {
                visits: vec![vec![0; dimensions.width]; dimensions.height],
                ..EpisodeCounters::default()
            },
            layout,
        };

        result.counters.visits[start.y][start.x] += 1;
        result
    }

    pub fn from_layout_name(name: &str) -> Result<Self> {
        Ok(Self::new(Layout::by_name(name)?))
    }

    /// Switches to the named layout and clears all counters.
    pub fn reset_environment(&mut self, name: &str) -> Result<()> {
        *self = Self::from_layout_name(name)?;
        log::debug!("environment reset to layout {}", name);
        Ok(())
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn possible_actions(&self) -> &'static [Action] {
        self.layout.actions()
    }

    pub fn counters(&self) -> &EpisodeCounters {
        &self.counters
    }

    pub fn apply_action(&mut self, action: Action) -> Step {
        self.counters.num_actions += 1;

        let (dx, dy) = action.delta();
        let next = match self.current.offset(dx, dy, self.layout.dimensions()) {
            Some(next) => next,
            None => {
                return Step {
                    state: self.current,
                    reward: OUT_OF_BOUNDS_REWARD,
                    terminal: self.terminal,
                }
            }
        };

        self.current = next;
        let reward = self.layout.reward(next);

        if reward > 0.0 {
            self.counters.reward_collected += reward;
        } else if reward < 0.0 {
            self.counters.punishment_collected -= reward;
        }

        self.counters.visits[next.y][next.x] += 1;

        if self.layout.is_terminal(next) {
            self.terminal = true;
        }

        Step {
            state: next,
            reward,
            terminal: self.terminal,
        }
    }

    pub fn render_world(&self) -> String {
        render_rows(self.layout.rewards().iter().map(|row| {
            row.iter()
                .map(|reward| format!("{}", *reward as i64))
                .collect::<Vec<_>>()
        }))
    }

    pub fn render_visits(&self) -> String {
        render_rows(
            self.counters
                .visits
                .iter()
                .map(|row| row.iter().map(|count| count.to_string()).collect::<Vec<_>>()),
        )
    }
}

fn render_rows(rows: impl Iterator<Item = Vec<String>>) -> String {
    let mut result = String::new();

    for row in rows {
        for cell in row {
            write!(result, " {}", cell).ok();
        }
        result.push('\n');
    }

    result
}

impl Environment for GridEnvironment {
    fn dimensions(&self) -> Dimensions {
        self.layout.dimensions()
    }

    fn num_actions(&self) -> usize {
        self.possible_actions().len()
    }

    fn current_state(&self) -> GridState {
        self.current
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }

    fn step(&mut self, action_idx: usize) -> Result<Step> {
        match self.possible_actions().get(action_idx) {
            Some(action) => Ok(self.apply_action(*action)),
            None => Err(Error::Policy(format!(
                "action index {} out of range for layout {}",
                action_idx,
                self.layout.name()
            ))),
        }
    }

    fn start_new_episode(&mut self) -> Result<(GridState, bool)> {
        self.current = self.layout.start();
        self.terminal = self.layout.is_terminal(self.current);
        Ok((self.current, self.terminal))
    }
}
