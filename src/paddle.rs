//! Simulated paddle tracking world used to pre-train Pong controllers.
//!
//! The state's `y` is the ball row, `x` is the paddle cell. The agent moves
//! the paddle up, keeps it, or moves it down; holding the paddle level with
//! the ball for two consecutive steps ends the trial.

use rand::{rngs::StdRng, Rng};

use crate::error::{Error, Result};
use crate::environment::{Environment, Step};
use crate::grid::{Dimensions, GridState};
use crate::learner::build_rng;

pub const PADDLE_GRID_SIZE: usize = 4;
pub const STEP_REWARD: f64 = -0.2;
pub const CATCH_REWARD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaddleCommand {
    Up,
    Stay,
    Down,
}

pub const PADDLE_COMMANDS: [PaddleCommand; 3] =
    [PaddleCommand::Up, PaddleCommand::Stay, PaddleCommand::Down];

impl PaddleCommand {
    /// Signed paddle displacement as sent to the game loop.
    pub fn direction(&self) -> i64 {
        match self {
            PaddleCommand::Up => 1,
            PaddleCommand::Stay => 0,
            PaddleCommand::Down => -1,
        }
    }

    pub fn from_index(action_idx: usize) -> Result<PaddleCommand> {
        PADDLE_COMMANDS.get(action_idx).copied().ok_or_else(|| {
            Error::Policy(format!("action index {} out of range for paddle", action_idx))
        })
    }
}

#[derive(Debug)]
pub struct PaddleEnvironment {
    dimensions: Dimensions,
    current: GridState,
    previous: GridState,
    terminal: bool,
    catches: usize,
    rng: StdRng,
}

impl PaddleEnvironment {
    pub fn new(seed_override: Option<u64>) -> Self {
        let start = GridState::new(0, 1);

        Self {
            dimensions: Dimensions {
                width: PADDLE_GRID_SIZE,
                height: PADDLE_GRID_SIZE,
            },
            current: start,
            previous: start,
            terminal: false,
            catches: 0,
            rng: build_rng(seed_override),
        }
    }

    pub fn catches(&self) -> usize {
        self.catches
    }

    pub fn apply_command(&mut self, command: PaddleCommand) -> Step {
        let max_x = self.dimensions.width as i64 - 1;
        let x = (self.current.x as i64 + command.direction()).clamp(0, max_x);
        self.current.x = x as usize;

        let mut reward = STEP_REWARD;
        self.terminal = false;

        if self.current.x == self.current.y && self.previous.x == self.current.y {
            self.terminal = true;
            reward = CATCH_REWARD;
            self.catches += 1;
        }

        self.previous = self.current;

        Step {
            state: self.current,
            reward,
            terminal: self.terminal,
        }
    }

    // relocates the ball to a random row
    fn beam(&mut self) {
        self.current.y = self.rng.gen_range(0..self.dimensions.height);
    }
}

impl Environment for PaddleEnvironment {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn num_actions(&self) -> usize {
        PADDLE_COMMANDS.len()
    }

    fn current_state(&self) -> GridState {
        self.current
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }

    fn step(&mut self, action_idx: usize) -> Result<Step> {
        let command = PaddleCommand::from_index(action_idx)?;
        Ok(self.apply_command(command))
    }

    fn start_new_episode(&mut self) -> Result<(GridState, bool)> {
        self.beam();
        self.terminal = self.current.x == self.current.y;
        Ok((self.current, self.terminal))
    }
}
