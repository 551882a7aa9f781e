use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::environment::{Environment, Step};
use crate::error::{Error, Result};
use crate::grid::{Dimensions, GridState};
use crate::mailbox::{Collector, Poster};
use crate::paddle::{PaddleCommand, PADDLE_COMMANDS};

pub const SCREEN_SIZE: f64 = 480.0;

/// Raw coordinates reported by the game loop, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PongObservation {
    pub ball_x: f64,
    pub ball_y: f64,
    pub paddle: f64,
}

impl PongObservation {
    /// Maps the ball height to a row and the paddle position to a column.
    pub fn discretize(&self, dimensions: Dimensions, screen_size: f64) -> GridState {
        GridState {
            x: to_cell(self.paddle, dimensions.width, screen_size),
            y: to_cell(self.ball_y, dimensions.height, screen_size),
        }
    }
}

fn to_cell(position: f64, num_cells: usize, screen_size: f64) -> usize {
    let cell_size = screen_size / num_cells as f64;
    let cell = (position.max(0.0) / cell_size).floor() as usize;
    cell.min(num_cells - 1)
}

/// Environment whose dynamics live in an external game loop. Commands go out
/// through one mailbox, observations come back through another.
#[derive(Debug)]
pub struct RemoteEnvironment {
    commands: Poster<PaddleCommand>,
    observations: Collector<PongObservation>,
    dimensions: Dimensions,
    screen_size: f64,
    current: GridState,
    step_interval: Duration,
    dropped_commands: usize,
}

impl RemoteEnvironment {
    pub fn new(
        commands: Poster<PaddleCommand>,
        observations: Collector<PongObservation>,
        dimensions: Dimensions,
    ) -> Result<Self> {
        if dimensions.num_cells() == 0 {
            return Err(Error::configuration("remote grid must not be empty"));
        }

        let mut env = Self {
            commands,
            observations,
            dimensions,
            screen_size: SCREEN_SIZE,
            current: GridState::new(0, 0),
            step_interval: Duration::ZERO,
            dropped_commands: 0,
        };
        env.refresh()?;

        Ok(env)
    }

    /// Waits this long after posting each command, so the game loop can
    /// advance before the next observation is read.
    pub fn with_step_interval(mut self, step_interval: Duration) -> Self {
        self.step_interval = step_interval;
        self
    }

    /// Number of commands replaced before the game loop picked them up.
    pub fn dropped_commands(&self) -> usize {
        self.dropped_commands
    }

    fn refresh(&mut self) -> Result<GridState> {
        if let Some(observation) = self.observations.latest()? {
            self.current = observation.discretize(self.dimensions, self.screen_size);
        }

        Ok(self.current)
    }
}

impl Environment for RemoteEnvironment {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    fn num_actions(&self) -> usize {
        PADDLE_COMMANDS.len()
    }

    // a closed observation mailbox surfaces on the next step
    fn current_state(&self) -> GridState {
        match self.observations.latest() {
            Ok(Some(observation)) => observation.discretize(self.dimensions, self.screen_size),
            _ => self.current,
        }
    }

    fn is_terminal(&self) -> bool {
        false
    }

    fn step(&mut self, action_idx: usize) -> Result<Step> {
        let command = PaddleCommand::from_index(action_idx)?;

        if self.commands.post(command)? {
            self.dropped_commands += 1;
            log::trace!("pending paddle command replaced by {:?}", command);
        }

        if !self.step_interval.is_zero() {
            thread::sleep(self.step_interval);
        }

        Ok(Step {
            state: self.refresh()?,
            reward: 0.0,
            terminal: false,
        })
    }

    fn start_new_episode(&mut self) -> Result<(GridState, bool)> {
        Ok((self.refresh()?, false))
    }
}
