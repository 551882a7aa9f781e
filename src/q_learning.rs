//! Epsilon-greedy tabular Q-learning over the same environments as the
//! actor-critic agent.

use std::path::{Path, PathBuf};

use rand::{rngs::StdRng, Rng};
use simple_error::try_with;

use crate::error::{Error, Result};
use crate::grid::{Dimensions, GridState};
use crate::learner::{build_rng, Learner, Transition};
use crate::params::{self, QLearningParams};
use crate::tables::PolicyTable;

#[derive(Debug)]
pub struct QLearningAgent {
    q_table: PolicyTable,
    params: QLearningParams,
    epsilon: f64,
    num_actions: usize,
    rng: StdRng,
    storage: Option<PathBuf>,
}

impl QLearningAgent {
    pub fn new(params: QLearningParams, dimensions: Dimensions, num_actions: usize) -> Result<Self> {
        try_with!(
            params::validate_q_learning_params(&params),
            "invalid q-learning parameters"
        );

        if num_actions == 0 {
            return Err(Error::configuration("q-learning agent needs at least one action"));
        }

        Ok(Self {
            q_table: PolicyTable::constant(dimensions, num_actions, params.q_init),
            epsilon: params.epsilon,
            rng: build_rng(params.seed_override),
            params,
            num_actions,
            storage: None,
        })
    }

    /// Continues from a persisted Q-table when `path` exists.
    pub fn load(
        params: QLearningParams,
        dimensions: Dimensions,
        num_actions: usize,
        path: PathBuf,
    ) -> Result<Self> {
        let mut agent = Self::new(params, dimensions, num_actions)?;
        let fresh = agent.q_table.clone();
        agent.q_table = PolicyTable::load_or_else(&path, dimensions, num_actions, || fresh)?;

        log::info!("q-table: {}", path.display());

        agent.storage = Some(path);
        Ok(agent)
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        self.q_table.persist(path)
    }

    pub fn q_table(&self) -> &PolicyTable {
        &self.q_table
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn greedy_action(&self, state: GridState) -> usize {
        let row = self.q_table.row(state);

        // first maximum wins ties
        let mut best = 0;
        for (idx, q) in row.iter().enumerate() {
            if *q > row[best] {
                best = idx;
            }
        }

        best
    }

    pub fn max_q(&self, state: GridState) -> f64 {
        self.q_table
            .row(state)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Q(s,a) += α [r + γ max_a' Q(s',a') − Q(s,a)]
    pub fn update(&mut self, transition: &Transition) -> f64 {
        let current = self.q_table.get(transition.state, transition.action_idx);
        let max_next = if transition.terminal {
            0.0
        } else {
            self.max_q(transition.next_state)
        };

        let error = transition.reward + self.params.discount * max_next - current;
        self.q_table.set(
            transition.state,
            transition.action_idx,
            current + self.params.learning_rate * error,
        );

        error
    }

    fn decay_epsilon(&mut self) {
        self.epsilon = (self.epsilon * self.params.epsilon_decay).max(self.params.min_epsilon);
    }
}

impl Learner for QLearningAgent {
    fn select_action(&mut self, state: GridState) -> Result<usize> {
        if self.rng.gen::<f64>() < self.epsilon {
            Ok(self.rng.gen_range(0..self.num_actions))
        } else {
            Ok(self.greedy_action(state))
        }
    }

    fn learn(&mut self, transition: &Transition) -> Option<f64> {
        Some(self.update(transition))
    }

    fn end_episode(&mut self) {
        self.decay_epsilon();
    }

    fn flush(&self) -> Result<()> {
        match &self.storage {
            Some(path) => self.persist(path),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    const DIMS: Dimensions = Dimensions {
        width: 3,
        height: 1,
    };

    fn params() -> QLearningParams {
        QLearningParams {
            seed_override: Some(0),
            ..QLearningParams::default()
        }
    }

    fn transition(reward: f64, terminal: bool) -> Transition {
        Transition {
            state: GridState::new(1, 0),
            action_idx: 1,
            reward,
            next_state: GridState::new(2, 0),
            terminal,
        }
    }

    #[test]
    fn update_uses_max_next_value() {
        let mut agent = QLearningAgent::new(params(), DIMS, 2).unwrap();
        agent.q_table.set(GridState::new(2, 0), 0, 0.5);
        agent.q_table.set(GridState::new(2, 0), 1, 2.0);

        let error = agent.update(&transition(1.0, false));
        assert_approx_eq!(f64, error, 1.0 + 0.9 * 2.0);
        assert_approx_eq!(f64, agent.q_table().get(GridState::new(1, 0), 1), 0.1 * 2.8);
    }

    #[test]
    fn terminal_update_ignores_next_value() {
        let mut agent = QLearningAgent::new(params(), DIMS, 2).unwrap();
        agent.q_table.set(GridState::new(2, 0), 1, 2.0);

        let error = agent.update(&transition(-1.0, true));
        assert_approx_eq!(f64, error, -1.0);
    }

    #[test]
    fn greedy_ties_pick_first() {
        let mut agent = QLearningAgent::new(params(), DIMS, 2).unwrap();
        assert_eq!(agent.greedy_action(GridState::new(0, 0)), 0);
        agent.q_table.set(GridState::new(0, 0), 1, 0.1);
        assert_eq!(agent.greedy_action(GridState::new(0, 0)), 1);
    }

    #[test]
    fn epsilon_decays_to_floor() {
        let mut agent = QLearningAgent::new(params(), DIMS, 2).unwrap();
        for _ in 0..1000 {
            agent.end_episode();
        }
        assert_approx_eq!(f64, agent.epsilon(), 0.01);
    }

    #[test]
    fn no_actions() {
        let result = QLearningAgent::new(params(), DIMS, 0);
        assert_eq!(
            result.unwrap_err().to_string(),
            "configuration error: q-learning agent needs at least one action"
        );
    }

    #[test]
    fn q_table_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q_table.dat");

        let mut agent = QLearningAgent::load(params(), DIMS, 2, path.clone()).unwrap();
        agent.learn(&transition(1.0, true));
        agent.flush().unwrap();

        let restarted = QLearningAgent::load(params(), DIMS, 2, path.clone()).unwrap();
        assert_eq!(restarted.q_table(), agent.q_table());
        assert_approx_eq!(f64, restarted.q_table().get(GridState::new(1, 0), 1), 0.1);

        let result = QLearningAgent::load(params(), DIMS, 4, path);
        assert!(result.unwrap_err().is_configuration());
    }

    #[test]
    fn flush_without_storage() {
        let agent = QLearningAgent::new(params(), DIMS, 2).unwrap();
        assert!(agent.flush().is_ok());
    }

    #[test]
    fn greedy_without_exploration() {
        let mut params = params();
        params.epsilon = 0.0;
        params.min_epsilon = 0.0;
        let mut agent = QLearningAgent::new(params, DIMS, 2).unwrap();
        agent.q_table.set(GridState::new(1, 0), 1, 1.0);

        for _ in 0..50 {
            assert_eq!(agent.select_action(GridState::new(1, 0)).unwrap(), 1);
        }
    }
}
