use std::path::Path;

use rand::{rngs::StdRng, Rng};
use simple_error::try_with;

use crate::error::{Error, Result};
use crate::grid::{Dimensions, GridState};
use crate::learner::{build_rng, Learner, TablePaths, Transition};
use crate::params::{self, AgentParams};
use crate::tables::{PolicyTable, ValueTable};

/// Softmax actor over a preference table, trained by a TD critic over a
/// state value table.
#[derive(Debug)]
pub struct TabularCriticAgent {
    values: ValueTable,
    policy: PolicyTable,
    params: AgentParams,
    num_actions: usize,
    rng: StdRng,
    storage: Option<TablePaths>,
}

impl TabularCriticAgent {
    pub fn new(params: AgentParams, dimensions: Dimensions, num_actions: usize) -> Result<Self> {
        try_with!(
            params::validate_agent_params(&params),
            "invalid agent parameters"
        );

        if num_actions == 0 {
            return Err(Error::configuration("policy table has no actions"));
        }

        let mut rng = build_rng(params.seed_override);
        let policy = PolicyTable::randomized(
            dimensions,
            num_actions,
            params.initial_preference_max,
            &mut rng,
        );

        Ok(Self {
            values: ValueTable::zeros(dimensions),
            policy,
            params,
            num_actions,
            rng,
            storage: None,
        })
    }

    pub fn from_tables(
        params: AgentParams,
        values: ValueTable,
        policy: PolicyTable,
    ) -> Result<Self> {
        try_with!(
            params::validate_agent_params(&params),
            "invalid agent parameters"
        );

        let rows = values.rows();
        let dimensions = Dimensions {
            width: rows.first().map(|row| row.len()).unwrap_or(0),
            height: rows.len(),
        };
        let num_actions = policy.num_actions();

        if num_actions == 0 {
            return Err(Error::configuration("policy table has no actions"));
        }

        values.check_shape(dimensions)?;
        policy.check_shape(dimensions, num_actions)?;

        Ok(Self {
            rng: build_rng(params.seed_override),
            values,
            policy,
            params,
            num_actions,
            storage: None,
        })
    }

    /// Loads both tables when present, otherwise starts from zero values and
    /// random preferences. Later flushes write back to the same files.
    pub fn load(
        params: AgentParams,
        dimensions: Dimensions,
        num_actions: usize,
        paths: TablePaths,
    ) -> Result<Self> {
        let mut agent = Self::new(params, dimensions, num_actions)?;

        agent.values = ValueTable::load_or_zeros(&paths.values, dimensions)?;

        let fresh_policy = agent.policy.clone();
        agent.policy =
            PolicyTable::load_or_else(&paths.policy, dimensions, num_actions, || fresh_policy)?;

        log::info!(
            "agent tables: values {}, policy {}",
            paths.values.display(),
            paths.policy.display()
        );

        agent.storage = Some(paths);
        Ok(agent)
    }

    pub fn persist(&self, values_path: &Path, policy_path: &Path) -> Result<()> {
        self.values.persist(values_path)?;
        self.policy.persist(policy_path)
    }

    pub fn values(&self) -> &ValueTable {
        &self.values
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    pub fn params(&self) -> &AgentParams {
        &self.params
    }

    pub fn action_distribution(&self, state: GridState) -> Vec<f64> {
        softmax(self.policy.row(state))
    }

    pub fn select_action(&mut self, state: GridState) -> Result<usize> {
        let distribution = self.action_distribution(state);

        if distribution.is_empty() || distribution.iter().any(|p| !p.is_finite()) {
            return Err(Error::Policy(format!(
                "degenerate action distribution at ({}, {}): {:?}",
                state.x, state.y, distribution
            )));
        }

        let r: f64 = self.rng.gen();
        Ok(sample_index(&distribution, r))
    }

    /// Applies one TD step and returns the error, or `None` for a zero-reward
    /// self-loop, which leaves both tables untouched.
    pub fn update(
        &mut self,
        state: GridState,
        next_state: GridState,
        reward: f64,
        action_idx: usize,
        terminal: bool,
    ) -> Option<f64> {
        if reward == 0.0 && state == next_state {
            return None;
        }

        let discount = if terminal { 0.0 } else { self.params.discount };
        let error = reward - self.values.get(state) + discount * self.values.get(next_state);

        self.values.add(state, self.params.critic_rate * error);
        self.policy
            .add(state, action_idx, self.params.actor_rate * error);

        Some(error)
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }
}

impl Learner for TabularCriticAgent {
    fn select_action(&mut self, state: GridState) -> Result<usize> {
        TabularCriticAgent::select_action(self, state)
    }

    fn learn(&mut self, transition: &Transition) -> Option<f64> {
        self.update(
            transition.state,
            transition.next_state,
            transition.reward * self.params.reward_scale,
            transition.action_idx,
            transition.terminal,
        )
    }

    fn flush(&self) -> Result<()> {
        match &self.storage {
            Some(paths) => self.persist(&paths.values, &paths.policy),
            None => Ok(()),
        }
    }
}

/// Numerically stable softmax: the row maximum is subtracted before
/// exponentiating.
pub fn softmax(preferences: &[f64]) -> Vec<f64> {
    let max = preferences
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    let exps: Vec<f64> = preferences.iter().map(|p| (p - max).exp()).collect();
    let sum: f64 = exps.iter().sum();

    exps.into_iter().map(|e| e / sum).collect()
}

/// Inverse-CDF sampling. Falls back to the last index when rounding keeps the
/// cumulative sum at or below `r`.
pub fn sample_index(distribution: &[f64], r: f64) -> usize {
    let mut cumulative = 0.0;

    for (idx, p) in distribution.iter().enumerate() {
        cumulative += p;
        if cumulative > r {
            return idx;
        }
    }

    distribution.len().saturating_sub(1)
}
