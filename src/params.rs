use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use simple_error::SimpleError;

use crate::error::{Error, Result};
use crate::grid::LAYOUT_NAMES;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParams {
    pub layout: String,
    pub iterations: usize,
    pub learner: LearnerKind,
    pub values_path: PathBuf,
    /// Preference table for the actor-critic learner, Q-table for Q-learning.
    pub policy_path: PathBuf,
    pub flush_policy: FlushPolicy,
    pub agent_params: AgentParams,
    pub q_learning_params: QLearningParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LearnerKind {
    ActorCritic,
    QLearning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentParams {
    pub critic_rate: f64,
    pub actor_rate: f64,
    pub discount: f64,
    pub reward_scale: f64,
    pub initial_preference_max: f64,
    pub seed_override: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningParams {
    pub learning_rate: f64,
    pub discount: f64,
    pub epsilon: f64,
    pub epsilon_decay: f64,
    pub min_epsilon: f64,
    pub q_init: f64,
    pub seed_override: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlushPolicy {
    EveryStep,
    EveryEpisode,
    EndOfRun,
    Never,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            layout: LAYOUT_NAMES[0].to_string(),
            iterations: 1000,
            learner: LearnerKind::ActorCritic,
            values_path: PathBuf::from("values.dat"),
            policy_path: PathBuf::from("policy.dat"),
            flush_policy: FlushPolicy::EveryEpisode,
            agent_params: AgentParams::default(),
            q_learning_params: QLearningParams::default(),
        }
    }
}


impl Default for AgentParams {
    fn default() -> Self {
        Self {
            critic_rate: 0.1,
            actor_rate: 0.1,
            discount: 0.8,
            reward_scale: 1.0,
            initial_preference_max: 1.0,
            seed_override: None,
        }
    }
}

impl AgentParams {
    /// Rates used by the paddle tracking trainer, which scales rewards by 100.
    pub fn paddle_defaults() -> Self {
        Self {
            critic_rate: 0.05,
            actor_rate: 0.01,
            discount: 0.5,
            reward_scale: 100.0,
            ..Self::default()
        }
    }
}

impl Default for QLearningParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount: 0.9,
            epsilon: 0.2,
            epsilon_decay: 0.99,
            min_epsilon: 0.01,
            q_init: 0.0,
            seed_override: None,
        }
    }
}

impl Default for FlushPolicy {
    fn default() -> Self {
        FlushPolicy::EveryEpisode
    }
}

impl RunParams {
    /// Table locations and agent rates of the paddle tracking trainer.
    pub fn paddle_defaults() -> Self {
        Self {
            values_path: PathBuf::from("pong_values.dat"),
            policy_path: PathBuf::from("pong_policy.dat"),
            agent_params: AgentParams::paddle_defaults(),
            ..Self::default()
        }
    }

    /// Reads YAML params for a gridworld run, or falls back to defaults when
    /// `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<RunParams> {
        let params = read_over(path, RunParams::default())?;
        validate_run_params(&params)?;
        Ok(params)
    }

    /// Like `load`, but fields missing from the file keep their paddle
    /// defaults and `layout` is not used.
    pub fn load_paddle(path: Option<&Path>) -> Result<RunParams> {
        let params = read_over(path, RunParams::paddle_defaults())?;
        validate_training_params(&params)?;
        Ok(params)
    }
}

fn read_over(path: Option<&Path>, defaults: RunParams) -> Result<RunParams> {
    let path = match path {
        Some(path) => path,
        None => return Ok(defaults),
    };

    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let invalid = |err: serde_yaml::Error| {
        Error::configuration(format!("invalid params file {}: {}", path.display(), err))
    };

    let overrides: Value = serde_yaml::from_str(&content).map_err(invalid)?;
    let mut merged = serde_yaml::to_value(defaults).map_err(invalid)?;
    merge_yaml(&mut merged, overrides);

    serde_yaml::from_value(merged).map_err(invalid)
}

// nested mappings merge key by key, anything else replaces the default
fn merge_yaml(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (_, Value::Null) => {}
        (Value::Mapping(base), Value::Mapping(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(existing) => merge_yaml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}

pub fn validate_run_params(run_params: &RunParams) -> Result<(), SimpleError> {
    if !LAYOUT_NAMES.contains(&run_params.layout.as_str()) {
        return Err(SimpleError::new(format!(
            "unknown layout: {}",
            run_params.layout
        )));
    }

    validate_training_params(run_params)
}

/// Everything except the layout, which only gridworld runs use.
pub fn validate_training_params(run_params: &RunParams) -> Result<(), SimpleError> {
    if run_params.values_path == run_params.policy_path {
        return Err(SimpleError::new(
            "values_path and policy_path must be different",
        ));
    }

    validate_agent_params(&run_params.agent_params)?;
    validate_q_learning_params(&run_params.q_learning_params)
}

pub fn validate_agent_params(agent_params: &AgentParams) -> Result<(), SimpleError> {
    if agent_params.critic_rate <= 0.0 {
        return Err(SimpleError::new("critic_rate must be strictly positive"));
    }

    if agent_params.actor_rate <= 0.0 {
        return Err(SimpleError::new("actor_rate must be strictly positive"));
    }

    if agent_params.discount < 0.0 || agent_params.discount > 1.0 {
        return Err(SimpleError::new("discount must be in [0, 1]"));
    }

    if !agent_params.reward_scale.is_finite() || agent_params.reward_scale <= 0.0 {
        return Err(SimpleError::new("reward_scale must be strictly positive"));
    }

    if !agent_params.initial_preference_max.is_finite()
        || agent_params.initial_preference_max <= 0.0
    {
        return Err(SimpleError::new(
            "initial_preference_max must be strictly positive",
        ));
    }

    Ok(())
}

pub fn validate_q_learning_params(params: &QLearningParams) -> Result<(), SimpleError> {
    if params.learning_rate <= 0.0 || params.learning_rate > 1.0 {
        return Err(SimpleError::new("learning_rate must be in (0, 1]"));
    }

    if params.discount < 0.0 || params.discount > 1.0 {
        return Err(SimpleError::new("discount must be in [0, 1]"));
    }

    if params.epsilon < 0.0 || params.epsilon > 1.0 {
        return Err(SimpleError::new("epsilon must be in [0, 1]"));
    }

    if params.epsilon_decay <= 0.0 || params.epsilon_decay > 1.0 {
        return Err(SimpleError::new("epsilon_decay must be in (0, 1]"));
    }

    if params.min_epsilon < 0.0 || params.min_epsilon > params.epsilon {
        return Err(SimpleError::new("min_epsilon must be in [0, epsilon]"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn valid_params() {
        assert!(validate_run_params(&RunParams::default()).is_ok());
        assert!(validate_agent_params(&AgentParams::paddle_defaults()).is_ok());
        assert!(validate_q_learning_params(&QLearningParams::default()).is_ok());
    }

    #[test]
    fn unknown_layout() {
        let mut params = RunParams::default();
        params.layout = "maze".to_string();
        let result = validate_run_params(&params);

        assert_eq!(result.unwrap_err().as_str(), "unknown layout: maze");
    }

    #[test]
    fn shared_table_path() {
        let mut params = RunParams::default();
        params.policy_path = params.values_path.clone();
        let result = validate_run_params(&params);

        assert_eq!(
            result.unwrap_err().as_str(),
            "values_path and policy_path must be different"
        );
    }

    #[test]
    fn zero_critic_rate() {
        let mut params = AgentParams::default();
        params.critic_rate = 0.0;
        let result = validate_agent_params(&params);

        assert_eq!(
            result.unwrap_err().as_str(),
            "critic_rate must be strictly positive"
        );
    }

    #[test]
    fn negative_actor_rate() {
        let mut params = AgentParams::default();
        params.actor_rate = -0.1;
        let result = validate_agent_params(&params);

        assert_eq!(
            result.unwrap_err().as_str(),
            "actor_rate must be strictly positive"
        );
    }

    #[test]
    fn discount_out_of_range() {
        let mut params = AgentParams::default();
        params.discount = 1.5;
        let result = validate_agent_params(&params);

        assert_eq!(result.unwrap_err().as_str(), "discount must be in [0, 1]");
    }

    #[test]
    fn zero_initial_preference_max() {
        let mut params = AgentParams::default();
        params.initial_preference_max = 0.0;
        let result = validate_agent_params(&params);

        assert_eq!(
            result.unwrap_err().as_str(),
            "initial_preference_max must be strictly positive"
        );
    }

    #[test]
    fn min_epsilon_above_epsilon() {
        let mut params = QLearningParams::default();
        params.min_epsilon = 0.5;
        let result = validate_q_learning_params(&params);

        assert_eq!(
            result.unwrap_err().as_str(),
            "min_epsilon must be in [0, epsilon]"
        );
    }

    #[test]
    fn yaml_params() {
        let params_yaml_str = r#"
layout: cliff4
iterations: 250
flush_policy: EveryStep
agent_params:
  critic_rate: 0.2
  seed_override: 7
"#;

        let params: RunParams = serde_yaml::from_str(params_yaml_str).unwrap();
        assert_eq!(params.layout, "cliff4");
        assert_eq!(params.iterations, 250);
        assert_eq!(params.flush_policy, FlushPolicy::EveryStep);
        assert_eq!(params.agent_params.seed_override, Some(7));
        assert_eq!(params.values_path, PathBuf::from("values.dat"));
        assert!(validate_run_params(&params).is_ok());
    }

    #[test]
    fn q_learning_selected() {
        let params_yaml_str = r#"
learner: QLearning
q_learning_params:
  epsilon: 0.5
"#;

        let params: RunParams = serde_yaml::from_str(params_yaml_str).unwrap();
        assert_eq!(params.learner, LearnerKind::QLearning);
        assert_approx_eq!(f64, params.q_learning_params.epsilon, 0.5);
        assert_approx_eq!(f64, params.q_learning_params.min_epsilon, 0.01);
        assert!(validate_run_params(&params).is_ok());
    }

    #[test]
    fn invalid_q_learning_params_in_run() {
        let mut params = RunParams::default();
        params.q_learning_params.learning_rate = 0.0;
        let result = validate_run_params(&params);

        assert_eq!(
            result.unwrap_err().as_str(),
            "learning_rate must be in (0, 1]"
        );
    }

    #[test]
    fn load_without_file() {
        let params = RunParams::load(None).unwrap();
        assert_eq!(params.layout, "corridor3");
    }

    #[test]
    fn load_keeps_unset_nested_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");
        fs::write(&path, "layout: square3\nagent_params:\n  critic_rate: 0.3\n").unwrap();

        let params = RunParams::load(Some(&path)).unwrap();
        assert_eq!(params.layout, "square3");
        assert_approx_eq!(f64, params.agent_params.critic_rate, 0.3);
        assert_approx_eq!(f64, params.agent_params.actor_rate, 0.1);
    }

    #[test]
    fn paddle_file_keeps_paddle_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");
        fs::write(
            &path,
            "layout: pong\niterations: 50\nagent_params:\n  seed_override: 3\n",
        )
        .unwrap();

        let params = RunParams::load_paddle(Some(&path)).unwrap();
        assert_eq!(params.iterations, 50);
        assert_eq!(params.values_path, PathBuf::from("pong_values.dat"));
        assert_approx_eq!(f64, params.agent_params.critic_rate, 0.05);
        assert_approx_eq!(f64, params.agent_params.reward_scale, 100.0);
        assert_eq!(params.agent_params.seed_override, Some(3));

        assert!(RunParams::load(Some(&path)).unwrap_err().is_configuration());
    }

    #[test]
    fn load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.yaml");
        fs::write(&path, "agent_params:\n  discount: 2.0\n").unwrap();

        let result = RunParams::load(Some(&path));
        assert_eq!(
            result.unwrap_err().to_string(),
            "configuration error: discount must be in [0, 1]"
        );
    }
}
