use std::env;
use std::path::PathBuf;

use clap::Parser;
use tdworld::{
    agent::TabularCriticAgent,
    environment::{Environment, GridEnvironment},
    error::Result,
    grid::GridState,
    learner::TablePaths,
    params::{LearnerKind, RunParams},
    q_learning::QLearningAgent,
    training::Trainer,
};

/// Trains a tabular learner on a gridworld layout. Further settings are read
/// from the YAML file named by TDWORLD_CONFIG.
#[derive(Parser)]
struct Args {
    /// Number of actions to take
    iterations: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config_path = env::var_os("TDWORLD_CONFIG").map(PathBuf::from);
    let mut params = RunParams::load(config_path.as_deref())?;
    if let Some(iterations) = args.iterations {
        params.iterations = iterations;
    }

    let mut env = GridEnvironment::from_layout_name(&params.layout)?;
    let dimensions = env.dimensions();

    let (summary, rows) = match params.learner {
        LearnerKind::ActorCritic => {
            let mut agent = TabularCriticAgent::load(
                params.agent_params.clone(),
                dimensions,
                env.num_actions(),
                TablePaths {
                    values: params.values_path.clone(),
                    policy: params.policy_path.clone(),
                },
            )?;
            let summary =
                Trainer::new(&mut env, &mut agent, params.flush_policy).run(params.iterations)?;
            (summary, agent.values().rows().to_vec())
        }
        LearnerKind::QLearning => {
            let mut agent = QLearningAgent::load(
                params.q_learning_params.clone(),
                dimensions,
                env.num_actions(),
                params.policy_path.clone(),
            )?;
            let summary =
                Trainer::new(&mut env, &mut agent, params.flush_policy).run(params.iterations)?;
            let rows = (0..dimensions.height)
                .map(|y| {
                    (0..dimensions.width)
                        .map(|x| agent.max_q(GridState::new(x, y)))
                        .collect()
                })
                .collect::<Vec<Vec<f64>>>();
            (summary, rows)
        }
    };

    log::info!("world:\n{}", env.render_world());
    log::info!("states visited:\n{}", env.render_visits());
    log::info!(
        "reward collected {:.3}, punishment collected {:.3}",
        env.counters().reward_collected,
        env.counters().punishment_collected
    );

    for row in rows {
        println!(
            "{}",
            row.iter()
                .map(|value| format!("{:8.4}", value))
                .collect::<Vec<_>>()
                .join(" ")
        );
    }
    println!(
        "steps: {}, episodes: {}, total reward: {:.3}",
        summary.steps, summary.episodes, summary.total_reward
    );

    Ok(())
}
