use std::env;
use std::fs;
use std::path::PathBuf;

use clap::Parser;
use tdworld::{
    agent::TabularCriticAgent,
    environment::Environment,
    error::{Error, Result},
    learner::TablePaths,
    paddle::PaddleEnvironment,
    params::RunParams,
    training::Trainer,
};

/// Pre-trains a Pong paddle controller in the simulated tracking world,
/// always starting from fresh tables.
#[derive(Parser)]
struct Args {
    /// Number of actions to take
    iterations: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config_path = env::var_os("TDWORLD_CONFIG").map(PathBuf::from);
    let params = RunParams::load_paddle(config_path.as_deref())?;

    let iterations = args.iterations.unwrap_or(params.iterations);

    for path in [&params.values_path, &params.policy_path] {
        if path.exists() {
            fs::remove_file(path).map_err(|source| Error::Io {
                path: path.clone(),
                source,
            })?;
        }
    }

    let mut env = PaddleEnvironment::new(params.agent_params.seed_override);
    let mut agent = TabularCriticAgent::load(
        params.agent_params.clone(),
        env.dimensions(),
        env.num_actions(),
        TablePaths {
            values: params.values_path.clone(),
            policy: params.policy_path.clone(),
        },
    )?;

    let summary = Trainer::new(&mut env, &mut agent, params.flush_policy).run(iterations)?;

    for row in agent.values().rows() {
        println!(
            "{}",
            row.iter()
                .map(|value| format!("{:9.3}", value))
                .collect::<Vec<_>>()
                .join(" ")
        );
    }
    println!(
        "steps: {}, catches: {}, total reward: {:.3}",
        summary.steps,
        env.catches(),
        summary.total_reward
    );

    Ok(())
}
