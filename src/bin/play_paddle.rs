use std::env;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tdworld::{
    agent::TabularCriticAgent,
    environment::Environment,
    error::{Error, Result},
    grid::Dimensions,
    learner::TablePaths,
    mailbox::{mailbox, Collector, Poster},
    paddle::{PaddleCommand, PADDLE_GRID_SIZE},
    params::{FlushPolicy, RunParams},
    remote::{PongObservation, RemoteEnvironment, SCREEN_SIZE},
    training::Trainer,
};

const FRAME: Duration = Duration::from_millis(16);
const STEP_INTERVAL: Duration = Duration::from_millis(100);
const PADDLE_HEIGHT: f64 = SCREEN_SIZE / PADDLE_GRID_SIZE as f64;
const BALL_SPEED: (f64, f64) = (6.0, 4.0);

/// Plays against a built-in ball with tables trained by `train_paddle`.
/// Nothing is learned and the tables are left untouched.
#[derive(Parser)]
struct Args {
    /// Number of actions to take
    iterations: Option<usize>,
}

#[derive(Debug, Default)]
struct GameStats {
    frames: usize,
    hits: usize,
    misses: usize,
}

/// Bounces a ball around the screen and moves the paddle on the right wall
/// by one paddle height per command, until the controller goes away.
fn game_loop(
    commands: Collector<PaddleCommand>,
    observations: Poster<PongObservation>,
) -> GameStats {
    let mut stats = GameStats::default();
    let (mut ball_x, mut ball_y) = (SCREEN_SIZE / 2.0, SCREEN_SIZE / 2.0);
    let (mut dx, mut dy) = BALL_SPEED;
    let mut paddle: f64 = 0.0;

    while let Ok(pending) = commands.take() {
        if let Some(command) = pending {
            paddle = (paddle + command.direction() as f64 * PADDLE_HEIGHT)
                .clamp(0.0, SCREEN_SIZE - PADDLE_HEIGHT);
        }

        ball_x += dx;
        ball_y += dy;
        if ball_y <= 0.0 || ball_y >= SCREEN_SIZE {
            dy = -dy;
            ball_y = ball_y.clamp(0.0, SCREEN_SIZE);
        }
        if ball_x <= 0.0 {
            dx = dx.abs();
        } else if ball_x >= SCREEN_SIZE {
            if (paddle..paddle + PADDLE_HEIGHT).contains(&ball_y) {
                stats.hits += 1;
            } else {
                stats.misses += 1;
            }
            dx = -dx.abs();
        }

        let observation = PongObservation {
            ball_x,
            ball_y,
            paddle,
        };
        if observations.post(observation).is_err() {
            break;
        }

        stats.frames += 1;
        thread::sleep(FRAME);
    }

    stats
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config_path = env::var_os("TDWORLD_CONFIG").map(PathBuf::from);
    let params = RunParams::load_paddle(config_path.as_deref())?;
    let iterations = args.iterations.unwrap_or(params.iterations);

    let (command_tx, command_rx) = mailbox();
    let (observation_tx, observation_rx) = mailbox();
    let game = thread::spawn(move || game_loop(command_rx, observation_tx));

    let mut env = RemoteEnvironment::new(
        command_tx,
        observation_rx,
        Dimensions {
            width: PADDLE_GRID_SIZE,
            height: PADDLE_GRID_SIZE,
        },
    )?
    .with_step_interval(STEP_INTERVAL);

    let mut agent = TabularCriticAgent::load(
        params.agent_params.clone(),
        env.dimensions(),
        env.num_actions(),
        TablePaths {
            values: params.values_path.clone(),
            policy: params.policy_path.clone(),
        },
    )?;

    let summary = Trainer::new(&mut env, &mut agent, FlushPolicy::Never).play(iterations)?;
    let dropped_commands = env.dropped_commands();

    // closes the command mailbox, which stops the game loop
    drop(env);
    let stats = game
        .join()
        .map_err(|_| Error::Channel("game loop panicked".to_string()))?;

    log::info!("{} commands replaced before the game loop read them", dropped_commands);
    println!(
        "steps: {}, frames: {}, hits: {}, misses: {}",
        summary.steps, stats.frames, stats.hits, stats.misses
    );

    Ok(())
}
