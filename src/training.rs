use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::learner::{Learner, Transition};
use crate::params::FlushPolicy;

const MAX_CONSECUTIVE_RESTARTS: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSummary {
    pub steps: usize,
    pub episodes: usize,
    pub updates: usize,
    pub total_reward: f64,
    pub mean_abs_td_error: f64,
}

/// Drives a learner through an environment for a fixed number of actions.
///
/// Reaching a terminal state does not consume an iteration: the next loop
/// turn starts a new episode instead of acting.
pub struct Trainer<'a, E: Environment, L: Learner> {
    env: &'a mut E,
    learner: &'a mut L,
    flush_policy: FlushPolicy,
}

impl<'a, E: Environment, L: Learner> Trainer<'a, E, L> {
    pub fn new(env: &'a mut E, learner: &'a mut L, flush_policy: FlushPolicy) -> Self {
        Self {
            env,
            learner,
            flush_policy,
        }
    }

    /// Acts and learns for `iterations` steps, flushing tables per the
    /// configured policy.
    pub fn run(&mut self, iterations: usize) -> Result<TrainingSummary> {
        let summary = self.rollout(iterations, true)?;

        log::info!(
            "training done: {} steps, {} episodes, total reward {:.3}, mean |td error| {:.4}",
            summary.steps,
            summary.episodes,
            summary.total_reward,
            summary.mean_abs_td_error
        );

        Ok(summary)
    }

    /// Acts on the learner's current policy without learning and
    /// without touching persisted tables.
    pub fn play(&mut self, iterations: usize) -> Result<TrainingSummary> {
        let summary = self.rollout(iterations, false)?;

        log::info!(
            "play done: {} steps, {} episodes, total reward {:.3}",
            summary.steps,
            summary.episodes,
            summary.total_reward
        );

        Ok(summary)
    }

    fn rollout(&mut self, iterations: usize, learning: bool) -> Result<TrainingSummary> {
        let mut summary = TrainingSummary::default();
        let mut abs_td_error_sum = 0.0;
        let mut episode_reward = 0.0;
        let mut consecutive_restarts = 0;
        let mut unflushed = false;

        while summary.steps < iterations {
            if self.env.is_terminal() {
                consecutive_restarts += 1;
                if consecutive_restarts > MAX_CONSECUTIVE_RESTARTS {
                    return Err(Error::configuration(
                        "environment keeps starting episodes in a terminal state",
                    ));
                }

                self.finish_episode(&mut summary, episode_reward, learning, &mut unflushed)?;
                episode_reward = 0.0;
                self.env.start_new_episode()?;
                continue;
            }

            consecutive_restarts = 0;

            let state = self.env.current_state();
            let action_idx = self.learner.select_action(state)?;
            let step = self.env.step(action_idx)?;
            summary.steps += 1;
            summary.total_reward += step.reward;
            episode_reward += step.reward;

            if !learning {
                continue;
            }

            let transition = Transition {
                state,
                action_idx,
                reward: step.reward,
                next_state: step.state,
                terminal: step.terminal,
            };

            if let Some(td_error) = self.learner.learn(&transition) {
                summary.updates += 1;
                abs_td_error_sum += td_error.abs();
                unflushed = true;
            }

            if self.flush_policy == FlushPolicy::EveryStep {
                self.flush(&mut unflushed)?;
            }
        }

        if self.env.is_terminal() {
            self.finish_episode(&mut summary, episode_reward, learning, &mut unflushed)?;
        }

        if summary.updates > 0 {
            summary.mean_abs_td_error = abs_td_error_sum / summary.updates as f64;
        }

        if unflushed && self.flush_policy != FlushPolicy::Never {
            self.flush(&mut unflushed)?;
        }

        Ok(summary)
    }

    fn finish_episode(
        &mut self,
        summary: &mut TrainingSummary,
        episode_reward: f64,
        learning: bool,
        unflushed: &mut bool,
    ) -> Result<()> {
        summary.episodes += 1;

        log::debug!(
            "episode {} finished after step {} with reward {:.3}",
            summary.episodes,
            summary.steps,
            episode_reward
        );

        if !learning {
            return Ok(());
        }

        self.learner.end_episode();

        if self.flush_policy == FlushPolicy::EveryEpisode && *unflushed {
            self.flush(unflushed)?;
        }

        Ok(())
    }

    fn flush(&mut self, unflushed: &mut bool) -> Result<()> {
        self.learner.flush()?;
        *unflushed = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::GridEnvironment;
    use crate::grid::{GridState, Layout};
    use float_cmp::assert_approx_eq;
    use std::cell::Cell;

    /// Always walks west and counts flushes.
    #[derive(Default)]
    struct WestWalker {
        learned: Vec<Transition>,
        episodes: usize,
        flushes: Cell<usize>,
    }

    impl Learner for WestWalker {
        fn select_action(&mut self, _state: GridState) -> Result<usize> {
            Ok(0)
        }

        fn learn(&mut self, transition: &Transition) -> Option<f64> {
            self.learned.push(*transition);
            Some(transition.reward)
        }

        fn end_episode(&mut self) {
            self.episodes += 1;
        }

        fn flush(&self) -> Result<()> {
            self.flushes.set(self.flushes.get() + 1);
            Ok(())
        }
    }

    fn run(flush_policy: FlushPolicy, iterations: usize) -> (WestWalker, TrainingSummary) {
        let mut env = GridEnvironment::from_layout_name("corridor3").unwrap();
        let mut learner = WestWalker::default();
        let summary = Trainer::new(&mut env, &mut learner, flush_policy)
            .run(iterations)
            .unwrap();
        (learner, summary)
    }

    #[test]
    fn terminal_restarts_episode() {
        let (learner, summary) = run(FlushPolicy::Never, 3);

        assert_eq!(summary.steps, 3);
        assert_eq!(summary.episodes, 3);
        assert_eq!(learner.episodes, 3);
        assert!(learner
            .learned
            .iter()
            .all(|t| t.state == GridState::new(1, 0) && t.terminal));
        assert_eq!(learner.flushes.get(), 0);
    }

    #[test]
    fn flush_policies() {
        assert_eq!(run(FlushPolicy::EveryStep, 4).0.flushes.get(), 4);
        assert_eq!(run(FlushPolicy::EveryEpisode, 4).0.flushes.get(), 4);
        assert_eq!(run(FlushPolicy::EndOfRun, 4).0.flushes.get(), 1);
        assert_eq!(run(FlushPolicy::Never, 4).0.flushes.get(), 0);
    }

    #[test]
    fn run_ending_mid_episode_flushes_once() {
        let layout = Layout::by_name("corridor5").unwrap();
        let mut env = GridEnvironment::new(layout);
        let mut learner = WestWalker::default();

        let summary = Trainer::new(&mut env, &mut learner, FlushPolicy::EveryEpisode)
            .run(1)
            .unwrap();
        assert_eq!(summary.episodes, 0);
        assert_eq!(learner.flushes.get(), 1);
    }

    #[test]
    fn play_neither_learns_nor_flushes() {
        let mut env = GridEnvironment::from_layout_name("corridor3").unwrap();
        let mut learner = WestWalker::default();

        let summary = Trainer::new(&mut env, &mut learner, FlushPolicy::EveryStep)
            .play(3)
            .unwrap();
        assert_eq!(summary.steps, 3);
        assert_eq!(summary.episodes, 3);
        assert_eq!(summary.updates, 0);
        assert_approx_eq!(f64, summary.total_reward, 3.0);
        assert!(learner.learned.is_empty());
        assert_eq!(learner.episodes, 0);
        assert_eq!(learner.flushes.get(), 0);
    }

    #[test]
    fn terminal_start_is_rejected() {
        let layout = Layout::new("dot", vec![vec![1.0]], GridState::new(0, 0), &[GridState::new(0, 0)])
            .unwrap();
        let mut env = GridEnvironment::new(layout);
        let mut learner = WestWalker::default();

        let result = Trainer::new(&mut env, &mut learner, FlushPolicy::Never).run(10);
        assert!(result.unwrap_err().is_configuration());
        assert!(learner.learned.is_empty());
    }

    #[test]
    fn zero_iterations() {
        let (learner, summary) = run(FlushPolicy::EndOfRun, 0);
        assert_eq!(summary, TrainingSummary::default());
        assert_eq!(learner.flushes.get(), 0);
    }
}
