use std::{mem, num::NonZeroUsize};

use environments::Environment;
use machine_learning::rl::n_step_returns;
use rand::Rng;

use crate::{error::Result, model::LocalModel};

/// How a rollout ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutEnd {
    /// The episode ended, there's nothing left to bootstrap from.
    Terminal,
    /// The horizon was reached mid episode.
    Truncated,
}

/// The transitions of one update cycle, in the order they were visited.
#[derive(Debug, Clone)]
pub struct Rollout {
    pub states: Vec<f32>,
    pub actions: Vec<usize>,
    pub rewards: Vec<f32>,
    /// The value estimate of every visited state.
    pub values: Vec<f32>,
    pub end: RolloutEnd,
}

impl Rollout {
    fn with_capacity(horizon: usize, observation_size: usize) -> Self {
        Self {
            states: Vec::with_capacity(horizon * observation_size),
            actions: Vec::with_capacity(horizon),
            rewards: Vec::with_capacity(horizon),
            values: Vec::with_capacity(horizon),
            end: RolloutEnd::Truncated,
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Records a transition.
    ///
    /// # Returns
    /// How the rollout ends if this was its last transition, `None` while collection goes on.
    fn record(
        &mut self,
        state: &[f32],
        action: usize,
        reward: f32,
        value: f32,
        done: bool,
        horizon: NonZeroUsize,
    ) -> Option<RolloutEnd> {
        self.states.extend_from_slice(state);
        self.actions.push(action);
        self.rewards.push(reward);
        self.values.push(value);

        if done {
            Some(RolloutEnd::Terminal)
        } else if self.len() == horizon.get() {
            Some(RolloutEnd::Truncated)
        } else {
            None
        }
    }

    /// Computes the training target of every transition.
    ///
    /// # Arguments
    /// * `gamma` - The discount factor.
    /// * `bootstrap` - Estimates the value of the state after the last transition, only
    ///                 called when the rollout was truncated.
    pub fn returns<F>(&self, gamma: f32, bootstrap: F) -> Result<Vec<f32>>
    where
        F: FnOnce() -> Result<f32>,
    {
        let bootstrap = match self.end {
            RolloutEnd::Terminal => None,
            RolloutEnd::Truncated => Some(bootstrap()?),
        };

        Ok(n_step_returns(&self.rewards, gamma, bootstrap))
    }
}

/// Runs the environment with the local policy for at most `horizon` steps.
///
/// Actions are sampled from the policy. When the episode ends the environment is reset and
/// the rollout stops early, `state` always holds the state the next rollout starts from.
///
/// # Arguments
/// * `env` - The environment to drive.
/// * `model` - The local model, synchronized before the call.
/// * `rng` - The source of action sampling.
/// * `state` - The current state of `env`.
/// * `horizon` - The maximum amount of transitions.
/// * `on_step` - Called after every step with the environment and the value estimate of the
///               state the action was taken in.
///
/// # Returns
/// A rollout holding between 1 and `horizon` transitions.
pub fn collect<E, R, F>(
    env: &mut E,
    model: &mut LocalModel,
    rng: &mut R,
    state: &mut Vec<f32>,
    horizon: NonZeroUsize,
    mut on_step: F,
) -> Result<Rollout>
where
    E: Environment + ?Sized,
    R: Rng + ?Sized,
    F: FnMut(&mut E, f32),
{
    let mut rollout = Rollout::with_capacity(horizon.get(), state.len());

    let end = loop {
        let (dist, value) = model.act(state)?;
        let action = dist.sample(rng);
        let step = env.step(action);
        on_step(&mut *env, value);

        let prev = mem::replace(state, step.state);
        if let Some(end) = rollout.record(&prev, action, step.reward, value, step.done, horizon) {
            break end;
        }
    };

    if end == RolloutEnd::Terminal {
        *state = env.reset();
    }

    rollout.end = end;
    Ok(rollout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use comms::specs::model::{ActFnSpec, ModelSpec};
    use environments::Step;
    use rand::{SeedableRng, rngs::StdRng};
    use std::collections::HashMap;

    /// Rewards 1 per step and ends the episode after `length` steps.
    struct Corridor {
        length: usize,
        t: usize,
        resets: usize,
    }

    impl Environment for Corridor {
        fn reset(&mut self) -> Vec<f32> {
            self.t = 0;
            self.resets += 1;
            vec![0.]
        }

        fn step(&mut self, _action: usize) -> Step {
            self.t += 1;
            Step {
                state: vec![self.t as f32],
                reward: 1.,
                done: self.t == self.length,
                info: HashMap::new(),
            }
        }

        fn actions(&self) -> usize {
            2
        }

        fn observation_size(&self) -> usize {
            1
        }
    }

    fn model() -> LocalModel {
        LocalModel::new(&ModelSpec::ActorCritic {
            input: 1,
            hidden: vec![2],
            actions: 2,
            act_fn: ActFnSpec::Tanh,
        })
        .unwrap()
    }

    fn horizon(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn stops_at_the_horizon_mid_episode() {
        let mut env = Corridor {
            length: 10,
            t: 0,
            resets: 0,
        };
        let mut state = env.reset();
        let mut rng = StdRng::seed_from_u64(0);
        let mut model = model();

        let rollout = collect(&mut env, &mut model, &mut rng, &mut state, horizon(3), |_, _| {})
            .unwrap();

        assert_eq!(rollout.len(), 3);
        assert_eq!(rollout.end, RolloutEnd::Truncated);
        assert_eq!(rollout.states, [0., 1., 2.]);
        assert_eq!(state, [3.]);
        assert_eq!(env.resets, 1);
    }

    #[test]
    fn stops_early_when_the_episode_ends() {
        let mut env = Corridor {
            length: 2,
            t: 0,
            resets: 0,
        };
        let mut state = env.reset();
        let mut rng = StdRng::seed_from_u64(0);
        let mut model = model();

        let mut calls = 0;
        let rollout = collect(&mut env, &mut model, &mut rng, &mut state, horizon(5), |_, _| {
            calls += 1
        })
        .unwrap();

        assert_eq!(rollout.len(), 2);
        assert_eq!(calls, 2);
        assert_eq!(rollout.end, RolloutEnd::Terminal);
        assert_eq!(state, [0.]);
        assert_eq!(env.resets, 2);
    }

    #[test]
    fn terminal_returns_ignore_the_bootstrap() {
        let rollout = Rollout {
            states: vec![0.; 3],
            actions: vec![0; 3],
            rewards: vec![1.; 3],
            values: vec![0.; 3],
            end: RolloutEnd::Terminal,
        };

        let returns = rollout.returns(0.9, || unreachable!()).unwrap();
        for (got, expected) in returns.iter().zip([2.71, 1.9, 1.0]) {
            assert!((got - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn truncated_returns_bootstrap_a_single_transition() {
        let rollout = Rollout {
            states: vec![0.],
            actions: vec![0],
            rewards: vec![1.],
            values: vec![0.],
            end: RolloutEnd::Truncated,
        };

        let returns = rollout.returns(0.9, || Ok(5.)).unwrap();
        assert_eq!(returns.len(), 1);
        assert!((returns[0] - 5.5).abs() < 1e-5);
    }
}
