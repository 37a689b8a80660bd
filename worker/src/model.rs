use comms::specs::model::ModelSpec;
use machine_learning::{
    MlErr,
    arch::{ActorCritic, Layout, LossStats},
    rl::Categorical,
};
use ndarray::ArrayView2;

use crate::error::Result;

/// A worker's private copy of the policy/value network.
///
/// The parameters are overwritten wholesale by every pull, the gradient buffer is reused
/// across update cycles.
pub struct LocalModel {
    arch: ActorCritic,
    params: Vec<f32>,
    grad: Vec<f32>,
}

impl LocalModel {
    /// Creates a new `LocalModel` with zeroed parameters.
    ///
    /// # Arguments
    /// * `spec` - The model specification shared with the parameter server.
    pub fn new(spec: &ModelSpec) -> Result<Self> {
        let arch = ActorCritic::new(spec)?;
        let size = arch.size();

        Ok(Self {
            arch,
            params: vec![0.; size],
            grad: vec![0.; size],
        })
    }

    pub fn layout(&self) -> &Layout {
        self.arch.layout()
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    /// The buffer a pull writes into.
    pub fn params_mut(&mut self) -> &mut [f32] {
        &mut self.params
    }

    /// Evaluates the current policy and value function at `state`.
    pub fn act(&mut self, state: &[f32]) -> Result<(Categorical, f32)> {
        Ok(self.arch.act(&self.params, state)?)
    }

    /// The value estimate of `state`, used to bootstrap truncated rollouts.
    pub fn value(&mut self, state: &[f32]) -> Result<f32> {
        Ok(self.arch.value(&self.params, state)?)
    }

    /// Computes the gradient of the actor-critic loss over a rollout.
    ///
    /// # Arguments
    /// * `states` - The visited states, concatenated in order.
    /// * `actions` - The sampled actions.
    /// * `returns` - The n-step returns.
    /// * `entropy_coef` - The entropy bonus coefficient.
    ///
    /// # Returns
    /// The gradient, laid out as the parameters, and the loss statistics.
    pub fn compute_gradients(
        &mut self,
        states: &[f32],
        actions: &[usize],
        returns: &[f32],
        entropy_coef: f32,
    ) -> Result<(&[f32], LossStats)> {
        let n = actions.len();
        if n == 0 {
            return Err(MlErr::EmptyBatch.into());
        }

        let states = ArrayView2::from_shape((n, states.len() / n), states).map_err(MlErr::from)?;
        let stats = self.arch.compute_gradients(
            &self.params,
            states,
            actions,
            returns,
            entropy_coef,
            &mut self.grad,
        )?;

        Ok((&self.grad, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comms::specs::model::ActFnSpec;

    fn spec() -> ModelSpec {
        ModelSpec::ActorCritic {
            input: 2,
            hidden: vec![4],
            actions: 3,
            act_fn: ActFnSpec::Tanh,
        }
    }

    #[test]
    fn gradient_has_the_parameters_layout() {
        let mut model = LocalModel::new(&spec()).unwrap();
        for (i, p) in model.params_mut().iter_mut().enumerate() {
            *p = (i as f32 * 0.37).sin() * 0.1;
        }

        let size = model.layout().len();
        let states = [0.1, 0.2, -0.3, 0.4];
        let (grad, stats) = model
            .compute_gradients(&states, &[0, 2], &[1., -1.], 0.01)
            .unwrap();

        assert_eq!(grad.len(), size);
        assert!(grad.iter().any(|g| *g != 0.));
        assert!(stats.loss.is_finite());
    }

    #[test]
    fn empty_rollout_is_an_error() {
        let mut model = LocalModel::new(&spec()).unwrap();
        assert!(model.compute_gradients(&[], &[], &[], 0.01).is_err());
    }

    #[test]
    fn act_returns_a_distribution_over_every_action() {
        let mut model = LocalModel::new(&spec()).unwrap();
        let (dist, value) = model.act(&[0.5, -0.5]).unwrap();

        assert_eq!(dist.len(), 3);
        assert_eq!(value, 0.);
    }
}
