use std::ops::Range;

use comms::specs::model::ModelSpec;
use ndarray::{Array1, Array2, ArrayView2, Axis};

use super::{ActFn, Dense, Layout};
use crate::{
    MlErr, Result,
    rl::{Categorical, global_norm},
};

/// Diagnostics of a single gradient computation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LossStats {
    pub policy_loss: f32,
    pub value_loss: f32,
    pub loss: f32,
    pub entropy: f32,
    pub advantage_mean: f32,
    pub grad_norm: f32,
    pub grad_norm_policy: f32,
    pub grad_norm_value: f32,
}

/// A policy/value network with a shared dense trunk and two linear heads.
///
/// The network holds no parameters, every call receives the flat buffer described by
/// `ActorCritic::layout`.
#[derive(Debug, Clone)]
pub struct ActorCritic {
    trunk: Vec<Dense>,
    policy: Dense,
    value: Dense,
    layout: Layout,
    spans: Vec<Range<usize>>,
    scratch: Vec<f32>,
}

impl ActorCritic {
    /// Creates a new `ActorCritic` from its specification.
    ///
    /// # Arguments
    /// * `spec` - The model specification shared with the parameter server.
    ///
    /// # Returns
    /// The network or an `MlErr::InvalidModel` if the specification is degenerate.
    pub fn new(spec: &ModelSpec) -> Result<Self> {
        let layout = Layout::from_spec(spec)?;
        let ModelSpec::ActorCritic {
            input,
            hidden,
            actions,
            act_fn,
        } = spec;

        let act_fn = ActFn::from(*act_fn);
        let mut fan_in = *input;
        let mut trunk = Vec::with_capacity(hidden.len());

        for &fan_out in hidden {
            trunk.push(Dense::new((fan_in, fan_out), Some(act_fn)));
            fan_in = fan_out;
        }

        let policy = Dense::new((fan_in, *actions), None);
        let value = Dense::new((fan_in, 1), None);

        // Weight and bias of a layer are adjacent in the layout.
        let spans = layout
            .ranges()
            .chunks_exact(2)
            .map(|pair| pair[0].start..pair[1].end)
            .collect();

        Ok(Self {
            trunk,
            policy,
            value,
            scratch: vec![0.; layout.len()],
            layout,
            spans,
        })
    }

    /// The amount of parameters of the network.
    pub fn size(&self) -> usize {
        self.layout.len()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The amount of discrete actions the policy head scores.
    pub fn actions(&self) -> usize {
        self.layout.tensors()[2 * self.trunk.len() + 1].len()
    }

    /// Makes a forward pass over a batch of states.
    ///
    /// # Arguments
    /// * `params` - The flat parameter buffer.
    /// * `states` - One state per row.
    ///
    /// # Returns
    /// The policy logits, one row per state, and the value estimates.
    pub fn forward(
        &mut self,
        params: &[f32],
        states: ArrayView2<f32>,
    ) -> Result<(Array2<f32>, Array1<f32>)> {
        self.check_len("actor critic params", params.len())?;

        let mut h = states.to_owned();
        for (layer, span) in self.trunk.iter_mut().zip(&self.spans) {
            h = layer.forward(&params[span.clone()], h.view())?;
        }

        let n = self.trunk.len();
        let logits = self.policy.forward(&params[self.spans[n].clone()], h.view())?;
        let values = self
            .value
            .forward(&params[self.spans[n + 1].clone()], h.view())?
            .remove_axis(Axis(1));

        Ok((logits, values))
    }

    /// Evaluates a single state.
    ///
    /// # Returns
    /// The action distribution to sample from and the value estimate of `state`.
    pub fn act(&mut self, params: &[f32], state: &[f32]) -> Result<(Categorical, f32)> {
        let states = ArrayView2::from_shape((1, state.len()), state)?;
        let (logits, values) = self.forward(params, states)?;
        let logits: Vec<f32> = logits.row(0).to_vec();

        Ok((Categorical::from_logits(&logits), values[0]))
    }

    /// The value estimate of a single state.
    pub fn value(&mut self, params: &[f32], state: &[f32]) -> Result<f32> {
        self.act(params, state).map(|(_, value)| value)
    }

    /// Computes the gradient of the A3C loss over a rollout.
    ///
    /// `loss = -mean(log pi(a|s) * A) - beta * mean(H(pi(.|s))) + mean((V(s) - R)^2)` where
    /// the advantage `A = R - V(s)` is a constant of the policy term.
    ///
    /// # Arguments
    /// * `params` - The flat parameter buffer the rollout was collected with.
    /// * `states` - The visited states, one per row.
    /// * `actions` - The sampled actions.
    /// * `returns` - The n-step returns.
    /// * `entropy_coef` - The entropy bonus coefficient, `beta`.
    /// * `grad` - Where to write the gradient, laid out as `params`.
    ///
    /// # Returns
    /// The loss components and the gradient norms.
    pub fn compute_gradients(
        &mut self,
        params: &[f32],
        states: ArrayView2<f32>,
        actions: &[usize],
        returns: &[f32],
        entropy_coef: f32,
        grad: &mut [f32],
    ) -> Result<LossStats> {
        let n = states.nrows();
        if n == 0 {
            return Err(MlErr::EmptyBatch);
        }

        for (what, got) in [("actions", actions.len()), ("returns", returns.len())] {
            if got != n {
                return Err(MlErr::SizeMismatch {
                    what,
                    got,
                    expected: n,
                });
            }
        }

        self.check_len("actor critic grad", grad.len())?;

        let (logits, values) = self.forward(params, states)?;
        let actions_n = logits.ncols();
        let inv_n = 1. / n as f32;

        let mut d_logits = Array2::zeros((n, actions_n));
        let mut d_values = Array2::zeros((n, 1));
        let mut stats = LossStats::default();

        for (i, (&action, &ret)) in actions.iter().zip(returns).enumerate() {
            if action >= actions_n {
                return Err(MlErr::SizeMismatch {
                    what: "action index",
                    got: action,
                    expected: actions_n,
                });
            }

            let dist = Categorical::from_logits(&logits.row(i).to_vec());
            let value = values[i];
            let advantage = ret - value;
            let entropy = dist.entropy();

            stats.policy_loss -= dist.log_prob(action) * advantage;
            stats.value_loss += (value - ret).powi(2);
            stats.entropy += entropy;
            stats.advantage_mean += advantage;

            for (j, &p) in dist.probs().iter().enumerate() {
                let onehot = if j == action { 1. } else { 0. };
                let pg = -(onehot - p) * advantage;
                let eg = entropy_coef * p * (dist.log_prob(j) + entropy);
                d_logits[[i, j]] = (pg + eg) * inv_n;
            }

            d_values[[i, 0]] = 2. * (value - ret) * inv_n;
        }

        stats.entropy *= inv_n;
        stats.advantage_mean *= inv_n;
        stats.policy_loss = stats.policy_loss * inv_n - entropy_coef * stats.entropy;
        stats.value_loss *= inv_n;
        stats.loss = stats.policy_loss + stats.value_loss;

        let n_trunk = self.trunk.len();
        let policy_span = self.spans[n_trunk].clone();
        let value_span = self.spans[n_trunk + 1].clone();

        grad.fill(0.);
        self.scratch.fill(0.);

        let dh = self.policy.backward(
            &params[policy_span.clone()],
            &mut grad[policy_span],
            d_logits,
        )?;
        backprop_trunk(&self.trunk, &self.spans, params, grad, dh)?;

        let dh = self.value.backward(
            &params[value_span.clone()],
            &mut self.scratch[value_span],
            d_values,
        )?;
        backprop_trunk(&self.trunk, &self.spans, params, &mut self.scratch, dh)?;

        stats.grad_norm_policy = global_norm(grad);
        stats.grad_norm_value = global_norm(&self.scratch);

        grad.iter_mut()
            .zip(&self.scratch)
            .for_each(|(g, s)| *g += s);
        stats.grad_norm = global_norm(grad);

        Ok(stats)
    }

    fn check_len(&self, what: &'static str, got: usize) -> Result<()> {
        if got != self.size() {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected: self.size(),
            });
        }

        Ok(())
    }
}

/// Back-propagates `d` through the trunk, last layer first.
fn backprop_trunk(
    trunk: &[Dense],
    spans: &[Range<usize>],
    params: &[f32],
    grad: &mut [f32],
    mut d: Array2<f32>,
) -> Result<()> {
    for (layer, span) in trunk.iter().zip(spans).rev() {
        d = layer.backward(&params[span.clone()], &mut grad[span.clone()], d)?;
    }

    Ok(())
}
