use super::Optimizer;
use crate::storage::{Result, SizeMismatchErr};

/// RMSProp without momentum.
///
/// `ms = decay * ms + (1 - decay) * g^2`, then `p -= lr * g / sqrt(ms + epsilon)`.
#[derive(Debug)]
pub struct RmsProp {
    learning_rate: f32,
    decay: f32,
    epsilon: f32,
    mean_square: Box<[f32]>,
}

impl RmsProp {
    /// Creates a new `RmsProp` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance keeps statistics for.
    /// * `learning_rate` - The step size.
    /// * `decay` - The discount of the squared gradient moving average.
    /// * `epsilon` - Keeps the denominator away from zero.
    pub fn new(len: usize, learning_rate: f32, decay: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            decay,
            epsilon,
            mean_square: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for RmsProp {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        if grad.len() != params.len() || grad.len() != self.mean_square.len() {
            return Err(SizeMismatchErr);
        }

        let Self {
            learning_rate: lr,
            decay,
            epsilon: eps,
            ..
        } = *self;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.mean_square.iter_mut())
            .for_each(|((p, g), ms)| {
                *ms = decay * *ms + (1. - decay) * g * g;
                *p -= lr * g / (*ms + eps).sqrt();
            });

        Ok(())
    }

    fn mean_square(&self) -> Option<f32> {
        mean(&self.mean_square)
    }
}

pub(super) fn mean(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }

    Some(values.iter().sum::<f32>() / values.len() as f32)
}
