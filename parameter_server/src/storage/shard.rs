use parking_lot::{Mutex, RwLock};

use crate::{
    optimization::Optimizer,
    storage::{Result, SizeMismatchErr},
};

/// One tensor of the global parameters together with its optimizer state.
///
/// Updates to a shard are atomic: readers observe the tensor either before or after a whole
/// optimizer step. Nothing orders updates across shards.
#[derive(Debug)]
pub struct ParameterShard<O: Optimizer> {
    nparams: usize,
    params: RwLock<Box<[f32]>>,
    optimizer: Mutex<O>,
}

impl<O: Optimizer> ParameterShard<O> {
    /// Creates a new `ParameterShard`.
    ///
    /// # Arguments
    /// * `params` - The initial values of the tensor.
    /// * `optimizer` - The optimizer owning this tensor's statistics.
    pub fn new(params: Vec<f32>, optimizer: O) -> Self {
        Self {
            nparams: params.len(),
            params: RwLock::new(params.into_boxed_slice()),
            optimizer: Mutex::new(optimizer),
        }
    }

    pub fn len(&self) -> usize {
        self.nparams
    }

    /// Runs one optimizer step with `grad` on this shard.
    ///
    /// # Arguments
    /// * `grad` - This tensor's slice of the gradient.
    pub fn apply(&self, grad: &[f32]) -> Result<()> {
        if grad.len() != self.nparams {
            return Err(SizeMismatchErr);
        }

        let mut params = self.params.write();
        self.optimizer.lock().update_params(grad, &mut params)
    }

    /// Copies the tensor into `out`.
    pub fn pull_params(&self, out: &mut [f32]) -> Result<()> {
        if out.len() != self.nparams {
            return Err(SizeMismatchErr);
        }

        out.copy_from_slice(&self.params.read());
        Ok(())
    }

    /// The mean squared gradient average of this tensor's optimizer, if it keeps one.
    pub fn mean_square(&self) -> Option<f32> {
        self.optimizer.lock().mean_square()
    }

    /// Replaces the tensor's values, the optimizer statistics are kept.
    pub fn overwrite(&self, values: &[f32]) -> Result<()> {
        if values.len() != self.nparams {
            return Err(SizeMismatchErr);
        }

        self.params.write().copy_from_slice(values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AddOptimizer;

    impl Optimizer for AddOptimizer {
        fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
            params.iter_mut().zip(grad).for_each(|(p, g)| *p += g);
            Ok(())
        }
    }

    #[test]
    fn apply_then_pull() {
        let shard = ParameterShard::new(vec![0.; 3], AddOptimizer);

        shard.apply(&[1., 2., 3.]).unwrap();
        shard.apply(&[1., 1., 1.]).unwrap();

        let mut out = [0.; 3];
        shard.pull_params(&mut out).unwrap();
        assert_eq!(out, [2., 3., 4.]);
    }

    #[test]
    fn overwrite_replaces_values() {
        let shard = ParameterShard::new(vec![5.; 2], AddOptimizer);
        shard.overwrite(&[1., 2.]).unwrap();

        let mut out = [0.; 2];
        shard.pull_params(&mut out).unwrap();
        assert_eq!(out, [1., 2.]);
    }

    #[test]
    fn wrong_sizes_are_rejected() {
        let shard = ParameterShard::new(vec![0.; 2], AddOptimizer);

        assert_eq!(shard.apply(&[1.]), Err(SizeMismatchErr));
        assert_eq!(shard.pull_params(&mut [0.; 3]), Err(SizeMismatchErr));
        assert_eq!(shard.overwrite(&[]), Err(SizeMismatchErr));
    }
}
