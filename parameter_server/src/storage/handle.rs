use std::ops::Deref;

use machine_learning::checkpoint::Checkpoint;
use tokio::task;

use super::{LoadErr, ParameterStore, Result};
use crate::optimization::Optimizer;

/// The interface the service uses to reach a `ParameterStore`.
///
/// It bridges the async runtime with the blocking CPU-bound implementation of the store, so it
/// must be used from a multi-threaded runtime.
pub struct ParameterHandle<O: Optimizer>(ParameterStore<O>);

impl<O: Optimizer> Clone for ParameterHandle<O> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<O: Optimizer> Deref for ParameterHandle<O> {
    type Target = ParameterStore<O>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<O: Optimizer> ParameterHandle<O> {
    pub fn new(store: ParameterStore<O>) -> Self {
        Self(store)
    }
}

impl<O: Optimizer + Send> ParameterHandle<O> {
    /// Async call to `ParameterStore::apply_gradients`.
    ///
    /// # Returns
    /// The norm of `grad` before clipping.
    pub async fn apply_gradients(&self, grad: &[f32]) -> Result<f32> {
        task::block_in_place(|| self.0.apply_gradients(grad))
    }

    /// Async call to `ParameterStore::pull_params`.
    pub async fn pull_params(&self, out: &mut [f32]) -> Result<()> {
        task::block_in_place(|| self.0.pull_params(out))
    }

    /// Async call to `ParameterStore::snapshot`.
    pub async fn snapshot(&self) -> Checkpoint {
        task::block_in_place(|| self.0.snapshot())
    }

    /// Async call to `ParameterStore::optimizer_stats`.
    pub async fn optimizer_stats(&self) -> Vec<(String, f32)> {
        task::block_in_place(|| self.0.optimizer_stats())
    }

    /// Restores a checkpoint, meant to run before any worker is served.
    pub fn restore(&self, checkpoint: &Checkpoint) -> std::result::Result<(), LoadErr> {
        self.0.restore(checkpoint)
    }
}
