use std::{
    ops::Range,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use machine_learning::{arch::Layout, checkpoint::Checkpoint, rl::clip_by_global_norm};
use rayon::prelude::*;

use super::{LoadErr, ParameterShard};
use crate::{
    initialization::ParamGen,
    optimization::Optimizer,
    storage::{Result, SizeMismatchErr},
};

/// The global parameters, sharded by tensor.
///
/// There's no lock around the whole store: concurrent `apply_gradients` calls interleave at the
/// granularity of single tensors, so a gradient may land on parameters that changed since the
/// worker pulled them, and a snapshot may be torn across tensors.
#[derive(Debug)]
pub struct ParameterStore<O: Optimizer> {
    layout: Arc<Layout>,
    ranges: Arc<[Range<usize>]>,
    shards: Arc<[ParameterShard<O>]>,
    updates: Arc<AtomicU64>,
    max_grad_norm: f32,
}

impl<O: Optimizer> Clone for ParameterStore<O> {
    fn clone(&self) -> Self {
        Self {
            layout: Arc::clone(&self.layout),
            ranges: Arc::clone(&self.ranges),
            shards: Arc::clone(&self.shards),
            updates: Arc::clone(&self.updates),
            max_grad_norm: self.max_grad_norm,
        }
    }
}

impl<O: Optimizer> ParameterStore<O> {
    /// Creates a new `ParameterStore`.
    ///
    /// # Arguments
    /// * `layout` - The tensors to store, one shard each.
    /// * `param_gen` - Produces the initial values in layout order.
    /// * `optimizer_factory` - Creates the optimizer of a tensor given its length.
    /// * `max_grad_norm` - Incoming gradients are clipped to this global norm.
    ///
    /// # Returns
    /// The store or a `SizeMismatchErr` if `param_gen` runs out before filling the layout.
    pub fn new<PG, OF>(
        layout: Layout,
        mut param_gen: PG,
        mut optimizer_factory: OF,
        max_grad_norm: f32,
    ) -> Result<Self>
    where
        PG: ParamGen,
        OF: FnMut(usize) -> O,
    {
        let mut shards = Vec::with_capacity(layout.tensors().len());

        for tensor in layout.tensors() {
            let len = tensor.len();
            let params = param_gen.sample(len).ok_or(SizeMismatchErr)?;
            if params.len() != len {
                return Err(SizeMismatchErr);
            }

            shards.push(ParameterShard::new(params, optimizer_factory(len)));
        }

        Ok(Self {
            ranges: Arc::from(layout.ranges()),
            layout: Arc::new(layout),
            shards: Arc::from(shards),
            updates: Arc::new(AtomicU64::new(0)),
            max_grad_norm,
        })
    }

    /// The amount of parameters in the store.
    pub fn len(&self) -> usize {
        self.layout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_empty()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// The amount of gradients applied so far, including those of a restored checkpoint.
    pub fn updates(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }
}

impl<O: Optimizer + Send> ParameterStore<O> {
    /// Clips `grad` to the maximum global norm and runs the optimizer on every shard.
    ///
    /// # Arguments
    /// * `grad` - A gradient laid out as the store.
    ///
    /// # Returns
    /// The norm of `grad` before clipping, or a `SizeMismatchErr`.
    pub(super) fn apply_gradients(&self, grad: &[f32]) -> Result<f32> {
        if grad.len() != self.len() {
            return Err(SizeMismatchErr);
        }

        let mut grad = grad.to_vec();
        let norm = clip_by_global_norm(&mut grad, self.max_grad_norm);

        self.shards
            .par_iter()
            .zip(self.ranges.par_iter())
            .try_for_each(|(shard, range)| shard.apply(&grad[range.clone()]))?;

        self.updates.fetch_add(1, Ordering::AcqRel);
        Ok(norm)
    }

    /// Reads the optimizer statistics of every tensor.
    ///
    /// # Returns
    /// The tensor names paired with their mean squared gradient average, empty if the
    /// optimizer keeps no such average.
    pub(super) fn optimizer_stats(&self) -> Vec<(String, f32)> {
        self.layout
            .tensors()
            .iter()
            .zip(self.shards.iter())
            .filter_map(|(tensor, shard)| Some((tensor.name.clone(), shard.mean_square()?)))
            .collect()
    }

    /// Copies every parameter into `out`.
    ///
    /// # Arguments
    /// * `out` - A buffer of exactly `self.len()` parameters.
    pub(super) fn pull_params(&self, out: &mut [f32]) -> Result<()> {
        if out.len() != self.len() {
            return Err(SizeMismatchErr);
        }

        self.shards
            .par_iter()
            .zip(split_by_ranges(out, &self.ranges))
            .try_for_each(|(shard, out_slice)| shard.pull_params(out_slice))
    }

    /// Takes a copy of the parameters and the update count.
    ///
    /// Each tensor is read atomically, but other workers may update the ones not read yet.
    pub(super) fn snapshot(&self) -> Checkpoint {
        let updates = self.updates();
        let mut params = vec![0.; self.len()];

        self.shards
            .par_iter()
            .zip(split_by_ranges(&mut params, &self.ranges))
            .for_each(|(shard, out_slice)| {
                // SAFETY: Both the buffer and the slices were built from the same layout.
                shard.pull_params(out_slice).unwrap()
            });

        Checkpoint {
            updates,
            layout: Layout::clone(&self.layout),
            params,
        }
    }

    /// Overwrites every parameter with the checkpoint's values.
    ///
    /// # Arguments
    /// * `checkpoint` - A checkpoint of the same layout as the store.
    ///
    /// # Returns
    /// A `LoadErr` if the tensors' names or shapes differ, the store is left untouched then.
    pub(super) fn restore(&self, checkpoint: &Checkpoint) -> std::result::Result<(), LoadErr> {
        checkpoint.check_layout(&self.layout)?;

        self.shards
            .par_iter()
            .zip(self.ranges.par_iter())
            .for_each(|(shard, range)| {
                // SAFETY: The checkpoint layout was just checked to be the store's.
                shard.overwrite(&checkpoint.params[range.clone()]).unwrap()
            });

        self.updates.store(checkpoint.updates, Ordering::Release);
        Ok(())
    }
}

/// Splits `buf` into the disjoint mutable slices given by contiguous `ranges`.
fn split_by_ranges<'a>(mut buf: &'a mut [f32], ranges: &[Range<usize>]) -> Vec<&'a mut [f32]> {
    let mut slices = Vec::with_capacity(ranges.len());

    for range in ranges {
        let (head, tail) = buf.split_at_mut(range.len());
        slices.push(head);
        buf = tail;
    }

    slices
}

#[cfg(test)]
mod tests {
    use std::thread;

    use machine_learning::{arch::TensorSpec, checkpoint::CheckpointErr};

    use super::*;
    use crate::{initialization::ConstParamGen, optimization::RmsProp};

    struct AddOptimizer;

    impl Optimizer for AddOptimizer {
        fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
            params.iter_mut().zip(grad).for_each(|(p, g)| *p += g);
            Ok(())
        }
    }

    fn layout() -> Layout {
        Layout::new(vec![
            TensorSpec::new("trunk.0.weight", vec![2, 3]),
            TensorSpec::new("trunk.0.bias", vec![3]),
            TensorSpec::new("value.bias", vec![1]),
        ])
    }

    fn create_test_store(init: f32, max_grad_norm: f32) -> ParameterStore<AddOptimizer> {
        let layout = layout();
        let param_gen = ConstParamGen::new(init, layout.len());
        ParameterStore::new(layout, param_gen, |_| AddOptimizer, max_grad_norm).unwrap()
    }

    fn pull(store: &ParameterStore<AddOptimizer>) -> Vec<f32> {
        let mut out = vec![0.; store.len()];
        store.pull_params(&mut out).unwrap();
        out
    }

    #[test]
    fn two_workers_updates_are_both_applied() {
        let store = create_test_store(1., f32::INFINITY);
        let delta_a: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let delta_b = vec![0.5; 10];

        let worker_a = store.clone();
        let worker_b = store.clone();
        worker_a.apply_gradients(&delta_a).unwrap();
        worker_b.apply_gradients(&delta_b).unwrap();

        let expected: Vec<f32> = delta_a.iter().zip(&delta_b).map(|(a, b)| 1. + a + b).collect();
        assert_eq!(pull(&store), expected);
        assert_eq!(store.updates(), 2);
    }

    #[test]
    fn concurrent_updates_are_not_dropped() {
        const WORKERS: usize = 8;
        const UPDATES: usize = 50;

        let store = create_test_store(0., f32::INFINITY);

        thread::scope(|s| {
            for _ in 0..WORKERS {
                let store = store.clone();
                s.spawn(move || {
                    for _ in 0..UPDATES {
                        store.apply_gradients(&[1.; 10]).unwrap();
                    }
                });
            }
        });

        assert_eq!(pull(&store), vec![(WORKERS * UPDATES) as f32; 10]);
        assert_eq!(store.updates(), (WORKERS * UPDATES) as u64);
    }

    #[test]
    fn gradients_are_clipped_before_the_optimizer() {
        let store = create_test_store(0., 0.5);
        let mut grad = vec![0.; 10];
        grad[0] = 3.;
        grad[9] = 4.;

        let norm = store.apply_gradients(&grad).unwrap();
        let params = pull(&store);

        assert_eq!(norm, 5.);
        assert!((params[0] - 0.3).abs() < 1e-6);
        assert!((params[9] - 0.4).abs() < 1e-6);
    }

    #[test]
    fn wrong_gradient_size_is_rejected() {
        let store = create_test_store(0., 0.5);
        assert_eq!(store.apply_gradients(&[1.; 3]), Err(SizeMismatchErr));
        assert_eq!(store.updates(), 0);
    }

    #[test]
    fn snapshot_then_restore() {
        let store = create_test_store(0., f32::INFINITY);
        store.apply_gradients(&[2.; 10]).unwrap();
        let snapshot = store.snapshot();

        let other = create_test_store(7., f32::INFINITY);
        other.restore(&snapshot).unwrap();

        assert_eq!(pull(&other), vec![2.; 10]);
        assert_eq!(other.updates(), 1);
        assert_eq!(snapshot.layout, layout());
    }

    #[test]
    fn restore_with_different_shapes_fails() {
        let store = create_test_store(3., f32::INFINITY);
        let checkpoint = Checkpoint::new(
            5,
            Layout::new(vec![
                TensorSpec::new("trunk.0.weight", vec![3, 2]),
                TensorSpec::new("trunk.0.bias", vec![3]),
                TensorSpec::new("value.bias", vec![1]),
            ]),
            vec![0.; 10],
        )
        .unwrap();

        let err = store.restore(&checkpoint).unwrap_err();
        assert!(matches!(err.0, CheckpointErr::ShapeMismatch { .. }));
        assert_eq!(pull(&store), vec![3.; 10]);
        assert_eq!(store.updates(), 0);
    }

    #[test]
    fn optimizer_stats_are_reported_per_tensor() {
        let layout = layout();
        let param_gen = ConstParamGen::new(0., layout.len());
        let optimizer_factory = |len| RmsProp::new(len, 0.1, 0.5, 1e-5);
        let store = ParameterStore::new(layout, param_gen, optimizer_factory, f32::INFINITY).unwrap();

        let mut grad = vec![0.; 10];
        grad[9] = 2.;
        store.apply_gradients(&grad).unwrap();

        let stats = store.optimizer_stats();
        let names: Vec<&str> = stats.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["trunk.0.weight", "trunk.0.bias", "value.bias"]);
        assert_eq!(stats[0].1, 0.);
        assert_eq!(stats[2].1, 2.);
    }

    #[test]
    fn stateless_optimizers_report_nothing() {
        let store = create_test_store(0., f32::INFINITY);
        store.apply_gradients(&[1.; 10]).unwrap();

        assert!(store.optimizer_stats().is_empty());
    }

    #[test]
    fn short_param_gen_is_rejected() {
        let param_gen = ConstParamGen::new(0., 4);
        let res = ParameterStore::new(layout(), param_gen, |_| AddOptimizer, 1.);
        assert!(res.is_err());
    }
}
