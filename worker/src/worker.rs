use std::time::Instant;

use comms::specs::worker::TrainingSpec;
use environments::Environment;
use log::{debug, info, warn};
use machine_learning::{arch::LossStats, checkpoint::Checkpoint};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    error::Result,
    metrics::MetricsSink,
    model::LocalModel,
    render::ValuePlot,
    rollout::{self, Rollout, RolloutEnd},
    sync::SyncClient,
};

/// What a worker did before terminating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub steps: u64,
    pub updates: u64,
}

/// A single actor-learner.
///
/// Every update cycle pulls the global parameters, collects a rollout with them, estimates
/// the returns and pushes the resulting gradient. The step budget is only checked between
/// cycles, so a worker may overshoot it by less than one rollout.
pub struct Worker<E, M> {
    worker_id: usize,
    env: E,
    model: LocalModel,
    training: TrainingSpec,
    rng: StdRng,
    metrics: M,
    plot: Option<ValuePlot>,
    state: Vec<f32>,
    episode_values: Vec<f32>,
    episodes: u64,
    stats: WorkerStats,
}

impl<E, M> Worker<E, M>
where
    E: Environment,
    M: MetricsSink,
{
    /// Creates a new `Worker` and starts the first episode.
    ///
    /// # Arguments
    /// * `worker_id` - Identifier used for observability, worker 0 also checkpoints.
    /// * `env` - This worker's own environment.
    /// * `model` - The local model.
    /// * `training` - The training hyperparameters.
    /// * `metrics` - Where to record the scalar time series.
    /// * `seed` - Seeds action sampling.
    pub fn new(
        worker_id: usize,
        mut env: E,
        model: LocalModel,
        training: TrainingSpec,
        metrics: M,
        seed: u64,
    ) -> Self {
        let state = env.reset();

        Self {
            worker_id,
            env,
            model,
            training,
            rng: StdRng::seed_from_u64(seed),
            metrics,
            plot: None,
            state,
            episode_values: Vec::new(),
            episodes: 0,
            stats: WorkerStats::default(),
        }
    }

    /// Renders the environment after every step and plots the recent value estimates.
    pub fn with_render(mut self) -> Self {
        self.plot = Some(ValuePlot::new());
        self
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    pub fn metrics(&self) -> &M {
        &self.metrics
    }

    /// Trains until the step budget is exhausted.
    ///
    /// # Arguments
    /// * `client` - The synchronization channel to the global parameters.
    ///
    /// # Returns
    /// The amount of steps and update cycles this worker ran.
    ///
    /// # Errors
    /// Any synchronization or model failure, checkpoint failures are only logged.
    pub async fn run<C: SyncClient>(&mut self, client: &mut C) -> Result<WorkerStats> {
        let max_steps = self.training.max_steps as u64;
        info!(worker_id = self.worker_id, max_steps = max_steps; "starting training");

        while self.stats.steps < max_steps {
            let start = Instant::now();
            let steps_before = self.stats.steps;
            self.update(client).await?;

            let elapsed = start.elapsed().as_secs_f32();
            if elapsed > 0. {
                let steps_per_second = (self.stats.steps - steps_before) as f32 / elapsed;
                self.record("steps_per_second", self.stats.updates, steps_per_second);
            }
        }

        info!(
            worker_id = self.worker_id,
            steps = self.stats.steps,
            updates = self.stats.updates;
            "step budget exhausted"
        );

        Ok(self.stats)
    }

    /// Runs a single update cycle.
    async fn update<C: SyncClient>(&mut self, client: &mut C) -> Result<()> {
        client.pull(self.model.params_mut()).await?;

        let worker_id = self.worker_id;
        let plot = &mut self.plot;
        let rollout = rollout::collect(
            &mut self.env,
            &mut self.model,
            &mut self.rng,
            &mut self.state,
            self.training.rollout_len,
            |env, value| {
                if let Some(plot) = plot.as_mut() {
                    env.render();
                    plot.push(value);
                    info!(worker_id = worker_id; "values {}", plot.sparkline());
                }
            },
        )?;

        self.stats.steps += rollout.len() as u64;

        let returns = rollout.returns(self.training.gamma, || self.model.value(&self.state))?;
        self.track_episode(&rollout);

        let (grad, loss) = self.model.compute_gradients(
            &rollout.states,
            &rollout.actions,
            &returns,
            self.training.entropy_coef,
        )?;

        debug!(
            worker_id = worker_id,
            update = self.stats.updates,
            transitions = rollout.len(),
            loss = loss.loss;
            "pushing gradient"
        );
        client.push(grad).await?;

        let updates = self.stats.updates;
        if updates != 0 && updates % self.training.summary_freq.get() as u64 == 0 {
            self.summarize(client, updates, &loss).await?;
        }

        self.stats.updates += 1;

        if self.worker_id == 0 && self.stats.updates % self.training.ckpt_freq.get() as u64 == 0 {
            self.checkpoint(client).await;
        }

        Ok(())
    }

    /// Accumulates the value estimates of the current episode, flushing them when it ends.
    fn track_episode(&mut self, rollout: &Rollout) {
        self.episode_values.extend_from_slice(&rollout.values);
        if rollout.end != RolloutEnd::Terminal {
            return;
        }

        let sum: f32 = self.episode_values.iter().sum();
        let mean = sum / self.episode_values.len() as f32;
        self.episode_values.clear();

        let episode = self.episodes;
        self.episodes += 1;

        self.record("rl/episode_value_sum", episode, sum);
        self.record("rl/episode_value_mean", episode, mean);
    }

    /// Records the loss components and the shared optimizer's statistics.
    async fn summarize<C: SyncClient>(
        &mut self,
        client: &mut C,
        step: u64,
        loss: &LossStats,
    ) -> Result<()> {
        let scalars = [
            ("rl/value_loss", loss.value_loss),
            ("rl/policy_loss", loss.policy_loss),
            ("rl/combined_loss", loss.loss),
            ("rl/policy_entropy", loss.entropy),
            ("rl/advantage_mean", loss.advantage_mean),
            ("gradients/norm", loss.grad_norm),
            ("gradients/norm_policy", loss.grad_norm_policy),
            ("gradients/norm_value", loss.grad_norm_value),
        ];

        for (name, value) in scalars {
            self.record(name, step, value);
        }

        for (tensor, mean_square) in client.optimizer_stats().await? {
            self.record(&format!("optimizer/{tensor}/mean_square"), step, mean_square);
        }

        Ok(())
    }

    /// Persists a snapshot of the global parameters.
    ///
    /// A failed snapshot or save is logged and training goes on.
    async fn checkpoint<C: SyncClient>(&mut self, client: &mut C) {
        let path = &self.training.ckpt_path;

        let (updates, params) = match client.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(worker_id = self.worker_id; "failed to snapshot the global parameters: {e}");
                return;
            }
        };

        match Checkpoint::new(updates, self.model.layout().clone(), params)
            .and_then(|checkpoint| checkpoint.save(path))
        {
            Ok(()) => info!(
                worker_id = self.worker_id,
                updates = updates;
                "saved checkpoint to {}", path.display()
            ),
            Err(e) => warn!(
                worker_id = self.worker_id,
                updates = updates;
                "failed to save checkpoint to {}: {e}", path.display()
            ),
        }
    }

    fn record(&mut self, name: &str, step: u64, value: f32) {
        let name = format!("worker_{}/{name}", self.worker_id);
        self.metrics.record(&name, step, value);
    }
}
