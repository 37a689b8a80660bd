use comms::specs::{model::ModelSpec, worker::WorkerSpec};
use environments::Environment;
use log::info;
use machine_learning::MlErr;
use rand::Rng;

use crate::{Worker, error::Result, metrics::JsonlSink, model::LocalModel};

/// The worker a `WorkerSpec` describes.
pub type BoxedWorker = Worker<Box<dyn Environment + Send>, JsonlSink>;

#[derive(Default)]
pub struct WorkerBuilder;

impl WorkerBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds a `Worker` from a `WorkerSpec`.
    ///
    /// The scalars go to `<log_dir>/worker_<n>/`, action sampling and the environment are
    /// seeded with `seed + worker_id` when a seed is given.
    ///
    /// # Arguments
    /// * `spec` - Bootstrap specification received from the orchestrator.
    ///
    /// # Returns
    /// A fully initialized `Worker` instance.
    pub fn build(&self, spec: &WorkerSpec) -> Result<BoxedWorker> {
        let seed = match spec.seed {
            Some(seed) => seed.wrapping_add(spec.worker_id as u64),
            None => rand::rng().random(),
        };

        let env = environments::make(&spec.env_id, seed)?;
        let model = LocalModel::new(&spec.model)?;
        check_dimensions(&*env, &spec.env_id, &spec.model)?;

        let metrics = JsonlSink::create(spec.log_dir.join(format!("worker_{}", spec.worker_id)))?;

        info!(
            worker_id = spec.worker_id,
            seed = seed,
            params = model.layout().len();
            "built worker for {}", spec.env_id
        );

        let worker = Worker::new(
            spec.worker_id,
            env,
            model,
            spec.training.clone(),
            metrics,
            seed,
        );

        Ok(if spec.render {
            worker.with_render()
        } else {
            worker
        })
    }
}

/// Fails if the model can't consume the environment's states or drive its actions.
fn check_dimensions(env: &(dyn Environment + Send), env_id: &str, model: &ModelSpec) -> Result<()> {
    let ModelSpec::ActorCritic { input, actions, .. } = model;

    if *input != env.observation_size() || *actions != env.actions() {
        let detail = format!(
            "model expects {input} inputs and {actions} actions, {env_id} has {} and {}",
            env.observation_size(),
            env.actions()
        );
        return Err(MlErr::InvalidModel(detail).into());
    }

    Ok(())
}
