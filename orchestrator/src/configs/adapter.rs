use std::{net::SocketAddr, num::NonZeroUsize, path::Path};

use comms::specs::{
    model::{ActFnSpec, ModelSpec},
    server::{OptimizerSpec, ServerSpec},
    worker::{TrainingSpec, WorkerSpec},
};

use super::{OptimizerConfig, TrainingConfig};
use crate::error::OrchestratorError;

const RMS_PROP_DECAY: f32 = 0.99;
const RMS_PROP_EPSILON: f32 = 1e-5;
const ADAM_BETA1: f32 = 0.9;
const ADAM_BETA2: f32 = 0.999;
const ADAM_EPSILON: f32 = 1e-8;

/// Turns a `TrainingConfig` into the wire specs of every node.
#[derive(Default)]
pub struct Adapter;

impl Adapter {
    pub fn new() -> Self {
        Self
    }

    /// Builds the specs of the parameter server and of every worker.
    ///
    /// # Arguments
    /// * `training` - The run's configuration.
    /// * `server_addr` - Where the parameter server listens for workers.
    /// * `log_dir` - The resolved log directory of the run.
    ///
    /// # Returns
    /// The server spec and one spec per worker, ordered by worker id.
    pub fn adapt_configs(
        &self,
        training: &TrainingConfig,
        server_addr: SocketAddr,
        log_dir: &Path,
    ) -> Result<(ServerSpec, Vec<WorkerSpec>), OrchestratorError> {
        self.validate(training)?;

        let model = self.adapt_model(training)?;
        let server = self.adapt_server(training, &model);
        let workers = self.adapt_workers(training, &model, server_addr, log_dir)?;
        Ok((server, workers))
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Checks the configuration before anything is created on disk or spawned.
    pub fn validate(&self, training: &TrainingConfig) -> Result<(), OrchestratorError> {
        let counts = [
            ("n_workers", training.n_workers),
            ("n_steps", training.n_steps),
            ("rollout_len", training.rollout_len),
            ("ckpt_freq", training.ckpt_freq),
            ("summary_freq", training.summary_freq),
        ];

        for (name, value) in counts {
            if value == 0 {
                return Err(invalid(format!("{name} must be greater than 0")));
            }
        }

        if !(training.gamma > 0. && training.gamma < 1.) {
            return Err(invalid(format!(
                "gamma ({}) must be within (0, 1)",
                training.gamma
            )));
        }

        if training.entropy_coef < 0. || !training.entropy_coef.is_finite() {
            return Err(invalid(format!(
                "entropy_coef ({}) must be a non negative number",
                training.entropy_coef
            )));
        }

        if training.max_grad_norm.is_nan() || training.max_grad_norm <= 0. {
            return Err(invalid(format!(
                "max_grad_norm ({}) must be greater than 0",
                training.max_grad_norm
            )));
        }

        let lr = match training.optimizer {
            OptimizerConfig::RmsProp { lr }
            | OptimizerConfig::Adam { lr }
            | OptimizerConfig::GradientDescent { lr } => lr,
        };

        if lr.is_nan() || lr <= 0. {
            return Err(invalid(format!("lr ({lr}) must be greater than 0")));
        }

        if training.hidden.is_empty() || training.hidden.contains(&0) {
            return Err(invalid(format!(
                "hidden layers {:?} must be non empty and non zero",
                training.hidden
            )));
        }

        environments::dimensions_of(&training.env_id)
            .map_err(|e| invalid(e.to_string()))?;

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Adaptation
    // -------------------------------------------------------------------------

    /// Sizes the network after the environment's observations and actions.
    fn adapt_model(&self, training: &TrainingConfig) -> Result<ModelSpec, OrchestratorError> {
        let (input, actions) = environments::dimensions_of(&training.env_id)
            .map_err(|e| invalid(e.to_string()))?;

        Ok(ModelSpec::ActorCritic {
            input,
            hidden: training.hidden.clone(),
            actions,
            act_fn: ActFnSpec::Tanh,
        })
    }

    fn adapt_server(&self, training: &TrainingConfig, model: &ModelSpec) -> ServerSpec {
        ServerSpec {
            workers: training.n_workers,
            model: model.clone(),
            optimizer: self.adapt_optimizer(training.optimizer),
            max_grad_norm: training.max_grad_norm,
            checkpoint: training.load_ckpt.clone(),
            seed: training.seed,
        }
    }

    fn adapt_workers(
        &self,
        training: &TrainingConfig,
        model: &ModelSpec,
        server_addr: SocketAddr,
        log_dir: &Path,
    ) -> Result<Vec<WorkerSpec>, OrchestratorError> {
        let training_spec = self.adapt_training(training)?;

        let workers = (0..training.n_workers)
            .map(|worker_id| WorkerSpec {
                worker_id,
                env_id: training.env_id.clone(),
                server_addr,
                model: model.clone(),
                training: training_spec.clone(),
                log_dir: log_dir.to_path_buf(),
                render: training.render,
                seed: training.seed,
            })
            .collect();

        Ok(workers)
    }

    fn adapt_training(&self, training: &TrainingConfig) -> Result<TrainingSpec, OrchestratorError> {
        Ok(TrainingSpec {
            max_steps: training.n_steps,
            rollout_len: non_zero("rollout_len", training.rollout_len)?,
            gamma: training.gamma,
            entropy_coef: training.entropy_coef,
            ckpt_freq: non_zero("ckpt_freq", training.ckpt_freq)?,
            ckpt_path: training.ckpt_path.clone(),
            summary_freq: non_zero("summary_freq", training.summary_freq)?,
        })
    }

    fn adapt_optimizer(&self, optimizer: OptimizerConfig) -> OptimizerSpec {
        match optimizer {
            OptimizerConfig::RmsProp { lr } => OptimizerSpec::RmsProp {
                learning_rate: lr,
                decay: RMS_PROP_DECAY,
                epsilon: RMS_PROP_EPSILON,
            },
            OptimizerConfig::Adam { lr } => OptimizerSpec::Adam {
                learning_rate: lr,
                beta1: ADAM_BETA1,
                beta2: ADAM_BETA2,
                epsilon: ADAM_EPSILON,
            },
            OptimizerConfig::GradientDescent { lr } => {
                OptimizerSpec::GradientDescent { learning_rate: lr }
            }
        }
    }
}

fn invalid(msg: String) -> OrchestratorError {
    OrchestratorError::InvalidConfig(msg)
}

fn non_zero(name: &str, value: usize) -> Result<NonZeroUsize, OrchestratorError> {
    NonZeroUsize::new(value).ok_or_else(|| invalid(format!("{name} must be greater than 0")))
}
