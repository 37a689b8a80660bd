use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf};

use serde::{Deserialize, Serialize};

use super::model::ModelSpec;

/// The hyperparameters of a worker's training loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSpec {
    /// Environment steps this worker runs before terminating.
    pub max_steps: usize,
    /// The rollout horizon, the maximum amount of transitions per update.
    pub rollout_len: NonZeroUsize,
    pub gamma: f32,
    pub entropy_coef: f32,
    /// Update cycles between checkpoints, only honored by the elected worker.
    pub ckpt_freq: NonZeroUsize,
    pub ckpt_path: PathBuf,
    /// Update cycles between loss summaries.
    pub summary_freq: NonZeroUsize,
}

/// Wire-level bootstrap specification for a worker instance.
///
/// This type is exchanged over the network during worker bootstrap.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub worker_id: usize,
    pub env_id: String,
    pub server_addr: SocketAddr,
    pub model: ModelSpec,
    pub training: TrainingSpec,
    pub log_dir: PathBuf,
    pub render: bool,
    pub seed: Option<u64>,
}
