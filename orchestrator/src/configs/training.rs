use std::path::PathBuf;

/// Where the run writes its logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDirConfig {
    /// Used as is, it may already exist.
    Explicit(PathBuf),
    /// Resolved to `runs/<name>_<git rev>`, which must not exist yet.
    RunName(String),
}

/// The shared optimizer applied by the parameter server.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizerConfig {
    RmsProp { lr: f32 },
    Adam { lr: f32 },
    GradientDescent { lr: f32 },
}

/// The full description of a training run.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub env_id: String,
    /// The step budget of every worker.
    pub n_steps: usize,
    pub n_workers: usize,
    /// The rollout horizon.
    pub rollout_len: usize,
    pub gamma: f32,
    pub entropy_coef: f32,
    pub optimizer: OptimizerConfig,
    pub max_grad_norm: f32,
    /// The hidden layer sizes of the shared trunk.
    pub hidden: Vec<usize>,
    pub ckpt_freq: usize,
    pub ckpt_path: PathBuf,
    pub load_ckpt: Option<PathBuf>,
    pub summary_freq: usize,
    pub render: bool,
    pub log_dir: LogDirConfig,
    pub seed: Option<u64>,
    /// The first port tried for the cluster's addresses.
    pub base_port: u16,
    /// Where the node binaries live, defaults to this executable's directory.
    pub bin_dir: Option<PathBuf>,
}
