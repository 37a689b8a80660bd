use std::{
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use clap::{Parser, ValueEnum};

use crate::configs::{LogDirConfig, OptimizerConfig, TrainingConfig};

/// The shared optimizer, selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OptimizerKind {
    RmsProp,
    Adam,
    GradientDescent,
}

/// Asynchronous advantage actor-critic over a parameter server
#[derive(Debug, Parser)]
#[command(name = "orchestrator")]
#[command(about = "Trains an actor-critic agent with asynchronous workers", long_about = None)]
pub struct Cli {
    /// Environment identifier, e.g. CartPole-v1
    pub env_id: String,

    /// Step budget of every worker
    #[arg(long = "n_steps", default_value_t = 10)]
    pub n_steps: usize,

    /// Amount of worker processes
    #[arg(long = "n_workers", default_value_t = 16)]
    pub n_workers: usize,

    /// Update cycles between checkpoints
    #[arg(long = "ckpt_freq", default_value_t = 500)]
    pub ckpt_freq: usize,

    /// Checkpoint to restore the global parameters from
    #[arg(long = "load_ckpt")]
    pub load_ckpt: Option<PathBuf>,

    /// Render the environments and plot the value estimates
    #[arg(long)]
    pub render: bool,

    /// Log directory, may already exist
    #[arg(long = "log_dir", conflicts_with = "run_name")]
    pub log_dir: Option<PathBuf>,

    /// Run name, logs go to runs/<run_name>_<git rev> [default: seconds since epoch]
    #[arg(long = "run_name")]
    pub run_name: Option<String>,

    /// Maximum transitions per rollout
    #[arg(long = "rollout_len", default_value_t = 5)]
    pub rollout_len: usize,

    /// Discount factor
    #[arg(long, default_value_t = 0.99)]
    pub gamma: f32,

    /// Entropy bonus coefficient
    #[arg(long = "entropy_coef", default_value_t = 0.01)]
    pub entropy_coef: f32,

    /// Shared optimizer
    #[arg(long, value_enum, default_value_t = OptimizerKind::RmsProp)]
    pub optimizer: OptimizerKind,

    /// Learning rate
    #[arg(long, default_value_t = 7e-4)]
    pub lr: f32,

    /// Gradients are clipped to this global norm
    #[arg(long = "max_grad_norm", default_value_t = 0.5)]
    pub max_grad_norm: f32,

    /// Hidden layer sizes
    #[arg(long, num_args = 1.., default_values_t = [64])]
    pub hidden: Vec<usize>,

    /// Update cycles between loss summaries
    #[arg(long = "summary_freq", default_value_t = 100)]
    pub summary_freq: usize,

    /// Where the elected worker saves checkpoints
    #[arg(long = "ckpt_path", default_value = "checkpoints/network.ckpt")]
    pub ckpt_path: PathBuf,

    /// Seeds parameter initialization and every worker
    #[arg(long)]
    pub seed: Option<u64>,

    /// First port tried for the cluster's addresses
    #[arg(long = "base_port", default_value_t = 2200)]
    pub base_port: u16,

    /// Directory of the parameter_server and worker binaries [default: this binary's]
    #[arg(long = "bin_dir")]
    pub bin_dir: Option<PathBuf>,
}

impl From<Cli> for TrainingConfig {
    fn from(cli: Cli) -> Self {
        let log_dir = match (cli.log_dir, cli.run_name) {
            (Some(dir), _) => LogDirConfig::Explicit(dir),
            (None, Some(name)) => LogDirConfig::RunName(name),
            (None, None) => LogDirConfig::RunName(seconds_since_epoch().to_string()),
        };

        let optimizer = match cli.optimizer {
            OptimizerKind::RmsProp => OptimizerConfig::RmsProp { lr: cli.lr },
            OptimizerKind::Adam => OptimizerConfig::Adam { lr: cli.lr },
            OptimizerKind::GradientDescent => OptimizerConfig::GradientDescent { lr: cli.lr },
        };

        Self {
            env_id: cli.env_id,
            n_steps: cli.n_steps,
            n_workers: cli.n_workers,
            rollout_len: cli.rollout_len,
            gamma: cli.gamma,
            entropy_coef: cli.entropy_coef,
            optimizer,
            max_grad_norm: cli.max_grad_norm,
            hidden: cli.hidden,
            ckpt_freq: cli.ckpt_freq,
            ckpt_path: cli.ckpt_path,
            load_ckpt: cli.load_ckpt,
            summary_freq: cli.summary_freq,
            render: cli.render,
            log_dir,
            seed: cli.seed,
            base_port: cli.base_port,
            bin_dir: cli.bin_dir,
        }
    }
}

fn seconds_since_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["orchestrator", "CartPole-v1"]).unwrap();
        let config = TrainingConfig::from(cli);

        assert_eq!(config.env_id, "CartPole-v1");
        assert_eq!(config.n_steps, 10);
        assert_eq!(config.n_workers, 16);
        assert_eq!(config.ckpt_freq, 500);
        assert_eq!(config.rollout_len, 5);
        assert_eq!(config.hidden, [64]);
        assert_eq!(config.ckpt_path, PathBuf::from("checkpoints/network.ckpt"));
        assert_eq!(config.optimizer, OptimizerConfig::RmsProp { lr: 7e-4 });
        assert!(!config.render);
        assert!(matches!(config.log_dir, LogDirConfig::RunName(_)));
    }

    #[test]
    fn log_dir_and_run_name_are_mutually_exclusive() {
        let parsed = Cli::try_parse_from([
            "orchestrator",
            "CartPole-v1",
            "--log_dir",
            "logs",
            "--run_name",
            "foo",
        ]);

        assert!(parsed.is_err());
    }

    #[test]
    fn explicit_log_dir() {
        let cli = Cli::try_parse_from(["orchestrator", "MovingDot-v0", "--log_dir", "logs"])
            .unwrap();

        assert_eq!(
            TrainingConfig::from(cli).log_dir,
            LogDirConfig::Explicit(PathBuf::from("logs"))
        );
    }

    #[test]
    fn flags_use_snake_case() {
        let cli = Cli::try_parse_from([
            "orchestrator",
            "CartPole-v1",
            "--n_steps",
            "100000",
            "--n_workers",
            "4",
            "--load_ckpt",
            "checkpoints/network.ckpt",
            "--render",
            "--hidden",
            "32",
            "32",
            "--optimizer",
            "adam",
        ])
        .unwrap();

        assert_eq!(cli.n_steps, 100_000);
        assert_eq!(cli.n_workers, 4);
        assert_eq!(cli.hidden, [32, 32]);
        assert!(cli.render);
        assert_eq!(cli.optimizer, OptimizerKind::Adam);
        assert_eq!(cli.load_ckpt, Some(PathBuf::from("checkpoints/network.ckpt")));
    }
}
