use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::model::ModelSpec;

/// The specification for the `Optimizer` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    GradientDescent {
        learning_rate: f32,
    },
    RmsProp {
        learning_rate: f32,
        decay: f32,
        epsilon: f32,
    },
}

/// The specification for the parameter server.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServerSpec {
    pub workers: usize,
    pub model: ModelSpec,
    pub optimizer: OptimizerSpec,
    pub max_grad_norm: f32,
    pub checkpoint: Option<PathBuf>,
    pub seed: Option<u64>,
}
