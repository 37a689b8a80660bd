use serde::{Deserialize, Serialize};

/// The specification for the hidden layers' activation function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFnSpec {
    Tanh,
    Relu,
    Sigmoid { amp: f32 },
}

/// The specification for the policy/value model shared by the server and the workers.
///
/// Both ends derive the same parameter layout from it, so it must be identical everywhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSpec {
    ActorCritic {
        input: usize,
        hidden: Vec<usize>,
        actions: usize,
        act_fn: ActFnSpec,
    },
}
