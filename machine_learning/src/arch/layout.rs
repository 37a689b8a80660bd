use std::ops::Range;

use comms::specs::model::ModelSpec;

use crate::{MlErr, Result};

/// A named tensor inside the flat parameter buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorSpec {
    pub name: String,
    pub shape: Vec<usize>,
}

impl TensorSpec {
    pub fn new<S: Into<String>>(name: S, shape: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            shape,
        }
    }

    /// The amount of parameters in this tensor.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The ordered partition of a model's flat parameter buffer into named tensors.
///
/// The server shards its storage by tensor and the workers index their local copy with it,
/// so the same layout must be derived on both ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    tensors: Vec<TensorSpec>,
}

impl Layout {
    /// Creates a new `Layout` from an ordered list of tensors.
    pub fn new(tensors: Vec<TensorSpec>) -> Self {
        Self { tensors }
    }

    /// Derives the layout of the model described by `spec`.
    ///
    /// Dense layers contribute a `[fan_in, fan_out]` weight followed by a `[fan_out]` bias,
    /// the hidden layers first, then the policy head and lastly the value head.
    ///
    /// # Arguments
    /// * `spec` - The model specification.
    ///
    /// # Returns
    /// The layout or an `MlErr::InvalidModel` if any dimension is zero.
    pub fn from_spec(spec: &ModelSpec) -> Result<Self> {
        let ModelSpec::ActorCritic {
            input,
            hidden,
            actions,
            ..
        } = spec;

        if *input == 0 || *actions == 0 || hidden.contains(&0) {
            return Err(MlErr::InvalidModel(format!(
                "every dimension must be positive, got input={input} hidden={hidden:?} actions={actions}"
            )));
        }

        let mut tensors = Vec::with_capacity(2 * (hidden.len() + 2));
        let mut fan_in = *input;

        for (i, &fan_out) in hidden.iter().enumerate() {
            tensors.push(TensorSpec::new(format!("trunk.{i}.weight"), vec![fan_in, fan_out]));
            tensors.push(TensorSpec::new(format!("trunk.{i}.bias"), vec![fan_out]));
            fan_in = fan_out;
        }

        tensors.push(TensorSpec::new("policy.weight", vec![fan_in, *actions]));
        tensors.push(TensorSpec::new("policy.bias", vec![*actions]));
        tensors.push(TensorSpec::new("value.weight", vec![fan_in, 1]));
        tensors.push(TensorSpec::new("value.bias", vec![1]));

        Ok(Self { tensors })
    }

    pub fn tensors(&self) -> &[TensorSpec] {
        &self.tensors
    }

    /// The total amount of parameters.
    pub fn len(&self) -> usize {
        self.tensors.iter().map(TensorSpec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The range each tensor occupies in the flat buffer, in order.
    pub fn ranges(&self) -> Vec<Range<usize>> {
        let mut start = 0;

        self.tensors
            .iter()
            .map(|tensor| {
                let range = start..start + tensor.len();
                start = range.end;
                range
            })
            .collect()
    }
}
