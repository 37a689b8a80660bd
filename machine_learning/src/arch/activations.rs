use comms::specs::model::ActFnSpec;

/// Element-wise activation functions for hidden layers.
#[derive(Debug, Clone, Copy)]
pub enum ActFn {
    Tanh,
    Relu,
    Sigmoid { amp: f32 },
}

impl ActFn {
    /// Evaluates the function at `z`.
    pub fn f(&self, z: f32) -> f32 {
        match *self {
            ActFn::Tanh => z.tanh(),
            ActFn::Relu => z.max(0.),
            ActFn::Sigmoid { amp } => amp / (1. + (-z).exp()),
        }
    }

    /// Evaluates the derivative at `z`.
    pub fn df(&self, z: f32) -> f32 {
        match *self {
            ActFn::Tanh => 1. - z.tanh().powi(2),
            ActFn::Relu => {
                if z > 0. {
                    1.
                } else {
                    0.
                }
            }
            ActFn::Sigmoid { amp } => (amp * (-z).exp()) / ((-z).exp() + 1.).powi(2),
        }
    }
}

impl From<ActFnSpec> for ActFn {
    fn from(spec: ActFnSpec) -> Self {
        match spec {
            ActFnSpec::Tanh => ActFn::Tanh,
            ActFnSpec::Relu => ActFn::Relu,
            ActFnSpec::Sigmoid { amp } => ActFn::Sigmoid { amp },
        }
    }
}
