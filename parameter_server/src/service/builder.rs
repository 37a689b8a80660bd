use std::{
    cell::RefCell,
    error::Error,
    fmt::{self, Display},
    rc::Rc,
};

use comms::specs::server::{OptimizerSpec, ServerSpec};
use log::info;
use machine_learning::{
    MlErr,
    arch::Layout,
    checkpoint::{Checkpoint, CheckpointErr},
};
use rand::{SeedableRng, rngs::StdRng};
use tokio::io::{AsyncRead, AsyncWrite};

use super::{ParameterServer, Server};
use crate::{
    initialization::{ParamGen, RandErr, layout_param_gen},
    optimization::{Adam, GradientDescent, Optimizer, RmsProp},
    storage::{LoadErr, ParameterHandle, ParameterStore, SizeMismatchErr},
};

/// The reasons a `ServerSpec` can't be turned into a running server.
#[derive(Debug)]
pub enum BuildErr {
    Model(MlErr),
    Init(RandErr),
    Size(SizeMismatchErr),
    Load(LoadErr),
}

impl Display for BuildErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildErr::Model(e) => write!(f, "invalid model: {e}"),
            BuildErr::Init(e) => write!(f, "invalid initialization: {e}"),
            BuildErr::Size(e) => write!(f, "invalid initialization: {e}"),
            BuildErr::Load(e) => write!(f, "{e}"),
        }
    }
}

impl Error for BuildErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BuildErr::Model(e) => Some(e),
            BuildErr::Init(e) => Some(e),
            BuildErr::Size(e) => Some(e),
            BuildErr::Load(e) => Some(e),
        }
    }
}

impl From<MlErr> for BuildErr {
    fn from(value: MlErr) -> Self {
        Self::Model(value)
    }
}

impl From<RandErr> for BuildErr {
    fn from(value: RandErr) -> Self {
        Self::Init(value)
    }
}

impl From<SizeMismatchErr> for BuildErr {
    fn from(value: SizeMismatchErr) -> Self {
        Self::Size(value)
    }
}

impl From<LoadErr> for BuildErr {
    fn from(value: LoadErr) -> Self {
        Self::Load(value)
    }
}

impl From<CheckpointErr> for BuildErr {
    fn from(value: CheckpointErr) -> Self {
        Self::Load(LoadErr(value))
    }
}

/// Builds `Server`s given a specification.
#[derive(Debug, Default)]
pub struct ServerBuilder;

impl ServerBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Builds a new `Server` following a spec.
    ///
    /// The parameters are initialized from the model's layout and, if the spec names a
    /// checkpoint, restored from it before the server is returned.
    ///
    /// # Arguments
    /// * `spec` - The specification of the parameter server.
    ///
    /// # Returns
    /// A new server or a `BuildErr` if the model, its initialization or the checkpoint is
    /// invalid.
    pub fn build<R, W>(&self, spec: ServerSpec) -> Result<Box<dyn Server<R, W>>, BuildErr>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let layout = Layout::from_spec(&spec.model)?;
        let rng = self.generate_rng(spec.seed);
        let param_gen = layout_param_gen(rng, &layout)?;

        let checkpoint = match &spec.checkpoint {
            Some(path) => {
                info!("loading checkpoint {}", path.display());
                Some(Checkpoint::load(path)?)
            }
            None => None,
        };

        self.resolve_optimizer(&spec, layout, param_gen, checkpoint)
    }

    /// Generates a random number generator given (or not) a seed.
    ///
    /// # Arguments
    /// * `seed` - An optional seed for the rng.
    ///
    /// # Returns
    /// A clonable random number generator with interior mutability.
    fn generate_rng(&self, seed: Option<u64>) -> Rc<RefCell<StdRng>> {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Rc::new(RefCell::new(rng))
    }

    /// Resolves the `Optimizer` for this server.
    fn resolve_optimizer<R, W, PG>(
        &self,
        spec: &ServerSpec,
        layout: Layout,
        param_gen: PG,
        checkpoint: Option<Checkpoint>,
    ) -> Result<Box<dyn Server<R, W>>, BuildErr>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        PG: ParamGen,
    {
        let max_grad_norm = spec.max_grad_norm;

        match spec.optimizer {
            OptimizerSpec::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => {
                let factory = |len| Adam::new(len, learning_rate, beta1, beta2, epsilon);
                self.terminate_build(layout, param_gen, factory, max_grad_norm, checkpoint)
            }
            OptimizerSpec::GradientDescent { learning_rate } => {
                let factory = |_| GradientDescent::new(learning_rate);
                self.terminate_build(layout, param_gen, factory, max_grad_norm, checkpoint)
            }
            OptimizerSpec::RmsProp {
                learning_rate,
                decay,
                epsilon,
            } => {
                let factory = |len| RmsProp::new(len, learning_rate, decay, epsilon);
                self.terminate_build(layout, param_gen, factory, max_grad_norm, checkpoint)
            }
        }
    }

    /// Terminates the build, instantiating the store and restoring the checkpoint.
    fn terminate_build<R, W, PG, O, OF>(
        &self,
        layout: Layout,
        param_gen: PG,
        optimizer_factory: OF,
        max_grad_norm: f32,
        checkpoint: Option<Checkpoint>,
    ) -> Result<Box<dyn Server<R, W>>, BuildErr>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        PG: ParamGen,
        O: Optimizer + Send + 'static,
        OF: FnMut(usize) -> O,
    {
        let store = ParameterStore::new(layout, param_gen, optimizer_factory, max_grad_norm)?;
        let handle = ParameterHandle::new(store);

        if let Some(checkpoint) = checkpoint {
            handle.restore(&checkpoint)?;
            info!(updates = checkpoint.updates; "restored checkpoint");
        }

        info!(params = handle.len(), tensors = handle.layout().tensors().len(); "parameter store ready");
        Ok(Box::new(ParameterServer::new(handle)))
    }
}
