//! Durable snapshots of the global parameters.
//!
//! A checkpoint is a safetensors file with one `F32` tensor per layout entry. The update
//! count and the layout order live in the file's metadata, since safetensors does not keep
//! the tensors in insertion order.

use std::{
    collections::HashMap,
    error::Error,
    fmt::{self, Display},
    fs, io,
    path::{Path, PathBuf},
};

use safetensors::{Dtype, SafeTensorError, SafeTensors, tensor::TensorView};

use crate::arch::{Layout, TensorSpec};

const UPDATES_KEY: &str = "updates";
const LAYOUT_KEY: &str = "layout";

/// The error type of checkpoint operations.
#[derive(Debug)]
pub enum CheckpointErr {
    Io(io::Error),
    Format(String),
    MissingTensor(String),
    ShapeMismatch {
        tensor: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
}

impl Display for CheckpointErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointErr::Io(e) => write!(f, "checkpoint io error: {e}"),
            CheckpointErr::Format(detail) => write!(f, "malformed checkpoint: {detail}"),
            CheckpointErr::MissingTensor(name) => write!(f, "checkpoint lacks tensor {name}"),
            CheckpointErr::ShapeMismatch {
                tensor,
                got,
                expected,
            } => write!(
                f,
                "tensor {tensor} has shape {got:?} in the checkpoint, expected {expected:?}"
            ),
        }
    }
}

impl Error for CheckpointErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CheckpointErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CheckpointErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<SafeTensorError> for CheckpointErr {
    fn from(value: SafeTensorError) -> Self {
        Self::Format(value.to_string())
    }
}

impl From<CheckpointErr> for io::Error {
    fn from(value: CheckpointErr) -> Self {
        match value {
            CheckpointErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

/// A point in time copy of the global parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub updates: u64,
    pub layout: Layout,
    pub params: Vec<f32>,
}

impl Checkpoint {
    /// Creates a new `Checkpoint`.
    ///
    /// # Errors
    /// `CheckpointErr::Format` if `params` doesn't fill `layout` exactly.
    pub fn new(updates: u64, layout: Layout, params: Vec<f32>) -> Result<Self, CheckpointErr> {
        if params.len() != layout.len() {
            return Err(CheckpointErr::Format(format!(
                "{} parameters for a layout of {}",
                params.len(),
                layout.len()
            )));
        }

        Ok(Self {
            updates,
            layout,
            params,
        })
    }

    /// Checks that this checkpoint can be restored into a model laid out as `expected`.
    pub fn check_layout(&self, expected: &Layout) -> Result<(), CheckpointErr> {
        let ours: HashMap<&str, &TensorSpec> = self
            .layout
            .tensors()
            .iter()
            .map(|t| (t.name.as_str(), t))
            .collect();

        for tensor in expected.tensors() {
            let Some(found) = ours.get(tensor.name.as_str()) else {
                return Err(CheckpointErr::MissingTensor(tensor.name.clone()));
            };

            if found.shape != tensor.shape {
                return Err(CheckpointErr::ShapeMismatch {
                    tensor: tensor.name.clone(),
                    got: found.shape.clone(),
                    expected: tensor.shape.clone(),
                });
            }
        }

        if self.layout != *expected {
            return Err(CheckpointErr::Format(
                "tensors are stored in a different order".to_string(),
            ));
        }

        Ok(())
    }

    /// Atomically writes this checkpoint to `path`.
    ///
    /// The file is first written next to `path` and then renamed over it, so a reader never
    /// observes a partially written checkpoint.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CheckpointErr> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let bytes: Vec<Vec<u8>> = self
            .layout
            .ranges()
            .into_iter()
            .map(|range| {
                self.params[range]
                    .iter()
                    .flat_map(|v| v.to_le_bytes())
                    .collect()
            })
            .collect();

        let mut views = Vec::with_capacity(bytes.len());
        for (tensor, data) in self.layout.tensors().iter().zip(&bytes) {
            let view = TensorView::new(Dtype::F32, tensor.shape.clone(), data)?;
            views.push((tensor.name.as_str(), view));
        }

        let names: Vec<&str> = self.layout.tensors().iter().map(|t| t.name.as_str()).collect();
        let metadata = HashMap::from([
            (UPDATES_KEY.to_string(), self.updates.to_string()),
            (
                LAYOUT_KEY.to_string(),
                serde_json::to_string(&names).map_err(|e| CheckpointErr::Format(e.to_string()))?,
            ),
        ]);

        let serialized = safetensors::serialize(views, &Some(metadata))?;

        let tmp = tmp_path(path);
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Reads a checkpoint previously written by `Checkpoint::save`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CheckpointErr> {
        let buf = fs::read(path)?;

        let (_, header) = SafeTensors::read_metadata(&buf)?;
        let metadata = header
            .metadata()
            .as_ref()
            .ok_or_else(|| CheckpointErr::Format("missing metadata".to_string()))?;

        let updates = metadata
            .get(UPDATES_KEY)
            .and_then(|u| u.parse().ok())
            .ok_or_else(|| CheckpointErr::Format("missing update count".to_string()))?;

        let names: Vec<String> = metadata
            .get(LAYOUT_KEY)
            .ok_or_else(|| CheckpointErr::Format("missing layout".to_string()))
            .and_then(|l| {
                serde_json::from_str(l).map_err(|e| CheckpointErr::Format(e.to_string()))
            })?;

        let tensors = SafeTensors::deserialize(&buf)?;
        let mut specs = Vec::with_capacity(names.len());
        let mut params = Vec::new();

        for name in names {
            let view = tensors
                .tensor(&name)
                .map_err(|_| CheckpointErr::MissingTensor(name.clone()))?;

            if view.dtype() != Dtype::F32 {
                return Err(CheckpointErr::Format(format!(
                    "tensor {name} is {:?}, expected F32",
                    view.dtype()
                )));
            }

            params.extend(
                view.data()
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
            );
            specs.push(TensorSpec::new(name, view.shape().to_vec()));
        }

        Self::new(updates, Layout::new(specs), params)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
