use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use machine_learning::checkpoint::CheckpointErr;

/// The specific result type for size mismatch checks inside the storage module.
pub type Result<T> = std::result::Result<T, SizeMismatchErr>;

/// Returned whenever a gradient, a parameter slice or an output buffer doesn't have the size
/// of the storage it's meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeMismatchErr;

impl Display for SizeMismatchErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the provided buffer length doesn't match the parameter storage size")
    }
}

impl Error for SizeMismatchErr {}

impl From<SizeMismatchErr> for io::Error {
    fn from(value: SizeMismatchErr) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, value)
    }
}

/// A checkpoint couldn't be read or doesn't fit the live model.
#[derive(Debug)]
pub struct LoadErr(pub CheckpointErr);

impl Display for LoadErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to restore the parameters: {}", self.0)
    }
}

impl Error for LoadErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

impl From<CheckpointErr> for LoadErr {
    fn from(value: CheckpointErr) -> Self {
        Self(value)
    }
}
