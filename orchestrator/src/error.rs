use std::{fmt, io, path::PathBuf};

/// All errors that can occur in the orchestrator.
#[derive(Debug)]
pub enum OrchestratorError {
    /// Invalid configuration, caught before anything is spawned.
    InvalidConfig(String),
    /// The resolved log directory is taken by an earlier run.
    LogDirExists(PathBuf),
    /// Not enough free ports to address the cluster.
    NoFreePorts { needed: usize, found: usize },
    /// Failed to start a node process.
    Launch { node: String, source: io::Error },
    /// Failed to connect to a worker or server.
    ConnectionFailed { addr: String, source: io::Error },
    /// The parameter server produced an unrecoverable error.
    ServerError(String),
    /// An underlying I/O error not covered by the above variants.
    Io(io::Error),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::LogDirExists(path) => {
                write!(f, "log directory {} already exists", path.display())
            }
            Self::NoFreePorts { needed, found } => {
                write!(f, "needed {needed} free ports, only found {found}")
            }
            Self::Launch { node, source } => write!(f, "failed to launch {node}: {source}"),
            Self::ConnectionFailed { addr, source } => {
                write!(f, "connection failed to {addr}: {source}")
            }
            Self::ServerError(msg) => write!(f, "server error: {msg}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for OrchestratorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Launch { source, .. } | Self::ConnectionFailed { source, .. } => Some(source),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for OrchestratorError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Boundary conversion for the binary.
impl From<OrchestratorError> for io::Error {
    fn from(value: OrchestratorError) -> Self {
        match value {
            OrchestratorError::Io(e) => e,
            other => io::Error::other(other),
        }
    }
}
