use std::{
    env, io,
    net::SocketAddr,
    path::{Path, PathBuf},
    process::Stdio,
};

use log::info;
use tokio::process::{Child, Command};

use crate::error::OrchestratorError;

const SERVER_BIN: &str = "parameter_server";
const WORKER_BIN: &str = "worker";

/// A node of the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Server,
    Worker(usize),
}

impl Node {
    fn binary(&self) -> &'static str {
        match self {
            Node::Server => SERVER_BIN,
            Node::Worker(_) => WORKER_BIN,
        }
    }

    fn name(&self) -> String {
        match self {
            Node::Server => "parameter server".to_string(),
            Node::Worker(id) => format!("worker {id}"),
        }
    }
}

/// Starts one OS process per node.
///
/// Every node listens on the address given through the `HOST` and `PORT` environment
/// variables and is killed as soon as its `Child` handle is dropped.
pub struct Launcher {
    bin_dir: PathBuf,
}

impl Launcher {
    /// Creates a new `Launcher`.
    ///
    /// # Arguments
    /// * `bin_dir` - Where the node binaries live, this executable's directory if `None`.
    pub fn new(bin_dir: Option<PathBuf>) -> io::Result<Self> {
        let bin_dir = match bin_dir {
            Some(dir) => dir,
            None => env::current_exe()?
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| io::Error::other("the executable has no parent directory"))?,
        };

        Ok(Self { bin_dir })
    }

    /// The path of the binary that runs `node`.
    pub fn binary_of(&self, node: Node) -> PathBuf {
        self.bin_dir.join(node.binary())
    }

    /// Spawns `node` listening at `addr`.
    pub fn spawn(&self, node: Node, addr: SocketAddr) -> Result<Child, OrchestratorError> {
        let binary = self.binary_of(node);
        info!("starting {} at {addr}", node.name());

        Command::new(&binary)
            .env("HOST", addr.ip().to_string())
            .env("PORT", addr.port().to_string())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| OrchestratorError::Launch {
                node: format!("{} ({})", node.name(), binary.display()),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binaries_are_looked_up_in_the_bin_dir() {
        let launcher = Launcher::new(Some(PathBuf::from("/opt/a3c/bin"))).unwrap();

        assert_eq!(
            launcher.binary_of(Node::Server),
            Path::new("/opt/a3c/bin/parameter_server")
        );
        assert_eq!(
            launcher.binary_of(Node::Worker(3)),
            Path::new("/opt/a3c/bin/worker")
        );
    }

    #[tokio::test]
    async fn missing_binary_is_a_launch_error() {
        let launcher = Launcher::new(Some(PathBuf::from("/nonexistent/a3c"))).unwrap();
        let addr = "127.0.0.1:2200".parse().unwrap();

        let err = launcher.spawn(Node::Worker(0), addr).unwrap_err();
        assert!(matches!(err, OrchestratorError::Launch { .. }));
    }
}
