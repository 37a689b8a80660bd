pub mod cli;
pub mod configs;
pub mod error;
pub mod launcher;
pub mod log_dir;
pub mod ports;
mod session;

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::Path,
};

use configs::{Adapter, TrainingConfig};
use launcher::{Launcher, Node};
use log::info;

pub use error::OrchestratorError;
pub use session::{Session, TrainingReport, WorkerOutcome};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Runs a whole training session on this host.
///
/// Resolves the log directory, spawns the parameter server and one process per worker,
/// creates every node and waits until all workers exhausted their budget. The node
/// processes are killed as soon as the final parameters were collected.
///
/// # Errors
/// Returns an `OrchestratorError` if the configuration is invalid, the log directory is
/// taken, or the cluster can't be formed.
pub async fn train(training: TrainingConfig) -> Result<TrainingReport, OrchestratorError> {
    let adapter = Adapter::new();
    adapter.validate(&training)?;

    let log_dir = log_dir::resolve(&training.log_dir, Path::new(log_dir::RUNS_DIR))?;

    let ports = ports::allocate(LOCALHOST, training.base_port, training.n_workers + 1)?;
    let server_addr = SocketAddr::new(LOCALHOST, ports[0]);
    let worker_addrs: Vec<SocketAddr> = ports[1..]
        .iter()
        .map(|&port| SocketAddr::new(LOCALHOST, port))
        .collect();

    info!("adapting configs");
    let (server_spec, worker_specs) = adapter.adapt_configs(&training, server_addr, &log_dir)?;

    let launcher = Launcher::new(training.bin_dir.clone())?;
    let mut nodes = Vec::with_capacity(worker_addrs.len() + 1);
    nodes.push(launcher.spawn(Node::Server, server_addr)?);
    for (worker_id, &addr) in worker_addrs.iter().enumerate() {
        nodes.push(launcher.spawn(Node::Worker(worker_id), addr)?);
    }

    info!(
        "connecting to {} worker(s) and the parameter server",
        worker_addrs.len()
    );
    let session = Session::start(
        server_addr,
        server_spec,
        worker_addrs.into_iter().zip(worker_specs).collect(),
    )
    .await?;

    let report = session.wait().await?;

    for node in &mut nodes {
        let _ = node.start_kill();
    }

    Ok(report)
}
