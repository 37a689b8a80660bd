use std::{net::SocketAddr, time::Duration};

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
    specs::{server::ServerSpec, worker::WorkerSpec},
};
use log::{error, info, warn};
use tokio::{
    io,
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    time,
};

use crate::error::OrchestratorError;

type NetRx = OnoReceiver<OwnedReadHalf>;
type NetTx = OnoSender<OwnedWriteHalf>;

const CONNECT_ATTEMPTS: usize = 100;
const CONNECT_BACKOFF: Duration = Duration::from_millis(50);

/// How a worker ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Done { steps: u64, updates: u64 },
    Failed(String),
}

/// The result of a finished training run.
#[derive(Debug)]
pub struct TrainingReport {
    /// The global update count.
    pub updates: u64,
    /// The final global parameters.
    pub params: Vec<f32>,
    /// Indexed by worker id.
    pub workers: Vec<WorkerOutcome>,
}

/// Represents an ongoing training session that's running in the background.
/// It lets it's owner interact with the entire system from a single instance.
pub struct Session {
    server: (NetRx, NetTx),
    workers: Vec<(NetRx, NetTx)>,
}

impl Session {
    /// Creates the parameter server and then every worker.
    ///
    /// The nodes may still be starting up, connections are retried for a while.
    ///
    /// # Arguments
    /// * `server_addr` - The network address of the parameter server node.
    /// * `server_spec` - The specification for the server node's configuration.
    /// * `workers` - The network address and specification of every worker node.
    ///
    /// # Returns
    /// A new `Session` instance, once the server is ready and every worker was created.
    pub async fn start(
        server_addr: SocketAddr,
        server_spec: ServerSpec,
        workers: Vec<(SocketAddr, WorkerSpec)>,
    ) -> Result<Self, OrchestratorError> {
        let server = Self::create_server(server_addr, server_spec).await?;
        let workers = Self::create_workers(workers).await?;

        Ok(Self { server, workers })
    }

    /// Waits until every worker exhausted its budget, then collects the final parameters.
    ///
    /// A worker that fails is not restarted, the rest keep training.
    ///
    /// # Returns
    /// The final state of the run or an error if the server couldn't deliver it.
    pub async fn wait(self) -> Result<TrainingReport, OrchestratorError> {
        let mut rx_buf: Vec<f32> = Vec::new();
        let mut outcomes = Vec::with_capacity(self.workers.len());

        for (worker_id, (mut rx, _)) in self.workers.into_iter().enumerate() {
            let outcome = Self::wait_worker(&mut rx, &mut rx_buf).await;
            match &outcome {
                WorkerOutcome::Done { steps, updates } => {
                    info!(worker_id = worker_id, steps = *steps, updates = *updates; "worker finished")
                }
                WorkerOutcome::Failed(detail) => {
                    error!(worker_id = worker_id; "worker failed: {detail}")
                }
            }

            outcomes.push(outcome);
        }

        let (mut rx, mut tx) = self.server;
        tx.send(&Msg::Control(Command::Disconnect)).await?;

        let updates = match rx.recv_into(&mut rx_buf).await? {
            Msg::Control(Command::SnapshotMeta { updates }) => updates,
            Msg::Err(detail) => return Err(OrchestratorError::ServerError(detail.into_owned())),
            msg => return Err(unexpected("snapshot meta", &msg)),
        };

        let params = match rx.recv_into(&mut rx_buf).await? {
            Msg::Data(Payload::Params(params)) => params.to_vec(),
            Msg::Err(detail) => return Err(OrchestratorError::ServerError(detail.into_owned())),
            msg => return Err(unexpected("data/params", &msg)),
        };

        Ok(TrainingReport {
            updates,
            params,
            workers: outcomes,
        })
    }

    /// Receives until the worker reports it's done.
    async fn wait_worker(rx: &mut NetRx, rx_buf: &mut Vec<f32>) -> WorkerOutcome {
        loop {
            match rx.recv_into(rx_buf).await {
                Ok(Msg::Control(Command::Done { steps, updates })) => {
                    return WorkerOutcome::Done { steps, updates };
                }
                Ok(Msg::Err(detail)) => return WorkerOutcome::Failed(detail.into_owned()),
                Ok(msg) => warn!("expected Done, got {}", msg.kind()),
                Err(e) => return WorkerOutcome::Failed(format!("connection lost: {e}")),
            }
        }
    }

    /// Tries to reach the parameter server and create it using the given specification.
    ///
    /// # Arguments
    /// * `server_addr` - The network address for the parameter server node.
    /// * `server_spec` - The specification for the server node's configuration.
    ///
    /// # Returns
    /// The communication channel once the server reported it's ready.
    async fn create_server(
        server_addr: SocketAddr,
        server_spec: ServerSpec,
    ) -> Result<(NetRx, NetTx), OrchestratorError> {
        let (mut rx, mut tx) = Self::open_channel(server_addr).await?;
        let msg = Msg::Control(Command::CreateServer(server_spec));
        tx.send(&msg).await?;

        let mut rx_buf: Vec<f32> = Vec::new();
        match rx.recv_into(&mut rx_buf).await? {
            Msg::Control(Command::Ready) => {
                info!("parameter server ready at {server_addr}");
                Ok((rx, tx))
            }
            Msg::Err(detail) => Err(OrchestratorError::ServerError(detail.into_owned())),
            msg => Err(unexpected("ready", &msg)),
        }
    }

    /// Tries to reach the workers and create them using their specification.
    ///
    /// # Arguments
    /// * `workers` - The network address and specification of every worker node.
    ///
    /// # Returns
    /// The communication channels or an error if failed to do so.
    async fn create_workers(
        workers: Vec<(SocketAddr, WorkerSpec)>,
    ) -> Result<Vec<(NetRx, NetTx)>, OrchestratorError> {
        let mut channels = Vec::with_capacity(workers.len());

        for (addr, spec) in workers {
            let (rx, mut tx) = Self::open_channel(addr).await?;
            tx.send(&Msg::Control(Command::CreateWorker(spec))).await?;
            channels.push((rx, tx));
        }

        Ok(channels)
    }

    /// Creates a communication channel with some entity through it's network address.
    ///
    /// # Arguments
    /// * `addr` - The network address of some node.
    ///
    /// # Returns
    /// A communication channel or an error if the node never started listening.
    async fn open_channel(addr: SocketAddr) -> Result<(NetRx, NetTx), OrchestratorError> {
        let mut last_err = None;

        for _ in 0..CONNECT_ATTEMPTS {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    let (rx, tx) = stream.into_split();
                    return Ok(comms::channel(rx, tx));
                }
                Err(e) => {
                    last_err = Some(e);
                    time::sleep(CONNECT_BACKOFF).await;
                }
            }
        }

        Err(OrchestratorError::ConnectionFailed {
            addr: addr.to_string(),
            source: last_err.unwrap_or_else(|| io::Error::other("no connection attempts")),
        })
    }
}

fn unexpected(expected: &str, got: &Msg) -> OrchestratorError {
    OrchestratorError::Io(io::Error::new(
        io::ErrorKind::InvalidData,
        format!("expected {expected}, got {}", got.kind()),
    ))
}
