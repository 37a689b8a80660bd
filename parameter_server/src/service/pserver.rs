use std::io;

use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
};
use log::{debug, info, warn};
use machine_learning::checkpoint::Checkpoint;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    task::JoinSet,
};

use crate::{optimization::Optimizer, service::Server, storage::ParameterHandle};

/// What a worker connection did before it disconnected.
#[derive(Debug, Default, Clone, Copy)]
struct ConnStats {
    pulls: u64,
    grads: u64,
    snapshots: u64,
}

/// The central server structure, it serves every worker connection in its own task.
pub struct ParameterServer<O: Optimizer> {
    tasks: JoinSet<(usize, io::Result<ConnStats>)>,
    handle: ParameterHandle<O>,
    next_id: usize,
}

impl<O: Optimizer> ParameterServer<O> {
    /// Creates a new `ParameterServer`.
    ///
    /// # Arguments
    /// * `handle` - The handle to the global parameters.
    pub fn new(handle: ParameterHandle<O>) -> Self {
        Self {
            tasks: JoinSet::new(),
            handle,
            next_id: 0,
        }
    }

    /// Waits for every connection to finish.
    ///
    /// A failed connection is logged and doesn't affect the others.
    pub async fn run(&mut self) -> io::Result<()> {
        let mut failed = 0;

        while let Some(res) = self.tasks.join_next().await {
            match res {
                Ok((conn, Ok(stats))) => {
                    info!(
                        conn = conn, pulls = stats.pulls, grads = stats.grads, snapshots = stats.snapshots;
                        "worker disconnected"
                    );
                }
                Ok((conn, Err(e))) => {
                    failed += 1;
                    warn!(conn = conn; "worker connection failed: {e}");
                }
                Err(e) => {
                    failed += 1;
                    warn!("worker task panicked: {e}");
                }
            }
        }

        info!(failed = failed, updates = self.handle.updates(); "every worker is done");
        Ok(())
    }

    /// Creates an error for when an unexpected message kind is received.
    ///
    /// # Arguments
    /// * `msg` - The received message.
    ///
    /// # Returns
    /// An error.
    fn unexpected_message_kind<U>(msg: Msg) -> io::Result<U> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an unexpected message kind, got: {}", msg.kind()),
        ))
    }
}

impl<O: Optimizer + Send + 'static> ParameterServer<O> {
    /// Binds a new worker to this server and spawns the task serving its requests.
    ///
    /// A worker pulls before every rollout and pushes one gradient after it; the elected
    /// worker additionally asks for snapshots to checkpoint.
    ///
    /// # Arguments
    /// * `rx` - The receiving end of the communication.
    /// * `tx` - The sending end of the communication.
    pub fn spawn<R, W>(&mut self, rx: OnoReceiver<R>, tx: OnoSender<W>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let conn = self.next_id;
        self.next_id += 1;

        let handle = self.handle.clone();
        self.tasks
            .spawn(async move { (conn, Self::serve(conn, handle, rx, tx).await) });
    }

    /// The request loop of a single worker connection.
    async fn serve<R, W>(
        conn: usize,
        handle: ParameterHandle<O>,
        mut rx: OnoReceiver<R>,
        mut tx: OnoSender<W>,
    ) -> io::Result<ConnStats>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let mut rx_buf: Vec<f32> = Vec::new();
        let mut params = vec![0.; handle.len()];
        let mut stats = ConnStats::default();

        loop {
            let msg: Msg = rx.recv_into(&mut rx_buf).await?;

            match msg {
                Msg::Control(Command::Pull) => {
                    handle.pull_params(&mut params).await?;
                    tx.send(&Msg::Data(Payload::Params(&params))).await?;
                    stats.pulls += 1;
                }
                Msg::Data(Payload::Grad(grad)) => {
                    let norm = handle.apply_gradients(grad).await?;
                    stats.grads += 1;
                    debug!(conn = conn, norm = norm; "applied gradient");
                }
                Msg::Control(Command::Snapshot) => {
                    let Checkpoint {
                        updates, params, ..
                    } = handle.snapshot().await;

                    tx.send(&Msg::Control(Command::SnapshotMeta { updates }))
                        .await?;
                    tx.send(&Msg::Data(Payload::Params(&params))).await?;
                    stats.snapshots += 1;
                }
                Msg::Control(Command::OptimizerStats) => {
                    let mean_squares = handle.optimizer_stats().await;
                    tx.send(&Msg::Control(Command::OptimizerSummary { mean_squares }))
                        .await?;
                }
                Msg::Control(Command::Disconnect) => {
                    tx.send(&Msg::Control(Command::Disconnect)).await?;
                    return Ok(stats);
                }
                Msg::Err(e) => {
                    return Err(io::Error::other(format!("worker reported: {e}")));
                }
                msg => return Self::unexpected_message_kind(msg),
            }
        }
    }

    /// Takes a snapshot of the global parameters.
    pub async fn snapshot(&self) -> Checkpoint {
        self.handle.snapshot().await
    }
}

#[async_trait::async_trait]
impl<R, W, O> Server<R, W> for ParameterServer<O>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
    O: Optimizer + Send + 'static,
{
    /// Indirection call to `Self::run`.
    async fn run(&mut self) -> io::Result<()> {
        ParameterServer::run(self).await
    }

    /// Indirection call to `Self::spawn`.
    fn spawn(&mut self, rx: OnoReceiver<R>, tx: OnoSender<W>) {
        ParameterServer::spawn(self, rx, tx)
    }

    /// Indirection call to `Self::snapshot`.
    async fn snapshot(&mut self) -> Checkpoint {
        ParameterServer::snapshot(self).await
    }
}
