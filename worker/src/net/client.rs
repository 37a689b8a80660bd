use comms::{
    OnoReceiver, OnoSender,
    msg::{Command, Msg, Payload},
};
use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::{
    error::{Result, WorkerErr},
    sync::SyncClient,
};

/// Parameter server client.
///
/// Protocol:
/// - `Pull` is answered with `Msg::Data(Payload::Params)`
/// - gradients are sent as `Msg::Data(Payload::Grad)` and never answered
/// - `Snapshot` is answered with `SnapshotMeta` followed by the parameters
/// - `Disconnect` is echoed back once the server is done with this connection
pub struct PsClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    rx: OnoReceiver<R>,
    tx: OnoSender<W>,
    rx_buf: Vec<f32>,
}

impl<R, W> PsClient<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(rx: OnoReceiver<R>, tx: OnoSender<W>) -> Self {
        Self {
            rx,
            tx,
            rx_buf: Vec::new(),
        }
    }

    /// Receives the parameters and copies them into `dst`.
    async fn recv_params_into(&mut self, dst: &mut [f32]) -> Result<()> {
        match self.rx.recv_into(&mut self.rx_buf).await? {
            Msg::Data(Payload::Params(params)) => {
                if params.len() != dst.len() {
                    return Err(WorkerErr::ParamsLengthMismatch {
                        got: params.len(),
                        expected: dst.len(),
                    });
                }

                dst.copy_from_slice(params);
                Ok(())
            }
            Msg::Err(detail) => Err(WorkerErr::Server(detail.into_owned())),
            other => Err(WorkerErr::UnexpectedMessage {
                expected: "data/params",
                got: other.kind(),
            }),
        }
    }
}

impl<R, W> SyncClient for PsClient<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn pull(&mut self, local: &mut [f32]) -> Result<()> {
        self.tx.send(&Msg::Control(Command::Pull)).await?;
        self.recv_params_into(local).await
    }

    async fn push(&mut self, grad: &[f32]) -> Result<()> {
        self.tx.send(&Msg::Data(Payload::Grad(grad))).await?;
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<(u64, Vec<f32>)> {
        self.tx.send(&Msg::Control(Command::Snapshot)).await?;

        let updates = match self.rx.recv_into(&mut self.rx_buf).await? {
            Msg::Control(Command::SnapshotMeta { updates }) => updates,
            Msg::Err(detail) => return Err(WorkerErr::Server(detail.into_owned())),
            other => {
                return Err(WorkerErr::UnexpectedMessage {
                    expected: "snapshot meta",
                    got: other.kind(),
                });
            }
        };

        match self.rx.recv_into(&mut self.rx_buf).await? {
            Msg::Data(Payload::Params(params)) => Ok((updates, params.to_vec())),
            Msg::Err(detail) => Err(WorkerErr::Server(detail.into_owned())),
            other => Err(WorkerErr::UnexpectedMessage {
                expected: "data/params",
                got: other.kind(),
            }),
        }
    }

    async fn optimizer_stats(&mut self) -> Result<Vec<(String, f32)>> {
        self.tx.send(&Msg::Control(Command::OptimizerStats)).await?;

        match self.rx.recv_into(&mut self.rx_buf).await? {
            Msg::Control(Command::OptimizerSummary { mean_squares }) => Ok(mean_squares),
            Msg::Err(detail) => Err(WorkerErr::Server(detail.into_owned())),
            other => Err(WorkerErr::UnexpectedMessage {
                expected: "optimizer summary",
                got: other.kind(),
            }),
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.tx.send(&Msg::Control(Command::Disconnect)).await?;

        loop {
            match self.rx.recv_into(&mut self.rx_buf).await? {
                Msg::Control(Command::Disconnect) => return Ok(()),
                msg => debug!(kind = msg.kind(); "draining before disconnect"),
            }
        }
    }
}
