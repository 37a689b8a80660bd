use std::io;

use comms::{
    OnoReceiver,
    msg::{Command, Msg},
    specs::worker::WorkerSpec,
};
use log::{info, warn};
use tokio::io::AsyncRead;

/// Worker bootstrap acceptor.
pub struct WorkerAcceptor;

impl WorkerAcceptor {
    /// Receives `CreateWorker(WorkerSpec)` and returns the spec.
    ///
    /// # Args
    /// * `rx` - Receiving end of the orchestrator channel.
    ///
    /// # Returns
    /// Returns `Ok(Some(spec))` on `CreateWorker`.
    /// Returns `Ok(None)` if `Disconnect` is received before bootstrap.
    ///
    /// # Errors
    /// Returns `io::Error` if receiving fails.
    pub async fn handshake<R>(rx: &mut OnoReceiver<R>) -> io::Result<Option<WorkerSpec>>
    where
        R: AsyncRead + Unpin + Send,
    {
        info!("waiting for CreateWorker spec");

        let mut rx_buf: Vec<f32> = Vec::new();
        loop {
            match rx.recv_into(&mut rx_buf).await? {
                Msg::Control(Command::CreateWorker(spec)) => return Ok(Some(spec)),
                Msg::Control(Command::Disconnect) => {
                    info!("received Disconnect before bootstrap, exiting");
                    return Ok(None);
                }
                msg => warn!("expected CreateWorker, got {}", msg.kind()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comms::specs::{
        model::{ActFnSpec, ModelSpec},
        worker::TrainingSpec,
    };
    use std::{num::NonZeroUsize, path::PathBuf};
    use tokio::io as tokio_io;

    fn spec() -> WorkerSpec {
        WorkerSpec {
            worker_id: 3,
            env_id: "CartPole-v1".to_string(),
            server_addr: "127.0.0.1:2200".parse().unwrap(),
            model: ModelSpec::ActorCritic {
                input: 4,
                hidden: vec![8],
                actions: 2,
                act_fn: ActFnSpec::Relu,
            },
            training: TrainingSpec {
                max_steps: 100,
                rollout_len: NonZeroUsize::new(5).unwrap(),
                gamma: 0.99,
                entropy_coef: 0.01,
                ckpt_freq: NonZeroUsize::new(10).unwrap(),
                ckpt_path: PathBuf::from("checkpoints/network.ckpt"),
                summary_freq: NonZeroUsize::new(100).unwrap(),
            },
            log_dir: PathBuf::from("runs/test"),
            render: false,
            seed: Some(1),
        }
    }

    #[tokio::test]
    async fn skips_unexpected_messages_until_the_spec() -> io::Result<()> {
        let (orch, wk) = tokio_io::duplex(4096);
        let (_orch_rx, orch_tx) = tokio_io::split(orch);
        let (wk_rx, wk_tx) = tokio_io::split(wk);
        let (_, mut orch_tx) = comms::channel(tokio_io::empty(), orch_tx);
        let (mut wk_rx, _wk_tx) = comms::channel(wk_rx, wk_tx);

        orch_tx.send(&Msg::Control(Command::Ready)).await?;
        orch_tx.send(&Msg::Control(Command::CreateWorker(spec()))).await?;

        let got = WorkerAcceptor::handshake(&mut wk_rx).await?.unwrap();
        assert_eq!(got.worker_id, 3);
        assert_eq!(got.training.rollout_len.get(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn disconnect_before_bootstrap() -> io::Result<()> {
        let (orch, wk) = tokio_io::duplex(4096);
        let (_orch_rx, orch_tx) = tokio_io::split(orch);
        let (wk_rx, wk_tx) = tokio_io::split(wk);
        let (_, mut orch_tx) = comms::channel(tokio_io::empty(), orch_tx);
        let (mut wk_rx, _wk_tx) = comms::channel(wk_rx, wk_tx);

        orch_tx.send(&Msg::Control(Command::Disconnect)).await?;

        assert!(WorkerAcceptor::handshake(&mut wk_rx).await?.is_none());
        Ok(())
    }
}
