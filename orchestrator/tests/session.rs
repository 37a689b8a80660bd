use std::{net::SocketAddr, num::NonZeroUsize, path::PathBuf};

use comms::{
    msg::{Command, Msg, Payload},
    specs::{
        model::{ActFnSpec, ModelSpec},
        server::{OptimizerSpec, ServerSpec},
        worker::{TrainingSpec, WorkerSpec},
    },
};
use orchestrator::{OrchestratorError, Session, WorkerOutcome};
use tokio::{net::TcpListener, task::JoinHandle};

fn model() -> ModelSpec {
    ModelSpec::ActorCritic {
        input: 4,
        hidden: vec![8],
        actions: 2,
        act_fn: ActFnSpec::Tanh,
    }
}

fn server_spec(workers: usize) -> ServerSpec {
    ServerSpec {
        workers,
        model: model(),
        optimizer: OptimizerSpec::GradientDescent { learning_rate: 0.1 },
        max_grad_norm: 0.5,
        checkpoint: None,
        seed: None,
    }
}

fn worker_spec(worker_id: usize, server_addr: SocketAddr) -> WorkerSpec {
    WorkerSpec {
        worker_id,
        env_id: "CartPole-v1".to_string(),
        server_addr,
        model: model(),
        training: TrainingSpec {
            max_steps: 10,
            rollout_len: NonZeroUsize::new(5).unwrap(),
            gamma: 0.99,
            entropy_coef: 0.01,
            ckpt_freq: NonZeroUsize::new(500).unwrap(),
            ckpt_path: PathBuf::from("checkpoints/network.ckpt"),
            summary_freq: NonZeroUsize::new(100).unwrap(),
        },
        log_dir: PathBuf::from("runs/test"),
        render: false,
        seed: None,
    }
}

/// Answers `CreateServer` with `reply`, then the final snapshot once disconnected.
async fn fake_server(reply: Msg<'static>) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (rx, tx) = stream.into_split();
        let (mut rx, mut tx) = comms::channel(rx, tx);

        let mut buf: Vec<f32> = Vec::new();
        let msg: Msg = rx.recv_into(&mut buf).await.unwrap();
        assert!(matches!(msg, Msg::Control(Command::CreateServer(_))));

        let failed = matches!(reply, Msg::Err(_));
        tx.send(&reply).await.unwrap();
        if failed {
            return;
        }

        let msg: Msg = rx.recv_into(&mut buf).await.unwrap();
        assert!(matches!(msg, Msg::Control(Command::Disconnect)));

        tx.send(&Msg::Control(Command::SnapshotMeta { updates: 7 }))
            .await
            .unwrap();
        tx.send(&Msg::Data(Payload::Params(&[1., 2., 3.])))
            .await
            .unwrap();
    });

    (addr, handle)
}

/// Reports `Done` after being created, or hangs up right away if `crash` is set.
async fn fake_worker(steps: u64, crash: bool) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (rx, tx) = stream.into_split();
        let (mut rx, mut tx) = comms::channel(rx, tx);

        let mut buf: Vec<f32> = Vec::new();
        let msg: Msg = rx.recv_into(&mut buf).await.unwrap();
        assert!(matches!(msg, Msg::Control(Command::CreateWorker(_))));

        if crash {
            return;
        }

        tx.send(&Msg::Control(Command::Done { steps, updates: 2 }))
            .await
            .unwrap();
        tx.send(&Msg::Control(Command::Disconnect)).await.unwrap();
    });

    (addr, handle)
}

#[tokio::test]
async fn collects_every_worker_and_the_final_parameters() -> Result<(), OrchestratorError> {
    let (server_addr, server) = fake_server(Msg::Control(Command::Ready)).await;
    let (addr_a, worker_a) = fake_worker(10, false).await;
    let (addr_b, worker_b) = fake_worker(12, false).await;

    let workers = vec![
        (addr_a, worker_spec(0, server_addr)),
        (addr_b, worker_spec(1, server_addr)),
    ];

    let session = Session::start(server_addr, server_spec(2), workers).await?;
    let report = session.wait().await?;

    assert_eq!(report.updates, 7);
    assert_eq!(report.params, [1., 2., 3.]);
    assert_eq!(
        report.workers,
        [
            WorkerOutcome::Done {
                steps: 10,
                updates: 2
            },
            WorkerOutcome::Done {
                steps: 12,
                updates: 2
            },
        ]
    );

    server.await.unwrap();
    worker_a.await.unwrap();
    worker_b.await.unwrap();
    Ok(())
}

#[tokio::test]
async fn server_build_failure_is_fatal() {
    let (server_addr, server) =
        fake_server(Msg::Err("tensor value.weight has shape [64, 1]".into())).await;

    let result = Session::start(server_addr, server_spec(0), Vec::new()).await;

    assert!(matches!(result, Err(OrchestratorError::ServerError(_))));
    server.await.unwrap();
}

#[tokio::test]
async fn a_crashed_worker_does_not_stop_the_session() -> Result<(), OrchestratorError> {
    let (server_addr, server) = fake_server(Msg::Control(Command::Ready)).await;
    let (addr_a, worker_a) = fake_worker(10, true).await;
    let (addr_b, worker_b) = fake_worker(10, false).await;

    let workers = vec![
        (addr_a, worker_spec(0, server_addr)),
        (addr_b, worker_spec(1, server_addr)),
    ];

    let session = Session::start(server_addr, server_spec(2), workers).await?;
    let report = session.wait().await?;

    assert!(matches!(report.workers[0], WorkerOutcome::Failed(_)));
    assert!(matches!(report.workers[1], WorkerOutcome::Done { .. }));
    assert_eq!(report.updates, 7);

    server.await.unwrap();
    worker_a.await.unwrap();
    worker_b.await.unwrap();
    Ok(())
}
