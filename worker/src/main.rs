use std::{env, io, time::Duration};

use comms::msg::{Command, Msg};
use log::{error, info};
use tokio::{
    net::{TcpListener, TcpStream},
    signal,
};

use worker::{
    PsClient, SyncClient, WorkerBuilder, acceptor::WorkerAcceptor, profiler::MemoryProfiler,
};

const DEFAULT_HOST: &str = "127.0.0.1";
const MEMORY_SAMPLE_PERIOD: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let addr = format!(
        "{}:{}",
        env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
        env::var("PORT").map_err(io::Error::other)?,
    );

    let listener = TcpListener::bind(&addr).await?;
    info!("listening at {addr}");

    let (stream, orchestrator) = listener.accept().await?;
    let (rx, tx) = stream.into_split();
    let (mut orch_rx, mut orch_tx) = comms::channel(rx, tx);
    info!("orchestrator connected from {orchestrator}");

    let Some(spec) = WorkerAcceptor::handshake(&mut orch_rx).await? else {
        return Ok(());
    };

    let mut worker = match WorkerBuilder::new().build(&spec) {
        Ok(worker) => worker,
        Err(e) => {
            orch_tx.send(&Msg::Err(e.to_string().into())).await?;
            return Err(e.into());
        }
    };

    let memory_log = spec
        .log_dir
        .join(format!("worker_{}_memory.log", spec.worker_id));
    let profiler = MemoryProfiler::spawn(memory_log, MEMORY_SAMPLE_PERIOD);

    let stream = TcpStream::connect(spec.server_addr).await?;
    let (rx, tx) = stream.into_split();
    let (rx, tx) = comms::channel(rx, tx);
    let mut client = PsClient::new(rx, tx);
    info!(worker_id = spec.worker_id; "connected to the parameter server at {}", spec.server_addr);

    let stats = tokio::select! {
        ret = worker.run(&mut client) => match ret {
            Ok(stats) => stats,
            Err(e) => {
                error!(worker_id = spec.worker_id; "training failed: {e}");
                orch_tx.send(&Msg::Err(e.to_string().into())).await?;
                return Err(e.into());
            }
        },
        _ = signal::ctrl_c() => {
            info!("received SIGINT");
            return Ok(());
        }
    };

    client.disconnect().await?;
    profiler.abort();

    orch_tx
        .send(&Msg::Control(Command::Done {
            steps: stats.steps,
            updates: stats.updates,
        }))
        .await?;
    orch_tx.send(&Msg::Control(Command::Disconnect)).await?;

    info!(worker_id = spec.worker_id; "wrapping up");
    Ok(())
}
