use std::{env, io};

use comms::msg::{Command, Msg, Payload};
use log::{info, warn};
use parameter_server::service::ServerBuilder;
use tokio::{net::TcpListener, signal};

const DEFAULT_HOST: &str = "127.0.0.1";

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
    let (mut rx, mut tx) = comms::channel(rx, tx);
    info!("orchestrator connected from {orchestrator}");

    let mut rx_buf: Vec<f32> = Vec::new();
    let spec = loop {
        match rx.recv_into(&mut rx_buf).await? {
            Msg::Control(Command::CreateServer(spec)) => break spec,
            msg => warn!("expected CreateServer, got {}", msg.kind()),
        }
    };

    let workers = spec.workers;
    let mut pserver = match ServerBuilder::new().build(spec) {
        Ok(pserver) => pserver,
        Err(e) => {
            tx.send(&Msg::Err(e.to_string().into())).await?;
            return Err(io::Error::other(e));
        }
    };

    tx.send(&Msg::Control(Command::Ready)).await?;

    // No worker is served until the whole cluster is connected.
    let mut streams = Vec::with_capacity(workers);
    for _ in 0..workers {
        let (stream, addr) = listener.accept().await?;
        info!("worker connected from {addr}");
        streams.push(stream);
    }

    for stream in streams {
        let (rx, tx) = stream.into_split();
        let (rx, tx) = comms::channel(rx, tx);
        pserver.spawn(rx, tx);
    }

    tokio::select! {
        ret = pserver.run() => ret?,
        _ = signal::ctrl_c() => {
            info!("received SIGINT");
            return Ok(());
        }
    }

    match rx.recv_into(&mut rx_buf).await? {
        Msg::Control(Command::Disconnect) => {}
        msg => warn!("expected Disconnect, got {}", msg.kind()),
    }

    let checkpoint = pserver.snapshot().await;
    tx.send(&Msg::Control(Command::SnapshotMeta {
        updates: checkpoint.updates,
    }))
    .await?;
    tx.send(&Msg::Data(Payload::Params(&checkpoint.params)))
        .await?;

    info!(updates = checkpoint.updates; "wrapping up");
    Ok(())
}
