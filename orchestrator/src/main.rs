use std::io;

use clap::Parser;
use log::{info, warn};
use orchestrator::{WorkerOutcome, cli::Cli, configs::TrainingConfig, train};
use tokio::runtime::Runtime;

fn main() -> io::Result<()> {
    env_logger::init();

    let config = TrainingConfig::from(Cli::parse());
    let runtime = Runtime::new()?;
    let report = runtime.block_on(train(config))?;

    let failed = report
        .workers
        .iter()
        .filter(|outcome| matches!(outcome, WorkerOutcome::Failed(_)))
        .count();

    if failed > 0 {
        warn!("{failed} worker(s) failed during training");
    }

    info!(
        updates = report.updates,
        params = report.params.len();
        "training finished"
    );
    Ok(())
}
