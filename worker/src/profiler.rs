use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use log::{debug, warn};
use tokio::{fs, io::AsyncWriteExt, task::JoinHandle, time};

const STATM: &str = "/proc/self/statm";
const PAGE_SIZE: u64 = 4096;

/// Samples the resident memory of this process.
pub struct MemoryProfiler;

impl MemoryProfiler {
    /// Starts appending `<unix secs> <rss bytes>` lines to `path` every `period`.
    ///
    /// Stops quietly on platforms without procfs.
    ///
    /// # Returns
    /// The sampling task, abort it to stop profiling.
    pub fn spawn(path: PathBuf, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = profile(&path, period).await {
                warn!("memory profiler stopped: {e}");
            }
        })
    }
}

async fn profile(path: &Path, period: Duration) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    let mut ticker = time::interval(period);

    loop {
        ticker.tick().await;

        let Some(rss) = resident_bytes().await else {
            debug!("{STATM} is unavailable, not profiling memory");
            return Ok(());
        };

        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        file.write_all(format!("{secs} {rss}\n").as_bytes()).await?;
        file.flush().await?;
    }
}

async fn resident_bytes() -> Option<u64> {
    let statm = fs::read_to_string(STATM).await.ok()?;
    parse_statm(&statm)
}

/// The second field of `statm` is the resident set size in pages.
fn parse_statm(statm: &str) -> Option<u64> {
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(pages * PAGE_SIZE)
}
