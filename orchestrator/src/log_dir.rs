use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use log::{debug, info};

use crate::{configs::LogDirConfig, error::OrchestratorError};

/// The directory named runs are created in.
pub const RUNS_DIR: &str = "runs";

const UNKNOWN_REV: &str = "unknown";

/// Resolves and creates the log directory of a run.
///
/// An explicit directory may already exist. A named run lives in
/// `<runs_dir>/<name>_<git rev>` and must be new.
///
/// # Arguments
/// * `config` - The requested log location.
/// * `runs_dir` - Where named runs are created.
///
/// # Returns
/// The created log directory.
///
/// # Errors
/// `OrchestratorError::LogDirExists` if a named run's directory is taken.
pub fn resolve(config: &LogDirConfig, runs_dir: &Path) -> Result<PathBuf, OrchestratorError> {
    let log_dir = match config {
        LogDirConfig::Explicit(path) => path.clone(),
        LogDirConfig::RunName(name) => {
            let log_dir = runs_dir.join(format!("{name}_{}", git_rev()));
            if log_dir.exists() {
                return Err(OrchestratorError::LogDirExists(log_dir));
            }

            log_dir
        }
    };

    fs::create_dir_all(&log_dir)?;
    info!("logging to {}", log_dir.display());
    Ok(log_dir)
}

/// The short hash of the checked out commit.
pub fn git_rev() -> String {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output();

    match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        Ok(output) => {
            debug!("git rev-parse exited with {}", output.status);
            UNKNOWN_REV.to_string()
        }
        Err(e) => {
            debug!("git is unavailable: {e}");
            UNKNOWN_REV.to_string()
        }
    }
}
