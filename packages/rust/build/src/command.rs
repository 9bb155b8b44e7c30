//! Subprocess execution for build steps.
//!
//! Commands come from recipe lines as single strings and are split on
//! whitespace into program + arguments (no shell involved). Combined
//! stdout/stderr is appended to the build log in execution order, and
//! every command sees the requested version via `BUILD_VERSION`.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use kiln_shared::{KilnError, Result};

/// Environment variable exposing the requested version to every command.
pub const BUILD_VERSION_ENV: &str = "BUILD_VERSION";

/// Run one command in `dir`, appending its combined output to `log`.
///
/// Returns `Ok(true)` on exit status 0, `Ok(false)` on non-zero exit.
/// A command that cannot be spawned at all is an error.
pub async fn run_logged(command: &str, dir: &Path, log: &Path, version: &str) -> Result<bool> {
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        return Err(KilnError::build("empty build command"));
    };

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log)
        .map_err(|e| KilnError::io(log, e))?;
    let log_clone = log_file.try_clone().map_err(|e| KilnError::io(log, e))?;

    debug!(command, dir = %dir.display(), "running build command");

    let status = Command::new(program)
        .args(parts)
        .current_dir(dir)
        .env(BUILD_VERSION_ENV, version)
        .stdout(Stdio::from(log_file))
        .stderr(Stdio::from(log_clone))
        // If the build future is ever dropped, take the child with it
        // rather than leaving an orphan writing into a deleted workspace.
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| KilnError::build(format!("failed to spawn `{command}`: {e}")))?;

    Ok(status.success())
}

/// Run commands in order, short-circuiting on the first failure.
pub async fn run_all(commands: &[String], dir: &Path, log: &Path, version: &str) -> Result<bool> {
    for command in commands {
        if !run_logged(command, dir, log, version).await? {
            return Ok(false);
        }
    }
    Ok(true)
}
