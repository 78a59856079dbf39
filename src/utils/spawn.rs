//! Async wrapper around launching external tools
//!
//! Resolves when the process exits with status 0 and fails otherwise.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Failure to run an external program to a successful exit
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("failed to start `{program}`: {source}")]
    Start {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}")]
    Exit { program: String, status: ExitStatus },
}

impl SpawnError {
    /// Exit code of the failed process, if it ran to completion
    pub fn code(&self) -> Option<i32> {
        match self {
            SpawnError::Exit { status, .. } => status.code(),
            SpawnError::Start { .. } => None,
        }
    }
}

/// Captured output of a process that ran to completion
#[derive(Debug, Clone)]
pub struct Captured {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

fn command<I, S>(program: &str, args: I, cwd: &Path) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.current_dir(cwd);
    cmd
}

/// Run a program with inherited stdio, failing on a non-zero exit
pub async fn spawn<I, S>(program: &str, args: I, cwd: &Path) -> Result<(), SpawnError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    debug!("Spawning {} in {}", program, cwd.display());

    let status = command(program, args, cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|source| SpawnError::Start {
            program: program.to_string(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(SpawnError::Exit {
            program: program.to_string(),
            status,
        })
    }
}

/// Run a program and capture its output regardless of exit status
pub async fn capture<I, S>(program: &str, args: I, cwd: &Path) -> Result<Captured, SpawnError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    debug!("Capturing {} in {}", program, cwd.display());

    let output = command(program, args, cwd)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| SpawnError::Start {
            program: program.to_string(),
            source,
        })?;

    Ok(Captured {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
