//! Error types surfaced by the tasks
//!
//! Every variant is fatal for the invocation that produced it; the binary
//! maps any of them to exit status 1.

use std::path::PathBuf;

use thiserror::Error;

use crate::utils::spawn::SpawnError;

/// Errors produced by the task runner and the CLI
#[derive(Debug, Error)]
pub enum Error {
    /// The resolved input directory does not exist
    #[error("Input directory {} does not exist", .0.display())]
    InputDirMissing(PathBuf),

    /// The linter exited unsuccessfully
    #[error("Linter failed")]
    LintFailed(#[source] SpawnError),

    /// The output directory could not be removed
    #[error("Failed to clean {}", path.display())]
    Clean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bundler failed or reported errors
    #[error("Build failed: {0}")]
    Compile(String),

    /// A locale file could not be parsed
    #[error("Invalid locale file {}: {message}", path.display())]
    Locale { path: PathBuf, message: String },

    /// A static ignore pattern is not a valid glob
    #[error("Invalid ignore pattern: {0}")]
    Pattern(#[from] globset::Error),

    /// Launching or waiting on an external process failed
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
