//! Clean command implementation

use std::io;
use std::path::Path;

use colored::Colorize;

use super::Project;
use crate::error::{Error, Result};
use crate::utils::log;

/// Remove the output directory tree
pub async fn run(project: &Project) -> Result<()> {
    let output_dir = &project.paths.build_dir;

    log::info(&format!("Cleaning {}...", output_dir.display().to_string().cyan()));

    match remove_dir_if_exists(output_dir).await {
        Ok(()) => {
            log::succeed("Clean complete");
            Ok(())
        }
        Err(source) => {
            log::error(&source.to_string());
            log::fail("Clean failed");
            Err(Error::Clean {
                path: output_dir.clone(),
                source,
            })
        }
    }
}

async fn remove_dir_if_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        result => result,
    }
}
