//! Lint command implementation

use std::ffi::OsString;

use colored::Colorize;

use super::Project;
use crate::config::{LinterTool, ResolvedPaths};
use crate::error::{Error, Result};
use crate::utils::{log, spawn::spawn};

/// Arguments for the linter: formatter, optional fix flag, input directory
pub fn lint_args(tool: &LinterTool, paths: &ResolvedPaths, fix: bool) -> Vec<OsString> {
    let mut args = Vec::new();

    if let Some(formatter) = &tool.formatter {
        args.push(OsString::from("-f"));
        args.push(paths.cwd.join(formatter).into_os_string());
    }
    if fix {
        args.push(OsString::from("--fix"));
    }
    args.push(paths.source_dir.clone().into_os_string());

    args
}

/// Run the linter over the input directory
pub async fn run(project: &Project, fix: bool) -> Result<()> {
    let input_dir = project.paths.source_dir.display().to_string();
    let tool = &project.config.tools.linter;

    if fix {
        log::info(&format!("Linting and fixing {}...", input_dir.cyan()));
    } else {
        log::info(&format!("Linting {}...", input_dir.cyan()));
    }

    let args = lint_args(tool, &project.paths, fix);
    spawn(&tool.program, &args, &project.paths.cwd)
        .await
        .map_err(Error::LintFailed)?;

    log::succeed("Linter completed successfully");
    Ok(())
}
