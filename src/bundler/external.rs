//! Bridge to the bundler that consumes the generated configuration
//!
//! The bundler is an external program. It receives the configuration as a
//! JSON file (`<program> --config <file>`) and may report statistics as a
//! JSON object on stdout (`{"errors": [...], "warnings": [...],
//! "summary": "..."}`); in watch mode it prints one such object per line,
//! once per compile.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::BundleConfig;
use crate::config::{BundlerTool, ResolvedPaths};
use crate::utils::spawn::{capture, Captured};

/// Name of the configuration file handed to the bundler
pub const CONFIG_FILE: &str = "bundle.config.json";

/// Outcome of one compile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stats {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub summary: String,
}

impl Stats {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Interpret a finished bundler process
    pub fn from_output(output: &Captured) -> Self {
        let mut stats = serde_json::from_str::<Stats>(output.stdout.trim()).unwrap_or_else(|_| Stats {
            summary: output.stdout.trim_end().to_string(),
            ..Stats::default()
        });

        if !output.status.success() && !stats.has_errors() {
            let stderr = output.stderr.trim();
            stats.errors.push(if stderr.is_empty() {
                format!("bundler exited with {}", output.status)
            } else {
                stderr.to_string()
            });
        }

        stats
    }

    /// Human-readable report: summary, then warnings and errors
    pub fn render(&self) -> String {
        let mut out = self.summary.clone();
        for warning in &self.warnings {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("WARNING: ");
            out.push_str(warning);
        }
        for error in &self.errors {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("ERROR: ");
            out.push_str(error);
        }
        out
    }
}

/// Notifications from a bundler running in watch mode
#[derive(Debug, Clone, PartialEq)]
pub enum BundlerEvent {
    /// A compile finished (possibly with errors)
    Compiled(Stats),

    /// The watcher stopped
    Failed(String),
}

/// A running watch-mode bundler; dropping it stops the bundler
pub struct WatchHandle {
    events: mpsc::Receiver<BundlerEvent>,
    task: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// A handle fed by `events`, with no process attached
    pub fn new(events: mpsc::Receiver<BundlerEvent>) -> Self {
        Self { events, task: None }
    }

    /// Wait for the next event; `None` once the bundler is gone
    pub async fn next_event(&mut self) -> Option<BundlerEvent> {
        self.events.recv().await
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// The bundler collaborator
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Bundler name for logging
    fn name(&self) -> &str;

    /// Compile once and report
    async fn compile(&self, config: &BundleConfig) -> Result<Stats>;

    /// Start compiling on every source change
    async fn watch(&self, config: &BundleConfig) -> Result<WatchHandle>;
}

/// Runs the configured bundler program
pub struct ExternalBundler {
    tool: BundlerTool,
    cwd: PathBuf,
    work_dir: PathBuf,
}

impl ExternalBundler {
    pub fn new(tool: BundlerTool, paths: &ResolvedPaths) -> Self {
        Self {
            tool,
            cwd: paths.cwd.clone(),
            work_dir: paths.work_dir.clone(),
        }
    }

    /// Persist `config` where the bundler will read it
    pub fn write_config(&self, config: &BundleConfig) -> Result<PathBuf> {
        write_config(&self.work_dir, config)
    }
}

/// Write `config` as pretty JSON into `work_dir`
pub fn write_config(work_dir: &Path, config: &BundleConfig) -> Result<PathBuf> {
    fs::create_dir_all(work_dir)
        .with_context(|| format!("Failed to create {}", work_dir.display()))?;

    let path = work_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;

    debug!("Wrote bundle config to {}", path.display());
    Ok(path)
}

#[async_trait]
impl Bundler for ExternalBundler {
    fn name(&self) -> &str {
        &self.tool.program
    }

    async fn compile(&self, config: &BundleConfig) -> Result<Stats> {
        let config_path = self.write_config(config)?;
        let args = [String::from("--config"), config_path.display().to_string()];

        let output = capture(&self.tool.program, &args, &self.cwd).await?;
        Ok(Stats::from_output(&output))
    }

    async fn watch(&self, config: &BundleConfig) -> Result<WatchHandle> {
        let config_path = self.write_config(config)?;

        let mut cmd = Command::new(&self.tool.program);
        cmd.arg("--config").arg(&config_path);
        if !self.tool.watch_flag.is_empty() {
            cmd.arg(&self.tool.watch_flag);
        }
        cmd.current_dir(&self.cwd);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to start {}", self.tool.program))?;
        let stdout = child
            .stdout
            .take()
            .context("Bundler stdout was not captured")?;

        let (tx, rx) = mpsc::channel(16);
        let program = self.tool.program.clone();

        let task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match serde_json::from_str::<Stats>(&line) {
                    Ok(stats) => {
                        if tx.send(BundlerEvent::Compiled(stats)).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => println!("{}", line),
                }
            }

            let reason = match child.wait().await {
                Ok(status) => format!("{} exited with {}", program, status),
                Err(e) => format!("{} could not be awaited: {}", program, e),
            };
            warn!("{}", reason);
            let _ = tx.send(BundlerEvent::Failed(reason)).await;
        });

        Ok(WatchHandle {
            events: rx,
            task: Some(task),
        })
    }
}
