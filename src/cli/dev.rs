//! Development server command implementation

use anyhow::Result;
use colored::Colorize;

use super::Project;
use crate::bundler::{generate, Mode};
use crate::config::DevConfig;
use crate::server::DevServer;

/// Development server options
#[derive(Debug, Clone)]
pub struct DevServerOptions {
    pub host: String,
    pub port: u16,
    pub open: bool,

    /// URL prefix the output directory is served under
    pub public_path: String,
}

impl From<&DevConfig> for DevServerOptions {
    fn from(dev: &DevConfig) -> Self {
        Self {
            host: dev.host.clone(),
            port: dev.port,
            open: dev.auto_open_browser,
            public_path: dev.public_path.clone(),
        }
    }
}

/// Serve the project with the bundler in watch mode; runs until killed
pub async fn run(project: &Project) -> Result<()> {
    let bundle = generate(&project.config, &project.paths.cwd, Mode::Development)?;
    let server = DevServer::new(project.paths.clone(), DevServerOptions::from(&project.config.dev));

    eprintln!(
        "  {} Press {} to stop\n",
        "•".dimmed(),
        "Ctrl+C".yellow()
    );

    server.start(project.bundler.clone(), &bundle).await
}
