//! Command-line interface for mpa-builder
//!
//! Provides the main CLI structure using clap with subcommands for:
//! - `clean`: Remove the output directory
//! - `build`: Lint, clean and compile for production
//! - `dev`: Development server with hot reload
//! - `lint`: Lint the input directory

mod build;
mod clean;
mod dev;
mod lint;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::debug;

use crate::bundler::{Bundler, ExternalBundler};
use crate::config::{Config, Overrides, ResolvedPaths, DEFAULT_CONFIG_FILE};
use crate::error::Error;
use crate::utils::log;

pub use dev::DevServerOptions;

/// Builds multi-page, multi-locale static sites with an external bundler
#[derive(Parser, Debug)]
#[command(name = "mpa-builder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true, arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The config file relative to project root
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// The input directory relative to project root
    #[arg(short = 'i', long = "inputDir", visible_alias = "input-dir", global = true)]
    pub input_dir: Option<String>,

    /// The output directory relative to project root
    #[arg(short = 'o', long = "outputDir", visible_alias = "output-dir", global = true)]
    pub output_dir: Option<String>,

    /// Run the bundle analyzer on build
    #[arg(short, long, global = true)]
    pub analyze: bool,

    /// Let the linter fix issues automatically
    #[arg(short, long, global = true)]
    pub fix: bool,

    /// Default public URL prefix of production assets; `build.publicPath` in the config file wins
    #[arg(long, env = "PUBLIC_PATH", global = true)]
    pub public_path: Option<String>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Wipe the built files
    Clean,

    /// Build the project for production
    Build,

    /// Run the project on a local dev server with hot reloading
    Dev,

    /// Lint the input directory
    Lint,
}

/// Everything a task needs about the project it runs on
pub struct Project {
    pub config: Config,
    pub paths: ResolvedPaths,
    pub bundler: Arc<dyn Bundler>,
}

impl Project {
    pub fn new(config: Config, paths: ResolvedPaths) -> Self {
        let bundler = Arc::new(ExternalBundler::new(config.tools.bundler.clone(), &paths));
        Self {
            config,
            paths,
            bundler,
        }
    }
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            input_dir: self.input_dir.clone(),
            output_dir: self.output_dir.clone(),
            analyze: self.analyze,
        }
    }

    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        let cwd = std::env::current_dir()?;

        let defaults = Config::defaults(self.public_path.as_deref());
        let loaded = Config::load_over(defaults, &cwd, &self.config);
        let mut config = loaded.config;
        self.overrides().apply(&mut config);
        let paths = config.paths(&cwd);

        if !paths.source_dir.is_dir() {
            return Err(Error::InputDirMissing(paths.source_dir).into());
        }

        let config_note = match &loaded.source {
            Some(_) => format!(" with config {}", self.config.display().to_string().cyan()),
            None => " with default config".to_string(),
        };
        log::info(&format!(
            "{}: Using input dir {} and output dir {}{}",
            format!("v{}", env!("CARGO_PKG_VERSION")).cyan(),
            config.input.base_dir.cyan(),
            config.output.base_dir.cyan(),
            config_note
        ));
        debug!("Resolved paths: {:?}", paths);

        let project = Project::new(config, paths);

        match self.command {
            Commands::Clean => clean::run(&project).await?,
            Commands::Build => build::run(&project).await?,
            Commands::Dev => dev::run(&project).await?,
            Commands::Lint => lint::run(&project, self.fix).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::Project;
    use crate::bundler::{BundleConfig, Bundler, Stats, WatchHandle};
    use crate::config::Config;

    /// Bundler double returning canned stats and counting compiles
    #[derive(Default)]
    pub struct FakeBundler {
        pub stats: Stats,
        pub compiles: AtomicUsize,
    }

    impl FakeBundler {
        pub fn compile_count(&self) -> usize {
            self.compiles.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Bundler for FakeBundler {
        fn name(&self) -> &str {
            "fake"
        }

        async fn compile(&self, _config: &BundleConfig) -> Result<Stats> {
            self.compiles.fetch_add(1, Ordering::SeqCst);
            Ok(self.stats.clone())
        }

        async fn watch(&self, _config: &BundleConfig) -> Result<WatchHandle> {
            let (_tx, rx) = mpsc::channel(1);
            Ok(WatchHandle::new(rx))
        }
    }

    pub fn project(root: &Path, config: Config, bundler: Arc<FakeBundler>) -> Project {
        let paths = config.paths(root);
        Project {
            config,
            paths,
            bundler,
        }
    }
}
