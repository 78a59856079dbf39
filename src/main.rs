//! mpa-builder - build tool for multi-page, multi-locale static sites
//!
//! Scans a project for entry scripts, page templates and locale files,
//! generates the matching bundler configuration, and runs one of four
//! tasks over it.
//!
//! # Commands
//! - `clean`: wipe the output directory
//! - `build`: lint, clean and compile for production
//! - `dev`: watch-mode bundler behind a hot-reloading dev server
//! - `lint`: lint the input directory, optionally fixing issues

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mpa_builder::utils::log;
use mpa_builder::Cli;

/// Initialize the logging/tracing system
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("mpa_builder=debug,tower_http=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mpa_builder=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    init_tracing(cli.verbose);

    match cli.execute().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
