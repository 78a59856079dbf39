//! Build command implementation

use std::path::Path;
use std::time::{Duration, Instant};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use walkdir::WalkDir;

use super::{clean, lint, Project};
use crate::bundler::{generate, Mode};
use crate::error::{Error, Result};
use crate::utils::{format_duration, format_size, log, relative_path};

/// Lint (if enabled), clean, then compile once in production mode
pub async fn run(project: &Project) -> Result<()> {
    let start = Instant::now();

    if project.config.build.linter {
        lint::run(project, false).await?;
    }

    clean::run(project).await?;

    log::info("Building...");
    let bundle = generate(&project.config, &project.paths.cwd, Mode::Production)?;
    info!(
        "Compiling {} entries and {} pages with {}",
        bundle.entry.len(),
        bundle.html_targets().count(),
        project.bundler.name()
    );

    let spinner = spinner();
    let result = project.bundler.compile(&bundle).await;
    spinner.finish_and_clear();

    let stats = match result {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("{:#}", e);
            log::fail("Build failed");
            return Err(Error::Compile(format!("{:#}", e)));
        }
    };

    if stats.has_errors() {
        eprintln!("{}", stats.render());
        log::fail("Build failed");
        return Err(Error::Compile(format!("{} error(s) reported", stats.errors.len())));
    }

    let report = stats.render();
    if !report.is_empty() {
        println!("{}", report);
    }
    print_pages(&project.paths.build_dir);

    log::succeed(&format!("Build complete in {}", format_duration(start.elapsed())));
    Ok(())
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message("Compiling...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// List emitted pages with their sizes
fn print_pages(build_dir: &Path) {
    let pages = WalkDir::new(build_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("html"));

    for page in pages {
        let size = page.metadata().map(|m| m.len()).unwrap_or(0);
        let name = relative_path(build_dir, page.path()).unwrap_or_default();
        println!("  {} {} {}", "•".dimmed(), name.cyan(), format_size(size).dimmed());
    }
}
