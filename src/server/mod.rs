//! Development server
//!
//! Provides a local development server with:
//! - Static serving of the bundler's output directory
//! - A WebSocket hot-reload channel
//! - Page reloads whenever the bundler re-emits an HTML page

mod hmr;

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use colored::Colorize;
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, error, info};

use crate::bundler::{Bundler, BundlerEvent, BundleConfig, WatchHandle, DEV_CLIENT_FILE};
use crate::cli::DevServerOptions;
use crate::config::ResolvedPaths;
use crate::transform::AssetKind;
use crate::utils::{log, relative_path};

pub use hmr::{HmrMessage, DEV_CLIENT_SCRIPT, HMR_PATH};

/// Shared server state
struct ServerState {
    /// HMR broadcast channel
    hmr_tx: broadcast::Sender<HmrMessage>,
}

/// Development server
pub struct DevServer {
    paths: ResolvedPaths,
    options: DevServerOptions,
}

impl DevServer {
    pub fn new(paths: ResolvedPaths, options: DevServerOptions) -> Self {
        Self { paths, options }
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.options.host, self.options.port)
    }

    /// Start the bundler in watch mode and serve its output until killed
    pub async fn start(&self, bundler: Arc<dyn Bundler>, bundle: &BundleConfig) -> Result<()> {
        let addr = self.resolve_addr().await?;

        write_dev_client(&self.paths.work_dir)?;
        fs::create_dir_all(&self.paths.build_dir)
            .with_context(|| format!("Failed to create {}", self.paths.build_dir.display()))?;

        let (hmr_tx, _) = broadcast::channel::<HmrMessage>(100);
        let state = Arc::new(ServerState {
            hmr_tx: hmr_tx.clone(),
        });

        // The debouncer stops watching when dropped
        let _watcher = watch_output(&self.paths.build_dir, hmr_tx.clone())?;

        debug!("Starting {} in watch mode", bundler.name());
        let handle = bundler.watch(bundle).await?;
        tokio::spawn(forward_bundler_events(
            handle,
            hmr_tx,
            self.url(),
            self.options.open,
        ));

        let app = Router::new()
            .route(HMR_PATH, get(hmr::hmr_websocket))
            .with_state(state);
        let app = mount_output(app, &self.options.public_path, &self.paths.build_dir)
            .layer(ServiceBuilder::new().layer(CorsLayer::permissive()));

        info!("Server listening on http://{}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    async fn resolve_addr(&self) -> Result<SocketAddr> {
        let target = format!("{}:{}", self.options.host, self.options.port);
        let addr = tokio::net::lookup_host(&target)
            .await
            .with_context(|| format!("Failed to resolve {}", target))?
            .next()
            .with_context(|| format!("No address for {}", target))?;
        Ok(addr)
    }
}

/// Serve `dir` under `public_path`
fn mount_output(app: Router, public_path: &str, dir: &Path) -> Router {
    let service = ServeDir::new(dir).append_index_html_on_directories(true);
    let prefix = public_path.trim_end_matches('/');

    if prefix.is_empty() {
        app.fallback_service(service)
    } else {
        let prefix = if prefix.starts_with('/') {
            prefix.to_string()
        } else {
            format!("/{}", prefix)
        };
        app.nest_service(&prefix, service)
    }
}

/// Write the hot-reload client the development entries import
pub fn write_dev_client(work_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(work_dir)
        .with_context(|| format!("Failed to create {}", work_dir.display()))?;
    let path = work_dir.join(DEV_CLIENT_FILE);
    fs::write(&path, DEV_CLIENT_SCRIPT)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Relay bundler notifications to connected browsers
async fn forward_bundler_events(
    mut handle: WatchHandle,
    hmr_tx: broadcast::Sender<HmrMessage>,
    url: String,
    open: bool,
) {
    let mut announced = false;

    while let Some(event) = handle.next_event().await {
        match event {
            BundlerEvent::Compiled(stats) => {
                if !announced {
                    announced = true;
                    log::info(&format!("Running dev server at {}...", url.cyan()));
                    if open {
                        if let Err(e) = webbrowser_open(&url) {
                            debug!("Failed to open browser: {}", e);
                        }
                    }
                }

                let message = if stats.has_errors() {
                    log::error(&stats.render());
                    HmrMessage::Errors {
                        errors: stats.errors,
                    }
                } else {
                    HmrMessage::Built {
                        warnings: stats.warnings,
                    }
                };
                let _ = hmr_tx.send(message);
            }
            BundlerEvent::Failed(reason) => {
                log::error(&reason);
                let _ = hmr_tx.send(HmrMessage::Errors {
                    errors: vec![reason],
                });
            }
        }
    }
}

/// Map a changed output file to the event browsers should receive
pub fn classify_change(path: &Path, root: &Path) -> Option<HmrMessage> {
    let display = relative_path(root, path).unwrap_or_else(|| path.display().to_string());
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    if extension.eq_ignore_ascii_case("html") {
        return Some(HmrMessage::Reload {
            reason: format!("{} emitted", display),
        });
    }

    match AssetKind::from_path(path) {
        AssetKind::Stylesheet => Some(HmrMessage::CssUpdate { path: display }),
        _ => None,
    }
}

/// Watch the output directory for page re-emission
fn watch_output(
    root: &Path,
    hmr_tx: broadcast::Sender<HmrMessage>,
) -> Result<notify_debouncer_mini::Debouncer<notify::RecommendedWatcher>> {
    let (tx, rx) = std::sync::mpsc::channel();

    let mut debouncer = new_debouncer(Duration::from_millis(100), tx)?;
    debouncer.watcher().watch(root, RecursiveMode::Recursive)?;

    let root = root.to_path_buf();
    std::thread::spawn(move || loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                for event in events {
                    if let Some(message) = classify_change(&event.path, &root) {
                        debug!("Output changed: {}", event.path.display());
                        let _ = hmr_tx.send(message);
                    }
                }
            }
            Ok(Err(e)) => {
                error!("Watch error: {:?}", e);
            }
            Err(_) => break,
        }
    });

    Ok(debouncer)
}

/// Open URL in browser (simple implementation)
fn webbrowser_open(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::Stats;
    use tokio::sync::mpsc;

    #[test]
    fn test_html_emission_triggers_reload() {
        let root = Path::new("/site/public");
        assert_eq!(
            classify_change(Path::new("/site/public/fr/about/index.html"), root),
            Some(HmrMessage::Reload {
                reason: "fr/about/index.html emitted".into()
            })
        );
    }

    #[test]
    fn test_stylesheet_change_is_css_update() {
        let root = Path::new("/site/public");
        assert_eq!(
            classify_change(Path::new("/site/public/assets/stylesheets/index.css"), root),
            Some(HmrMessage::CssUpdate {
                path: "assets/stylesheets/index.css".into()
            })
        );
        assert_eq!(classify_change(Path::new("/site/public/index.js"), root), None);
    }

    #[tokio::test]
    async fn test_resolve_addr() {
        let paths = crate::config::Config::default().paths(Path::new("/site"));
        let server = DevServer::new(
            paths,
            DevServerOptions {
                host: "127.0.0.1".into(),
                port: 8123,
                open: false,
                public_path: "/".into(),
            },
        );

        let addr = server.resolve_addr().await.unwrap();
        assert_eq!(addr, "127.0.0.1:8123".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_write_dev_client() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dev_client(&dir.path().join(".mpa-builder")).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), DEV_CLIENT_SCRIPT);
    }

    #[tokio::test]
    async fn test_compile_errors_reach_browsers() {
        let (events_tx, events_rx) = mpsc::channel(4);
        let (hmr_tx, mut hmr_rx) = broadcast::channel(4);

        events_tx
            .send(BundlerEvent::Compiled(Stats {
                errors: vec!["Unexpected token".into()],
                ..Stats::default()
            }))
            .await
            .unwrap();
        events_tx
            .send(BundlerEvent::Compiled(Stats::default()))
            .await
            .unwrap();
        drop(events_tx);

        forward_bundler_events(WatchHandle::new(events_rx), hmr_tx, "http://localhost:0".into(), false).await;

        assert_eq!(
            hmr_rx.recv().await.unwrap(),
            HmrMessage::Errors {
                errors: vec!["Unexpected token".into()]
            }
        );
        assert_eq!(hmr_rx.recv().await.unwrap(), HmrMessage::Built { warnings: vec![] });
    }
}
