//! Configuration handling
//!
//! Built-in defaults are overlaid by an optional project file
//! (`config/build.toml` unless `--config` says otherwise). A missing or
//! broken project file is never fatal: the defaults are used instead.

mod merge;
mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

pub use merge::{deep_merge, MergeStrategy};
pub use schema::*;

/// Default location of the project override file
pub const DEFAULT_CONFIG_FILE: &str = "config/build.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,

    #[serde(rename = "config")]
    pub dirs: ConfigDirs,

    #[serde(rename = "static")]
    pub static_files: StaticConfig,

    pub build: BuildConfig,
    pub dev: DevConfig,
    pub tools: ToolsConfig,
}

/// A configuration together with the project file it came from
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,

    /// Project file that was applied, `None` when running on defaults
    pub source: Option<PathBuf>,
}

/// Values supplied on the command line that win over any file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input_dir: Option<String>,
    pub output_dir: Option<String>,
    pub analyze: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.input_dir {
            config.input.base_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output.base_dir = dir.clone();
        }
        if self.analyze {
            config.build.analyzer = true;
        }
    }
}

impl Config {
    /// Arrays replaced wholesale by a project file; all others concatenate
    pub fn merge_strategy() -> MergeStrategy {
        MergeStrategy::new()
            .replace("static.ignore")
            .replace("build.gzipExtensions")
    }

    /// Built-in defaults, with `public_path` (from `PUBLIC_PATH`) as the
    /// production public path a project file may still override
    pub fn defaults(public_path: Option<&str>) -> Self {
        let mut config = Config::default();
        if let Some(public_path) = public_path {
            config.build.public_path = public_path.to_string();
        }
        config
    }

    /// Load defaults overlaid by the project file at `cwd/config_file`
    pub fn load(cwd: &Path, config_file: &Path) -> LoadedConfig {
        Self::load_over(Config::default(), cwd, config_file)
    }

    /// Load `base` overlaid by the project file at `cwd/config_file`
    pub fn load_over(base: Config, cwd: &Path, config_file: &Path) -> LoadedConfig {
        let path = cwd.join(config_file);

        if !path.is_file() {
            debug!("No project config at {}", path.display());
            return LoadedConfig {
                config: base,
                source: None,
            };
        }

        match Self::read_override(&path).and_then(|overlay| base.clone().overlay(overlay)) {
            Ok(config) => LoadedConfig {
                config,
                source: Some(path),
            },
            Err(e) => {
                info!("Ignoring project config {}: {:#}", path.display(), e);
                LoadedConfig {
                    config: base,
                    source: None,
                }
            }
        }
    }

    /// Merge an override tree onto the defaults
    pub fn with_override(overlay: Value) -> Result<Self> {
        Config::default().overlay(overlay)
    }

    /// Merge an override tree onto `self`
    pub fn overlay(self, overlay: Value) -> Result<Self> {
        let base = serde_json::to_value(self)?;
        let merged = deep_merge(base, overlay, &Self::merge_strategy());
        serde_json::from_value(merged).context("Project config does not match the schema")
    }

    fn read_override(path: &Path) -> Result<Value> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        let value = if is_json {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        } else {
            let table: toml::Table = toml::from_str(&content).context("Failed to parse TOML config")?;
            serde_json::to_value(table)?
        };

        Ok(value)
    }

    /// Resolve every configured path against the project root
    pub fn paths(&self, cwd: &Path) -> ResolvedPaths {
        let source_dir = cwd.join(&self.input.base_dir);
        let build_dir = cwd.join(&self.output.base_dir);
        let config_dir = cwd.join(&self.dirs.base_dir);
        let static_dir = cwd.join(&self.static_files.base_dir);

        ResolvedPaths {
            cwd: cwd.to_path_buf(),
            entries_dir: source_dir.join(&self.input.entries_dir),
            views_dir: source_dir.join(&self.input.views_dir),
            manifest_dir: source_dir.join(&self.input.manifest_dir),
            stylesheet_include_dir: source_dir.join(&self.input.assets_dir),
            locales_dir: config_dir.join(&self.dirs.locales_dir),
            app_config_file: config_dir.join(&self.dirs.app_config_file),
            static_out_dir: build_dir.join(&self.output.static_dir),
            node_modules: cwd.join("node_modules"),
            work_dir: cwd.join(".mpa-builder"),
            source_dir,
            build_dir,
            config_dir,
            static_dir,
        }
    }
}

/// Absolute paths derived from a [`Config`] and a working directory
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPaths {
    pub cwd: PathBuf,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub config_dir: PathBuf,
    pub static_dir: PathBuf,
    pub entries_dir: PathBuf,
    pub views_dir: PathBuf,
    pub manifest_dir: PathBuf,
    pub stylesheet_include_dir: PathBuf,
    pub locales_dir: PathBuf,
    pub app_config_file: PathBuf,
    pub static_out_dir: PathBuf,
    pub node_modules: PathBuf,

    /// Scratch directory for generated files handed to external tools
    pub work_dir: PathBuf,
}
