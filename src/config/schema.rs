//! Configuration schema definitions
//!
//! Field names are camelCase on disk so project override files keep the
//! keys the tool has always documented (`baseDir`, `gzipExtensions`, ...).

use serde::{Deserialize, Serialize};

/// Source tree layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InputConfig {
    /// Source root, relative to the project root
    pub base_dir: String,

    /// Stylesheet include root (relative to `base_dir`)
    pub assets_dir: String,

    /// Files copied through untouched (relative to `base_dir`)
    pub manifest_dir: String,

    /// One bundle entry per file here (relative to `base_dir`)
    pub entries_dir: String,

    /// Page templates (relative to `base_dir`)
    pub views_dir: String,

    /// Template whose stem is emitted as the root `index.html`
    pub view_index_file: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            base_dir: "app".to_string(),
            assets_dir: "assets".to_string(),
            manifest_dir: "manifest".to_string(),
            entries_dir: "assets".to_string(),
            views_dir: "views".to_string(),
            view_index_file: "index".to_string(),
        }
    }
}

/// Output tree layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputConfig {
    /// Output root, relative to the project root
    pub base_dir: String,

    /// Build artifacts, relative to `base_dir`
    pub assets_dir: String,

    /// Destination of the static directory copy, relative to `base_dir`
    pub static_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: "public".to_string(),
            assets_dir: "assets".to_string(),
            static_dir: String::new(),
        }
    }
}

/// Project configuration and locale files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigDirs {
    pub base_dir: String,
    pub locales_dir: String,

    /// Application data exposed to pages as `$config`
    pub app_config_file: String,

    /// Locale whose pages are written at the output root
    pub default_locale: String,
}

impl Default for ConfigDirs {
    fn default() -> Self {
        Self {
            base_dir: "config".to_string(),
            locales_dir: "locales".to_string(),
            app_config_file: "app.conf".to_string(),
            default_locale: "en".to_string(),
        }
    }
}

/// Verbatim static file copy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticConfig {
    pub base_dir: String,

    /// Glob patterns excluded from the copy
    pub ignore: Vec<String>,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            base_dir: "static".to_string(),
            ignore: vec![".*".to_string()],
        }
    }
}

/// Production build behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildConfig {
    pub public_path: String,

    /// Run the linter before building
    pub linter: bool,

    pub gzip: bool,
    pub gzip_extensions: Vec<String>,

    /// Emit the bundle analyzer report
    pub analyzer: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            public_path: "/".to_string(),
            linter: true,
            gzip: false,
            gzip_extensions: vec!["js".to_string(), "css".to_string()],
            analyzer: false,
        }
    }
}

/// Development server behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DevConfig {
    pub public_path: String,

    /// Lint sources as part of each watch-mode compile
    pub linter: bool,

    pub port: u16,
    pub host: String,
    pub auto_open_browser: bool,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            public_path: "/".to_string(),
            linter: false,
            port: 8080,
            host: "localhost".to_string(),
            auto_open_browser: false,
        }
    }
}

/// External programs driven by the tasks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    pub bundler: BundlerTool,
    pub linter: LinterTool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BundlerTool {
    /// Invoked as `<program> --config <file>`
    pub program: String,
    pub watch_flag: String,
}

impl Default for BundlerTool {
    fn default() -> Self {
        Self {
            program: "mpa-bundle".to_string(),
            watch_flag: "--watch".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinterTool {
    pub program: String,

    /// Passed as `-f <formatter>`; resolved against the project root
    pub formatter: Option<String>,
}

impl Default for LinterTool {
    fn default() -> Self {
        Self {
            program: "eslint".to_string(),
            formatter: Some("node_modules/eslint-friendly-formatter".to_string()),
        }
    }
}
