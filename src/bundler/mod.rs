//! Bundle configuration generator
//!
//! Turns a merged [`Config`] and a project root into the complete
//! configuration consumed by the external bundler: entries, output naming,
//! loader rules, plugins and one HTML target per locale × page. The result
//! is a pure function of the configuration and the filesystem.

mod chunk;
pub mod external;
mod pages;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{Config, ResolvedPaths};
use crate::error::Result;
use crate::i18n::Catalog;
use crate::plugins::{self, PluginSpec};
use crate::resolver::SourceSets;
use crate::transform::{self, Rule};
use crate::utils::{log, posix_join};

pub use chunk::{page_chunks, COMMON_CHUNK, RUNTIME_CHUNK};
pub use external::{Bundler, BundlerEvent, ExternalBundler, Stats, WatchHandle};
pub use pages::{html_targets, output_file, HtmlMinify, HtmlTarget, NOT_FOUND_PAGE};

/// File name of the hot-reload client prepended to entries in development
pub const DEV_CLIENT_FILE: &str = "dev-client.js";

/// Build flavor; selects mutually exclusive plugin and loader options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    pub fn is_development(self) -> bool {
        self == Mode::Development
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Development => "development",
            Mode::Production => "production",
        }
    }
}

/// Bundler diagnostics switches
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsOptions {
    pub colors: bool,
    pub modules: bool,
    pub reasons: bool,
    pub error_details: bool,
}

impl Default for StatsOptions {
    fn default() -> Self {
        Self {
            colors: true,
            modules: true,
            reasons: true,
            error_details: true,
        }
    }
}

/// Modules making up one entry bundle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntrySource {
    Single(PathBuf),
    /// Dev client followed by the entry file
    Many(Vec<PathBuf>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputSpec {
    pub path: PathBuf,
    pub public_path: String,
    pub filename: String,
    pub chunk_filename: String,
    pub source_map_filename: String,
}

impl OutputSpec {
    fn new(config: &Config, paths: &ResolvedPaths, mode: Mode) -> Self {
        let assets = config.output.assets_dir.as_str();
        match mode {
            Mode::Development => Self {
                path: paths.build_dir.clone(),
                public_path: config.dev.public_path.clone(),
                filename: "[name].js".to_string(),
                chunk_filename: "[chunkhash].js".to_string(),
                source_map_filename: "[name].map".to_string(),
            },
            Mode::Production => Self {
                path: paths.build_dir.clone(),
                public_path: config.build.public_path.clone(),
                filename: posix_join(&[assets, "[name].[chunkhash].js"]),
                chunk_filename: posix_join(&[assets, "[id].[chunkhash].js"]),
                source_map_filename: posix_join(&[assets, "[name].[hash].map"]),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleSpec {
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolveSpec {
    pub extensions: Vec<String>,
    pub modules: Vec<PathBuf>,
}

/// The complete configuration handed to the bundler
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleConfig {
    pub mode: Mode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub devtool: Option<String>,

    /// Directory entries are resolved against
    pub context: PathBuf,

    pub stats: StatsOptions,
    pub entry: BTreeMap<String, EntrySource>,
    pub output: OutputSpec,
    pub module: ModuleSpec,
    pub resolve: ResolveSpec,
    pub plugins: Vec<PluginSpec>,
}

impl BundleConfig {
    /// HTML emissions, in plugin order
    pub fn html_targets(&self) -> impl Iterator<Item = &HtmlTarget> {
        self.plugins.iter().filter_map(|plugin| match plugin {
            PluginSpec::Html(target) => Some(target),
            _ => None,
        })
    }
}

/// Application data exposed to pages; `{}` when absent or unreadable
pub fn load_app_config(path: &Path) -> Value {
    let Ok(content) = fs::read_to_string(path) else {
        log::info("No app config found");
        return Value::Object(Default::default());
    };

    if let Ok(value) = serde_json::from_str::<Value>(&content) {
        return value;
    }

    match toml::from_str::<toml::Table>(&content) {
        Ok(table) => serde_json::to_value(table).unwrap_or_default(),
        Err(e) => {
            debug!("Unparsable app config {}: {}", path.display(), e);
            log::info("No app config found");
            Value::Object(Default::default())
        }
    }
}

/// Generate the bundle configuration for `mode`
pub fn generate(config: &Config, cwd: &Path, mode: Mode) -> Result<BundleConfig> {
    let paths = config.paths(cwd);
    let sets = SourceSets::scan(&paths);
    let app_config = load_app_config(&paths.app_config_file);

    let default_locale = config.dirs.default_locale.as_str();
    if !sets.locales.is_empty() && !sets.locales.iter().any(|l| l.name == default_locale) {
        warn!(
            "Default locale '{}' has no file in {}; every locale will be prefixed",
            default_locale,
            paths.locales_dir.display()
        );
    }
    let catalog = Catalog::load(default_locale, &sets.locales)?;

    let index_page = Path::new(&config.input.view_index_file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index");

    let dev_client = paths.work_dir.join(DEV_CLIENT_FILE);
    let entry = sets
        .entries
        .iter()
        .map(|file| {
            let source = match mode {
                Mode::Development => EntrySource::Many(vec![dev_client.clone(), file.path.clone()]),
                Mode::Production => EntrySource::Single(file.path.clone()),
            };
            (file.name.clone(), source)
        })
        .collect();

    let targets = html_targets(&sets, &catalog, &paths.build_dir, index_page);
    debug!("Generated {} page targets", targets.len());

    Ok(BundleConfig {
        mode,
        devtool: mode.is_development().then(|| "cheap-eval-source-map".to_string()),
        context: paths.source_dir.clone(),
        stats: StatsOptions::default(),
        entry,
        output: OutputSpec::new(config, &paths, mode),
        module: ModuleSpec {
            rules: transform::rules(config, &paths, mode),
        },
        resolve: ResolveSpec {
            extensions: [".js", ".sass", ".scss", ".pug"].map(String::from).to_vec(),
            modules: vec![paths.source_dir.clone(), paths.node_modules.clone()],
        },
        plugins: plugins::plugins(config, &paths, mode, &app_config, targets)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "app/assets/index.js", "");
        write(root, "app/assets/about.js", "");
        write(root, "app/views/index.pug", "");
        write(root, "app/views/404.pug", "");
        write(root, "app/views/about.pug", "");
        write(root, "config/locales/en.json", r#"{"hello": "Hello"}"#);
        write(root, "config/locales/fr.json", r#"{"hello": "Bonjour"}"#);
        dir
    }

    #[test]
    fn test_entries_per_file() {
        let dir = site();
        let bundle = generate(&Config::default(), dir.path(), Mode::Production).unwrap();
        let names: Vec<&String> = bundle.entry.keys().collect();
        assert_eq!(names, vec!["about", "index"]);
        assert_eq!(
            bundle.entry["index"],
            EntrySource::Single(dir.path().join("app/assets/index.js"))
        );
    }

    #[test]
    fn test_dev_entries_carry_client() {
        let dir = site();
        let bundle = generate(&Config::default(), dir.path(), Mode::Development).unwrap();
        assert_eq!(
            bundle.entry["about"],
            EntrySource::Many(vec![
                dir.path().join(".mpa-builder").join(DEV_CLIENT_FILE),
                dir.path().join("app/assets/about.js"),
            ])
        );
    }

    #[test]
    fn test_locale_page_cross_product() {
        let dir = site();
        let bundle = generate(&Config::default(), dir.path(), Mode::Production).unwrap();
        let out = dir.path().join("public");

        let mut files: Vec<PathBuf> = bundle.html_targets().map(|t| t.filename.clone()).collect();
        assert_eq!(files.len(), 2 * 3);
        files.sort();

        let mut expected = vec![
            out.join("index.html"),
            out.join("404.html"),
            out.join("about/index.html"),
            out.join("fr/index.html"),
            out.join("fr/404.html"),
            out.join("fr/about/index.html"),
        ];
        expected.sort();
        assert_eq!(files, expected);
    }

    #[test]
    fn test_targets_carry_locale_messages() {
        let dir = site();
        let bundle = generate(&Config::default(), dir.path(), Mode::Production).unwrap();
        let fr = bundle.html_targets().find(|t| t.locale == "fr").unwrap();
        assert_eq!(fr.messages.get("hello"), Some(&Value::String("Bonjour".into())));
    }

    #[test]
    fn test_targets_fall_back_to_default_locale_messages() {
        let dir = site();
        write(dir.path(), "config/locales/en.json", r#"{"hello": "Hello", "only_en": "English"}"#);
        write(dir.path(), "config/locales/fr.json", "");

        let bundle = generate(&Config::default(), dir.path(), Mode::Production).unwrap();
        let fr = bundle.html_targets().find(|t| t.locale == "fr").unwrap();
        assert_eq!(fr.messages.get("only_en"), Some(&Value::String("English".into())));
        assert_eq!(fr.messages.get("hello"), Some(&Value::String("Hello".into())));
    }

    #[test]
    fn test_non_json_locale_files_are_ignored() {
        let dir = site();
        write(dir.path(), "config/locales/README.md", "# Locales\n");
        write(dir.path(), "config/locales/de.yml", "hello: Hallo\n");

        let bundle = generate(&Config::default(), dir.path(), Mode::Production).unwrap();
        let mut locales: Vec<&str> = bundle.html_targets().map(|t| t.locale.as_str()).collect();
        locales.dedup();
        assert_eq!(locales, vec!["en", "fr"]);
    }

    #[test]
    fn test_generation_is_idempotent() {
        let dir = site();
        write(dir.path(), "static/robots.txt", "");
        write(dir.path(), "config/app.conf", r#"{"name": "demo"}"#);

        for mode in [Mode::Development, Mode::Production] {
            let first = generate(&Config::default(), dir.path(), mode).unwrap();
            let second = generate(&Config::default(), dir.path(), mode).unwrap();
            assert_eq!(first, second);
            assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );
        }
    }

    #[test]
    fn test_mode_selects_output_naming() {
        let dir = site();
        let dev = generate(&Config::default(), dir.path(), Mode::Development).unwrap();
        let prod = generate(&Config::default(), dir.path(), Mode::Production).unwrap();

        assert_eq!(dev.devtool.as_deref(), Some("cheap-eval-source-map"));
        assert_eq!(dev.output.filename, "[name].js");
        assert_eq!(prod.devtool, None);
        assert_eq!(prod.output.filename, "assets/[name].[chunkhash].js");
        assert_eq!(prod.output.chunk_filename, "assets/[id].[chunkhash].js");
        assert_eq!(prod.output.source_map_filename, "assets/[name].[hash].map");
    }

    #[test]
    fn test_public_path_per_mode() {
        let dir = site();
        let mut config = Config::default();
        config.build.public_path = "/cdn/".into();
        config.dev.public_path = "/dev/".into();

        assert_eq!(generate(&config, dir.path(), Mode::Production).unwrap().output.public_path, "/cdn/");
        assert_eq!(generate(&config, dir.path(), Mode::Development).unwrap().output.public_path, "/dev/");
    }

    #[test]
    fn test_app_config_injected() {
        let dir = site();
        write(dir.path(), "config/app.conf", "title = \"Demo\"\n");
        let bundle = generate(&Config::default(), dir.path(), Mode::Production).unwrap();

        let define = bundle.plugins.iter().find(|p| p.name() == "define").unwrap();
        let value = serde_json::to_value(define).unwrap();
        assert_eq!(value["definitions"]["$config"], r#"{"title":"Demo"}"#);
    }

    #[test]
    fn test_missing_app_config_is_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_app_config(&dir.path().join("app.conf")), serde_json::json!({}));
    }

    #[test]
    fn test_empty_project_generates() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = generate(&Config::default(), dir.path(), Mode::Production).unwrap();
        assert!(bundle.entry.is_empty());
        assert_eq!(bundle.html_targets().count(), 0);
    }

    #[test]
    fn test_serialized_top_level_keys() {
        let dir = site();
        let bundle = generate(&Config::default(), dir.path(), Mode::Production).unwrap();
        let value = serde_json::to_value(&bundle).unwrap();
        assert_eq!(value["mode"], "production");
        assert!(value.get("devtool").is_none());
        assert_eq!(value["output"]["publicPath"], "/");
        assert_eq!(value["stats"]["errorDetails"], true);
        assert_eq!(value["plugins"].as_array().unwrap().last().unwrap()["plugin"], "html");
    }
}
