//! Plugin pipeline
//!
//! The plugin list handed to the bundler: code splitting, environment
//! injection, static copying, stylesheet extraction, minification,
//! compression, bundle analysis and one HTML emission per page target.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use walkdir::WalkDir;

use crate::bundler::{HtmlTarget, Mode, COMMON_CHUNK, RUNTIME_CHUNK};
use crate::config::{Config, ResolvedPaths};
use crate::error::Result;
use crate::utils::{posix_join, relative_path};

/// Assets smaller than this are not compressed
pub const COMPRESSION_THRESHOLD: u64 = 10_240;

/// Compressed output is kept only below this size ratio
pub const COMPRESSION_MIN_RATIO: f64 = 0.8;

/// Modules hoisted into the `common` chunk
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorModules {
    /// Regex over the module resource path
    pub resource: String,
    /// Only modules under this directory
    pub under: PathBuf,
}

/// A single bundler plugin and its options
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "plugin", rename_all = "kebab-case")]
pub enum PluginSpec {
    /// Compile-time constants
    Define { definitions: BTreeMap<String, Value> },

    #[serde(rename_all = "camelCase")]
    CommonsChunk {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        chunks: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        min_chunks: Option<VendorModules>,
    },

    /// Verbatim copy of the static directory
    Copy {
        from: PathBuf,
        to: PathBuf,
        ignore: Vec<String>,
        /// Files (relative to `from`) that survive `ignore`
        files: Vec<String>,
    },

    HotModuleReplacement,
    NoEmitOnErrors,

    ExtractText { filename: String },

    OptimizeCss { safe: bool },

    #[serde(rename_all = "camelCase")]
    Uglify { compress_warnings: bool },

    #[serde(rename_all = "camelCase")]
    Compression {
        asset: String,
        algorithm: String,
        test: String,
        threshold: u64,
        min_ratio: f64,
    },

    BundleAnalyzer,

    Html(HtmlTarget),
}

impl PluginSpec {
    /// Kebab-case plugin name, as serialized
    pub fn name(&self) -> &'static str {
        match self {
            PluginSpec::Define { .. } => "define",
            PluginSpec::CommonsChunk { .. } => "commons-chunk",
            PluginSpec::Copy { .. } => "copy",
            PluginSpec::HotModuleReplacement => "hot-module-replacement",
            PluginSpec::NoEmitOnErrors => "no-emit-on-errors",
            PluginSpec::ExtractText { .. } => "extract-text",
            PluginSpec::OptimizeCss { .. } => "optimize-css",
            PluginSpec::Uglify { .. } => "uglify",
            PluginSpec::Compression { .. } => "compression",
            PluginSpec::BundleAnalyzer => "bundle-analyzer",
            PluginSpec::Html(_) => "html",
        }
    }
}

fn define(mode: Mode, app_config: &Value) -> PluginSpec {
    let mut definitions = BTreeMap::new();
    definitions.insert(
        "process.env".to_string(),
        json!({ "NODE_ENV": Value::String(mode.as_str().to_string()).to_string() }),
    );
    definitions.insert("$config".to_string(), Value::String(app_config.to_string()));
    PluginSpec::Define { definitions }
}

fn build_ignore_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Files under `from` whose relative path and file name match no pattern
pub fn static_files(from: &Path, ignore: &[String]) -> Result<Vec<String>> {
    let ignore = build_ignore_set(ignore)?;

    let files = WalkDir::new(from)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let relative = relative_path(from, entry.path())?;
            let ignored = ignore.is_match(&relative) || ignore.is_match(entry.file_name());
            (!ignored).then_some(relative)
        })
        .collect();

    Ok(files)
}

fn compression_test(extensions: &[String]) -> String {
    let alternatives: Vec<String> = extensions.iter().map(|ext| regex::escape(ext)).collect();
    format!(r"\.({})$", alternatives.join("|"))
}

/// Assemble the plugin list; `pages` are appended last, in order
pub fn plugins(
    config: &Config,
    paths: &ResolvedPaths,
    mode: Mode,
    app_config: &Value,
    pages: Vec<HtmlTarget>,
) -> Result<Vec<PluginSpec>> {
    let assets_dir = config.output.assets_dir.as_str();

    let mut plugins = vec![
        define(mode, app_config),
        PluginSpec::CommonsChunk {
            name: COMMON_CHUNK.to_string(),
            chunks: None,
            min_chunks: Some(VendorModules {
                resource: r"\.js$".to_string(),
                under: paths.node_modules.clone(),
            }),
        },
        PluginSpec::CommonsChunk {
            name: RUNTIME_CHUNK.to_string(),
            chunks: Some(vec![COMMON_CHUNK.to_string()]),
            min_chunks: None,
        },
    ];

    if paths.static_dir.is_dir() {
        plugins.push(PluginSpec::Copy {
            from: paths.static_dir.clone(),
            to: paths.static_out_dir.clone(),
            ignore: config.static_files.ignore.clone(),
            files: static_files(&paths.static_dir, &config.static_files.ignore)?,
        });
    }

    match mode {
        Mode::Development => {
            plugins.push(PluginSpec::HotModuleReplacement);
            plugins.push(PluginSpec::NoEmitOnErrors);
        }
        Mode::Production => {
            plugins.push(PluginSpec::ExtractText {
                filename: posix_join(&[assets_dir, "stylesheets", "[name].[contenthash].css"]),
            });
            plugins.push(PluginSpec::OptimizeCss { safe: true });
            plugins.push(PluginSpec::Uglify {
                compress_warnings: false,
            });

            if config.build.gzip {
                plugins.push(PluginSpec::Compression {
                    asset: "[path].gz[query]".to_string(),
                    algorithm: "gzip".to_string(),
                    test: compression_test(&config.build.gzip_extensions),
                    threshold: COMPRESSION_THRESHOLD,
                    min_ratio: COMPRESSION_MIN_RATIO,
                });
            }

            if config.build.analyzer {
                plugins.push(PluginSpec::BundleAnalyzer);
            }
        }
    }

    plugins.extend(pages.into_iter().map(PluginSpec::Html));

    Ok(plugins)
}
