//! Loader pipeline
//!
//! Describes, per file type, the ordered chain of transformation steps the
//! bundler applies. Rules are data only: the loaders themselves belong to
//! the bundler.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::bundler::Mode;
use crate::config::{Config, ResolvedPaths};
use crate::utils::{posix_join, to_posix};

/// Inline size limit for the url loader, in bytes
pub const URL_INLINE_LIMIT: u64 = 10_000;

const HASHED_NAME: &str = "[name].[hash:7].[ext]";

/// Broad category of a source asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Script,
    Template,
    Stylesheet,
    Manifest,
    Image,
    Media,
    Font,
    Lint,
    Other,
}

impl AssetKind {
    /// Determine asset kind from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "js" => AssetKind::Script,
            "pug" => AssetKind::Template,
            "scss" | "sass" | "css" => AssetKind::Stylesheet,
            "jpg" | "jpeg" | "png" | "gif" | "svg" | "ico" => AssetKind::Image,
            "mp4" | "webm" | "ogg" | "mp3" | "wav" | "flac" | "aac" => AssetKind::Media,
            "woff" | "woff2" | "eot" | "ttf" | "otf" => AssetKind::Font,
            _ => AssetKind::Other,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(AssetKind::Other)
    }
}

/// Include/exclude condition of a rule
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// Anything under this directory
    Path(PathBuf),
    /// Regex matched against the full path
    Pattern(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforce {
    Pre,
}

/// One named transformation step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoaderStep {
    pub loader: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl LoaderStep {
    pub fn new(loader: &str) -> Self {
        Self {
            loader: loader.to_string(),
            options: Map::new(),
        }
    }

    pub fn option(mut self, key: &str, value: Value) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }
}

/// A file-type rule and its loader chain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    #[serde(skip)]
    pub kind: AssetKind,

    /// Regex over the module path
    pub test: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<Condition>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<Condition>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforce: Option<Enforce>,

    #[serde(rename = "use")]
    pub steps: Vec<LoaderStep>,
}

impl Rule {
    fn new(kind: AssetKind, test: &str, steps: Vec<LoaderStep>) -> Self {
        Self {
            kind,
            test: test.to_string(),
            include: Vec::new(),
            exclude: Vec::new(),
            enforce: None,
            steps,
        }
    }

    fn include(mut self, condition: Condition) -> Self {
        self.include.push(condition);
        self
    }

    fn exclude(mut self, condition: Condition) -> Self {
        self.exclude.push(condition);
        self
    }
}

/// Stylesheet chain switches; development and production pick opposite sides
#[derive(Debug, Clone, Copy)]
pub struct StylesheetOptions {
    pub inline: bool,
    pub source_map: bool,
    pub minify: bool,
}

impl StylesheetOptions {
    pub fn for_mode(mode: Mode) -> Self {
        let debug = mode.is_development();
        Self {
            inline: debug,
            source_map: debug,
            minify: !debug,
        }
    }
}

fn javascript_steps() -> Vec<LoaderStep> {
    vec![LoaderStep::new("babel-loader").option("presets", json!(["env"]))]
}

fn lint_steps() -> Vec<LoaderStep> {
    vec![LoaderStep::new("eslint-loader").option("formatter", json!("eslint-friendly-formatter"))]
}

fn template_steps(source_dir: &Path) -> Vec<LoaderStep> {
    let mut steps = javascript_steps();
    steps.push(LoaderStep::new("pug-loader").option("root", json!(to_posix(source_dir))));
    steps
}

fn stylesheet_steps(options: StylesheetOptions, include_dir: &Path) -> Vec<LoaderStep> {
    let output_style = format!(
        "{}{}",
        if options.minify { "compressed" } else { "expanded" },
        if options.source_map { ",sourceMap" } else { "" }
    );

    let mut steps = Vec::new();
    if options.inline {
        steps.push(LoaderStep::new("style-loader"));
    } else {
        steps.push(LoaderStep::new("extract-text-loader").option("fallback", json!("style-loader")));
    }

    steps.push(
        LoaderStep::new("css-loader")
            .option("sourceMap", json!(options.source_map))
            .option("minimize", json!(options.minify)),
    );
    steps.push(LoaderStep::new("postcss-loader").option("plugins", json!(["autoprefixer"])));
    steps.push(
        LoaderStep::new("sass-loader")
            .option("includePaths", json!([to_posix(include_dir)]))
            .option("outputStyle", json!(output_style)),
    );
    steps
}

fn file_steps(output_dir: &str) -> Vec<LoaderStep> {
    vec![LoaderStep::new("file-loader").option("name", json!(posix_join(&[output_dir, HASHED_NAME])))]
}

fn url_steps(output_dir: &str) -> Vec<LoaderStep> {
    vec![LoaderStep::new("url-loader")
        .option("limit", json!(URL_INLINE_LIMIT))
        .option("name", json!(posix_join(&[output_dir, HASHED_NAME])))]
}

/// Build the ordered rule list for `mode`
pub fn rules(config: &Config, paths: &ResolvedPaths, mode: Mode) -> Vec<Rule> {
    let node_modules = || Condition::Pattern("node_modules".to_string());
    let manifest = || Condition::Path(paths.manifest_dir.clone());
    let assets_dir = config.output.assets_dir.as_str();

    let mut rules = vec![
        Rule::new(AssetKind::Script, r"\.js$", javascript_steps())
            .exclude(node_modules())
            .exclude(manifest()),
        Rule::new(AssetKind::Template, r"\.pug$", template_steps(&paths.source_dir))
            .exclude(node_modules())
            .exclude(manifest()),
        Rule::new(
            AssetKind::Stylesheet,
            r"\.(scss|sass)$",
            stylesheet_steps(StylesheetOptions::for_mode(mode), &paths.stylesheet_include_dir),
        ),
        Rule::new(AssetKind::Manifest, r"\.*", file_steps("")).include(manifest()),
        Rule::new(
            AssetKind::Image,
            r"\.(jpe?g|png|gif|svg|ico)(\?.*)?$",
            url_steps(&posix_join(&[assets_dir, "images"])),
        )
        .exclude(manifest()),
        Rule::new(
            AssetKind::Media,
            r"\.(mp4|webm|ogg|mp3|wav|flac|aac)(\?.*)?$",
            url_steps(&posix_join(&[assets_dir, "media"])),
        )
        .exclude(manifest()),
        Rule::new(
            AssetKind::Font,
            r"\.(woff2?|eot|ttf|otf)(\?.*)?$",
            url_steps(&posix_join(&[assets_dir, "fonts"])),
        )
        .exclude(manifest()),
    ];

    if mode.is_development() && config.dev.linter {
        let mut lint = Rule::new(AssetKind::Lint, r"\.js", lint_steps())
            .include(Condition::Path(paths.source_dir.clone()))
            .exclude(manifest());
        lint.enforce = Some(Enforce::Pre);
        rules.push(lint);
    }

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    /// How the bundler applies a rule, mirrored for assertions
    trait RuleMatch {
        fn matches(&self, path: &Path) -> bool;
        fn loader_names(&self) -> Vec<&str>;
    }

    fn condition_matches(condition: &Condition, path: &Path) -> bool {
        match condition {
            Condition::Path(dir) => path.starts_with(dir),
            Condition::Pattern(pattern) => Regex::new(pattern).unwrap().is_match(&to_posix(path)),
        }
    }

    impl RuleMatch for Rule {
        fn matches(&self, path: &Path) -> bool {
            Regex::new(&self.test).unwrap().is_match(&to_posix(path))
                && (self.include.is_empty() || self.include.iter().any(|c| condition_matches(c, path)))
                && !self.exclude.iter().any(|c| condition_matches(c, path))
        }

        fn loader_names(&self) -> Vec<&str> {
            self.steps.iter().map(|s| s.loader.as_str()).collect()
        }
    }

    fn setup(mode: Mode, dev_linter: bool) -> (Vec<Rule>, ResolvedPaths) {
        let mut config = Config::default();
        config.dev.linter = dev_linter;
        let paths = config.paths(Path::new("/site"));
        (rules(&config, &paths, mode), paths)
    }

    fn rule(rules: &[Rule], kind: AssetKind) -> &Rule {
        rules.iter().find(|r| r.kind == kind).unwrap()
    }

    #[test]
    fn test_asset_kind_detection() {
        assert_eq!(AssetKind::from_extension("js"), AssetKind::Script);
        assert_eq!(AssetKind::from_extension("SCSS"), AssetKind::Stylesheet);
        assert_eq!(AssetKind::from_extension("woff2"), AssetKind::Font);
        assert_eq!(AssetKind::from_path(Path::new("a/b.png")), AssetKind::Image);
        assert_eq!(AssetKind::from_path(Path::new("Makefile")), AssetKind::Other);
    }

    #[test]
    fn test_rule_order_and_patterns_compile() {
        let (rules, _) = setup(Mode::Production, false);
        let kinds: Vec<AssetKind> = rules.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AssetKind::Script,
                AssetKind::Template,
                AssetKind::Stylesheet,
                AssetKind::Manifest,
                AssetKind::Image,
                AssetKind::Media,
                AssetKind::Font,
            ]
        );
        for rule in &rules {
            assert!(Regex::new(&rule.test).is_ok(), "bad pattern {}", rule.test);
        }
    }

    #[test]
    fn test_stylesheets_inline_in_development() {
        let (rules, _) = setup(Mode::Development, false);
        let css = rule(&rules, AssetKind::Stylesheet);
        assert_eq!(
            css.loader_names(),
            vec!["style-loader", "css-loader", "postcss-loader", "sass-loader"]
        );
        assert_eq!(css.steps[1].options["sourceMap"], json!(true));
        assert_eq!(css.steps[1].options["minimize"], json!(false));
        assert_eq!(css.steps[3].options["outputStyle"], json!("expanded,sourceMap"));
    }

    #[test]
    fn test_stylesheets_extracted_in_production() {
        let (rules, _) = setup(Mode::Production, false);
        let css = rule(&rules, AssetKind::Stylesheet);
        assert_eq!(css.steps[0].loader, "extract-text-loader");
        assert_eq!(css.steps[1].options["minimize"], json!(true));
        assert_eq!(css.steps[3].options["outputStyle"], json!("compressed"));
    }

    #[test]
    fn test_manifest_files_bypass_pipeline() {
        let (rules, _) = setup(Mode::Production, false);
        let logo = Path::new("/site/app/manifest/logo.png");
        let matched: Vec<AssetKind> = rules.iter().filter(|r| r.matches(logo)).map(|r| r.kind).collect();
        assert_eq!(matched, vec![AssetKind::Manifest]);

        let photo = Path::new("/site/app/images/photo.png");
        let matched: Vec<AssetKind> = rules.iter().filter(|r| r.matches(photo)).map(|r| r.kind).collect();
        assert_eq!(matched, vec![AssetKind::Image]);
    }

    #[test]
    fn test_scripts_skip_node_modules() {
        let (rules, _) = setup(Mode::Production, false);
        let script = rule(&rules, AssetKind::Script);
        assert!(script.matches(Path::new("/site/app/assets/index.js")));
        assert!(!script.matches(Path::new("/site/node_modules/lib/index.js")));
    }

    #[test]
    fn test_url_loader_output_dirs() {
        let (rules, _) = setup(Mode::Production, false);
        assert_eq!(
            rule(&rules, AssetKind::Image).steps[0].options["name"],
            json!("assets/images/[name].[hash:7].[ext]")
        );
        assert_eq!(
            rule(&rules, AssetKind::Font).steps[0].options["limit"],
            json!(10000)
        );
        assert_eq!(
            rule(&rules, AssetKind::Manifest).steps[0].options["name"],
            json!("[name].[hash:7].[ext]")
        );
    }

    #[test]
    fn test_lint_rule_only_in_development_with_linter() {
        let (rules, _) = setup(Mode::Development, true);
        let lint = rule(&rules, AssetKind::Lint);
        assert_eq!(lint.enforce, Some(Enforce::Pre));

        let (rules, _) = setup(Mode::Production, true);
        assert!(rules.iter().all(|r| r.kind != AssetKind::Lint));

        let (rules, _) = setup(Mode::Development, false);
        assert!(rules.iter().all(|r| r.kind != AssetKind::Lint));
    }

    #[test]
    fn test_serialized_shape() {
        let (rules, _) = setup(Mode::Production, false);
        let value = serde_json::to_value(&rules[0]).unwrap();
        assert_eq!(value["test"], json!(r"\.js$"));
        assert_eq!(value["use"][0]["loader"], json!("babel-loader"));
        assert_eq!(value["exclude"][0]["pattern"], json!("node_modules"));
        assert!(value.get("kind").is_none());
        assert!(value.get("include").is_none());
    }
}
