//! Output mapping: one HTML emission per locale × page

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::chunk::page_chunks;
use crate::i18n::{Catalog, Messages};
use crate::resolver::SourceSets;

/// Page name that always maps to `404.html`
pub const NOT_FOUND_PAGE: &str = "404";

/// HTML minifier switches applied to every emitted page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HtmlMinify {
    pub remove_comments: bool,
    pub collapse_whitespace: bool,
    pub remove_attribute_quotes: bool,
}

impl Default for HtmlMinify {
    fn default() -> Self {
        Self {
            remove_comments: true,
            collapse_whitespace: true,
            remove_attribute_quotes: true,
        }
    }
}

/// A single page emission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HtmlTarget {
    /// Absolute output file
    pub filename: PathBuf,
    pub template: PathBuf,
    pub chunks: Vec<String>,
    pub inject: bool,
    pub minify: HtmlMinify,

    /// Locale the template is rendered in
    pub locale: String,

    /// Catalog backing `__`/`__n` for this page
    pub messages: Messages,
}

/// Output path of `page` in `locale`, relative to the output root.
///
/// The default locale writes at the root, every other locale under a
/// directory named after its code. The index page and `404` map to fixed
/// files; anything else gets a directory of its own.
pub fn output_file(page: &str, locale: &str, default_locale: &str, index_page: &str) -> PathBuf {
    let subdir = if locale == default_locale {
        PathBuf::new()
    } else {
        PathBuf::from(locale)
    };

    if page == index_page {
        subdir.join("index.html")
    } else if page == NOT_FOUND_PAGE {
        subdir.join("404.html")
    } else {
        subdir.join(page).join("index.html")
    }
}

/// Every locale × page target, locales outermost
pub fn html_targets(
    sets: &SourceSets,
    catalog: &Catalog,
    build_dir: &Path,
    index_page: &str,
) -> Vec<HtmlTarget> {
    let default_locale = catalog.default_locale();

    sets.locales
        .iter()
        .flat_map(|locale| {
            sets.pages.iter().map(move |page| HtmlTarget {
                filename: build_dir.join(output_file(
                    &page.name,
                    &locale.name,
                    default_locale,
                    index_page,
                )),
                template: page.path.clone(),
                chunks: page_chunks(&page.name, sets.has_entry(&page.name)),
                inject: true,
                minify: HtmlMinify::default(),
                locale: locale.name.clone(),
                messages: catalog.resolved(&locale.name),
            })
        })
        .collect()
}
