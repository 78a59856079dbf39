//! Source discovery
//!
//! Derives the entry, page and locale sets by scanning the configured
//! directories. Nothing is cached: every invocation rescans.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::config::ResolvedPaths;

/// A discovered source file and its logical name (the file stem)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NamedFile {
    pub name: String,
    pub path: PathBuf,
}

/// Everything the generator derives from the filesystem
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSets {
    pub entries: Vec<NamedFile>,
    pub pages: Vec<NamedFile>,
    pub locales: Vec<NamedFile>,
}

impl SourceSets {
    pub fn scan(paths: &ResolvedPaths) -> Self {
        let sets = Self {
            entries: scan_dir(&paths.entries_dir),
            pages: scan_dir(&paths.views_dir),
            locales: scan_dir_with_extension(&paths.locales_dir, "json"),
        };

        debug!(
            "Found {} entries, {} pages, {} locales",
            sets.entries.len(),
            sets.pages.len(),
            sets.locales.len()
        );

        sets
    }

    /// Whether an entry bundle shares its name with `page`
    pub fn has_entry(&self, page: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == page)
    }

    pub fn locale_codes(&self) -> Vec<String> {
        self.locales.iter().map(|l| l.name.clone()).collect()
    }
}

/// List `name.ext` files directly inside `dir`, sorted by file name.
///
/// Hidden files and extensionless files are skipped; a missing directory
/// is an empty set.
pub fn scan_dir(dir: &Path) -> Vec<NamedFile> {
    if !dir.is_dir() {
        debug!("Skipping missing directory {}", dir.display());
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let file_name = entry.file_name().to_str()?;
            if file_name.starts_with('.') || !file_name.contains('.') {
                return None;
            }
            let name = entry.path().file_stem()?.to_str()?.to_string();
            Some(NamedFile {
                name,
                path: entry.into_path(),
            })
        })
        .collect()
}

/// `scan_dir` restricted to files ending in `.<extension>`
pub fn scan_dir_with_extension(dir: &Path, extension: &str) -> Vec<NamedFile> {
    scan_dir(dir)
        .into_iter()
        .filter(|file| {
            let matches = file.path.extension().and_then(|e| e.to_str()) == Some(extension);
            if !matches {
                debug!("Skipping {}: not a .{} file", file.path.display(), extension);
            }
            matches
        })
        .collect()
}
