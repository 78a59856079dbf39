//! Locale message catalogs
//!
//! Each locale file is a JSON object mapping message keys to strings or to
//! plural forms (`{"one": "...", "other": "..."}`). Catalogs are plain
//! values handed to each page target, already layered over the default
//! locale; there is no process-wide active locale.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::resolver::NamedFile;

/// Messages of a single locale
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Messages(BTreeMap<String, Value>);

impl Messages {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let map: BTreeMap<String, Value> =
            serde_json::from_str(&content).map_err(|e| Error::Locale {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        Ok(Self(map))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, Value>> for Messages {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

/// All locale catalogs of a project plus the designated default
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    default_locale: String,
    locales: BTreeMap<String, Messages>,
}

impl Catalog {
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            locales: BTreeMap::new(),
        }
    }

    /// Load one catalog per locale file
    pub fn load(default_locale: &str, files: &[NamedFile]) -> Result<Self> {
        let mut catalog = Self::new(default_locale);
        for file in files {
            catalog.insert(&file.name, Messages::load(&file.path)?);
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, locale: &str, messages: Messages) {
        self.locales.insert(locale.to_string(), messages);
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn messages(&self, locale: &str) -> Option<&Messages> {
        self.locales.get(locale)
    }

    /// Messages for `locale` with the default locale's layered underneath.
    ///
    /// Keys the locale lacks resolve to the default locale's text; keys
    /// neither defines stay absent and render as the key itself.
    pub fn resolved(&self, locale: &str) -> Messages {
        let mut merged = self
            .messages(&self.default_locale)
            .map(|m| m.0.clone())
            .unwrap_or_default();

        if locale != self.default_locale {
            if let Some(own) = self.messages(locale) {
                merged.extend(own.0.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }

        Messages(merged)
    }
}
