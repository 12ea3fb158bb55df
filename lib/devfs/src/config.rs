//! Driver declaration documents.
//!
//! A declaration is a small sectioned key/value document. The `main`
//! section may name the driver through `driver_name`; every key is handed
//! to the driver's `create` untouched.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::{ConfigError, DriverError};

/// Section holding the keys the filesystem itself looks at.
pub const MAIN_SECTION: &str = "main";

/// Key of [`MAIN_SECTION`] that overrides driver name resolution.
pub const DRIVER_NAME_KEY: &str = "driver_name";

/// Extensions recognized as declaration documents. They are stripped from
/// file names when a driver name is derived from one.
pub const CONFIG_EXTENSIONS: &[&str] = &["ini", "toml"];

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    sections: IndexMap<String, IndexMap<String, String>>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads and parses a declaration file. `.toml` files are parsed as
    /// TOML, everything else as INI.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&source),
            _ => Self::from_ini_str(&source),
        }
    }

    /// Parses an INI document.
    ///
    /// Keys that appear before the first section header belong to
    /// [`MAIN_SECTION`]. Lines starting with `;` or `#` are comments, and a
    /// value wrapped in double quotes is unwrapped.
    pub fn from_ini_str(source: &str) -> Result<Self, ConfigError> {
        let mut doc = Self::new();
        let mut section = MAIN_SECTION.to_string();

        for (idx, raw) in source.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .ok_or_else(|| ConfigError::Syntax {
                        line: idx + 1,
                        message: format!("malformed section header `{line}`"),
                    })?;
                section = name.to_string();
                doc.sections.entry(section.clone()).or_default();
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| ConfigError::Syntax {
                line: idx + 1,
                message: format!("expected `key = value`, found `{line}`"),
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(ConfigError::Syntax {
                    line: idx + 1,
                    message: "empty key".to_string(),
                });
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            doc.insert(&section, key, value);
        }

        Ok(doc)
    }

    /// Parses a TOML document. Top-level tables become sections, top-level
    /// scalars belong to [`MAIN_SECTION`].
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(source)?;
        let mut doc = Self::new();

        for (key, value) in table {
            match value {
                toml::Value::Table(entries) => {
                    doc.sections.entry(key.clone()).or_default();
                    for (inner, value) in entries {
                        doc.insert(&key, &inner, &toml_scalar(value));
                    }
                }
                other => doc.insert(MAIN_SECTION, &key, &toml_scalar(other)),
            }
        }

        Ok(doc)
    }

    pub fn insert(&mut self, section: &str, key: &str, value: &str) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Builder flavour of [`ConfigDocument::insert`].
    pub fn with(mut self, section: &str, key: &str, value: &str) -> Self {
        self.insert(section, key, value);
        self
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    /// Parses a value, reporting unparsable values as an invalid
    /// configuration.
    pub fn get_parsed<T: FromStr>(&self, section: &str, key: &str) -> Result<Option<T>, DriverError> {
        self.get(section, key)
            .map(|raw| {
                raw.parse().map_err(|_| {
                    DriverError::InvalidConfig(format!("`{section}.{key}` has invalid value `{raw}`"))
                })
            })
            .transpose()
    }

    /// The explicit driver name, if the document declares one.
    pub fn driver_name(&self) -> Option<&str> {
        self.get(MAIN_SECTION, DRIVER_NAME_KEY)
            .filter(|name| !name.is_empty())
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn entries(&self, section: &str) -> impl Iterator<Item = (&str, &str)> {
        self.sections
            .get(section)
            .into_iter()
            .flat_map(|entries| entries.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

fn toml_scalar(value: toml::Value) -> String {
    match value {
        toml::Value::String(s) => s,
        other => other.to_string(),
    }
}

/// File name with a recognized declaration extension removed.
pub fn strip_config_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && CONFIG_EXTENSIONS.contains(&ext) => stem,
        _ => file_name,
    }
}
