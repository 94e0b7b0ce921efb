//! Comparison configuration.

use super::error::DiffResult;
use super::snapshot::value_at_ignore_case;
use crate::fieldpath::{Path, PathMatcher, PathParseError, PatternSet};
use crate::value::{Diffable, Value};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Configuration used when a comparison is called without one.
pub(crate) static DEFAULT_CONFIG: Lazy<ComparisonConfig> = Lazy::new(ComparisonConfig::default);

/// Signature of a closure key selector.
pub type KeyFn = dyn Fn(&dyn Diffable) -> Option<Value> + Send + Sync;

/// KeySelector maps a collection element to the key used to pair it with
/// its counterpart on the other side.
#[derive(Clone)]
pub enum KeySelector {
    /// Key is the value found at this path inside the element.
    Path(Path),
    /// Key is computed by a closure.
    Func(Arc<KeyFn>),
}

impl KeySelector {
    /// Selects the value at `path` (e.g. `Id` or `Ref.Code`). Field names
    /// match exactly when possible and ignoring case otherwise.
    pub fn path(path: &str) -> Result<Self, PathParseError> {
        Ok(KeySelector::Path(Path::parse(path)?))
    }

    /// Selects keys with a closure.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&dyn Diffable) -> Option<Value> + Send + Sync + 'static,
    {
        KeySelector::Func(Arc::new(f))
    }

    /// Returns the key of `item`, or `None` if it has none. A null key
    /// counts as no key.
    pub fn select(&self, item: &dyn Diffable) -> DiffResult<Option<Value>> {
        let key = match self {
            KeySelector::Path(path) => value_at_ignore_case(item, path)?,
            KeySelector::Func(f) => f(item),
        };
        Ok(key.filter(|k| !k.is_null()))
    }
}

impl fmt::Debug for KeySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySelector::Path(path) => f.debug_tuple("Path").field(&path.to_string()).finish(),
            KeySelector::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// ComparisonConfig holds the rules of one or more comparisons.
///
/// It is immutable once built and can be shared between threads.
#[derive(Debug, Clone)]
pub struct ComparisonConfig {
    matcher: PathMatcher,
    include_unchanged_always_included: bool,
    strict_shapes: bool,
    key_selector: Option<KeySelector>,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        ComparisonConfig {
            matcher: PathMatcher::default(),
            include_unchanged_always_included: true,
            strict_shapes: true,
            key_selector: None,
        }
    }
}

impl ComparisonConfig {
    /// Creates a new ComparisonConfigBuilder.
    pub fn builder() -> ComparisonConfigBuilder {
        ComparisonConfigBuilder::new()
    }

    /// Returns the ignore / always-include matcher.
    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    /// Whether always-included fields surface when nothing else changed.
    pub fn include_unchanged_always_included(&self) -> bool {
        self.include_unchanged_always_included
    }

    /// Whether a shape mismatch fails the comparison.
    pub fn strict_shapes(&self) -> bool {
        self.strict_shapes
    }

    /// Returns the key selector for keyed collection comparison.
    pub fn key_selector(&self) -> Option<&KeySelector> {
        self.key_selector.as_ref()
    }

    /// Parses a YAML (or JSON) configuration document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_yaml::from_str(yaml)?;
        Ok(file.into_builder().build()?)
    }

    /// Parses a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(json)?;
        Ok(file.into_builder().build()?)
    }

    /// Loads a configuration file; `.json` files are read as JSON, anything
    /// else as YAML.
    pub fn load(path: &FsPath) -> Result<Self, ConfigError> {
        Ok(ConfigFile::load(path)?.into_builder().build()?)
    }
}

/// ComparisonConfigBuilder is a builder for creating a ComparisonConfig.
#[derive(Debug, Clone)]
pub struct ComparisonConfigBuilder {
    ignore: Vec<String>,
    always_include: Vec<String>,
    include_unchanged_always_included: bool,
    strict_shapes: bool,
    key_selector: Option<KeySelector>,
    key_path: Option<String>,
}

impl Default for ComparisonConfigBuilder {
    fn default() -> Self {
        ComparisonConfigBuilder {
            ignore: Vec::new(),
            always_include: Vec::new(),
            include_unchanged_always_included: true,
            strict_shapes: true,
            key_selector: None,
            key_path: None,
        }
    }
}

impl ComparisonConfigBuilder {
    /// Creates a new ComparisonConfigBuilder.
    pub fn new() -> Self {
        ComparisonConfigBuilder::default()
    }

    /// Adds an ignore pattern.
    pub fn ignore(mut self, pattern: impl Into<String>) -> Self {
        self.ignore.push(pattern.into());
        self
    }

    /// Adds several ignore patterns.
    pub fn ignore_all<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Adds an always-include pattern.
    pub fn always_include(mut self, pattern: impl Into<String>) -> Self {
        self.always_include.push(pattern.into());
        self
    }

    /// Adds several always-include patterns.
    pub fn always_include_all<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.always_include
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Sets whether always-included fields surface without a real change.
    pub fn include_unchanged_always_included(mut self, value: bool) -> Self {
        self.include_unchanged_always_included = value;
        self
    }

    /// Sets whether shape mismatches fail the comparison.
    pub fn strict_shapes(mut self, value: bool) -> Self {
        self.strict_shapes = value;
        self
    }

    /// Sets the key selector.
    pub fn key_selector(mut self, selector: KeySelector) -> Self {
        self.key_selector = Some(selector);
        self.key_path = None;
        self
    }

    /// Sets a path key selector, parsed on build.
    pub fn key_path(mut self, path: impl Into<String>) -> Self {
        self.key_path = Some(path.into());
        self.key_selector = None;
        self
    }

    /// Builds the ComparisonConfig.
    pub fn build(self) -> Result<ComparisonConfig, PathParseError> {
        let key_selector = match self.key_path {
            Some(path) => Some(KeySelector::path(&path)?),
            None => self.key_selector,
        };
        Ok(ComparisonConfig {
            matcher: PathMatcher::new(
                PatternSet::parse(&self.ignore)?,
                PatternSet::parse(&self.always_include)?,
            ),
            include_unchanged_always_included: self.include_unchanged_always_included,
            strict_shapes: self.strict_shapes,
            key_selector,
        })
    }
}

/// ConfigFile is the on-disk form of a ComparisonConfig.
///
/// ```yaml
/// ignore: [UpdatedAt, "Items[].Etag"]
/// alwaysInclude: [Id]
/// includeUnchangedAlwaysIncluded: false
/// strictShapes: true
/// key: Id
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ConfigFile {
    pub ignore: Vec<String>,
    pub always_include: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_unchanged_always_included: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_shapes: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl ConfigFile {
    /// Reads a configuration file from disk.
    pub fn load(path: &FsPath) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let file = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        tracing::debug!("loaded comparison config from {}", path.display());
        Ok(file)
    }

    /// Converts the file into a builder so callers can layer more rules on top.
    pub fn into_builder(self) -> ComparisonConfigBuilder {
        let mut builder = ComparisonConfig::builder()
            .ignore_all(self.ignore)
            .always_include_all(self.always_include);
        if let Some(value) = self.include_unchanged_always_included {
            builder = builder.include_unchanged_always_included(value);
        }
        if let Some(value) = self.strict_shapes {
            builder = builder.strict_shapes(value);
        }
        if let Some(key) = self.key {
            builder = builder.key_path(key);
        }
        builder
    }
}

/// ConfigError represents a failure to load a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] PathParseError),
}
