//! Configuration for LineKV
//!
//! Centralized configuration with sensible defaults, plus the partial
//! `Options` type that `Engine::configure` merges into the live config.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::{LineKvError, Result};

/// Main configuration for a LineKV engine
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all database files
    /// Internal structure:
    ///   {path}/
    ///     ├── {database}{ext}[.gz]                (records, one per line)
    ///     └── {database}{ext}[.gz].tmp{ext}[.gz]  (only while a replace runs)
    pub path: Option<PathBuf>,

    /// Database file extension (including the leading dot)
    pub ext: String,

    /// Wrap every database file in gzip
    pub gzip: bool,

    // -------------------------------------------------------------------------
    // Access Configuration
    // -------------------------------------------------------------------------
    /// Databases allowed to exist (and be created on first access)
    pub databases: BTreeSet<String>,

    /// Surface failures from `Engine::call` as `Err` instead of `Reply::Failed`
    pub raise_errors: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            ext: ".dat".to_string(),
            gzip: false,
            databases: BTreeSet::new(),
            raise_errors: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Whether `name` is in the create set
    pub fn is_registered(&self, name: &str) -> bool {
        self.databases.contains(name)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the storage root directory
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = Some(path.into());
        self
    }

    /// Set the database file extension
    pub fn ext(mut self, ext: impl Into<String>) -> Self {
        self.config.ext = ext.into();
        self
    }

    /// Enable or disable gzip compression
    pub fn gzip(mut self, enabled: bool) -> Self {
        self.config.gzip = enabled;
        self
    }

    /// Register a database name
    pub fn database(mut self, name: impl Into<String>) -> Self {
        self.config.databases.insert(name.into());
        self
    }

    /// Raise errors from `Engine::call` instead of returning `Reply::Failed`
    pub fn raise_errors(mut self, raise: bool) -> Self {
        self.config.raise_errors = raise;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// =============================================================================
// Merge-style Options
// =============================================================================

/// A partial configuration; only the fields that are set get merged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub create: Option<BTreeSet<String>>,
    pub create_also: BTreeSet<String>,
    pub errors: Option<bool>,
    pub ext: Option<String>,
    pub gzip: Option<bool>,
    pub path: Option<PathBuf>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the create set
    pub fn create<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.create = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Add names to the create set, keeping the ones already registered
    pub fn create_also<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.create_also.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn errors(mut self, raise: bool) -> Self {
        self.errors = Some(raise);
        self
    }

    pub fn ext(mut self, ext: impl Into<String>) -> Self {
        self.ext = Some(ext.into());
        self
    }

    pub fn gzip(mut self, enabled: bool) -> Self {
        self.gzip = Some(enabled);
        self
    }

    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Parse `(name, value)` string pairs
    ///
    /// Recognized names: `create` (comma separated), `errors`, `ext`, `gzip`,
    /// `path`. Anything else is skipped without complaint.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Options::new();

        for (name, value) in pairs {
            let value = value.as_ref();
            match name.as_ref() {
                "create" => {
                    options.create = Some(
                        value
                            .split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from)
                            .collect(),
                    );
                }
                "errors" => options.errors = Some(parse_bool("errors", value)?),
                "ext" => options.ext = Some(value.to_string()),
                "gzip" => options.gzip = Some(parse_bool("gzip", value)?),
                "path" => options.path = Some(PathBuf::from(value)),
                other => tracing::debug!("Ignoring unrecognized option \"{}\"", other),
            }
        }

        Ok(options)
    }

    /// Merge into `config`; `path` is only applied when `allow_path` is set
    ///
    /// Returns false if a `path` change was refused.
    pub(crate) fn apply(self, config: &mut Config, allow_path: bool) -> bool {
        if let Some(create) = self.create {
            config.databases = create;
        }
        config.databases.extend(self.create_also);

        if let Some(raise) = self.errors {
            config.raise_errors = raise;
        }
        if let Some(ext) = self.ext {
            config.ext = ext;
        }
        if let Some(gzip) = self.gzip {
            config.gzip = gzip;
        }

        match self.path {
            Some(path) if allow_path => {
                config.path = Some(path);
                true
            }
            Some(path) => config.path.as_deref() == Some(path.as_path()),
            None => true,
        }
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(LineKvError::Config(format!(
            "option \"{}\" expects a boolean, got \"{}\"",
            name, value
        ))),
    }
}
