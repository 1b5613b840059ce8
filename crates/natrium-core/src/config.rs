//! Loader configuration.
//!
//! Selects which variant the process-wide loader resolves and where its
//! bytes come from and go to. Read from TOML or from `NATRIUM_*` environment
//! variables:
//!
//! | Variable | Field | Format |
//! |----------|-------|--------|
//! | `NATRIUM_VERSION` | `version` | `1.0.18` |
//! | `NATRIUM_TAGS` | `tags` | `runtime=msvc,runtime-version=142` |
//! | `NATRIUM_STRICT` | `strict` | `true` / `false` / `1` / `0` |
//! | `NATRIUM_NATIVE_DIR` | `native_dir` | path |
//! | `NATRIUM_EXTRACT_DIR` | `extract_dir` | path |

use crate::catalog::{DEFAULT_VERSION, Tags};
use crate::error::{NatriumError, Result};
use crate::resolver::ResolvePolicy;
use crate::resources::{DirectoryResources, EmbeddedResources, ResourceSource};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

/// Variant selection and extraction settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Library version to resolve
    #[serde(default = "default_version")]
    pub version: String,
    /// Reject requests matched by more than one variant
    #[serde(default)]
    pub strict: bool,
    /// Read variant bytes from this directory instead of the embedded set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_dir: Option<PathBuf>,
    /// Extract into this directory instead of the OS temp directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_dir: Option<PathBuf>,
    /// Runtime tags every selected variant must carry
    #[serde(default)]
    pub tags: Tags,
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            strict: false,
            native_dir: None,
            extract_dir: None,
            tags: Tags::new(),
        }
    }
}

impl LoaderConfig {
    /// Parse a TOML document
    ///
    /// # Errors
    ///
    /// Returns `NatriumError::InvalidConfig` if the document is malformed.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| NatriumError::InvalidConfig(Cow::Owned(e.to_string())))
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Defaults overlaid with `NATRIUM_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns `NatriumError::InvalidConfig` if a variable is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`
    ///
    /// # Errors
    ///
    /// Returns `NatriumError::InvalidConfig` if a value is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(version) = lookup("NATRIUM_VERSION") {
            config.version = version.trim().to_string();
        }
        if let Some(tags) = lookup("NATRIUM_TAGS") {
            config.tags = parse_tags(&tags)?;
        }
        if let Some(strict) = lookup("NATRIUM_STRICT") {
            config.strict = parse_bool(&strict)?;
        }
        if let Some(dir) = lookup("NATRIUM_NATIVE_DIR") {
            config.native_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup("NATRIUM_EXTRACT_DIR") {
            config.extract_dir = Some(PathBuf::from(dir));
        }

        config.validate()?;
        Ok(config)
    }

    /// Resolver policy implied by `strict`
    #[must_use]
    pub fn policy(&self) -> ResolvePolicy {
        if self.strict {
            ResolvePolicy::RejectAmbiguous
        } else {
            ResolvePolicy::FirstMatch
        }
    }

    /// Where variant bytes are read from
    #[must_use]
    pub fn resource_source(&self) -> Box<dyn ResourceSource> {
        match &self.native_dir {
            Some(dir) => Box::new(DirectoryResources::new(dir)),
            None => Box::new(EmbeddedResources),
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `NatriumError::InvalidConfig` for an empty version or an
    /// empty tag key.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(NatriumError::invalid_config("version must not be empty"));
        }
        if self.tags.keys().any(|k| k.trim().is_empty()) {
            return Err(NatriumError::invalid_config("tag keys must not be empty"));
        }
        Ok(())
    }
}

/// Parse `k=v,k=v` into a tag map
///
/// # Errors
///
/// Returns `NatriumError::InvalidConfig` if an entry has no `=` or an empty key.
pub fn parse_tags(input: &str) -> Result<Tags> {
    let mut tags = Tags::new();
    for entry in input.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (key, value) = parse_tag(entry)?;
        tags.insert(key, value);
    }
    Ok(tags)
}

/// Parse a single `k=v` tag
///
/// # Errors
///
/// Returns `NatriumError::InvalidConfig` if there is no `=` or the key is empty.
pub fn parse_tag(entry: &str) -> Result<(String, String)> {
    let (key, value) = entry
        .split_once('=')
        .ok_or_else(|| NatriumError::InvalidConfig(Cow::Owned(format!("tag '{entry}' is not key=value"))))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(NatriumError::InvalidConfig(Cow::Owned(format!(
            "tag '{entry}' has an empty key"
        ))));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(NatriumError::InvalidConfig(Cow::Owned(format!(
            "NATRIUM_STRICT: expected a boolean, got '{other}'"
        )))),
    }
}
