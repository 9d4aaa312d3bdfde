//! Persisted configuration access.
//!
//! # Design
//! - Loading reads the file once and migrates it in memory; it never writes.
//! - `save` is the only write path and always emits the current, versioned shape.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::migrate::ConfigDocument;
use crate::model::Config;

/// Environment variable overriding the configuration location.
pub const CONFIG_PATH_ENV: &str = "ESCLI_CONFIG";

const CONFIG_DIR: &str = ".escli";
const CONFIG_FILE: &str = "config.yaml";

/// Source of the resolved configuration for one command invocation.
pub trait ConfigLoader: Send + Sync {
    /// Produce the configuration in its current shape.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when no usable configuration can be produced.
    fn load(&self) -> ConfigResult<Config>;
}

/// Configuration stored as a YAML file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store backed by an explicit file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `$ESCLI_CONFIG`, falling back to `~/.escli/config.yaml`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(Self::default_path())
    }

    /// Resolve the default configuration location.
    #[must_use]
    pub fn default_path() -> PathBuf {
        resolve_path(env::var_os(CONFIG_PATH_ENV), dirs::home_dir())
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and classify the persisted document without migrating it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when the file does not exist,
    /// [`ConfigError::Io`] when it cannot be read, and the errors of
    /// [`ConfigDocument::parse`] otherwise.
    pub fn load_document(&self) -> ConfigResult<ConfigDocument> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ConfigError::Missing {
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    operation: "read",
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let document = ConfigDocument::parse(&text)?;
        debug!(
            path = %self.path.display(),
            version = document.version().as_u64(),
            "configuration document detected"
        );
        Ok(document)
    }

    /// Write `config` back in the current shape, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] or [`ConfigError::Io`] on failure.
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        let text = ConfigDocument::render_current(config)?;
        if let Some(parent) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                operation: "create directory for",
                path: self.path.clone(),
                source,
            })?;
        }
        fs::write(&self.path, text).map_err(|source| ConfigError::Io {
            operation: "write",
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "configuration saved");
        Ok(())
    }
}

/// An empty override counts as unset; without a home directory the
/// relative `.escli/config.yaml` is used.
fn resolve_path(override_path: Option<OsString>, home: Option<PathBuf>) -> PathBuf {
    if let Some(path) = override_path.filter(|value| !value.is_empty()) {
        return PathBuf::from(path);
    }
    home.unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

impl ConfigLoader for ConfigStore {
    fn load(&self) -> ConfigResult<Config> {
        let document = self.load_document()?;
        if !document.is_current() {
            info!(
                path = %self.path.display(),
                from = document.version().as_u64(),
                "migrating legacy configuration in memory"
            );
        }
        Ok(document.into_current())
    }
}
