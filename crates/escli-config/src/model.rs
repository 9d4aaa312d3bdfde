//! Versioned configuration shapes.
//!
//! Every schema that has ever shipped keeps its own struct so older files can
//! still be read. `Config` always aliases the newest one.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ConfigError, ConfigResult};

/// The configuration shape the rest of the tool works with.
pub type Config = ConfigV2;

/// Explicit schema discriminator persisted under the `version` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigVersion {
    /// Unversioned layout written by escli 0.0.3 and earlier.
    V1,
    /// Current layout with a profile and snake-case keys.
    V2,
}

impl ConfigVersion {
    /// Version written by [`crate::ConfigStore::save`].
    pub const CURRENT: Self = Self::V2;

    /// Integer form stored in the document.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }

    /// Parse the integer form stored in the document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedVersion`] for numbers this build does not know.
    pub const fn from_u64(version: u64) -> ConfigResult<Self> {
        match version {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(ConfigError::UnsupportedVersion { version: other }),
        }
    }
}

/// Legacy configuration shape (escli 0.0.3).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigV1 {
    /// Cluster endpoint.
    pub elasticsearchurl: String,
    /// AWS region hosting the cluster.
    pub awsregion: String,
}

impl ConfigV1 {
    /// Keys that only ever appeared in this shape.
    pub const KEYS: [&'static str; 2] = ["elasticsearchurl", "awsregion"];
}

/// Current configuration shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigV2 {
    /// Named credentials profile used when talking to the cluster.
    pub profile: String,
    /// Cluster endpoint.
    pub elasticsearch_url: String,
    /// AWS region hosting the cluster.
    pub aws_region: String,
}

impl ConfigV2 {
    /// Keys that only appear in this shape.
    pub const KEYS: [&'static str; 3] = ["profile", "elasticsearch_url", "aws_region"];

    /// Check that the configuration can be used to reach a cluster.
    ///
    /// The profile and region may be empty; the endpoint must be an absolute
    /// `http` or `https` URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when the endpoint is unusable.
    pub fn validate(&self) -> ConfigResult<()> {
        self.endpoint().map(|_| ())
    }

    /// Parse the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when the endpoint is empty, not a
    /// URL, or not served over HTTP(S).
    pub fn endpoint(&self) -> ConfigResult<Url> {
        let raw = self.elasticsearch_url.trim();
        let invalid = |reason| ConfigError::InvalidField {
            field: "elasticsearch_url",
            value: raw.to_string(),
            reason,
        };

        if raw.is_empty() {
            return Err(invalid("must not be empty"));
        }
        let url = Url::parse(raw).map_err(|_| invalid("must be an absolute URL"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid("scheme must be http or https"));
        }
        if url.host_str().is_none() {
            return Err(invalid("must include a host"));
        }
        Ok(url)
    }

    /// Render the configuration the way it would be persisted.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if YAML encoding fails.
    pub fn render_yaml(&self) -> ConfigResult<String> {
        serde_yaml::to_string(self).map_err(|source| ConfigError::Serialize { source })
    }
}
