//! Schema detection and the migration chain between configuration versions.
//!
//! Documents written by this build carry an explicit `version` key. Files
//! written before the key existed are classified by which field names they
//! use; a file mixing both vocabularies, or using neither, is rejected.

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{Config, ConfigV1, ConfigV2, ConfigVersion};

/// Key holding the schema discriminator.
pub const VERSION_KEY: &str = "version";

/// A parsed configuration document in whatever shape it was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigDocument {
    /// Legacy escli 0.0.3 layout.
    V1(ConfigV1),
    /// Current layout.
    V2(ConfigV2),
}

impl ConfigDocument {
    /// Parse a YAML document and classify its schema.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid YAML or keys the selected
    /// schema does not know, [`ConfigError::NotAMapping`] for scalar or list
    /// documents, [`ConfigError::UnsupportedVersion`] for unknown version
    /// numbers and [`ConfigError::UnrecognizedShape`] when the version cannot
    /// be determined.
    pub fn parse(text: &str) -> ConfigResult<Self> {
        let value: Value =
            serde_yaml::from_str(text).map_err(|source| ConfigError::Parse { source })?;
        let mut mapping = match value {
            Value::Mapping(mapping) => mapping,
            Value::Null => {
                return Err(ConfigError::UnrecognizedShape {
                    reason: "document is empty".to_string(),
                });
            }
            _ => return Err(ConfigError::NotAMapping),
        };

        let version = match mapping.remove(VERSION_KEY) {
            Some(tag) => parse_version_tag(&tag)?,
            None => detect_shape(&mapping)?,
        };
        Self::from_mapping(version, mapping)
    }

    fn from_mapping(version: ConfigVersion, mapping: Mapping) -> ConfigResult<Self> {
        let value = Value::Mapping(mapping);
        let document = match version {
            ConfigVersion::V1 => Self::V1(
                serde_yaml::from_value(value).map_err(|source| ConfigError::Parse { source })?,
            ),
            ConfigVersion::V2 => Self::V2(
                serde_yaml::from_value(value).map_err(|source| ConfigError::Parse { source })?,
            ),
        };
        Ok(document)
    }

    /// Schema version of this document.
    #[must_use]
    pub const fn version(&self) -> ConfigVersion {
        match self {
            Self::V1(_) => ConfigVersion::V1,
            Self::V2(_) => ConfigVersion::V2,
        }
    }

    /// Whether the document already has the current shape.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.version() == ConfigVersion::CURRENT
    }

    /// Walk the migration chain until the document reaches the current shape.
    #[must_use]
    pub fn into_current(self) -> Config {
        let mut document = self;
        loop {
            document = match document {
                Self::V1(legacy) => Self::V2(migrate_v1(legacy)),
                Self::V2(current) => return current,
            };
        }
    }

    /// Render `config` as a current-shape document including the version key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if YAML encoding fails.
    pub fn render_current(config: &Config) -> ConfigResult<String> {
        let persisted = Persisted {
            version: ConfigVersion::CURRENT.as_u64(),
            config,
        };
        serde_yaml::to_string(&persisted).map_err(|source| ConfigError::Serialize { source })
    }
}

#[derive(Serialize)]
struct Persisted<'a> {
    version: u64,
    #[serde(flatten)]
    config: &'a Config,
}

/// Upgrade the legacy layout. Shared fields carry over verbatim and the
/// profile, which did not exist yet, is left empty.
#[must_use]
pub fn migrate_v1(legacy: ConfigV1) -> ConfigV2 {
    ConfigV2 {
        profile: String::new(),
        elasticsearch_url: legacy.elasticsearchurl,
        aws_region: legacy.awsregion,
    }
}

fn parse_version_tag(tag: &Value) -> ConfigResult<ConfigVersion> {
    let number = tag.as_u64().ok_or_else(|| ConfigError::UnrecognizedShape {
        reason: format!("'{VERSION_KEY}' must be a positive integer"),
    })?;
    ConfigVersion::from_u64(number)
}

fn detect_shape(mapping: &Mapping) -> ConfigResult<ConfigVersion> {
    let has_legacy = ConfigV1::KEYS.iter().any(|key| mapping.contains_key(*key));
    let has_current = ConfigV2::KEYS.iter().any(|key| mapping.contains_key(*key));

    match (has_legacy, has_current) {
        (true, false) => Ok(ConfigVersion::V1),
        (false, true) => Ok(ConfigVersion::V2),
        (true, true) => Err(ConfigError::UnrecognizedShape {
            reason: "document mixes legacy and current keys".to_string(),
        }),
        (false, false) => Err(ConfigError::UnrecognizedShape {
            reason: "document contains no known configuration keys".to_string(),
        }),
    }
}
