//! Endpoint file loading, validation, and hot-reloading.
//!
//! Defines the [`ConfigSource`] trait for pluggable endpoint sources, the
//! [`ConfigResolver`] for primary/fallback resolution, and the
//! [`ConfigVersion`] enum for change detection. Submodules provide the data
//! model, validation logic, and the file source.

pub mod model;
pub mod sources;
pub mod validation;

use std::path::Path;

use async_trait::async_trait;

use crate::error::WaypointError;
use model::Config;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigVersion {
    Hash(String),
}

impl std::fmt::Display for ConfigVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hash(hash) => f.write_str(hash.get(..12).unwrap_or(hash)),
        }
    }
}

// Used as Box<dyn ConfigSource>, which native async fn in traits cannot express.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn load(&self) -> Result<(Config, ConfigVersion), WaypointError>;
    async fn has_changed(&self, current: &ConfigVersion) -> Result<bool, WaypointError>;
}

pub struct ConfigResolver {
    primary: Box<dyn ConfigSource>,
    fallback: Option<Box<dyn ConfigSource>>,
}

impl ConfigResolver {
    #[must_use]
    pub fn new(primary: Box<dyn ConfigSource>, fallback: Option<Box<dyn ConfigSource>>) -> Self {
        Self { primary, fallback }
    }

    pub async fn load_with_fallback(&self) -> Result<(Config, ConfigVersion), WaypointError> {
        match self.primary.load().await {
            Ok(result) => Ok(result),
            Err(primary_err) => {
                let Some(ref fallback) = self.fallback else {
                    return Err(primary_err);
                };
                tracing::warn!(
                    primary = self.primary.name(),
                    fallback = fallback.name(),
                    error = %primary_err,
                    "primary endpoint source failed, using fallback"
                );
                fallback.load().await
            }
        }
    }

    #[must_use]
    pub fn primary_name(&self) -> &str {
        self.primary.name()
    }

    #[must_use]
    pub fn primary(&self) -> &dyn ConfigSource {
        &*self.primary
    }
}

/// Read and parse an endpoint file without validating it.
pub fn read_file(path: &Path) -> Result<Config, WaypointError> {
    if !path.exists() {
        return Err(WaypointError::ConfigFileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    sources::parse_config_str(ext, &content, &path.display().to_string())
}

/// Read, parse and validate an endpoint file.
pub fn load_file(path: &Path) -> Result<Config, WaypointError> {
    let config = read_file(path)?;
    validation::validate(&config).map_err(|errors| WaypointError::ConfigValidation { errors })?;
    Ok(config)
}
