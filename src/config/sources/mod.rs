//! Concrete [`ConfigSource`](super::ConfigSource) implementations.
//!
//! Provides file-based sources (YAML, JSON, TOML) gated by feature flags
//! and the [`parse_config_str`] helper for format-specific deserialization.

pub mod file_source;

use std::path::PathBuf;

use sha2::{Digest, Sha256};

use crate::config::model::Config;
use crate::error::WaypointError;
use file_source::FileSource;

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, WaypointError> {
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| WaypointError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| WaypointError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| WaypointError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        other => Err(WaypointError::UnsupportedFormat(other.to_string())),
    }
}

/// Pick the [`FileSource`] for `path` from its extension.
pub fn file_source_for(path: PathBuf) -> Result<FileSource, WaypointError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => Ok(FileSource::yaml(path)),

        #[cfg(feature = "json")]
        "json" => Ok(FileSource::json(path)),

        #[cfg(feature = "toml")]
        "toml" => Ok(FileSource::toml(path)),

        other => Err(WaypointError::UnsupportedFormat(other.to_string())),
    }
}

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_is_stable() {
        assert_eq!(
            sha256_hex(b"waypoint"),
            sha256_hex(b"waypoint"),
        );
        assert_ne!(sha256_hex(b"a"), sha256_hex(b"b"));
        assert_eq!(sha256_hex(b"").len(), 64);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = file_source_for(PathBuf::from("endpoints.ini")).unwrap_err();
        assert!(matches!(err, WaypointError::UnsupportedFormat(ref ext) if ext == "ini"));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn parses_yaml() {
        let config = parse_config_str("yaml", "endpoints:\n  - template: /a\n", "inline").unwrap();
        assert_eq!(config.endpoints.len(), 1);
        assert_eq!(config.endpoints[0].template, "/a");
    }
}
