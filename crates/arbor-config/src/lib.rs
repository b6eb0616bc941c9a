//! Arbor Config
//!
//! This crate contains the serializable runtime configuration for arbor.
//! Configuration can be loaded from:
//! - JSON files (via CLI with `--config=config.json`, or `<data dir>/config.json`)
//! - JSON strings embedded by a host
//!
//! Every field has a default, so an empty object (or no file at all) yields
//! [`RuntimeConfig::default`].

mod error;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::ConfigError;

/// Settings consumed by the arbor runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
  /// Re-encode and publish the persistence snapshot after every update.
  pub publish_snapshots: bool,
  /// Rebuild and publish the debug snapshot after every update.
  pub publish_debug_snapshots: bool,
  /// Default `tracing` filter directive, used when `RUST_LOG` is unset.
  pub log_filter: String,
  /// Capacity of the renderings channel. `None` means unbounded.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub output_buffer: Option<usize>,
}

impl Default for RuntimeConfig {
  fn default() -> Self {
    Self {
      publish_snapshots: true,
      publish_debug_snapshots: true,
      log_filter: "info".to_string(),
      output_buffer: None,
    }
  }
}

impl RuntimeConfig {
  /// Parse a config from a JSON string.
  pub fn from_json(json: &str) -> Result<Self, ConfigError> {
    serde_json::from_str(json).map_err(|source| ConfigError::Parse {
      message: source.to_string(),
      source,
    })
  }

  /// Read and parse a JSON config file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_json(&contents)
  }

  /// Like [`load`](Self::load), but a missing file yields the defaults.
  pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
      return Ok(Self::default());
    }
    Self::load(path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = RuntimeConfig::default();
    assert!(config.publish_snapshots);
    assert!(config.publish_debug_snapshots);
    assert_eq!(config.log_filter, "info");
    assert_eq!(config.output_buffer, None);
  }

  #[test]
  fn test_empty_object_uses_defaults() {
    let config = RuntimeConfig::from_json("{}").unwrap();
    assert_eq!(config, RuntimeConfig::default());
  }

  #[test]
  fn test_partial_override() {
    let config =
      RuntimeConfig::from_json(r#"{"log_filter": "arbor=debug", "output_buffer": 16}"#).unwrap();

    assert_eq!(config.log_filter, "arbor=debug");
    assert_eq!(config.output_buffer, Some(16));
    assert!(config.publish_snapshots);
  }

  #[test]
  fn test_invalid_json() {
    let result = RuntimeConfig::from_json("{ not json");
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
  }

  #[test]
  fn test_serialization_skips_unset_buffer() {
    let json = serde_json::to_value(RuntimeConfig::default()).unwrap();
    assert!(json.get("output_buffer").is_none());
    assert_eq!(json["publish_snapshots"], true);
  }
}
