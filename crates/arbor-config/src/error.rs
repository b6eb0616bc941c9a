use std::path::PathBuf;

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  /// The config file could not be read.
  #[error("failed to read config file '{}'", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The config contents are not valid JSON for [`RuntimeConfig`](crate::RuntimeConfig).
  #[error("failed to parse config: {message}")]
  Parse {
    message: String,
    #[source]
    source: serde_json::Error,
  },
}
