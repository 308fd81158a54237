//! Server configuration: an optional TOML file layered under `DRAMATURGY_*`
//! environment variables.

use std::path::{Path, PathBuf};

use dramaturgy_core::params::NotificationConfig;
use serde::Deserialize;

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  /// Lifetime of sessions issued with `--issue-session`.
  pub session_ttl_hours: u32,
  #[serde(default)]
  pub notifications:     NotificationConfig,
}

impl ServerConfig {
  /// Load from `path` (if it exists) and the environment.
  ///
  /// Nested keys use a double underscore in the environment, e.g.
  /// `DRAMATURGY_NOTIFICATIONS__MAX_LIMIT=50`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("host", "127.0.0.1")?
      .set_default("port", 3000)?
      .set_default("store_path", "dramaturgy.db")?
      .set_default("session_ttl_hours", 24 * 30)?
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("DRAMATURGY")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}
