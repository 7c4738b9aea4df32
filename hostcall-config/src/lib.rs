//! Runtime configuration for hostcall bridges.
//!
//! A bridge is configured from a small TOML document. Every section is
//! optional; omitted keys fall back to the defaults documented on each
//! settings type.
//!
//! ```toml
//! [host]
//! tick_interval_ms = 16
//! thread_name = "scene-host"
//!
//! [catalog]
//! route_prefix = "/tools"
//! default_method = "POST"
//!
//! [telemetry]
//! filter = "info,hostcall_kernel=debug"
//! ```

#![warn(missing_docs, clippy::pedantic)]

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// HTTP methods accepted as catalog defaults.
const KNOWN_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read `{path}`: {reason}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O failure.
        reason: String,
    },

    /// The document is not valid TOML for [`BridgeConfig`].
    #[error("invalid configuration: {0}")]
    Parse(String),

    /// A value parsed but is out of range.
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        /// Dotted key of the offending value.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level bridge configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Host thread settings.
    pub host: HostSettings,
    /// Catalog export settings.
    pub catalog: CatalogSettings,
    /// Logging settings.
    pub telemetry: TelemetrySettings,
}

/// Host thread settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostSettings {
    /// Milliseconds between host loop ticks. Defaults to 16.
    pub tick_interval_ms: u64,
    /// Name given to the host OS thread. Defaults to `hostcall-host`.
    pub thread_name: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            thread_name: "hostcall-host".into(),
        }
    }
}

impl HostSettings {
    /// Returns the tick interval as a [`Duration`].
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Catalog export settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogSettings {
    /// Path prefix tool routes hang off. Defaults to `/tools`.
    pub route_prefix: String,
    /// Method used for tools without a method hint. Defaults to `POST`.
    pub default_method: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            route_prefix: "/tools".into(),
            default_method: "POST".into(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetrySettings {
    /// `tracing` filter directive. Defaults to `info`.
    pub filter: String,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            filter: "info".into(),
        }
    }
}

impl BridgeConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents and
    /// [`ConfigError::Invalid`] when [`validate`](Self::validate) fails.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise the
    /// errors of [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let config = Self::from_toml_str(&source)?;
        debug!(path = %path.display(), "loaded bridge configuration");
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.host.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "host.tick_interval_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.host.thread_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "host.thread_name",
                reason: "must not be empty".into(),
            });
        }
        if !self.catalog.route_prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "catalog.route_prefix",
                reason: format!("`{}` must start with `/`", self.catalog.route_prefix),
            });
        }
        let method = self.catalog.default_method.to_ascii_uppercase();
        if !KNOWN_METHODS.contains(&method.as_str()) {
            return Err(ConfigError::Invalid {
                field: "catalog.default_method",
                reason: format!(
                    "`{}` is not one of {}",
                    self.catalog.default_method,
                    KNOWN_METHODS.join(", ")
                ),
            });
        }
        Ok(())
    }
}
