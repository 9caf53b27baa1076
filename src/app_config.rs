//! Module for application configuration settings.
//!
//! User configurations may be specified in a configuration file. Every field
//! has a default, so running without any file is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use onelake_api::DEFAULT_BASE_URL;
use onelake_fs::CacheSettings;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn serialize_token<S>(_token: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str("****")
}

/// Where and as whom to talk to OneLake.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApiConfig {
    /// The DFS endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Entra tenant the token was issued for. Informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    /// Application the token was issued to. Informational.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Bearer token. `--token` and `ONELAKE_ACCESS_TOKEN` take precedence.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_token"
    )]
    pub token: Option<SecretString>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            tenant_id: None,
            client_id: None,
            token: None,
        }
    }
}

/// Timing of the node cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CacheConfig {
    /// How long to wait for another request's in-flight fetch of the same node.
    pub load_wait_secs: u64,

    /// How long a fetch waits for the connection check to complete.
    pub init_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let settings = CacheSettings::default();
        Self {
            load_wait_secs: settings.load_wait_ceiling.as_secs(),
            init_timeout_secs: settings.init_timeout.as_secs(),
        }
    }
}

/// Outbound HTTP settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout_secs: u64,

    /// Proxy for every request, e.g. `http://proxy.corp:8080`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Verify TLS certificates.
    pub strict_ssl: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            proxy: None,
            strict_ssl: true,
        }
    }
}

/// Application configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Config {
    /// Validate the correctness of the configuration.
    ///
    /// Returns:
    /// - `Ok(())` if the configuration is valid.
    /// - `Err(Vec<String>)` with every problem found otherwise.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.api.base_url.trim().is_empty() {
            errors.push("api.base-url must not be empty.".to_owned());
        } else if let Err(e) = Url::parse(&self.api.base_url) {
            errors.push(format!("api.base-url '{}' is not a URL: {e}", self.api.base_url));
        }

        if self.cache.load_wait_secs == 0 {
            errors.push("cache.load-wait-secs must be greater than zero.".to_owned());
        }
        if self.cache.init_timeout_secs == 0 {
            errors.push("cache.init-timeout-secs must be greater than zero.".to_owned());
        }
        if self.http.timeout_secs == 0 {
            errors.push("http.timeout-secs must be greater than zero.".to_owned());
        }

        if let Some(proxy) = &self.http.proxy
            && let Err(e) = Url::parse(proxy)
        {
            errors.push(format!("http.proxy '{proxy}' is not a URL: {e}"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    #[must_use]
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            load_wait_ceiling: Duration::from_secs(self.cache.load_wait_secs),
            init_timeout: Duration::from_secs(self.cache.init_timeout_secs),
        }
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    /// Returns config file paths in descending priority order.
    /// On macOS, skips `dirs::config_dir()` (resolves to ~/Library/Application Support/).
    fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(not(target_os = "macos"))]
        if let Some(xdg) = dirs::config_dir() {
            paths.push(xdg.join("onelake-fs").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join("onelake-fs").join("config.toml"));
        }

        paths.push(PathBuf::from("/etc/onelake-fs/config.toml"));

        paths
    }

    /// Finds the first existing config file from search paths.
    fn find_config_file() -> Option<PathBuf> {
        Self::config_search_paths().into_iter().find(|p| p.exists())
    }

    /// Loads config from a single TOML file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = ?path, "Loading configuration file.");
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads configuration from the external path if given, otherwise from
    /// the first config file found, otherwise the defaults.
    pub fn load_or_default(external_config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = external_config_path {
            return Self::load_from_file(path);
        }
        match Self::find_config_file() {
            Some(path) => Self::load_from_file(&path),
            None => {
                debug!("No configuration file found, using defaults.");
                Ok(Self::default())
            }
        }
    }

    /// The configuration as TOML, with the token masked.
    pub fn to_masked_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
