//! Client configuration.
//!
//! A [`ClientConfig`] is read from a TOML or YAML file and then overridden
//! by `D1_*` environment variables. Every field has a default, so an empty
//! file (or no file at all) yields a working configuration against the
//! production coordinating node.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::D1Error;

pub const DEFAULT_CN_URL: &str = "https://cn.dataone.org/cn";
pub const DEFAULT_API_VERSION: &str = "v2";

pub const ENV_CN_URL: &str = "D1_CN_URL";
pub const ENV_AUTH_TOKEN: &str = "D1_AUTH_TOKEN";
pub const ENV_CERT_PATH: &str = "D1_CERT_PATH";
pub const ENV_API_VERSION: &str = "D1_API_VERSION";
pub const ENV_TIMEOUT_SECS: &str = "D1_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the coordinating node, without the API version.
    pub cn_url: String,
    /// REST API version prefixed to every path, e.g. `v2`.
    pub api_version: String,
    /// Bearer token sent with every request.
    pub auth_token: Option<String>,
    /// PEM file holding a client certificate and its private key.
    pub cert_path: Option<PathBuf>,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub pool_idle_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries of the object cache, `0` disables it.
    pub object_capacity: usize,
    /// Entries of the system metadata cache, `0` disables it.
    pub sysmeta_capacity: usize,
    /// How long a fetched format list stays fresh.
    pub format_refresh_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            cn_url: DEFAULT_CN_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            auth_token: None,
            cert_path: None,
            timeout_secs: 300,
            connect_timeout_secs: 60,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 10,
            user_agent: format!("dataone-rs/{}", env!("CARGO_PKG_VERSION")),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            object_capacity: 50,
            sysmeta_capacity: 500,
            format_refresh_secs: 24 * 60 * 60,
        }
    }
}

impl ClientConfig {
    /// Loads a configuration file, trying TOML first and YAML second.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the file.
    ///
    /// # Returns
    ///
    /// The parsed configuration or a client-side error naming the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, D1Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            D1Error::client_side(format!("Could not read configuration {path:?}"), Some(e))
        })?;

        Self::parse(&content).map_err(|e| {
            D1Error::client_message(format!("Could not parse configuration {path:?}: {e}"))
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        match toml::from_str::<ClientConfig>(content) {
            Ok(config) => Ok(config),
            Err(toml_err) => serde_yaml::from_str::<ClientConfig>(content)
                .map_err(|yaml_err| format!("not TOML ({toml_err}) nor YAML ({yaml_err})")),
        }
    }

    /// The default configuration overridden by the process environment.
    pub fn from_env() -> Result<Self, D1Error> {
        Self::default().apply_env()
    }

    /// Overrides fields from the `D1_*` environment variables.
    pub fn apply_env(self) -> Result<Self, D1Error> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Overrides fields from a variable lookup. Empty values are ignored.
    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, D1Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(ENV_CN_URL) {
            self.cn_url = url;
        }
        if let Some(token) = lookup(ENV_AUTH_TOKEN) {
            self.auth_token = Some(token);
        }
        if let Some(path) = lookup(ENV_CERT_PATH) {
            self.cert_path = Some(PathBuf::from(path));
        }
        if let Some(version) = lookup(ENV_API_VERSION) {
            self.api_version = version;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = timeout.trim().parse().map_err(|e| {
                D1Error::client_side(format!("{ENV_TIMEOUT_SECS} is not a number"), Some(e))
            })?;
        }

        Ok(self)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

impl CacheConfig {
    pub fn format_refresh(&self) -> Duration {
        Duration::from_secs(self.format_refresh_secs)
    }
}
