//! Configuration loading for gencached.
//!
//! Configuration is loaded from TOML with the following resolution
//! order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.gencache/config.toml` (user)
//!
//! Absent both, built-in defaults apply. CLI flags override whatever
//! the file provided; the upstream URL is the only value with no
//! default and must come from one of the two.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{GencacheError, Result};

/// Default bind host: all interfaces, the proxy fronts other machines.
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    30001
}

fn default_upstream_timeout() -> u64 {
    300
}

/// Proxy configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Server network configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to (default: 0.0.0.0).
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to (default: 30001).
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Upstream backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the inference server (required, no default).
    #[serde(default)]
    pub url: Option<String>,
    /// Per-request timeout in seconds (default: 300).
    #[serde(default = "default_upstream_timeout")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_upstream_timeout(),
        }
    }
}

/// Cache storage configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheConfig {
    /// Directory holding the journal (default: `~/.gencache`).
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Remove any existing journal before loading (default: false).
    #[serde(default)]
    pub overwrite: bool,
}

impl CacheConfig {
    /// The effective cache directory.
    pub fn dir_or_default(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(default_cache_dir)
    }
}

/// `~/.gencache`, falling back to a relative path when the home
/// directory can't be resolved (e.g. stripped-down containers).
fn default_cache_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".gencache"))
        .unwrap_or_else(|| PathBuf::from(".gencache"))
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path must exist; the user config is optional and
    /// missing-is-defaults.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match Self::resolve_config_path(explicit_path)? {
            Some(path) => path,
            None => return Ok(Config::default()),
        };
        let content = fs::read_to_string(&path).map_err(|e| {
            GencacheError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            GencacheError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(GencacheError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".gencache").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 30001);
        assert_eq!(config.upstream.timeout_secs, 300);
        assert!(config.upstream.url.is_none());
        assert!(!config.cache.overwrite);
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [upstream]
            url = "http://localhost:30000"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.upstream.url.as_deref(),
            Some("http://localhost:30000")
        );
        // Defaults preserved
        assert_eq!(config.server.port, 30001);
        assert_eq!(config.upstream.timeout_secs, 300);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [server]
            host = "127.0.0.1"
            port = 31000

            [upstream]
            url = "http://gpu-box:30000"
            timeout_secs = 60

            [cache]
            dir = "/var/cache/gencache"
            overwrite = true
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 31000);
        assert_eq!(config.upstream.timeout_secs, 60);
        assert_eq!(
            config.cache.dir,
            Some(PathBuf::from("/var/cache/gencache"))
        );
        assert!(config.cache.overwrite);
    }

    #[test]
    fn explicit_config_must_exist() {
        let result = Config::load(Some(Path::new("/nonexistent/config.toml")));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Config file not found"));
    }

    #[test]
    fn cache_dir_default_ends_with_gencache() {
        let config = Config::default();
        assert!(config.cache.dir_or_default().ends_with(".gencache"));
    }
}
