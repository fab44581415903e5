//! Client configuration: file/struct/environment resolution.
//!
//! Settings are resolved with a fixed precedence: a value passed directly
//! to the builder wins over the config source (YAML file or in-memory
//! [`FileConfig`]), which wins over the environment variable / built-in
//! default. The API key is the only setting with an environment fallback
//! (`FMP_API_KEY`); its absence is a hard construction-time failure.
//!
//! Example `config.yaml`:
//!
//! ```yaml
//! fmp:
//!   api_key: "your-api-key"
//!   cache:
//!     backend: "sqlite"
//!     name: "fmp_cache"
//!     expire_after: 3600
//!   rate_limit:
//!     requests_per_minute: 300
//!     retry: true
//!     max_retries: 3
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::errors::FmpError;

/// Base URL of the FMP "stable" API.
pub const BASE_URL: &str = "https://financialmodelingprep.com/stable";

/// Environment variable consulted when no API key is given directly or in
/// the config source.
pub const API_KEY_ENV_VAR: &str = "FMP_API_KEY";

pub(crate) const DEFAULT_CACHE_NAME: &str = "fmp_cache";
pub(crate) const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
pub(crate) const DEFAULT_REQUESTS_PER_MINUTE: usize = 300;
pub(crate) const DEFAULT_RATE_LIMIT_RETRY: bool = true;
pub(crate) const DEFAULT_RATE_LIMIT_MAX_RETRIES: u32 = 3;
pub(crate) const DEFAULT_MAX_RETRIES: u32 = 3;

/// Cache backend selection.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// File-backed SQLite store (the default); survives restarts and is
    /// shareable across processes.
    #[default]
    Sqlite,
    /// Process-local in-memory store.
    Memory,
}

/// Top-level shape of a YAML config file.
///
/// Only the `fmp` section is read; unrelated sections in a shared config
/// file are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FileConfig {
    /// The `fmp:` section.
    #[serde(default)]
    pub fmp: FmpSection,
}

/// The `fmp:` section of a config file.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FmpSection {
    /// API key (overridden by a directly supplied key).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Cache settings.
    #[serde(default)]
    pub cache: CacheSection,
    /// Rate limit settings.
    #[serde(default)]
    pub rate_limit: RateLimitSection,
}

/// The `fmp.cache:` section.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CacheSection {
    /// Backend type ("sqlite" or "memory").
    #[serde(default)]
    pub backend: Option<CacheBackend>,
    /// Name for the cache database (file stem for the SQLite backend).
    #[serde(default)]
    pub name: Option<String>,
    /// Cache TTL in seconds.
    #[serde(default)]
    pub expire_after: Option<u64>,
}

/// The `fmp.rate_limit:` section.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RateLimitSection {
    /// Max real network calls per trailing 60-second window.
    #[serde(default)]
    pub requests_per_minute: Option<usize>,
    /// Whether to auto-retry on HTTP 429.
    #[serde(default)]
    pub retry: Option<bool>,
    /// Max retries on 429 before giving up.
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl FileConfig {
    /// Load a config file from disk.
    ///
    /// A missing or malformed file is a [`FmpError::Configuration`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FmpError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            FmpError::Configuration(format!("config file not found: {}: {e}", path.display()))
        })?;
        serde_yml::from_str(&raw).map_err(|e| {
            FmpError::Configuration(format!("invalid config file {}: {e}", path.display()))
        })
    }
}

/// Fully resolved client settings, immutable after construction.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Resolved API key.
    pub api_key: String,
    /// Base URL requests are issued against.
    pub base_url: String,
    /// Selected cache backend.
    pub cache_backend: CacheBackend,
    /// Cache database name (file stem for SQLite).
    pub cache_name: String,
    /// Per-entry cache time-to-live.
    pub cache_ttl: Duration,
    /// Max real network calls per trailing 60-second window.
    pub requests_per_minute: usize,
    /// Whether 429 responses are retried with exponential backoff.
    pub rate_limit_retry: bool,
    /// Max 429 retries before surfacing `RateLimited`.
    pub rate_limit_max_retries: u32,
    /// Max transient-store retries before surfacing `TransientStore`.
    pub max_retries: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config_file_shape() {
        let yaml = r#"
fmp:
  api_key: "file-key"
  cache:
    backend: "memory"
    name: "test_cache"
    expire_after: 3600
  rate_limit:
    requests_per_minute: 5
    retry: false
    max_retries: 7
"#;
        let config: FileConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.fmp.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.fmp.cache.backend, Some(CacheBackend::Memory));
        assert_eq!(config.fmp.cache.name.as_deref(), Some("test_cache"));
        assert_eq!(config.fmp.cache.expire_after, Some(3600));
        assert_eq!(config.fmp.rate_limit.requests_per_minute, Some(5));
        assert_eq!(config.fmp.rate_limit.retry, Some(false));
        assert_eq!(config.fmp.rate_limit.max_retries, Some(7));
    }

    #[test]
    fn test_partial_sections_default_to_none() {
        let yaml = r#"
fmp:
  api_key: "file-key"
"#;
        let config: FileConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.fmp.api_key.as_deref(), Some("file-key"));
        assert!(config.fmp.cache.backend.is_none());
        assert!(config.fmp.rate_limit.retry.is_none());
    }

    #[test]
    fn test_unrelated_sections_are_ignored() {
        let yaml = r#"
other_app:
  setting: 1
fmp:
  api_key: "k"
"#;
        let config: FileConfig = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.fmp.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = FileConfig::from_path("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, FmpError::Configuration(_)));
    }

    #[test]
    fn test_malformed_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "fmp: [not, a, mapping").unwrap();
        let err = FileConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, FmpError::Configuration(_)));
    }

    #[test]
    fn test_backend_parses_lowercase_names() {
        let backend: CacheBackend = serde_yml::from_str("\"sqlite\"").unwrap();
        assert_eq!(backend, CacheBackend::Sqlite);
        let backend: CacheBackend = serde_yml::from_str("\"memory\"").unwrap();
        assert_eq!(backend, CacheBackend::Memory);
    }
}
