//! The FMP client: construction, configuration resolution, and the
//! resource accessor surface.
//!
//! # Example
//!
//! ```no_run
//! use fmp_client::FmpClient;
//!
//! # async fn demo() -> Result<(), fmp_client::FmpError> {
//! let client = FmpClient::new("your-api-key")?;
//! let quote = client.quote("AAPL").await?;
//! let profile = client.company_profile("NVDA").await?;
//! # Ok(())
//! # }
//! ```

mod accessors;

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::cache::{MemoryCache, ResponseCache, SqliteCache};
use crate::config::{
    CacheBackend, FileConfig, Settings, API_KEY_ENV_VAR, BASE_URL, DEFAULT_CACHE_NAME,
    DEFAULT_CACHE_TTL, DEFAULT_MAX_RETRIES, DEFAULT_RATE_LIMIT_MAX_RETRIES,
    DEFAULT_RATE_LIMIT_RETRY, DEFAULT_REQUESTS_PER_MINUTE,
};
use crate::errors::FmpError;
use crate::limiter::RateLimiter;
use crate::pipeline::{PipelineConfig, RequestPipeline};
use crate::transport::{HttpTransport, Transport};

/// Client for the Financial Modeling Prep API.
///
/// Wraps the request pipeline (response caching, sliding-window rate
/// governance, transient-failure retry) behind per-resource accessor
/// methods. One instance is safe to share across tasks; each instance is
/// rate-limited independently.
pub struct FmpClient {
    pub(crate) settings: Settings,
    pipeline: RequestPipeline,
    cache: Arc<dyn ResponseCache>,
}

impl std::fmt::Debug for FmpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FmpClient")
            .field("settings", &self.settings)
            .field("pipeline", &"RequestPipeline")
            .field("cache", &"Arc<dyn ResponseCache>")
            .finish()
    }
}

impl FmpClient {
    /// Construct a client from an API key, with defaults for everything
    /// else.
    pub fn new(api_key: impl Into<String>) -> Result<Self, FmpError> {
        Self::builder().api_key(api_key).build()
    }

    /// Start building a client with explicit settings.
    pub fn builder() -> FmpClientBuilder {
        FmpClientBuilder::default()
    }

    /// The resolved API key.
    pub fn api_key(&self) -> &str {
        &self.settings.api_key
    }

    /// The fully resolved settings this client was built with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Drop all cached responses.
    pub fn clear_cache(&self) -> Result<(), FmpError> {
        self.cache.clear().map_err(|e| FmpError::TransientStore {
            message: e.to_string(),
        })?;
        info!("Cache cleared");
        Ok(())
    }

    pub(crate) fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }
}

/// Builder for [`FmpClient`].
///
/// Every setting resolves with precedence: value set here > config source
/// (in-memory [`FileConfig`] or YAML file, the former winning if both are
/// given) > environment variable / built-in default.
#[derive(Default)]
pub struct FmpClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    config: Option<FileConfig>,
    config_path: Option<PathBuf>,
    cache_backend: Option<CacheBackend>,
    cache_name: Option<String>,
    cache_expire_after: Option<Duration>,
    requests_per_minute: Option<usize>,
    rate_limit_retry: Option<bool>,
    rate_limit_max_retries: Option<u32>,
    max_retries: Option<u32>,
    cache: Option<Arc<dyn ResponseCache>>,
    transport: Option<Arc<dyn Transport>>,
}

impl FmpClientBuilder {
    /// API key; takes precedence over config source and environment.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the API base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// In-memory config source (alternative to [`config_path`](Self::config_path)).
    pub fn config(mut self, config: FileConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Path to a YAML config file containing an `fmp:` section.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Cache backend type (default: sqlite).
    pub fn cache_backend(mut self, backend: CacheBackend) -> Self {
        self.cache_backend = Some(backend);
        self
    }

    /// Name for the cache database (default: "fmp_cache").
    pub fn cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = Some(name.into());
        self
    }

    /// Cache TTL (default: 300 seconds).
    pub fn cache_expire_after(mut self, ttl: Duration) -> Self {
        self.cache_expire_after = Some(ttl);
        self
    }

    /// Max real network calls per trailing minute (default: 300, the
    /// Starter plan limit).
    pub fn requests_per_minute(mut self, limit: usize) -> Self {
        self.requests_per_minute = Some(limit);
        self
    }

    /// Whether to auto-retry on 429 responses (default: true).
    pub fn rate_limit_retry(mut self, retry: bool) -> Self {
        self.rate_limit_retry = Some(retry);
        self
    }

    /// Max retries on 429 before giving up (default: 3).
    pub fn rate_limit_max_retries(mut self, retries: u32) -> Self {
        self.rate_limit_max_retries = Some(retries);
        self
    }

    /// Max retry attempts for transient cache faults (default: 3).
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Use a pre-built cache instead of constructing one from the
    /// backend/name settings.
    pub fn cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use a custom transport instead of the HTTP one. The seam for
    /// exercising the pipeline without a network.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Resolve all settings and construct the client.
    ///
    /// Fails with [`FmpError::Configuration`] when no API key is
    /// resolvable, the config file is missing or malformed, or the cache
    /// database cannot be opened.
    pub fn build(self) -> Result<FmpClient, FmpError> {
        let file = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => FileConfig::from_path(path)?,
            (None, None) => FileConfig::default(),
        };
        let section = file.fmp;

        let api_key = non_empty(self.api_key)
            .or_else(|| non_empty(section.api_key))
            .or_else(|| non_empty(env::var(API_KEY_ENV_VAR).ok()))
            .ok_or_else(|| {
                FmpError::Configuration(format!(
                    "API key must be provided via the api_key argument, \
                     the config source (fmp.api_key), or the {API_KEY_ENV_VAR} \
                     environment variable"
                ))
            })?;

        let settings = Settings {
            api_key,
            base_url: self.base_url.unwrap_or_else(|| BASE_URL.to_string()),
            cache_backend: self
                .cache_backend
                .or(section.cache.backend)
                .unwrap_or_default(),
            cache_name: self
                .cache_name
                .or(section.cache.name)
                .unwrap_or_else(|| DEFAULT_CACHE_NAME.to_string()),
            cache_ttl: self
                .cache_expire_after
                .or(section.cache.expire_after.map(Duration::from_secs))
                .unwrap_or(DEFAULT_CACHE_TTL),
            requests_per_minute: self
                .requests_per_minute
                .or(section.rate_limit.requests_per_minute)
                .unwrap_or(DEFAULT_REQUESTS_PER_MINUTE),
            rate_limit_retry: self
                .rate_limit_retry
                .or(section.rate_limit.retry)
                .unwrap_or(DEFAULT_RATE_LIMIT_RETRY),
            rate_limit_max_retries: self
                .rate_limit_max_retries
                .or(section.rate_limit.max_retries)
                .unwrap_or(DEFAULT_RATE_LIMIT_MAX_RETRIES),
            max_retries: self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES),
        };

        let cache: Arc<dyn ResponseCache> = match self.cache {
            Some(cache) => cache,
            None => match settings.cache_backend {
                CacheBackend::Sqlite => {
                    let path = format!("{}.sqlite", settings.cache_name);
                    Arc::new(SqliteCache::open(&path).map_err(|e| {
                        FmpError::Configuration(format!(
                            "could not open cache database {path}: {e}"
                        ))
                    })?)
                }
                CacheBackend::Memory => Arc::new(MemoryCache::new()),
            },
        };

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(settings.api_key.clone())),
        };

        let limiter = Arc::new(RateLimiter::new(settings.requests_per_minute));

        let pipeline = RequestPipeline::new(
            PipelineConfig {
                base_url: settings.base_url.clone(),
                cache_ttl: settings.cache_ttl,
                rate_limit_retry: settings.rate_limit_retry,
                rate_limit_max_retries: settings.rate_limit_max_retries,
                max_retries: settings.max_retries,
            },
            Arc::clone(&cache),
            limiter,
            transport,
        );

        info!(
            "FMP client initialized with cache backend: {:?}, expire_after: {}s, \
             rate limit: {} req/min",
            settings.cache_backend,
            settings.cache_ttl.as_secs(),
            settings.requests_per_minute
        );

        Ok(FmpClient {
            settings,
            pipeline,
            cache,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
