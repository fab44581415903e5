//! The request pipeline: cache, rate governance, transport, and retry.
//!
//! Turns a logical "fetch this endpoint" call into a rate-limited,
//! cached, retried HTTP exchange:
//!
//! ```text
//! request(endpoint, params)
//!   -> cache lookup -- fresh hit: return (no rate-limit cost)
//!   -> RateLimiter::admit()        (may suspend; records the call)
//!   -> Transport::get()
//!   -> 200: store in cache, return
//!      429: exponential backoff within its own retry budget
//!      other: fail immediately
//! ```
//!
//! Transient cache faults are retried with linear backoff on a second,
//! independent budget, so a flaky store cannot consume the 429 budget and
//! vice versa. Neither budget is shared with a deadline; callers that
//! need one must impose it from outside.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, warn};
use serde_json::Value;

use crate::cache::{CacheError, CacheKey, ResponseCache};
use crate::errors::{FmpError, RetryClass};
use crate::limiter::RateLimiter;
use crate::transport::Transport;

/// Pipeline tunables, immutable after client construction.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Base URL endpoint paths are joined to.
    pub base_url: String,
    /// TTL applied to entries stored on a successful fetch.
    pub cache_ttl: Duration,
    /// Whether 429 responses are retried at all.
    pub rate_limit_retry: bool,
    /// Max 429 retries before surfacing `RateLimited`.
    pub rate_limit_max_retries: u32,
    /// Max transient-store retries before surfacing `TransientStore`.
    pub max_retries: u32,
}

/// Orchestrates one client's exchanges with the remote API.
pub struct RequestPipeline {
    config: PipelineConfig,
    cache: Arc<dyn ResponseCache>,
    limiter: Arc<RateLimiter>,
    transport: Arc<dyn Transport>,
}

impl RequestPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        config: PipelineConfig,
        cache: Arc<dyn ResponseCache>,
        limiter: Arc<RateLimiter>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            cache,
            limiter,
            transport,
        }
    }

    /// Fetch `endpoint` with `params` using the configured
    /// transient-store retry budget.
    pub async fn request(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Value, FmpError> {
        self.request_with_retries(endpoint, params, self.config.max_retries)
            .await
    }

    /// Fetch `endpoint` with `params`, going to the network only on a
    /// cache miss. `max_retries` bounds transient-store retries for this
    /// call only; the 429 budget stays as configured.
    ///
    /// Parameter order does not matter: calls are identified by the
    /// endpoint plus the sorted parameter set.
    pub async fn request_with_retries(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        max_retries: u32,
    ) -> Result<Value, FmpError> {
        let key = CacheKey::new(endpoint, params);
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint
        );
        let query: Vec<(String, String)> = params
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();

        let mut store_attempts: u32 = 0;
        let mut rate_limit_attempts: u32 = 0;

        // Every iteration either returns or consumes one unit of a bounded
        // retry budget, so this many passes always suffice.
        let attempt_budget = max_retries
            .saturating_add(self.config.rate_limit_max_retries)
            .saturating_add(1);

        for _ in 0..attempt_budget {
            // cache first: a fresh hit costs no rate-limit budget
            match self.cache.lookup(&key) {
                Ok(Some(entry)) if entry.is_fresh(Utc::now()) => {
                    debug!("Retrieved {endpoint} from cache");
                    return Ok(serde_json::from_str(&entry.body)?);
                }
                Ok(_) => {}
                Err(e) => {
                    match Self::store_backoff(&e, &mut store_attempts, max_retries) {
                        Some(wait) => {
                            debug!(
                                "Cache retry {}/{} in {:.1}s: {e}",
                                store_attempts,
                                max_retries,
                                wait.as_secs_f64()
                            );
                            tokio::time::sleep(wait).await;
                            continue;
                        }
                        None => {
                            return Err(FmpError::TransientStore {
                                message: e.to_string(),
                            })
                        }
                    }
                }
            }

            // admission blocks until window capacity exists, then records
            // the call so the next admission sees it
            self.limiter.admit().await;

            let response = self.transport.get(&url, &query).await?;

            if response.status == 200 {
                debug!("Fetched {endpoint} from API");
                let value: Value = serde_json::from_str(&response.body)?;

                if let Err(e) = self
                    .cache
                    .store(&key, &response.body, self.config.cache_ttl)
                {
                    match Self::store_backoff(&e, &mut store_attempts, max_retries) {
                        Some(wait) => {
                            debug!(
                                "Cache retry {}/{} in {:.1}s: {e}",
                                store_attempts,
                                max_retries,
                                wait.as_secs_f64()
                            );
                            tokio::time::sleep(wait).await;
                            continue;
                        }
                        None => {
                            return Err(FmpError::TransientStore {
                                message: e.to_string(),
                            })
                        }
                    }
                }

                return Ok(value);
            }

            let err = FmpError::from_status(response.status, response.body);
            match err.retry_class() {
                RetryClass::RateLimitBackoff
                    if self.config.rate_limit_retry
                        && rate_limit_attempts < self.config.rate_limit_max_retries =>
                {
                    rate_limit_attempts += 1;
                    let wait = Duration::from_secs(2u64.saturating_pow(rate_limit_attempts));
                    warn!(
                        "Rate limit hit (429), retry {}/{} in {}s",
                        rate_limit_attempts,
                        self.config.rate_limit_max_retries,
                        wait.as_secs()
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                RetryClass::RateLimitBackoff => {
                    error!("Rate limit exceeded after retries");
                    return Err(err);
                }
                _ => {
                    error!("API request failed with status {}", response.status);
                    return Err(err);
                }
            }
        }

        // Unreachable under correct configuration; kept as a defensive
        // terminal failure rather than a panic.
        Err(FmpError::TransientStore {
            message: "retry budget exhausted without a final response".to_string(),
        })
    }

    /// Decide whether a storage fault earns another attempt. Consumes one
    /// unit of the store budget and returns the linear backoff to sleep,
    /// or `None` when the fault is persistent or the budget is spent.
    fn store_backoff(
        error: &CacheError,
        store_attempts: &mut u32,
        max_retries: u32,
    ) -> Option<Duration> {
        if !error.is_transient() || *store_attempts >= max_retries {
            return None;
        }
        *store_attempts += 1;
        Some(Duration::from_millis(500 * u64::from(*store_attempts)))
    }
}
