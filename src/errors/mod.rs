//! Error types and retry classification for the FMP client.
//!
//! This module provides:
//! - [`FmpError`]: the main error enum for all client operations
//! - [`RetryClass`]: classification for determining retry behavior
//! - [`classify_store_fault`]: the transient-store-fault heuristic

mod retry;

pub use retry::{classify_store_fault, RetryClass, StoreFault};

use thiserror::Error;

/// Errors that can occur during FMP client operations.
///
/// Each variant is classified into a [`RetryClass`] via the
/// [`retry_class`](Self::retry_class) method, which determines how the
/// request pipeline responds to the failure. Every variant except
/// [`Configuration`](Self::Configuration) is recoverable by the caller.
#[derive(Error, Debug)]
pub enum FmpError {
    /// No API key could be resolved, or a named config file is missing or
    /// malformed. Fatal at construction; never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The FMP API rate limit was exceeded (HTTP 429) and the retry budget
    /// is exhausted or retry is disabled. Callers observing this should
    /// back off further upstream.
    #[error("the FMP API rate limit was exceeded")]
    RateLimited,

    /// Any non-200, non-429 response. Surfaced immediately with status and
    /// body for diagnostics; never retried.
    #[error("API request failed with status {status}: {body}")]
    Http {
        /// HTTP status code returned by the server
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Transport-level failure (timeout, connection refused, DNS).
    /// Surfaced immediately; the pipeline does not retry these.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A cache/storage fault, surfaced after the transient-retry budget is
    /// exhausted (or immediately when classified persistent). Callers
    /// should treat the cache as temporarily unavailable, not as a
    /// data-correctness failure.
    #[error("cache store fault: {message}")]
    TransientStore {
        /// Message from the backing store
        message: String,
    },

    /// A caller-supplied parameter has the wrong shape. Raised before any
    /// network activity.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A 200 response body that is not valid JSON. Never retried.
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FmpError {
    /// Map an HTTP status and body to the corresponding error variant.
    ///
    /// 429 becomes [`FmpError::RateLimited`] so callers can catch it as a
    /// distinct condition; everything else becomes [`FmpError::Http`].
    pub fn from_status(status: u16, body: String) -> Self {
        if status == 429 {
            Self::RateLimited
        } else {
            Self::Http { status, body }
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use fmp_client::errors::{FmpError, RetryClass};
    ///
    /// assert_eq!(FmpError::RateLimited.retry_class(), RetryClass::RateLimitBackoff);
    ///
    /// let error = FmpError::Http { status: 500, body: String::new() };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited => RetryClass::RateLimitBackoff,
            Self::TransientStore { .. } => RetryClass::StoreBackoff,
            Self::Configuration(_)
            | Self::Http { .. }
            | Self::Network(_)
            | Self::InvalidArgument(_)
            | Self::Decode(_) => RetryClass::Never,
        }
    }
}
