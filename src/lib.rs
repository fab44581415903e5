//! FMP Client
//!
//! Rust client for the Financial Modeling Prep (FMP) API with response
//! caching, request-rate governance, and transient-failure retry.
//!
//! # Overview
//!
//! The crate supports:
//! - SQLite-backed response caching with configurable TTL (in-memory
//!   backend available for ephemeral use)
//! - A sliding-window rate limiter bounding real network calls per
//!   trailing minute
//! - Automatic retry with exponential backoff on HTTP 429 and linear
//!   backoff on transient cache faults, each on its own budget
//! - Flexible configuration via builder arguments, a YAML file, or the
//!   `FMP_API_KEY` environment variable
//!
//! # Architecture
//!
//! ```text
//! +-----------------+
//! |    FmpClient    |  (accessors: quote, profile, earnings, ...)
//! +-----------------+
//!          |
//!          v
//! +-----------------+     +-----------------+
//! | RequestPipeline | --> |  ResponseCache  |  (fresh hit: done)
//! +-----------------+     +-----------------+
//!          |
//!          v
//! +-----------------+     +-----------------+
//! |   RateLimiter   | --> |    Transport    |  (HTTP GET + apikey)
//! +-----------------+     +-----------------+
//! ```
//!
//! A fresh cache hit never consults the rate limiter: the limiter
//! throttles real network egress, not logical call volume.
//!
//! # Example
//!
//! ```no_run
//! use fmp_client::FmpClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fmp_client::FmpError> {
//!     let client = FmpClient::new("your-api-key")?;
//!
//!     let quote = client.quote("AAPL").await?;
//!     println!("price: {}", quote[0]["price"]);
//!
//!     let table = fmp_client::DataTable::from_records(&quote)?;
//!     println!("{} rows", table.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod limiter;
pub mod models;
pub mod pipeline;
pub mod transport;

// Re-export the client and the types its surface speaks in
pub use cache::{CacheEntry, CacheKey, MemoryCache, ResponseCache, SqliteCache};
pub use client::{FmpClient, FmpClientBuilder};
pub use config::{CacheBackend, FileConfig, Settings};
pub use errors::{FmpError, RetryClass};
pub use limiter::RateLimiter;
pub use models::{DataTable, ScreenerQuery};
pub use transport::{HttpResponse, HttpTransport, Transport};
