//! HTTP client module
//!
//! Provides the HTTP client used for every Google Ads API call.
//!
//! # Features
//!
//! - **Automatic Retries**: 429, 5xx, timeouts and connection errors
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Backoff Strategies**: Constant, linear, and exponential backoff
//! - **Authentication**: Integration with auth module

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
