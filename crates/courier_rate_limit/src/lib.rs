//! Rate limiting, retry and configuration for platform API workers.
//!
//! Platform quotas are described by [`Tier`] values, usually [`TierConfig`]
//! entries loaded from `courier.toml`. A [`RateLimiter`] enforces a tier and
//! retries transient failures; a [`HeaderRateLimitDetector`] picks up the
//! throttling signals platforms send back.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod detector;
mod limiter;
mod tier;

pub use config::{CourierConfig, DispatchConfig, MethodTierConfig, PlatformConfig, TierConfig};
pub use detector::{DetectedLimits, HeaderRateLimitDetector, telegram_retry_after};
pub use limiter::{RateLimiter, RateLimiterGuard, RetryPolicy, RetryableError};
pub use tier::Tier;
