//! Detection of rate limit signals in platform responses.
//!
//! Graph API reports app usage as a JSON percentage header and answers
//! throttled calls with `Retry-After`; Telegram returns `retry_after` inside
//! the error body.

use reqwest::header::HeaderMap;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Rate limit signals extracted from one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectedLimits {
    /// Wait requested by the platform before the next call
    pub retry_after: Option<Duration>,
    /// Highest reported usage percentage of the app quota
    pub usage_percent: Option<u32>,
}

impl DetectedLimits {
    /// Whether usage is at or above `threshold` percent.
    pub fn is_near_limit(&self, threshold: u32) -> bool {
        self.usage_percent.is_some_and(|usage| usage >= threshold)
    }
}

/// Detects and caches rate limit signals from API responses.
///
/// # Example
///
/// ```
/// use courier_rate_limit::HeaderRateLimitDetector;
/// use reqwest::header::{HeaderMap, HeaderValue};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let detector = HeaderRateLimitDetector::new();
/// let mut headers = HeaderMap::new();
/// headers.insert("retry-after", HeaderValue::from_static("7"));
///
/// let limits = detector.detect(&headers).await.unwrap();
/// assert_eq!(limits.retry_after.map(|d| d.as_secs()), Some(7));
/// assert!(detector.get_cached().await.is_some());
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HeaderRateLimitDetector {
    detected_limits: Arc<RwLock<Option<DetectedLimits>>>,
}

impl HeaderRateLimitDetector {
    /// Create a new detector.
    #[instrument]
    pub fn new() -> Self {
        debug!("Creating new header rate limit detector");
        Self {
            detected_limits: Arc::new(RwLock::new(None)),
        }
    }

    /// Detect rate limit signals from response headers.
    ///
    /// Reads `Retry-After` (seconds) and the Graph API `x-app-usage` header
    /// (`{"call_count":..,"total_time":..,"total_cputime":..}`). Returns
    /// `None` when neither is present.
    #[instrument(skip(self, headers))]
    pub async fn detect(&self, headers: &HeaderMap) -> Option<DetectedLimits> {
        let retry_after = parse_header_u64(headers, "retry-after").map(Duration::from_secs);
        let usage_percent = headers
            .get("x-app-usage")
            .and_then(|value| value.to_str().ok())
            .and_then(parse_app_usage);

        if retry_after.is_none() && usage_percent.is_none() {
            return None;
        }

        let limits = DetectedLimits {
            retry_after,
            usage_percent,
        };
        debug!(?limits, "Detected rate limit signals");

        *self.detected_limits.write().await = Some(limits);
        Some(limits)
    }

    /// Get last detected limits from cache.
    #[instrument(skip(self))]
    pub async fn get_cached(&self) -> Option<DetectedLimits> {
        let cached = *self.detected_limits.read().await;
        debug!(has_cached = cached.is_some(), "Retrieving cached rate limits");
        cached
    }

    /// Clear the cached detected limits.
    #[instrument(skip(self))]
    pub async fn clear_cache(&self) {
        debug!("Clearing cached rate limits");
        *self.detected_limits.write().await = None;
    }
}

impl Default for HeaderRateLimitDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract `parameters.retry_after` from a Telegram error body.
///
/// ```
/// use courier_rate_limit::telegram_retry_after;
/// use serde_json::json;
///
/// let body = json!({ "ok": false, "error_code": 429, "parameters": { "retry_after": 3 } });
/// assert_eq!(telegram_retry_after(&body), Some(3));
/// ```
pub fn telegram_retry_after(body: &JsonValue) -> Option<u64> {
    body.get("parameters")?.get("retry_after")?.as_u64()
}

fn parse_app_usage(raw: &str) -> Option<u32> {
    let usage: JsonValue = serde_json::from_str(raw).ok()?;
    ["call_count", "total_time", "total_cputime"]
        .iter()
        .filter_map(|field| usage.get(*field).and_then(JsonValue::as_u64))
        .max()
        .map(|max| max.min(u32::MAX as u64) as u32)
}

fn parse_header_u64(headers: &HeaderMap, key: &str) -> Option<u64> {
    headers.get(key)?.to_str().ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[tokio::test]
    async fn test_detect_graph_app_usage() {
        let detector = HeaderRateLimitDetector::new();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-app-usage",
            HeaderValue::from_static(r#"{"call_count":28,"total_time":91,"total_cputime":12}"#),
        );

        let limits = detector.detect(&headers).await.unwrap();
        assert_eq!(limits.usage_percent, Some(91));
        assert!(limits.is_near_limit(90));
        assert!(limits.retry_after.is_none());
    }

    #[tokio::test]
    async fn test_no_signals_leaves_cache_untouched() {
        let detector = HeaderRateLimitDetector::new();
        assert!(detector.detect(&HeaderMap::new()).await.is_none());
        assert!(detector.get_cached().await.is_none());
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let detector = HeaderRateLimitDetector::new();
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("2"));
        detector.detect(&headers).await;
        detector.clear_cache().await;
        assert!(detector.get_cached().await.is_none());
    }
}
