//! Retry policy for the request pipeline: which statuses to retry and how
//! long to wait between attempts.

use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// Default number of attempts per logical request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default multiplier for exponential backoff, in seconds.
pub const DEFAULT_BACKOFF_FACTOR: f64 = 0.5;

/// Statuses retried by default: request timeout, conflict, too early,
/// rate limited, and the transient 5xx family.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 8] = [408, 409, 425, 429, 500, 502, 503, 504];

/// Backoff delays never exceed this many seconds.
const MAX_BACKOFF_SECS: f64 = 10.0;

/// Retry configuration shared by every request a client issues.
///
/// Note that the pipeline re-attempts any method whose response status is
/// listed here, including non-idempotent writes. Callers that need stricter
/// semantics for POST retries should narrow `retryable_statuses` or send an
/// idempotency key.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts per logical request, including the first. At least 1.
    pub max_attempts: u32,
    /// Multiplier for exponential backoff, in seconds. Must be positive.
    pub backoff_factor: f64,
    /// Status codes that trigger an automatic re-attempt.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
        }
    }
}

impl RetryConfig {
    pub fn is_retryable(&self, status: StatusCode) -> bool {
        self.retryable_statuses.contains(&status.as_u16())
    }

    /// Delay before the attempt following 1-indexed failed attempt
    /// `attempt`: `backoff_factor * 2^(attempt - 1)`, capped at 10 seconds.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(62) as i32;
        let exponential = self.backoff_factor * f64::powi(2.0, exponent);
        Duration::from_secs_f64(exponential.clamp(0.0, MAX_BACKOFF_SECS))
    }
}

/// Reads `Retry-After` as a float number of seconds. Unparsable or
/// out-of-range values are ignored in favor of computed backoff.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<f64> {
    let seconds = headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()?;
    (seconds.is_finite() && seconds >= 0.0).then_some(seconds)
}
