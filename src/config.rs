//! Client configuration. Built once, never mutated: per-call header
//! overrides are merged transiently by the request pipeline.

use std::time::Duration;

use crate::http::RetryConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.stateset.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a [`Stateset`](crate::Stateset) client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Bearer token rendered into the `Authorization` header. Must be
    /// non-empty.
    pub api_key: String,
    /// Base URL all request paths are resolved against.
    pub base_url: String,
    /// Per-request transport timeout.
    pub timeout: Duration,
    pub retry: RetryConfig,
    /// Extra default headers sent on every request, e.g. a tenant id.
    pub additional_headers: Vec<(String, String)>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryConfig::default(),
            additional_headers: Vec::new(),
        }
    }

    /// Reads configuration from `STATESET_API_KEY`, `STATESET_BASE_URL`,
    /// and `STATESET_TIMEOUT` (seconds). Only the key is required; the
    /// missing-key error is surfaced later, at client construction.
    pub fn from_env() -> Self {
        let mut config = Self::new(std::env::var("STATESET_API_KEY").unwrap_or_default());
        if let Ok(base_url) = std::env::var("STATESET_BASE_URL") {
            config.base_url = base_url;
        }
        if let Some(timeout) = std::env::var("STATESET_TIMEOUT")
            .ok()
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs > 0.0)
        {
            config.timeout = Duration::from_secs_f64(timeout);
        }
        config
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional_headers.push((name.into(), value.into()));
        self
    }
}
