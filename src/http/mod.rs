//! HTTP request pipeline with retry logic and error mapping.

mod requestor;
mod retry;

pub use requestor::{Body, Execute, RequestOptions, Requestor, ResponseBody};
pub use retry::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRYABLE_STATUSES, RetryConfig,
    parse_retry_after,
};

#[cfg(test)]
pub use requestor::MockExecute;
