//! The request pipeline: header merge, body handling, bounded retries with
//! exponential backoff, and status-to-error mapping.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::retry::{RetryConfig, parse_retry_after};
use crate::config::ClientConfig;
use crate::error::{Error, Result};

const USER_AGENT_VALUE: &str = concat!("stateset-rust/", env!("CARGO_PKG_VERSION"));

/// Request body, chosen by the caller or inferred from a loose JSON value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    None,
    /// Serialized as JSON with `Content-Type: application/json`.
    Json(Value),
    /// URL-form-encoded with `Content-Type: application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Passed through untouched.
    Raw(Vec<u8>),
}

impl Body {
    /// Infers the body kind from an ambiguous value: an object is sent as
    /// JSON, a sequence of `(string, value)` pairs is form-encoded, and any
    /// other sequence is sent as a JSON array.
    pub fn infer(data: Value) -> Body {
        match data {
            Value::Array(ref items) if is_pair_sequence(items) => {
                let pairs = items
                    .iter()
                    .filter_map(|item| item.as_array())
                    .map(|pair| (stringify(&pair[0]), stringify(&pair[1])))
                    .collect();
                Body::Form(pairs)
            }
            other => Body::Json(other),
        }
    }
}

fn is_pair_sequence(items: &[Value]) -> bool {
    items.iter().all(|item| match item {
        Value::Array(pair) => pair.len() == 2 && pair[0].is_string(),
        _ => false,
    })
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Per-call options for [`Requestor::request`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestOptions {
    pub params: Vec<(String, String)>,
    pub body: Body,
    /// Headers merged over the client defaults, case-insensitively.
    pub headers: Vec<(String, String)>,
    /// Overrides the default "2xx is success" rule when set.
    pub expected: Option<Vec<u16>>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    pub fn json(mut self, value: Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn expected(mut self, codes: &[u16]) -> Self {
        self.expected = Some(codes.to_vec());
        self
    }
}

/// Deserialized response body: JSON when the `Content-Type` says so, text
/// for anything else with content, empty for 204 or zero-length bodies.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

impl ResponseBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseBody::Empty)
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Deserializes the body into `T`. An empty body deserializes as JSON
    /// `null`, so `Option<T>` targets accept it.
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        let value = match self {
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
            ResponseBody::Empty => Value::Null,
        };
        serde_json::from_value(value)
            .map_err(|err| Error::api(format!("failed to decode response body: {err}"), None))
    }
}

/// Transport seam between the resource layer and the request pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody>;
}

/// Executes logical HTTP calls with bounded retries against a base URL.
///
/// Cheap to clone; the underlying transport pools connections and is safe
/// for concurrent use. Each call's retry counter is local, so many requests
/// may be in flight at once, each retrying independently.
#[derive(Clone, Debug)]
pub struct Requestor {
    client: Client,
    base_url: String,
    default_headers: HeaderMap,
    retry: RetryConfig,
}

impl Requestor {
    /// Builds a requestor from the client configuration. Fails before any
    /// network activity when the API key is empty or a configured header is
    /// not a valid header name/value.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::authentication(
                "an API key is required to construct the client",
            ));
        }

        let mut default_headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| Error::authentication("the API key is not a valid header value"))?;
        auth.set_sensitive(true);
        default_headers.insert(AUTHORIZATION, auth);
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &config.additional_headers {
            let (name, value) = parse_header(name, value)?;
            default_headers.insert(name, value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| Error::connection("failed to build the HTTP transport", Some(err)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            default_headers,
            retry: config.retry.clone(),
        })
    }

    /// Executes one logical call: issues up to `max_attempts` HTTP requests,
    /// sleeping per the backoff policy between attempts, and maps failures
    /// into the error taxonomy. Retry attempts are invisible to the caller
    /// except as added latency.
    #[tracing::instrument(skip(self, options), fields(method = %method, path = path))]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody> {
        let url = self.url_for(path);
        let headers = self.merge_headers(&options.headers)?;
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt: u32 = 1;

        debug!("{} {}", method, url);

        loop {
            let response = match self.send_once(&method, &url, &options, headers.clone()).await {
                Ok(response) => response,
                Err(err) => {
                    if attempt >= max_attempts {
                        return Err(Error::connection("failed to reach the Stateset API", Some(err)));
                    }
                    let delay = self.retry.backoff_delay(attempt);
                    warn!(
                        "{} {}: attempt {}/{} failed ({}), retrying in {:.1?}...",
                        method, path, attempt, max_attempts, err, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                    continue;
                }
            };

            let status = response.status();
            if is_expected(status, options.expected.as_deref()) {
                return deserialize_response(response).await;
            }

            if self.retry.is_retryable(status) && attempt < max_attempts {
                let delay = if status == StatusCode::TOO_MANY_REQUESTS {
                    parse_retry_after(response.headers())
                        .map(Duration::from_secs_f64)
                        .unwrap_or_else(|| self.retry.backoff_delay(attempt))
                } else {
                    self.retry.backoff_delay(attempt)
                };
                warn!(
                    "{} {}: status {} on attempt {}/{}, retrying in {:.1?}...",
                    method, path, status, attempt, max_attempts, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
                continue;
            }

            let retry_after = (status == StatusCode::TOO_MANY_REQUESTS)
                .then(|| parse_retry_after(response.headers()))
                .flatten();
            let body = response.bytes().await.unwrap_or_default();
            return Err(Error::from_response(status, retry_after, &body, Some(path)));
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &str,
        options: &RequestOptions,
        headers: HeaderMap,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let mut builder = self.client.request(method.clone(), url).headers(headers);
        if !options.params.is_empty() {
            builder = builder.query(&options.params);
        }
        builder = match &options.body {
            Body::None => builder,
            Body::Json(value) => builder.json(value),
            Body::Form(pairs) => builder.form(pairs),
            Body::Raw(bytes) => builder.body(bytes.clone()),
        };
        builder.send().await
    }

    /// Effective headers for one call: the client defaults overridden by
    /// per-call headers. Header names match case-insensitively.
    fn merge_headers(&self, overrides: &[(String, String)]) -> Result<HeaderMap> {
        let mut merged = self.default_headers.clone();
        for (name, value) in overrides {
            let (name, value) = parse_header(name, value)?;
            merged.insert(name, value);
        }
        Ok(merged)
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Execute for Requestor {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody> {
        self.request(method, path, options).await
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| Error::invalid_request(format!("invalid header name: {name}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|_| Error::invalid_request(format!("invalid value for header {name}")))?;
    Ok((name, value))
}

fn is_expected(status: StatusCode, expected: Option<&[u16]>) -> bool {
    match expected {
        Some(codes) => codes.contains(&status.as_u16()),
        None => status.is_success(),
    }
}

async fn deserialize_response(response: reqwest::Response) -> Result<ResponseBody> {
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return Ok(ResponseBody::Empty);
    }

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));

    let bytes = response
        .bytes()
        .await
        .map_err(|err| Error::connection("failed to read the response body", Some(err)))?;
    if bytes.is_empty() {
        return Ok(ResponseBody::Empty);
    }

    if is_json {
        let value = serde_json::from_slice(&bytes).map_err(|err| {
            Error::api(
                format!("failed to decode JSON response: {err}"),
                Some(status.as_u16()),
            )
        })?;
        return Ok(ResponseBody::Json(value));
    }

    Ok(ResponseBody::Text(String::from_utf8_lossy(&bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn requestor(base_url: &str) -> Requestor {
        let config = ClientConfig::new("test-key").base_url(base_url);
        Requestor::new(&config).unwrap()
    }

    #[test]
    fn test_empty_api_key_fails_at_construction() {
        let config = ClientConfig::new("  ");
        let err = Requestor::new(&config).unwrap_err();
        assert!(matches!(err, Error::Authentication { .. }));
    }

    #[test]
    fn test_default_headers_present() {
        let requestor = requestor("https://api.test");
        let headers = requestor.merge_headers(&[]).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer test-key");
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(headers.get(USER_AGENT).unwrap(), USER_AGENT_VALUE);
    }

    #[test]
    fn test_merge_headers_caller_override_wins() {
        let requestor = requestor("https://api.test");
        let overrides = vec![("AUTHORIZATION".to_string(), "Bearer other".to_string())];
        let headers = requestor.merge_headers(&overrides).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer other");
        // Untouched defaults survive the merge.
        assert_eq!(headers.get(ACCEPT).unwrap(), "application/json");
    }

    #[test]
    fn test_configured_headers_survive_unless_overridden() {
        let config = ClientConfig::new("test-key").header("X-Tenant", "acme");
        let requestor = Requestor::new(&config).unwrap();
        let headers = requestor.merge_headers(&[]).unwrap();
        assert_eq!(headers.get("x-tenant").unwrap(), "acme");

        let overrides = vec![("x-tenant".to_string(), "globex".to_string())];
        let headers = requestor.merge_headers(&overrides).unwrap();
        assert_eq!(headers.get("x-tenant").unwrap(), "globex");
    }

    #[test]
    fn test_url_for_joins_base_and_path() {
        let requestor = requestor("https://api.test/");
        assert_eq!(requestor.url_for("orders"), "https://api.test/orders");
        assert_eq!(requestor.url_for("/orders/42"), "https://api.test/orders/42");
    }

    #[test]
    fn test_body_infer_object_is_json() {
        let body = Body::infer(json!({"name": "widget"}));
        assert_eq!(body, Body::Json(json!({"name": "widget"})));
    }

    #[test]
    fn test_body_infer_pair_sequence_is_form() {
        let body = Body::infer(json!([["status", "open"], ["limit", 10]]));
        assert_eq!(
            body,
            Body::Form(vec![
                ("status".to_string(), "open".to_string()),
                ("limit".to_string(), "10".to_string()),
            ])
        );
    }

    #[test]
    fn test_body_infer_other_sequence_is_json_array() {
        let body = Body::infer(json!(["a", "b", "c"]));
        assert_eq!(body, Body::Json(json!(["a", "b", "c"])));

        // Pairs whose first element is not a string stay JSON.
        let body = Body::infer(json!([[1, 2], [3, 4]]));
        assert_eq!(body, Body::Json(json!([[1, 2], [3, 4]])));
    }

    #[test]
    fn test_is_expected_default_2xx() {
        assert!(is_expected(StatusCode::OK, None));
        assert!(is_expected(StatusCode::NO_CONTENT, None));
        assert!(!is_expected(StatusCode::CONFLICT, None));
    }

    #[test]
    fn test_is_expected_override() {
        assert!(is_expected(StatusCode::CONFLICT, Some(&[409])));
        assert!(!is_expected(StatusCode::OK, Some(&[409])));
    }

    #[test]
    fn test_response_body_json_decodes_empty_as_null() {
        let value: Option<String> = ResponseBody::Empty.json().unwrap();
        assert_eq!(value, None);

        let value: Value = ResponseBody::Empty.json().unwrap();
        assert_eq!(value, Value::Null);
    }
}
