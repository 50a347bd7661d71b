//! Error taxonomy for the Stateset API client.
//!
//! Every failure surfaced by the crate is one variant of [`Error`], built
//! either from an API error payload or from a transport-level failure. The
//! wire shape for error payloads is
//! `{"type": str, "message": str, "code"?: str, "detail"?: str, "path"?: str}`;
//! unrecognized or undecodable payloads degrade to [`Error::Api`] rather
//! than failing to construct the error.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

pub type Result<T> = std::result::Result<T, Error>;

/// Context shared by every error variant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorDetails {
    /// Machine-readable error code from the API, when present.
    pub code: Option<String>,
    /// Additional human-readable detail from the API, when present.
    pub detail: Option<String>,
    /// Request path the error relates to.
    pub path: Option<String>,
    /// HTTP status code of the response, when the error came from one.
    pub status_code: Option<u16>,
    /// The decoded error payload as returned by the server.
    pub raw_response: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request was rejected as malformed (400, or an
    /// `invalid_request_error` payload).
    #[error("invalid request: {message}")]
    InvalidRequest {
        message: String,
        details: ErrorDetails,
    },

    /// Authentication failed (401, or a missing API key at construction).
    #[error("authentication failed: {message}")]
    Authentication {
        message: String,
        details: ErrorDetails,
    },

    /// The credentials are valid but do not grant access (403).
    #[error("permission denied: {message}")]
    Permission {
        message: String,
        details: ErrorDetails,
    },

    /// The requested resource does not exist (404).
    #[error("{message}")]
    NotFound {
        message: String,
        resource_type: Option<String>,
        resource_id: Option<String>,
        details: ErrorDetails,
    },

    /// The API asked us to slow down (429).
    #[error("{message}")]
    RateLimit {
        message: String,
        /// Seconds to wait before retrying, from the `Retry-After` header.
        retry_after: Option<f64>,
        details: ErrorDetails,
    },

    /// A network-level failure (timeout, DNS, refused connection) after
    /// retries were exhausted.
    #[error("connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
        details: ErrorDetails,
    },

    /// Fallback for any other non-success status or unrecognized payload
    /// `type`. Carries the original type string when the server sent one.
    #[error("[{error_type}] {message}")]
    Api {
        message: String,
        error_type: String,
        details: ErrorDetails,
    },
}

/// Error payload shape returned by the API.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(rename = "type")]
    error_type: Option<String>,
    message: Option<String>,
    code: Option<String>,
    detail: Option<String>,
    path: Option<String>,
}

impl Error {
    /// The wire-level type string for this error kind.
    pub fn kind(&self) -> &str {
        match self {
            Error::InvalidRequest { .. } => "invalid_request_error",
            Error::Authentication { .. } => "authentication_error",
            Error::Permission { .. } => "permission_error",
            Error::NotFound { .. } => "not_found_error",
            Error::RateLimit { .. } => "rate_limit_error",
            Error::Connection { .. } => "connection_error",
            Error::Api { error_type, .. } => error_type,
        }
    }

    pub fn details(&self) -> &ErrorDetails {
        match self {
            Error::InvalidRequest { details, .. }
            | Error::Authentication { details, .. }
            | Error::Permission { details, .. }
            | Error::NotFound { details, .. }
            | Error::RateLimit { details, .. }
            | Error::Connection { details, .. }
            | Error::Api { details, .. } => details,
        }
    }

    /// HTTP status code of the response this error was mapped from, if any.
    pub fn status_code(&self) -> Option<u16> {
        self.details().status_code
    }

    pub(crate) fn authentication(message: impl Into<String>) -> Self {
        Error::Authentication {
            message: message.into(),
            details: ErrorDetails::default(),
        }
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Error::InvalidRequest {
            message: message.into(),
            details: ErrorDetails::default(),
        }
    }

    pub(crate) fn connection(message: impl Into<String>, source: Option<reqwest::Error>) -> Self {
        Error::Connection {
            message: message.into(),
            source,
            details: ErrorDetails::default(),
        }
    }

    pub(crate) fn api(message: impl Into<String>, status_code: Option<u16>) -> Self {
        Error::Api {
            message: message.into(),
            error_type: "api_error".to_string(),
            details: ErrorDetails {
                status_code,
                ..ErrorDetails::default()
            },
        }
    }

    /// Builds a richer not-found error for a specific resource.
    pub fn not_found(resource_type: &str, resource_id: Option<&str>) -> Self {
        let message = match resource_id {
            Some(id) => format!("{resource_type} not found: {id}"),
            None => format!("{resource_type} not found"),
        };
        Error::NotFound {
            message,
            resource_type: Some(resource_type.to_string()),
            resource_id: resource_id.map(str::to_string),
            details: ErrorDetails::default(),
        }
    }

    /// Maps a non-success HTTP response to the matching error variant.
    ///
    /// The payload `type` field wins when it names a known kind; otherwise
    /// the status code decides. 429 always becomes [`Error::RateLimit`],
    /// whatever the body says. Undecodable bodies degrade to a generic
    /// API error carrying `HTTP <code> <reason>`.
    pub fn from_response(
        status: StatusCode,
        retry_after: Option<f64>,
        body: &[u8],
        path: Option<&str>,
    ) -> Self {
        let raw: Option<Value> = serde_json::from_slice(body).ok();
        let payload = raw
            .as_ref()
            .and_then(|value| serde_json::from_value::<ErrorPayload>(value.clone()).ok());

        let message = payload
            .as_ref()
            .and_then(|p| p.message.clone())
            .or_else(|| {
                if raw.is_some() {
                    return None;
                }
                std::str::from_utf8(body)
                    .ok()
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| {
                format!(
                    "HTTP {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("error")
                )
            });

        let details = ErrorDetails {
            code: payload.as_ref().and_then(|p| p.code.clone()),
            detail: payload.as_ref().and_then(|p| p.detail.clone()),
            path: payload
                .as_ref()
                .and_then(|p| p.path.clone())
                .or_else(|| path.map(str::to_string)),
            status_code: Some(status.as_u16()),
            raw_response: raw,
        };

        if status == StatusCode::TOO_MANY_REQUESTS {
            let message = match retry_after {
                Some(seconds) => format!("{message}. Retry after {seconds} seconds"),
                None => message,
            };
            return Error::RateLimit {
                message,
                retry_after,
                details,
            };
        }

        let wire_type = payload.as_ref().and_then(|p| p.error_type.clone());
        match wire_type.as_deref() {
            Some("invalid_request_error") => Error::InvalidRequest { message, details },
            Some("authentication_error") => Error::Authentication { message, details },
            Some("permission_error") => Error::Permission { message, details },
            Some("not_found_error") => Error::NotFound {
                message,
                resource_type: None,
                resource_id: None,
                details,
            },
            Some("connection_error") => Error::Connection {
                message,
                source: None,
                details,
            },
            Some(other) => Error::Api {
                message,
                error_type: other.to_string(),
                details,
            },
            None => match status {
                StatusCode::BAD_REQUEST => Error::InvalidRequest { message, details },
                StatusCode::UNAUTHORIZED => Error::Authentication { message, details },
                StatusCode::FORBIDDEN => Error::Permission { message, details },
                StatusCode::NOT_FOUND => Error::NotFound {
                    message,
                    resource_type: None,
                    resource_id: None,
                    details,
                },
                _ => Error::Api {
                    message,
                    error_type: "api_error".to_string(),
                    details,
                },
            },
        }
    }
}
