//! Client error types.
//!
//! Non-success responses are classified strictly by HTTP status. Each
//! classified status has its own response schema, decoded and validated here.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// 400: the request failed validation.
    #[error("Bad request: {reason}{}", format_details(.details))]
    BadRequest {
        /// Server supplied reason.
        reason: String,
        /// Per-field validation failures.
        details: Vec<String>,
    },

    /// 401: the credentials were missing or rejected.
    #[error("Could not authenticate the request: {reason}")]
    Unauthenticated {
        /// Server supplied reason.
        reason: String,
    },

    /// 403: the principal may not perform the operation.
    #[error("The request is not authorized.")]
    Forbidden,

    /// 404: the addressed resource does not exist.
    #[error("{resource_type} \"{id}\" not found.")]
    NotFound {
        /// Kind of resource, e.g. `Project`.
        resource_type: String,
        /// Identifier of the missing resource.
        id: String,
    },

    /// 409: the request conflicts with current server state.
    #[error("{reason}")]
    Conflict {
        /// Server supplied reason.
        reason: String,
    },

    /// 500: the server failed.
    #[error("An internal server error occurred.")]
    Internal,

    /// 501: the server does not support the operation.
    #[error("Request not supported: {details}")]
    NotSupported {
        /// Server supplied explanation.
        details: String,
    },

    /// Any other status that did not match the expected success status.
    #[error("received {status} from API server")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
    },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request path would leave the API address.
    #[error("Invalid request path: {0}")]
    InvalidPath(String),

    /// The request body cannot carry the version envelope.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Event stream failed without a status.
    #[error("Stream error: {0}")]
    Stream(String),

    /// Event stream connection was refused with a status.
    #[error("received {status} from the API server")]
    StreamStatus {
        /// HTTP status code.
        status: u16,
    },
}

impl Error {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this is an authentication or authorization error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Unauthenticated { .. } | Error::Forbidden)
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// HTTP status behind a classified error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::BadRequest { .. } => Some(400),
            Error::Unauthenticated { .. } => Some(401),
            Error::Forbidden => Some(403),
            Error::NotFound { .. } => Some(404),
            Error::Conflict { .. } => Some(409),
            Error::Internal => Some(500),
            Error::NotSupported { .. } => Some(501),
            Error::UnexpectedStatus { status } | Error::StreamStatus { status } => Some(*status),
            Error::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Classify a non-success response from its status and raw body.
    pub(crate) fn from_response(status: StatusCode, body: &str) -> Self {
        match status.as_u16() {
            400 => match parse_body::<BadRequestBody>(status, body) {
                Some(b) => Error::BadRequest {
                    reason: b.reason,
                    details: b.details.unwrap_or_default(),
                },
                None => Error::BadRequest {
                    reason: body.to_string(),
                    details: Vec::new(),
                },
            },
            401 => Error::Unauthenticated {
                reason: reason_or_raw(status, body),
            },
            403 => Error::Forbidden,
            404 => match parse_body::<NotFoundBody>(status, body) {
                Some(b) => Error::NotFound {
                    resource_type: b.resource_type,
                    id: b.id,
                },
                None => Error::NotFound {
                    resource_type: "Resource".to_string(),
                    id: body.to_string(),
                },
            },
            409 => Error::Conflict {
                reason: reason_or_raw(status, body),
            },
            500 => Error::Internal,
            501 => Error::NotSupported {
                details: parse_body::<NotSupportedBody>(status, body)
                    .map(|b| b.details)
                    .unwrap_or_else(|| body.to_string()),
            },
            other => Error::UnexpectedStatus { status: other },
        }
    }
}

fn format_details(details: &[String]) -> String {
    details
        .iter()
        .enumerate()
        .map(|(i, detail)| format!("\n  {}. {}", i, detail))
        .collect()
}

fn reason_or_raw(status: StatusCode, body: &str) -> String {
    parse_body::<ReasonBody>(status, body)
        .map(|b| b.reason)
        .unwrap_or_else(|| body.to_string())
}

fn parse_body<T: serde::de::DeserializeOwned>(status: StatusCode, body: &str) -> Option<T> {
    match serde_json::from_str(body) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(status = status.as_u16(), error = %e, "Malformed error response body");
            None
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Body of a 400 response.
#[derive(Debug, Deserialize)]
struct BadRequestBody {
    reason: String,
    /// Absent and `null` both mean no details.
    #[serde(default)]
    details: Option<Vec<String>>,
}

/// Body of 401 and 409 responses.
#[derive(Debug, Deserialize)]
struct ReasonBody {
    reason: String,
}

/// Body of a 404 response.
#[derive(Debug, Deserialize)]
struct NotFoundBody {
    #[serde(rename = "type")]
    resource_type: String,
    id: String,
}

/// Body of a 501 response.
#[derive(Debug, Deserialize)]
struct NotSupportedBody {
    details: String,
}
