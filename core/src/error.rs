//! Error types for the provider API client.
//!
//! # Design
//! Failures fall into three groups that callers typically branch on:
//! - no response at all (`Timeout`, `Transport`),
//! - a response whose body could not be read as JSON (`Parse`),
//! - a well-formed provider error, split by endpoint family into `Auth`,
//!   `TokenValidation` and `Api`. All three carry the same `ProviderError`
//!   fields decoded from the camelCased error body.
//!
//! The remaining variants cover local failures while building a request or
//! decoding a successful payload into the caller's type.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Fields the provider reports for a failed request.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderError {
    /// HTTP status code of the response.
    pub status: u16,
    pub request_id: Option<String>,
    /// Provider error type, e.g. `invalid_request_error` or `invalid_grant`.
    pub error_type: Option<String>,
    pub message: String,
    /// Upstream provider detail, forwarded verbatim when present.
    pub provider_error: Option<Value>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(error_type) = &self.error_type {
            write!(f, " {error_type}")?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(request_id) = &self.request_id {
            write!(f, " (request id {request_id})")?;
        }
        Ok(())
    }
}

/// Errors returned by `ApiClient` and every resource built on it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response arrived before the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be delivered (DNS, connect, TLS, I/O).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was expected to be JSON but was not.
    #[error("failed to parse response (HTTP {status}): {message}; body: {raw}")]
    Parse { status: u16, message: String, raw: String },

    /// Error response from a token exchange or revocation endpoint.
    #[error("auth error: {0}")]
    Auth(ProviderError),

    /// Error response from the token introspection endpoint.
    #[error("token validation error: {0}")]
    TokenValidation(ProviderError),

    /// Error response from any other endpoint.
    #[error("API error: {0}")]
    Api(ProviderError),

    /// The request body or query could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A successful payload did not match the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The call was rejected locally before anything was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// The provider-reported fields, for the three provider error kinds.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            ApiError::Auth(err) | ApiError::TokenValidation(err) | ApiError::Api(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ApiError::Timeout(_))
    }

    /// Status code of the response that produced this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Parse { status, .. } => Some(*status),
            _ => self.provider_error().map(|err| err.status),
        }
    }
}

/// Which endpoint family a failed request belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Auth,
    TokenValidation,
    Api,
}

impl ErrorKind {
    /// Classify by request path.
    ///
    /// `connect/tokeninfo` is checked first since it also contains
    /// `connect/token`.
    pub fn for_path(path: &str) -> Self {
        if path.contains("connect/tokeninfo") {
            ErrorKind::TokenValidation
        } else if path.contains("connect/token") || path.contains("connect/revoke") {
            ErrorKind::Auth
        } else {
            ErrorKind::Api
        }
    }

    pub fn into_error(self, err: ProviderError) -> ApiError {
        match self {
            ErrorKind::Auth => ApiError::Auth(err),
            ErrorKind::TokenValidation => ApiError::TokenValidation(err),
            ErrorKind::Api => ApiError::Api(err),
        }
    }
}

/// Error body after camelCasing. The provider uses three layouts:
/// flat (`type`, `message`), nested (`error: { type, message }`) and the
/// OAuth layout (`error: "invalid_grant"`, `errorDescription`).
///
/// Fields are read leniently from any JSON value: ids and types of other
/// JSON types are stringified, and a message that is not a string is
/// ignored in favour of the generic one.
#[derive(Debug, Default)]
pub(crate) struct ErrorBody {
    request_id: Option<String>,
    error_type: Option<String>,
    message: Option<String>,
    error: Option<Value>,
    error_description: Option<String>,
    error_code: Option<Value>,
    provider_error: Option<Value>,
}

impl ErrorBody {
    pub(crate) fn from_value(value: Value) -> Self {
        let mut fields = match value {
            Value::Object(fields) => fields,
            Value::String(message) => {
                return Self {
                    message: Some(message),
                    ..Self::default()
                }
            }
            _ => return Self::default(),
        };
        Self {
            request_id: fields.remove("requestId").and_then(stringify),
            error_type: fields.remove("type").and_then(stringify),
            message: fields.remove("message").and_then(text),
            error: fields.remove("error").filter(|v| !v.is_null()),
            error_description: fields.remove("errorDescription").and_then(text),
            error_code: fields.remove("errorCode").filter(|v| !v.is_null()),
            provider_error: fields.remove("providerError").filter(|v| !v.is_null()),
        }
    }

    pub(crate) fn into_provider_error(self, status: u16) -> ProviderError {
        let mut error_type = self.error_type;
        let mut message = self.message.or(self.error_description);
        let mut provider_error = self.provider_error;

        match self.error {
            Some(Value::Object(mut detail)) => {
                if let Some(t) = detail.remove("type").and_then(stringify) {
                    error_type = error_type.or(Some(t));
                }
                if let Some(Value::String(m)) = detail.remove("message") {
                    message = message.or(Some(m));
                }
                provider_error = provider_error.or_else(|| detail.remove("providerError"));
            }
            Some(Value::String(code)) => error_type = error_type.or(Some(code)),
            _ => {}
        }

        if error_type.is_none() {
            error_type = self.error_code.and_then(stringify);
        }

        ProviderError {
            status,
            request_id: self.request_id,
            error_type,
            message: message.unwrap_or_else(|| format!("request failed with status {status}")),
            provider_error,
        }
    }
}

fn text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn stringify(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(body: Value, status: u16) -> ProviderError {
        ErrorBody::from_value(body).into_provider_error(status)
    }

    #[test]
    fn flat_error_body() {
        let err = decode(json!({ "requestId": "r1", "type": "auth_error", "message": "bad token" }), 401);
        assert_eq!(err.request_id.as_deref(), Some("r1"));
        assert_eq!(err.error_type.as_deref(), Some("auth_error"));
        assert_eq!(err.message, "bad token");
        assert_eq!(err.status, 401);
    }

    #[test]
    fn nested_error_body() {
        let err = decode(
            json!({
                "requestId": "r2",
                "error": {
                    "type": "not_found_error",
                    "message": "calendar not found",
                    "providerError": { "code": 404 },
                },
            }),
            404,
        );
        assert_eq!(err.error_type.as_deref(), Some("not_found_error"));
        assert_eq!(err.message, "calendar not found");
        assert_eq!(err.provider_error, Some(json!({ "code": 404 })));
    }

    #[test]
    fn oauth_error_body() {
        let err = decode(
            json!({
                "requestId": "r3",
                "error": "invalid_grant",
                "errorDescription": "code expired",
                "errorCode": 100,
            }),
            400,
        );
        assert_eq!(err.error_type.as_deref(), Some("invalid_grant"));
        assert_eq!(err.message, "code expired");
    }

    #[test]
    fn empty_error_body_gets_generic_message() {
        let err = decode(json!({}), 500);
        assert_eq!(err.message, "request failed with status 500");
        assert!(err.request_id.is_none());
    }

    #[test]
    fn mistyped_fields_are_read_leniently() {
        let err = decode(
            json!({ "requestId": 123, "type": 7, "message": { "text": "nested" }, "errorDescription": false }),
            401,
        );
        assert_eq!(err.request_id.as_deref(), Some("123"));
        assert_eq!(err.error_type.as_deref(), Some("7"));
        assert_eq!(err.message, "request failed with status 401");
    }

    #[test]
    fn bare_string_body_becomes_the_message() {
        let err = decode(json!("unauthorized"), 401);
        assert_eq!(err.message, "unauthorized");
        assert!(err.error_type.is_none());

        let err = decode(json!([1, 2]), 500);
        assert_eq!(err.message, "request failed with status 500");
    }

    #[test]
    fn tokeninfo_is_not_an_auth_path() {
        assert_eq!(ErrorKind::for_path("/v3/connect/tokeninfo"), ErrorKind::TokenValidation);
        assert_eq!(ErrorKind::for_path("/v3/connect/token"), ErrorKind::Auth);
        assert_eq!(ErrorKind::for_path("/v3/connect/revoke"), ErrorKind::Auth);
        assert_eq!(ErrorKind::for_path("/v3/grants/g1/calendars"), ErrorKind::Api);
    }

    #[test]
    fn display_includes_request_id() {
        let err = ApiError::Api(decode(json!({ "requestId": "r9", "type": "x", "message": "boom" }), 400));
        let text = err.to_string();
        assert!(text.contains("boom"));
        assert!(text.contains("r9"));
        assert_eq!(err.status(), Some(400));
    }
}
