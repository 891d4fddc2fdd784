//! Request builder, dispatcher and response classifier for the provider API.
//!
//! # Design
//! `ApiClient` holds only its `ClientConfig` and a shared `Transport`; it
//! carries no mutable state between calls and is safe to clone and share
//! across threads. Every call is split the same way:
//! - `build_request` turns a `RequestDescriptor` into an `HttpRequest`
//!   (deterministic, no I/O),
//! - the transport performs the round-trip,
//! - `parse_response` turns the `HttpResponse` into the caller's type or a
//!   typed `ApiError`.
//!
//! The caller picks the expected shape through `T` (`ItemResponse<_>`,
//! `ListResponse<_>`, a raw struct, `()`); the payload is never probed to
//! guess it.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::casing::{keys_to_camel, keys_to_snake, to_snake_case, DEFAULT_PASSTHROUGH_KEYS};
use crate::config::ClientConfig;
use crate::error::{ApiError, ErrorBody, ErrorKind};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::request::{RequestDescriptor, METADATA_PAIR_PARAM};

pub const USER_AGENT: &str = concat!("nylas-rust/", env!("CARGO_PKG_VERSION"));

const CONTENT_TYPE: &str = "Content-Type";
const JSON: &str = "application/json";

#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// Client using the blocking `ureq` transport.
    #[cfg(feature = "ureq")]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, crate::http::UreqTransport::new())
    }

    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self {
            config,
            transport: Arc::new(transport),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build, send and decode one request.
    pub fn request<T: DeserializeOwned>(&self, descriptor: &RequestDescriptor) -> Result<T, ApiError> {
        let request = self.build_request(descriptor)?;
        debug!(method = %request.method, path = %descriptor.path, "dispatching request");
        let response = self.transport.execute(&request)?;
        self.parse_response(descriptor, response)
    }

    pub fn build_request(&self, descriptor: &RequestDescriptor) -> Result<HttpRequest, ApiError> {
        if descriptor.path.is_empty() {
            return Err(ApiError::InvalidRequest("request path is empty".to_string()));
        }

        let base = descriptor
            .overrides
            .server_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or_else(|| self.config.base_url());
        let separator = if descriptor.path.starts_with('/') { "" } else { "/" };
        let mut url = Url::parse(&format!("{base}{separator}{}", descriptor.path))?;

        let pairs = query_pairs(&descriptor.query_params);
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let mut headers = self.default_headers(descriptor);
        for (name, value) in descriptor.overrides.headers.iter().chain(&descriptor.headers) {
            set_header(&mut headers, name, value);
        }

        let body = match &descriptor.body {
            Some(body) => {
                let wire = keys_to_snake(body.clone(), &passthrough_keys(descriptor));
                let text = serde_json::to_string(&wire).map_err(|e| ApiError::Serialization(e.to_string()))?;
                set_header(&mut headers, CONTENT_TYPE, JSON);
                Some(text)
            }
            None => {
                headers.retain(|(name, _)| !name.eq_ignore_ascii_case(CONTENT_TYPE));
                None
            }
        };

        Ok(HttpRequest {
            method: descriptor.method,
            url: url.into(),
            headers,
            body,
            timeout: descriptor.overrides.timeout.unwrap_or(self.config.timeout),
        })
    }

    pub fn parse_response<T: DeserializeOwned>(
        &self,
        descriptor: &RequestDescriptor,
        response: HttpResponse,
    ) -> Result<T, ApiError> {
        if response.status >= 300 {
            return Err(classify_error(descriptor, response));
        }

        if response.status == 204 || response.body.trim().is_empty() {
            return decode(Value::Null);
        }

        let value: Value = serde_json::from_str(&response.body).map_err(|e| ApiError::Parse {
            status: response.status,
            message: e.to_string(),
            raw: response.body.clone(),
        })?;
        decode(keys_to_camel(value, &passthrough_keys(descriptor)))
    }

    fn default_headers(&self, descriptor: &RequestDescriptor) -> Vec<(String, String)> {
        let api_key = descriptor
            .overrides
            .api_key
            .as_deref()
            .unwrap_or(&self.config.api_key);
        vec![
            ("Accept".to_string(), JSON.to_string()),
            ("User-Agent".to_string(), USER_AGENT.to_string()),
            ("Authorization".to_string(), format!("Bearer {api_key}")),
        ]
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient").field("config", &self.config).finish_non_exhaustive()
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).execute(request)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Map a non-success response to `Auth`, `TokenValidation` or `Api`.
fn classify_error(descriptor: &RequestDescriptor, response: HttpResponse) -> ApiError {
    let status = response.status;
    let value: Value = match serde_json::from_str(&response.body) {
        Ok(value) => value,
        Err(e) => {
            warn!(status, path = %descriptor.path, "error response is not JSON");
            return ApiError::Parse {
                status,
                message: e.to_string(),
                raw: response.body,
            };
        }
    };

    let body = ErrorBody::from_value(keys_to_camel(value, &passthrough_keys(descriptor)));
    let err = body.into_provider_error(status);
    warn!(
        status,
        path = %descriptor.path,
        request_id = err.request_id.as_deref().unwrap_or("-"),
        "provider returned an error"
    );
    ErrorKind::for_path(&descriptor.path).into_error(err)
}

fn passthrough_keys(descriptor: &RequestDescriptor) -> Vec<&str> {
    DEFAULT_PASSTHROUGH_KEYS
        .iter()
        .copied()
        .chain(descriptor.passthrough_keys.iter().map(String::as_str))
        .collect()
}

/// Replace a header case-insensitively, or append it.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: &str) {
    match headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        Some(slot) => {
            slot.0 = name.to_string();
            slot.1 = value.to_string();
        }
        None => headers.push((name.to_string(), value.to_string())),
    }
}

/// Render query params as wire pairs.
///
/// Keys are snake_cased. `metadataPair` takes a map and becomes a single
/// `metadata_pair` parameter of comma-joined `key:value` entries, keys left
/// as given. `null` values are dropped.
fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len());
    for (key, value) in params {
        let wire_key = to_snake_case(key);
        if key == METADATA_PAIR_PARAM || wire_key == "metadata_pair" {
            if let Some(rendered) = render_metadata_pair(value) {
                pairs.push((wire_key, rendered));
            }
            continue;
        }
        if let Some(rendered) = render_query_value(value) {
            pairs.push((wire_key, rendered));
        }
    }
    pairs
}

fn render_metadata_pair(value: &Value) -> Option<String> {
    match value {
        Value::Object(entries) if entries.is_empty() => None,
        Value::Object(entries) => Some(
            entries
                .iter()
                .map(|(k, v)| format!("{k}:{}", render_scalar(v)))
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => render_query_value(other),
    }
}

fn render_query_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Array(items) => Some(
            items
                .iter()
                .filter(|item| !item.is_null())
                .map(render_scalar)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(render_scalar(other)),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
