//! Logical request descriptors.
//!
//! A `RequestDescriptor` names one call: method, path, optional query, body,
//! headers and overrides. Query params and body are held in the caller's
//! camelCase; `ApiClient::build_request` converts them for the wire.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::Overrides;
use crate::error::ApiError;
use crate::http::HttpMethod;

/// Query parameter holding a key -> value map rendered as `key:value`.
pub const METADATA_PAIR_PARAM: &str = "metadataPair";

#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub query_params: Map<String, Value>,
    pub body: Option<Value>,
    pub overrides: Overrides,
    /// Keys whose children are sent and returned without re-casing, on top
    /// of `casing::DEFAULT_PASSTHROUGH_KEYS`.
    pub passthrough_keys: Vec<String>,
}

impl RequestDescriptor {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            query_params: Map::new(),
            body: None,
            overrides: Overrides::default(),
            passthrough_keys: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    pub fn query_params(mut self, params: Map<String, Value>) -> Self {
        self.query_params.extend(params);
        self
    }

    /// Merge the fields of a serializable struct into the query params.
    /// `None` fields serialize to `null` and are dropped.
    pub fn query<Q: Serialize>(self, query: &Q) -> Result<Self, ApiError> {
        Ok(self.query_params(query_map(query)?))
    }

    pub fn json_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn body<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(self.json_body(value))
    }

    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn passthrough_key(mut self, key: impl Into<String>) -> Self {
        self.passthrough_keys.push(key.into());
        self
    }
}

/// Serialize a query struct to its params; `null` means none.
pub(crate) fn query_map<Q: Serialize + ?Sized>(query: &Q) -> Result<Map<String, Value>, ApiError> {
    match serde_json::to_value(query).map_err(|e| ApiError::Serialization(e.to_string()))? {
        Value::Object(params) => Ok(params),
        Value::Null => Ok(Map::new()),
        other => Err(ApiError::Serialization(format!(
            "query params must serialize to an object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct ListQuery {
        calendar_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        limit: Option<u32>,
    }

    #[test]
    fn query_struct_merges_into_params() {
        let desc = RequestDescriptor::get("/v3/grants/g1/events")
            .query(&ListQuery {
                calendar_id: "primary".to_string(),
                limit: Some(5),
            })
            .unwrap();
        assert_eq!(desc.query_params["calendarId"], "primary");
        assert_eq!(desc.query_params["limit"], 5);
    }

    #[test]
    fn query_rejects_non_object() {
        let err = RequestDescriptor::get("/x").query(&vec![1, 2]).unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)));
    }

    #[test]
    fn body_is_stored_as_json() {
        let desc = RequestDescriptor::post("/v3/webhooks")
            .body(&json!({ "webhookUrl": "https://example.com" }))
            .unwrap();
        assert_eq!(desc.method, HttpMethod::Post);
        assert_eq!(desc.body, Some(json!({ "webhookUrl": "https://example.com" })));
    }
}
