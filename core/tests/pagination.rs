//! Cursor pagination against a scripted transport.
//!
//! # Design
//! `Scripted` hands out canned responses in order and records every request
//! it sees, so tests can assert both what the iterator yields and exactly
//! which requests it made.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use nylas_core::{
    ApiClient, ApiError, ClientConfig, HttpRequest, HttpResponse, Resource, ResourceRequest, Transport,
};
use serde::Deserialize;
use serde_json::json;
use url::Url;

#[derive(Default)]
struct Scripted {
    responses: Mutex<VecDeque<HttpResponse>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl Scripted {
    fn new(responses: impl IntoIterator<Item = HttpResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl Transport for Scripted {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        self.seen.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::Transport("script exhausted".to_string()))
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    id: u32,
}

/// A list page of `count` items starting at `first`.
fn page(first: u32, count: u32, cursor: Option<&str>) -> HttpResponse {
    let data: Vec<_> = (first..first + count).map(|id| json!({ "id": id })).collect();
    let mut body = json!({ "request_id": format!("req-{first}"), "data": data });
    if let Some(cursor) = cursor {
        body["next_cursor"] = json!(cursor);
    }
    HttpResponse::new(200, body.to_string())
}

fn resource(transport: &Arc<Scripted>) -> Resource {
    let client = ApiClient::with_transport(
        ClientConfig::new("key").with_server_url("https://api.test.com"),
        Arc::clone(transport),
    );
    Resource::new(client)
}

fn query(req: &HttpRequest, key: &str) -> Option<String> {
    Url::parse(&req.url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[test]
fn iterates_every_page_in_order() {
    let transport = Scripted::new([page(0, 10, Some("c1")), page(10, 10, Some("c2")), page(20, 5, None)]);
    let pages: Vec<_> = resource(&transport)
        .list::<Item>(ResourceRequest::new("/v3/items"))
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(pages.len(), 3);
    let ids: Vec<u32> = pages.iter().flat_map(|p| p.data.iter().map(|i| i.id)).collect();
    assert_eq!(ids, (0..25).collect::<Vec<_>>());

    let requests = transport.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(query(&requests[0], "page_token"), None);
    assert_eq!(query(&requests[1], "page_token").as_deref(), Some("c1"));
    assert_eq!(query(&requests[2], "page_token").as_deref(), Some("c2"));
}

#[test]
fn limit_is_filled_across_pages_and_capped() {
    let transport = Scripted::new([page(0, 10, Some("c1")), page(10, 10, Some("c2"))]);
    let items = resource(&transport)
        .list::<Item>(ResourceRequest::new("/v3/items").query_param("limit", 15))
        .collect_all()
        .unwrap();

    assert_eq!(items.len(), 15);
    assert_eq!(items.last(), Some(&Item { id: 14 }));

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(query(&requests[0], "limit").as_deref(), Some("15"));
    assert_eq!(query(&requests[1], "limit").as_deref(), Some("5"));
    assert_eq!(query(&requests[1], "page_token").as_deref(), Some("c1"));
}

#[test]
fn float_limit_is_sent_as_an_integer_and_capped() {
    let transport = Scripted::new([page(0, 10, Some("c1")), page(10, 10, Some("c2"))]);
    let items = resource(&transport)
        .list::<Item>(ResourceRequest::new("/v3/items").query_param("limit", 15.0))
        .collect_all()
        .unwrap();

    assert_eq!(items.len(), 15);
    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(query(&requests[0], "limit").as_deref(), Some("15"));
    assert_eq!(query(&requests[1], "limit").as_deref(), Some("5"));
}

#[test]
fn limit_stops_early_when_cursor_runs_out() {
    let transport = Scripted::new([page(0, 4, Some("c1")), page(4, 3, None)]);
    let first = resource(&transport)
        .list::<Item>(ResourceRequest::new("/v3/items").query_param("limit", 20))
        .send()
        .unwrap();

    assert_eq!(first.data.len(), 7);
    assert!(!first.has_more());
    assert_eq!(transport.requests().len(), 2);
}

#[test]
fn failure_mid_iteration_is_reported_and_ends_iteration() {
    let failure = HttpResponse::new(
        500,
        json!({ "request_id": "boom", "error": { "type": "api_error", "message": "server fell over" } }).to_string(),
    );
    let transport = Scripted::new([page(0, 10, Some("c1")), failure]);
    let mut pages = resource(&transport)
        .list::<Item>(ResourceRequest::new("/v3/items"))
        .into_iter();

    assert_eq!(pages.next().unwrap().unwrap().data.len(), 10);
    let err = pages.next().unwrap().unwrap_err();
    assert_eq!(err.provider_error().unwrap().request_id.as_deref(), Some("boom"));
    assert!(pages.next().is_none());
    assert_eq!(transport.requests().len(), 2);
}

#[test]
fn collect_all_returns_no_partial_results_on_failure() {
    let transport = Scripted::new([page(0, 10, Some("c1")), HttpResponse::new(502, "Bad Gateway")]);
    let err = resource(&transport)
        .list::<Item>(ResourceRequest::new("/v3/items"))
        .collect_all()
        .unwrap_err();

    assert!(matches!(err, ApiError::Parse { status: 502, .. }));
}

#[test]
fn stopping_early_sends_no_further_requests() {
    let transport = Scripted::new([page(0, 10, Some("c1")), page(10, 10, None)]);
    let taken: Vec<_> = resource(&transport)
        .list::<Item>(ResourceRequest::new("/v3/items"))
        .into_iter()
        .take(1)
        .collect();

    assert_eq!(taken.len(), 1);
    assert_eq!(transport.requests().len(), 1);
}

#[test]
fn first_page_continues_with_next_page() {
    let transport = Scripted::new([page(0, 2, Some("c1")), page(2, 2, None)]);
    let mut first = resource(&transport)
        .list::<Item>(ResourceRequest::new("/v3/items"))
        .send()
        .unwrap();

    assert_eq!(first.request_id, "req-0");
    assert_eq!(first.next_cursor.as_deref(), Some("c1"));
    let second = first.next_page().unwrap().unwrap();
    assert_eq!(second.data, vec![Item { id: 2 }, Item { id: 3 }]);
    assert!(first.next_page().is_none());
}

#[test]
fn empty_first_page_without_cursor() {
    let transport = Scripted::new([HttpResponse::new(200, r#"{"request_id":"r0","data":[]}"#)]);
    let first = resource(&transport)
        .list::<Item>(ResourceRequest::new("/v3/items"))
        .send()
        .unwrap();

    assert!(first.data.is_empty());
    assert!(first.next_cursor.is_none());
}

#[test]
fn auth_path_errors_are_classified() {
    let unauthorized = HttpResponse::new(
        401,
        json!({ "request_id": "r1", "error": "invalid_client", "error_description": "bad secret" }).to_string(),
    );
    let transport = Scripted::new([unauthorized]);
    let err = resource(&transport)
        .create::<serde_json::Value, _>(ResourceRequest::new("/v3/connect/token"), &json!({}))
        .unwrap_err();

    match err {
        ApiError::Auth(provider) => {
            assert_eq!(provider.request_id.as_deref(), Some("r1"));
            assert_eq!(provider.message, "bad secret");
        }
        other => panic!("expected Auth, got {other:?}"),
    }
}

#[test]
fn update_patch_sends_a_snake_cased_patch() {
    let transport = Scripted::new([HttpResponse::new(200, r##"{"request_id":"r1","data":{"hex_color":"#fff"}}"##)]);
    let updated: nylas_core::ItemResponse<serde_json::Value> = resource(&transport)
        .update_patch(ResourceRequest::new("/v3/items/1"), &json!({ "hexColor": "#fff" }))
        .unwrap();
    assert_eq!(updated.data, json!({ "hexColor": "#fff" }));

    let requests = transport.requests();
    assert_eq!(requests[0].method, nylas_core::HttpMethod::Patch);
    assert_eq!(requests[0].body.as_deref(), Some(r##"{"hex_color":"#fff"}"##));
}
