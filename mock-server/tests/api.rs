use std::collections::HashMap;

use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with, Calendar, Store, API_KEY, AUTH_CODE, CLIENT_ID};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn authed(method: &str, uri: &str) -> http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {API_KEY}"))
}

fn get(uri: &str) -> Request<String> {
    authed("GET", uri).body(String::new()).unwrap()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    authed(method, uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn calendar(id: &str, team: &str) -> Calendar {
    Calendar {
        id: id.to_string(),
        grant_id: "g1".to_string(),
        name: format!("Calendar {id}"),
        description: None,
        location: None,
        timezone: None,
        hex_color: None,
        read_only: false,
        is_primary: false,
        is_owned_by_user: true,
        metadata: HashMap::from([("team_id".to_string(), team.to_string())]),
    }
}

fn seeded() -> Store {
    Store {
        calendars: vec![calendar("c1", "red"), calendar("c2", "blue"), calendar("c3", "red")],
        ..Store::default()
    }
}

// --- auth ---

#[tokio::test]
async fn missing_api_key_returns_401() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/v3/webhooks")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "unauthorized");
    assert!(body["request_id"].is_string());
}

// --- calendars ---

#[tokio::test]
async fn list_calendars_empty() {
    let resp = app().oneshot(get("/v3/grants/g1/calendars")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"], json!([]));
    assert!(body.get("next_cursor").is_none());
}

#[tokio::test]
async fn list_calendars_pages_with_offset_cursor() {
    let resp = app_with(seeded())
        .oneshot(get("/v3/grants/g1/calendars?limit=2"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["next_cursor"], "2");

    let resp = app_with(seeded())
        .oneshot(get("/v3/grants/g1/calendars?limit=2&page_token=2"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"][0]["id"], "c3");
    assert!(body.get("next_cursor").is_none());
}

#[tokio::test]
async fn list_calendars_filters_on_metadata_pair() {
    let resp = app_with(seeded())
        .oneshot(get("/v3/grants/g1/calendars?metadata_pair=team_id%3Ared"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["c1", "c3"]);
}

#[tokio::test]
async fn list_calendars_rejects_bad_page_token() {
    let resp = app_with(seeded())
        .oneshot(get("/v3/grants/g1/calendars?page_token=nope"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn get_calendar_not_found_uses_nested_error() {
    let resp = app().oneshot(get("/v3/grants/g1/calendars/missing")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "not_found_error");
    assert_eq!(body["error"]["message"], "calendar missing not found");
}

#[tokio::test]
async fn calendars_are_scoped_to_their_grant() {
    let resp = app_with(seeded())
        .oneshot(get("/v3/grants/other/calendars/c1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_calendar_malformed_json_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/v3/grants/g1/calendars", r#"{"not_name":1}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn availability_is_not_mistaken_for_a_calendar_id() {
    let body = json!({
        "start_time": 0,
        "end_time": 3600,
        "duration_minutes": 30,
        "participants": [{ "email": "a@example.com" }],
    });
    let resp = app()
        .oneshot(json_request("POST", "/v3/grants/g1/calendars/availability", &body.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["time_slots"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["time_slots"][1]["start_time"], 1800);
    assert_eq!(body["data"]["order"], json!(["a@example.com"]));
}

#[tokio::test]
async fn availability_requires_participants() {
    let body = json!({ "start_time": 0, "end_time": 3600, "duration_minutes": 30, "participants": [] });
    let resp = app()
        .oneshot(json_request("POST", "/v3/grants/g1/calendars/availability", &body.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "invalid_request_error");
}

// --- events ---

#[tokio::test]
async fn events_require_calendar_id() {
    let resp = app().oneshot(get("/v3/grants/g1/events")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["message"], "calendar_id is a required query parameter");
}

#[tokio::test]
async fn rsvp_rejects_unknown_status() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/v3/grants/g1/events/e1/send-rsvp?calendar_id=c1",
            r#"{"status":"perhaps"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- connect ---

#[tokio::test]
async fn token_exchange_with_bad_code_uses_oauth_error() {
    let body = json!({
        "client_id": CLIENT_ID,
        "client_secret": API_KEY,
        "grant_type": "authorization_code",
        "code": "wrong",
        "redirect_uri": "https://example.com/callback",
    });
    let resp = app()
        .oneshot(json_request("POST", "/v3/connect/token", &body.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "invalid_grant");
    assert!(body["error_description"].is_string());
}

#[tokio::test]
async fn token_exchange_returns_unwrapped_tokens() {
    let body = json!({
        "client_id": CLIENT_ID,
        "client_secret": API_KEY,
        "grant_type": "authorization_code",
        "code": AUTH_CODE,
        "redirect_uri": "https://example.com/callback",
    });
    let resp = app()
        .oneshot(json_request("POST", "/v3/connect/token", &body.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert!(body.get("data").is_none());
    assert_eq!(body["access_token"], mock_server::ACCESS_TOKEN);
    assert_eq!(body["grant_id"], mock_server::GRANT_ID);
}

#[tokio::test]
async fn token_exchange_checks_the_client_secret() {
    let exchange = |secret: &str| {
        json!({
            "client_id": CLIENT_ID,
            "client_secret": secret,
            "grant_type": "refresh_token",
            "refresh_token": mock_server::REFRESH_TOKEN,
        })
        .to_string()
    };

    let resp = app()
        .oneshot(json_request("POST", "/v3/connect/token", &exchange(mock_server::CLIENT_SECRET)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app()
        .oneshot(json_request("POST", "/v3/connect/token", &exchange("wrong")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "invalid_client");
}

#[tokio::test]
async fn tokeninfo_with_unknown_token_returns_401() {
    let resp = app()
        .oneshot(get("/v3/connect/tokeninfo?access_token=bogus"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["type"], "invalid_token");
}

// --- fault injection ---

#[tokio::test]
async fn broken_route_returns_plain_text() {
    let resp = app().oneshot(get("/v3/broken")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_bytes(resp).await, "Bad Gateway");
}

// --- full webhook lifecycle ---

#[tokio::test]
async fn webhook_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "POST",
            "/v3/webhooks",
            r#"{"trigger_types":["event.created"],"webhook_url":"https://example.com/hook"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created = body_json(resp).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    let secret = created["data"]["webhook_secret"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["status"], "active");

    // list: secrets are never listed
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(get("/v3/webhooks"))
        .await
        .unwrap();
    let listed = body_json(resp).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
    assert!(listed["data"][0].get("webhook_secret").is_none());

    // rotate
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("PUT", &format!("/v3/webhooks/{id}/rotate-secret"), "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let rotated = body_json(resp).await;
    assert_ne!(rotated["data"]["webhook_secret"].as_str().unwrap(), secret);

    // update: partial
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/v3/webhooks/{id}"),
            r#"{"description":"renamed"}"#,
        ))
        .await
        .unwrap();
    let updated = body_json(resp).await;
    assert_eq!(updated["data"]["description"], "renamed");
    assert_eq!(updated["data"]["webhook_url"], "https://example.com/hook");

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("DELETE", &format!("/v3/webhooks/{id}")).body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // delete again: 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("DELETE", &format!("/v3/webhooks/{id}")).body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
