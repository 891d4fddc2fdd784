//! In-memory emulation of the provider's v3 REST API.
//!
//! # Design
//! Speaks the provider's wire format: snake_case JSON, `{request_id, data}`
//! envelopes, `next_cursor` pagination and the three error body layouts
//! (flat, nested `error` object, OAuth). Every route requires
//! `Authorization: Bearer API_KEY`. State lives in one `RwLock`'d `Store`;
//! cursors are plain offsets into the filtered collection.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

pub const API_KEY: &str = "mock-api-key";
pub const CLIENT_ID: &str = "mock-client-id";
pub const CLIENT_SECRET: &str = "mock-client-secret";
pub const GRANT_ID: &str = "mock-grant";
pub const AUTH_CODE: &str = "mock-auth-code";
pub const REFRESH_TOKEN: &str = "mock-refresh-token";
pub const ACCESS_TOKEN: &str = "mock-access-token";
pub const ID_TOKEN: &str = "mock-id-token";
pub const WEBHOOK_IPS: &[&str] = &["34.71.157.10", "35.193.21.60"];

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    pub grant_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hex_color: Option<String>,
    pub read_only: bool,
    pub is_primary: bool,
    pub is_owned_by_user: bool,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCalendar {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCalendar {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub timezone: Option<String>,
    pub hex_color: Option<String>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub grant_id: String,
    pub calendar_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub busy: bool,
    pub status: String,
    pub when: Value,
    pub participants: Vec<Participant>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateEvent {
    pub when: Value,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub busy: Option<bool>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEvent {
    pub when: Option<Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub busy: Option<bool>,
    pub participants: Option<Vec<Participant>>,
    pub metadata: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct SendRsvp {
    pub status: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub trigger_types: Vec<String>,
    pub webhook_url: String,
    pub status: String,
    pub notification_email_addresses: Vec<String>,
    pub status_updated_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateWebhook {
    pub trigger_types: Vec<String>,
    pub webhook_url: String,
    pub description: Option<String>,
    #[serde(default)]
    pub notification_email_addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateWebhook {
    pub trigger_types: Option<Vec<String>>,
    pub webhook_url: Option<String>,
    pub description: Option<String>,
    pub notification_email_addresses: Option<Vec<String>>,
}

#[derive(Serialize)]
struct WithSecret<'a> {
    #[serde(flatten)]
    webhook: &'a Webhook,
    webhook_secret: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub start_time: i64,
    pub end_time: i64,
    pub duration_minutes: i64,
    pub interval_minutes: Option<i64>,
    #[serde(default)]
    pub participants: Vec<AvailabilityParticipant>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityParticipant {
    pub email: String,
    #[serde(default)]
    pub calendar_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub grant_type: String,
    pub code: Option<String>,
    pub refresh_token: Option<String>,
    pub redirect_uri: Option<String>,
    pub code_verifier: Option<String>,
}

/// Query params shared by every list route.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
    pub page_token: Option<String>,
    pub metadata_pair: Option<String>,
    pub calendar_id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarScope {
    pub calendar_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenInfoParams {
    pub access_token: Option<String>,
    pub id_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RevokeParams {
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SlowParams {
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Default)]
pub struct Store {
    pub calendars: Vec<Calendar>,
    pub events: Vec<Event>,
    pub webhooks: Vec<(Webhook, String)>,
    pub revoked: HashSet<String>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with(Store::default())
}

/// Router over a pre-populated store.
pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/v3/grants/{grant_id}/calendars", get(list_calendars).post(create_calendar))
        .route("/v3/grants/{grant_id}/calendars/availability", post(calendar_availability))
        .route(
            "/v3/grants/{grant_id}/calendars/{id}",
            get(get_calendar).put(update_calendar).delete(delete_calendar),
        )
        .route("/v3/grants/{grant_id}/events", get(list_events).post(create_event))
        .route(
            "/v3/grants/{grant_id}/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
        .route("/v3/grants/{grant_id}/events/{id}/send-rsvp", post(send_rsvp))
        .route("/v3/webhooks", get(list_webhooks).post(create_webhook))
        .route("/v3/webhooks/ip-addresses", get(webhook_ip_addresses))
        .route("/v3/webhooks/{id}", put(update_webhook).delete(delete_webhook))
        .route("/v3/webhooks/{id}/rotate-secret", put(rotate_webhook_secret))
        .route("/v3/connect/token", post(exchange_token))
        .route("/v3/connect/tokeninfo", get(token_info))
        .route("/v3/connect/revoke", post(revoke_token))
        .route("/v3/slow", get(slow))
        .route("/v3/broken", get(broken))
        .layer(middleware::from_fn(require_api_key))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn require_api_key(request: Request, next: Next) -> Response {
    let expected = format!("Bearer {API_KEY}");
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if presented != Some(expected.as_str()) {
        warn!(path = %request.uri().path(), "rejected request with a bad api key");
        return api_error(StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized: invalid API key");
    }
    next.run(request).await
}

// --- responses ---

fn request_id() -> String {
    Uuid::new_v4().to_string()
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn item<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(json!({ "request_id": request_id(), "data": data }))).into_response()
}

fn acknowledged() -> Response {
    Json(json!({ "request_id": request_id() })).into_response()
}

/// Nested layout: `{request_id, error: {type, message}}`.
fn api_error(status: StatusCode, error_type: &str, message: impl Into<String>) -> Response {
    let body = json!({
        "request_id": request_id(),
        "error": { "type": error_type, "message": message.into() },
    });
    (status, Json(body)).into_response()
}

/// OAuth layout: `{error, error_description, request_id}`.
fn oauth_error(error: &str, description: &str) -> Response {
    let body = json!({
        "request_id": request_id(),
        "error": error,
        "error_description": description,
    });
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn not_found(what: &str, id: &str) -> Response {
    api_error(StatusCode::NOT_FOUND, "not_found_error", format!("{what} {id} not found"))
}

fn list<T: Serialize>(items: &[T], params: &ListParams) -> Response {
    match page_window(items.len(), params.limit, params.page_token.as_deref()) {
        Ok((range, next_cursor)) => {
            let mut body = json!({ "request_id": request_id(), "data": &items[range] });
            if let Some(cursor) = next_cursor {
                body["next_cursor"] = json!(cursor);
            }
            Json(body).into_response()
        }
        Err(message) => api_error(StatusCode::BAD_REQUEST, "invalid_request_error", message),
    }
}

/// Slice of a collection for one page, plus the cursor of the next one.
pub fn page_window(
    len: usize,
    limit: Option<usize>,
    page_token: Option<&str>,
) -> Result<(Range<usize>, Option<String>), String> {
    let start = match page_token {
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| format!("invalid page token: {token}"))?,
        None => 0,
    };
    let size = limit.filter(|&n| n > 0).unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let start = start.min(len);
    let end = (start + size).min(len);
    let next = (end < len).then(|| end.to_string());
    Ok((start..end, next))
}

/// `key:value[,key:value...]` as sent in `metadata_pair`.
pub fn parse_metadata_pairs(raw: &str) -> Vec<(&str, &str)> {
    raw.split(',')
        .filter_map(|pair| pair.split_once(':'))
        .collect()
}

fn metadata_matches(metadata: &HashMap<String, String>, filter: Option<&str>) -> bool {
    let Some(raw) = filter else {
        return true;
    };
    parse_metadata_pairs(raw)
        .into_iter()
        .all(|(key, value)| metadata.get(key).map(String::as_str) == Some(value))
}

// --- calendars ---

async fn list_calendars(
    State(db): State<Db>,
    Path(grant_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Response {
    let store = db.read().await;
    let matching: Vec<&Calendar> = store
        .calendars
        .iter()
        .filter(|c| c.grant_id == grant_id)
        .filter(|c| metadata_matches(&c.metadata, params.metadata_pair.as_deref()))
        .collect();
    list(&matching, &params)
}

async fn create_calendar(
    State(db): State<Db>,
    Path(grant_id): Path<String>,
    Json(input): Json<CreateCalendar>,
) -> Response {
    if input.name.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "invalid_request_error", "name is required");
    }
    let calendar = Calendar {
        id: Uuid::new_v4().simple().to_string(),
        grant_id,
        name: input.name,
        description: input.description,
        location: input.location,
        timezone: input.timezone,
        hex_color: None,
        read_only: false,
        is_primary: false,
        is_owned_by_user: true,
        metadata: input.metadata,
    };
    info!(id = %calendar.id, grant_id = %calendar.grant_id, "created calendar");
    db.write().await.calendars.push(calendar.clone());
    item(StatusCode::OK, calendar)
}

async fn get_calendar(State(db): State<Db>, Path((grant_id, id)): Path<(String, String)>) -> Response {
    let store = db.read().await;
    match store.calendars.iter().find(|c| c.grant_id == grant_id && c.id == id) {
        Some(calendar) => item(StatusCode::OK, calendar),
        None => not_found("calendar", &id),
    }
}

async fn update_calendar(
    State(db): State<Db>,
    Path((grant_id, id)): Path<(String, String)>,
    Json(input): Json<UpdateCalendar>,
) -> Response {
    let mut store = db.write().await;
    let Some(calendar) = store.calendars.iter_mut().find(|c| c.grant_id == grant_id && c.id == id) else {
        return not_found("calendar", &id);
    };
    if let Some(name) = input.name {
        calendar.name = name;
    }
    if input.description.is_some() {
        calendar.description = input.description;
    }
    if input.location.is_some() {
        calendar.location = input.location;
    }
    if input.timezone.is_some() {
        calendar.timezone = input.timezone;
    }
    if input.hex_color.is_some() {
        calendar.hex_color = input.hex_color;
    }
    if let Some(metadata) = input.metadata {
        calendar.metadata = metadata;
    }
    item(StatusCode::OK, calendar.clone())
}

async fn delete_calendar(State(db): State<Db>, Path((grant_id, id)): Path<(String, String)>) -> Response {
    let mut store = db.write().await;
    let before = store.calendars.len();
    store.calendars.retain(|c| !(c.grant_id == grant_id && c.id == id));
    if store.calendars.len() == before {
        return not_found("calendar", &id);
    }
    store.events.retain(|e| !(e.grant_id == grant_id && e.calendar_id == id));
    info!(%id, %grant_id, "deleted calendar");
    acknowledged()
}

/// Busy `[start, end)` span of an event, when its `when` is a timespan.
fn busy_span(event: &Event) -> Option<(i64, i64)> {
    if !event.busy {
        return None;
    }
    let start = event.when.get("start_time")?.as_i64()?;
    let end = event.when.get("end_time")?.as_i64()?;
    Some((start, end))
}

/// Candidate slots of `duration` seconds every `step` seconds inside
/// `[start, end)`, minus those overlapping any busy span.
pub fn free_slots(start: i64, end: i64, duration: i64, step: i64, busy: &[(i64, i64)]) -> Vec<(i64, i64)> {
    let mut slots = Vec::new();
    if duration <= 0 || step <= 0 {
        return slots;
    }
    let mut at = start;
    while at + duration <= end {
        let slot = (at, at + duration);
        if !busy.iter().any(|&(b_start, b_end)| b_start < slot.1 && slot.0 < b_end) {
            slots.push(slot);
        }
        at += step;
    }
    slots
}

async fn calendar_availability(
    State(db): State<Db>,
    Path(grant_id): Path<String>,
    Json(input): Json<AvailabilityRequest>,
) -> Response {
    if input.participants.is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "invalid_request_error", "participants must not be empty");
    }
    if input.start_time >= input.end_time || input.duration_minutes <= 0 {
        return api_error(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            "start_time must precede end_time and duration_minutes must be positive",
        );
    }

    let store = db.read().await;
    let busy: Vec<(i64, i64)> = store
        .events
        .iter()
        .filter(|e| e.grant_id == grant_id)
        .filter(|e| {
            input.participants.iter().any(|p| {
                p.calendar_ids.contains(&e.calendar_id) || e.participants.iter().any(|ep| ep.email == p.email)
            })
        })
        .filter_map(busy_span)
        .collect();

    let duration = input.duration_minutes * 60;
    let step = input.interval_minutes.filter(|&m| m > 0).map_or(duration, |m| m * 60);
    let emails: Vec<&str> = input.participants.iter().map(|p| p.email.as_str()).collect();
    let time_slots: Vec<Value> = free_slots(input.start_time, input.end_time, duration, step, &busy)
        .into_iter()
        .map(|(start, end)| json!({ "emails": emails, "start_time": start, "end_time": end }))
        .collect();
    info!(%grant_id, slots = time_slots.len(), "computed availability");
    item(StatusCode::OK, json!({ "time_slots": time_slots, "order": emails }))
}

// --- events ---

fn require_calendar(calendar_id: Option<String>) -> Result<String, Response> {
    calendar_id.filter(|id| !id.is_empty()).ok_or_else(|| {
        api_error(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            "calendar_id is a required query parameter",
        )
    })
}

async fn list_events(
    State(db): State<Db>,
    Path(grant_id): Path<String>,
    Query(params): Query<ListParams>,
) -> Response {
    let calendar_id = match require_calendar(params.calendar_id.clone()) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let store = db.read().await;
    let matching: Vec<&Event> = store
        .events
        .iter()
        .filter(|e| e.grant_id == grant_id && e.calendar_id == calendar_id)
        .filter(|e| metadata_matches(&e.metadata, params.metadata_pair.as_deref()))
        .filter(|e| match &params.title {
            Some(title) => e.title.as_deref() == Some(title.as_str()),
            None => true,
        })
        .collect();
    list(&matching, &params)
}

async fn create_event(
    State(db): State<Db>,
    Path(grant_id): Path<String>,
    Query(scope): Query<CalendarScope>,
    Json(input): Json<CreateEvent>,
) -> Response {
    let calendar_id = match require_calendar(scope.calendar_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let event = Event {
        id: Uuid::new_v4().simple().to_string(),
        grant_id,
        calendar_id,
        title: input.title,
        description: input.description,
        location: input.location,
        busy: input.busy.unwrap_or(true),
        status: "confirmed".to_string(),
        when: input.when,
        participants: input.participants,
        metadata: input.metadata,
    };
    info!(id = %event.id, calendar_id = %event.calendar_id, "created event");
    db.write().await.events.push(event.clone());
    item(StatusCode::OK, event)
}

async fn get_event(
    State(db): State<Db>,
    Path((grant_id, id)): Path<(String, String)>,
    Query(scope): Query<CalendarScope>,
) -> Response {
    let calendar_id = match require_calendar(scope.calendar_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let store = db.read().await;
    match store
        .events
        .iter()
        .find(|e| e.grant_id == grant_id && e.calendar_id == calendar_id && e.id == id)
    {
        Some(event) => item(StatusCode::OK, event),
        None => not_found("event", &id),
    }
}

async fn update_event(
    State(db): State<Db>,
    Path((grant_id, id)): Path<(String, String)>,
    Query(scope): Query<CalendarScope>,
    Json(input): Json<UpdateEvent>,
) -> Response {
    let calendar_id = match require_calendar(scope.calendar_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut store = db.write().await;
    let Some(event) = store
        .events
        .iter_mut()
        .find(|e| e.grant_id == grant_id && e.calendar_id == calendar_id && e.id == id)
    else {
        return not_found("event", &id);
    };
    if let Some(when) = input.when {
        event.when = when;
    }
    if input.title.is_some() {
        event.title = input.title;
    }
    if input.description.is_some() {
        event.description = input.description;
    }
    if input.location.is_some() {
        event.location = input.location;
    }
    if let Some(busy) = input.busy {
        event.busy = busy;
    }
    if let Some(participants) = input.participants {
        event.participants = participants;
    }
    if let Some(metadata) = input.metadata {
        event.metadata = metadata;
    }
    item(StatusCode::OK, event.clone())
}

async fn delete_event(
    State(db): State<Db>,
    Path((grant_id, id)): Path<(String, String)>,
    Query(scope): Query<CalendarScope>,
) -> Response {
    let calendar_id = match require_calendar(scope.calendar_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut store = db.write().await;
    let before = store.events.len();
    store
        .events
        .retain(|e| !(e.grant_id == grant_id && e.calendar_id == calendar_id && e.id == id));
    if store.events.len() == before {
        return not_found("event", &id);
    }
    acknowledged()
}

async fn send_rsvp(
    State(db): State<Db>,
    Path((grant_id, id)): Path<(String, String)>,
    Query(scope): Query<CalendarScope>,
    Json(input): Json<SendRsvp>,
) -> Response {
    let calendar_id = match require_calendar(scope.calendar_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if !matches!(input.status.as_str(), "yes" | "no" | "maybe") {
        return api_error(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            format!("invalid rsvp status: {}", input.status),
        );
    }
    let store = db.read().await;
    if !store
        .events
        .iter()
        .any(|e| e.grant_id == grant_id && e.calendar_id == calendar_id && e.id == id)
    {
        return not_found("event", &id);
    }
    acknowledged()
}

// --- webhooks ---

async fn list_webhooks(State(db): State<Db>, Query(params): Query<ListParams>) -> Response {
    let store = db.read().await;
    let webhooks: Vec<&Webhook> = store.webhooks.iter().map(|(webhook, _)| webhook).collect();
    list(&webhooks, &params)
}

async fn create_webhook(State(db): State<Db>, Json(input): Json<CreateWebhook>) -> Response {
    if input.trigger_types.is_empty() {
        return api_error(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            "trigger_types must not be empty",
        );
    }
    let created = now();
    let webhook = Webhook {
        id: Uuid::new_v4().simple().to_string(),
        description: input.description,
        trigger_types: input.trigger_types,
        webhook_url: input.webhook_url,
        status: "active".to_string(),
        notification_email_addresses: input.notification_email_addresses,
        status_updated_at: created,
        created_at: created,
        updated_at: created,
    };
    let secret = Uuid::new_v4().simple().to_string();
    info!(id = %webhook.id, "created webhook");
    let response = item(
        StatusCode::OK,
        WithSecret {
            webhook: &webhook,
            webhook_secret: &secret,
        },
    );
    db.write().await.webhooks.push((webhook, secret));
    response
}

async fn update_webhook(
    State(db): State<Db>,
    Path(id): Path<String>,
    Json(input): Json<UpdateWebhook>,
) -> Response {
    let mut store = db.write().await;
    let Some((webhook, _)) = store.webhooks.iter_mut().find(|(w, _)| w.id == id) else {
        return not_found("webhook", &id);
    };
    if let Some(trigger_types) = input.trigger_types {
        webhook.trigger_types = trigger_types;
    }
    if let Some(webhook_url) = input.webhook_url {
        webhook.webhook_url = webhook_url;
    }
    if input.description.is_some() {
        webhook.description = input.description;
    }
    if let Some(addresses) = input.notification_email_addresses {
        webhook.notification_email_addresses = addresses;
    }
    webhook.updated_at = now();
    item(StatusCode::OK, webhook.clone())
}

async fn delete_webhook(State(db): State<Db>, Path(id): Path<String>) -> Response {
    let mut store = db.write().await;
    let before = store.webhooks.len();
    store.webhooks.retain(|(w, _)| w.id != id);
    if store.webhooks.len() == before {
        return not_found("webhook", &id);
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn rotate_webhook_secret(State(db): State<Db>, Path(id): Path<String>) -> Response {
    let mut store = db.write().await;
    let Some((webhook, secret)) = store.webhooks.iter_mut().find(|(w, _)| w.id == id) else {
        return not_found("webhook", &id);
    };
    *secret = Uuid::new_v4().simple().to_string();
    webhook.updated_at = now();
    info!(%id, "rotated webhook secret");
    item(
        StatusCode::OK,
        WithSecret {
            webhook,
            webhook_secret: secret,
        },
    )
}

async fn webhook_ip_addresses() -> Response {
    item(
        StatusCode::OK,
        json!({ "ip_addresses": WEBHOOK_IPS, "updated_at": 1_700_000_000 }),
    )
}

// --- connect ---

async fn exchange_token(State(db): State<Db>, Json(input): Json<TokenRequest>) -> Response {
    // Applications without a dedicated secret authenticate with the API key.
    let secret_ok = matches!(input.client_secret.as_deref(), Some(CLIENT_SECRET) | Some(API_KEY));
    if input.client_id != CLIENT_ID || !secret_ok {
        return oauth_error("invalid_client", "client authentication failed");
    }
    let granted = match input.grant_type.as_str() {
        "authorization_code" => input.code.as_deref() == Some(AUTH_CODE) && input.redirect_uri.is_some(),
        "refresh_token" => input.refresh_token.as_deref() == Some(REFRESH_TOKEN),
        _ => return oauth_error("unsupported_grant_type", "grant type is not supported"),
    };
    if !granted {
        return oauth_error("invalid_grant", "the authorization grant is invalid or expired");
    }
    db.write().await.revoked.remove(ACCESS_TOKEN);
    info!(grant_type = %input.grant_type, pkce = input.code_verifier.is_some(), "issued token");
    Json(json!({
        "access_token": ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": "https://www.googleapis.com/auth/calendar",
        "refresh_token": REFRESH_TOKEN,
        "id_token": ID_TOKEN,
        "grant_id": GRANT_ID,
        "email": "user@example.com",
        "provider": "google",
    }))
    .into_response()
}

async fn token_info(State(db): State<Db>, Query(params): Query<TokenInfoParams>) -> Response {
    let store = db.read().await;
    let valid = match (&params.access_token, &params.id_token) {
        (Some(token), _) => token == ACCESS_TOKEN && !store.revoked.contains(token),
        (None, Some(token)) => token == ID_TOKEN,
        (None, None) => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "access_token or id_token is required",
            )
        }
    };
    if !valid {
        return api_error(StatusCode::UNAUTHORIZED, "invalid_token", "token is invalid or expired");
    }
    let issued = now();
    item(
        StatusCode::OK,
        json!({
            "iss": "https://nylas.com",
            "aud": CLIENT_ID,
            "sub": GRANT_ID,
            "email": "user@example.com",
            "iat": issued,
            "exp": issued + 3600,
        }),
    )
}

async fn revoke_token(State(db): State<Db>, Query(params): Query<RevokeParams>) -> Response {
    let Some(token) = params.token else {
        return oauth_error("invalid_request", "token is required");
    };
    let mut store = db.write().await;
    if token != ACCESS_TOKEN || store.revoked.contains(&token) {
        return oauth_error("invalid_token", "token not found");
    }
    store.revoked.insert(token);
    info!("revoked access token");
    Json(json!({ "success": true })).into_response()
}

// --- fault injection ---

async fn slow(Query(params): Query<SlowParams>) -> Response {
    tokio::time::sleep(Duration::from_millis(params.delay_ms.unwrap_or(2_000))).await;
    acknowledged()
}

async fn broken() -> Response {
    (StatusCode::BAD_GATEWAY, "Bad Gateway").into_response()
}
