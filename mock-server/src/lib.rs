//! In-memory stand-in for the Emarsys v2 REST API.
//!
//! # Design
//! Serves a small slice of `/api/v2` (settings, fields and choices, contacts,
//! contact lists) with the same `{replyCode, replyText, data}` envelope the
//! real service uses. Every API route requires a valid `X-WSSE` header for
//! the configured account; requests without one get HTTP 401 with
//! `replyCode` 1. Unknown routes answer with a plain-text 404, which is not
//! JSON on purpose.
//!
//! Wire types are defined here independently from the client crate, so a
//! schema drift between the two shows up in the integration tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sha1::{Digest, Sha1};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info, warn};

/// Field used to identify contacts when a request names none (email).
const DEFAULT_KEY_FIELD: &str = "3";

/// Account accepted by the server.
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub username: String,
    pub secret: String,
}

impl MockConfig {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

#[derive(Debug, Clone)]
struct ContactList {
    id: i64,
    name: String,
    members: BTreeSet<i64>,
}

#[derive(Debug, Default)]
struct Store {
    next_contact_id: i64,
    contacts: BTreeMap<i64, Map<String, Value>>,
    next_list_id: i64,
    lists: BTreeMap<i64, ContactList>,
}

impl Store {
    fn find(&self, key_field: &str, key_value: &Value) -> Option<i64> {
        self.contacts
            .iter()
            .find(|(_, fields)| fields.get(key_field).is_some_and(|v| same_value(v, key_value)))
            .map(|(id, _)| *id)
    }

    fn insert_contact(&mut self, fields: Map<String, Value>) -> i64 {
        self.next_contact_id += 1;
        let id = self.next_contact_id;
        self.contacts.insert(id, fields);
        id
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<MockConfig>,
    store: Arc<RwLock<Store>>,
}

pub fn app(config: MockConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
        store: Arc::new(RwLock::new(Store::default())),
    };

    let api = Router::new()
        .route("/settings", get(settings))
        .route("/field", get(list_fields))
        .route("/field/{id}/choice", get(field_choices))
        .route("/contact", post(create_contacts).put(update_contacts))
        .route("/contact/", post(create_contacts).put(update_contacts))
        .route("/contact/{lookup}", get(lookup_contact))
        .route("/contactlist", get(list_contact_lists).post(create_contact_list))
        .route("/contactlist/{id}/add", post(add_to_contact_list))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_wsse))
        .with_state(state);

    Router::new().nest("/api/v2", api).fallback(not_found)
}

pub async fn run(listener: TcpListener, config: MockConfig) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, username = %config.username, "mock Emarsys API listening");
    }
    axum::serve(listener, app(config)).await
}

/// `X-WSSE` value for the given parts, with the digest computed the way the
/// server checks it. Freshness of `nonce` and `created` is not verified.
pub fn wsse_header(username: &str, secret: &str, nonce: &str, created: &str) -> String {
    let digest = BASE64.encode(sha1_digest(nonce, created, secret));
    format!(
        "UsernameToken Username=\"{username}\", PasswordDigest=\"{digest}\", Nonce=\"{nonce}\", Created=\"{created}\""
    )
}

fn sha1_digest(nonce: &str, created: &str, secret: &str) -> Vec<u8> {
    let mut hasher = Sha1::new();
    hasher.update(nonce.as_bytes());
    hasher.update(created.as_bytes());
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn envelope(code: i64, text: &str, data: Value) -> Json<Value> {
    Json(json!({"replyCode": code, "replyText": text, "data": data}))
}

fn ok(data: Value) -> Json<Value> {
    envelope(0, "OK", data)
}

/// Emarsys compares key values loosely: `5` and `"5"` match.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), other) | (other, Value::String(s)) if !other.is_string() => {
            *s == other.to_string()
        }
        _ => a == b,
    }
}

/// Username, digest, nonce and timestamp of a `UsernameToken` header, in
/// that fixed order. Only the username may contain quotes or `", "`.
fn token_parts(header: &str) -> Option<(&str, &str, &str, &str)> {
    let rest = header.trim().strip_prefix("UsernameToken Username=\"")?;
    let (username, rest) = rest.rsplit_once("\", PasswordDigest=\"")?;
    let (digest, rest) = rest.split_once("\", Nonce=\"")?;
    let (nonce, rest) = rest.split_once("\", Created=\"")?;
    let created = rest.strip_suffix('"')?;
    Some((username, digest, nonce, created))
}

fn verify(config: &MockConfig, header: &str) -> bool {
    let Some((username, digest, nonce, created)) = token_parts(header) else {
        return false;
    };
    if username != config.username {
        return false;
    }
    let expected = sha1_digest(nonce, created, &config.secret);
    // Both the raw-byte and the hex-string digest forms are in use.
    digest == BASE64.encode(&expected) || digest == BASE64.encode(hex::encode(&expected))
}

async fn require_wsse(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get("x-wsse")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|header| verify(&state.config, header));
    if !authorized {
        warn!(uri = %request.uri(), "rejecting request with invalid X-WSSE header");
        return (StatusCode::UNAUTHORIZED, envelope(1, "Unauthorized", json!(""))).into_response();
    }
    debug!(method = %request.method(), uri = %request.uri(), "authenticated request");
    next.run(request).await
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

async fn settings(State(state): State<AppState>) -> Json<Value> {
    let total_contacts = state.store.read().await.contacts.len();
    ok(json!({
        "id": 1,
        "environment": "suite.mock",
        "timezone": "Europe/Vienna",
        "name": state.config.username,
        "password_history_queue_size": 1,
        "country": "AT",
        "language": "en",
        "total_contacts": total_contacts,
    }))
}

async fn list_fields() -> Json<Value> {
    ok(json!([
        {"id": 1, "name": "First Name", "application_type": "shorttext", "string_id": "first_name"},
        {"id": 2, "name": "Last Name", "application_type": "shorttext", "string_id": "last_name"},
        {"id": 3, "name": "E-Mail", "application_type": "longtext", "string_id": "email"},
        {"id": 5, "name": "Gender", "application_type": "gender", "string_id": "gender"},
        {"id": 31, "name": "Opt-In", "application_type": "special", "string_id": "optin"},
    ]))
}

async fn field_choices(Path(id): Path<String>) -> Json<Value> {
    match id.as_str() {
        "5" => ok(json!([
            {"id": "1", "choice": "Male"},
            {"id": "2", "choice": "Female"},
        ])),
        "31" => ok(json!([
            {"id": "1", "choice": "TRUE"},
            {"id": "2", "choice": "FALSE"},
        ])),
        _ => envelope(10001, &format!("Field {id} has no choices"), json!("")),
    }
}

#[derive(Debug, Deserialize)]
struct UpsertParams {
    create_if_not_exists: Option<String>,
}

/// Split a contact body into its key field and its records.
fn contact_records(body: &Map<String, Value>) -> (String, bool, Vec<Map<String, Value>>) {
    let key_field = match body.get("key_id") {
        Some(Value::String(key)) => key.clone(),
        Some(Value::Number(key)) => key.to_string(),
        _ => DEFAULT_KEY_FIELD.to_string(),
    };
    match body.get("contacts") {
        Some(Value::Array(contacts)) => {
            let records = contacts
                .iter()
                .filter_map(|c| c.as_object().cloned())
                .collect();
            (key_field, true, records)
        }
        _ => {
            let mut record = body.clone();
            record.remove("key_id");
            (key_field, false, vec![record])
        }
    }
}

async fn create_contacts(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> Json<Value> {
    let (key_field, batch, records) = contact_records(&body);
    let mut store = state.store.write().await;

    let mut ids = Vec::new();
    let mut errors = Map::new();
    let mut first_error = None;
    for record in records {
        let Some(key_value) = record.get(&key_field).cloned() else {
            first_error.get_or_insert((2005, "No value provided for key field"));
            continue;
        };
        if store.find(&key_field, &key_value).is_some() {
            let text = "Contact with the external key already exists";
            errors.insert(value_label(&key_value), json!({"2009": text}));
            first_error.get_or_insert((2009, text));
            continue;
        }
        ids.push(store.insert_contact(record));
    }

    if batch {
        return ok(json!({"ids": ids, "errors": errors}));
    }
    match (ids.first(), first_error) {
        (Some(id), _) => ok(json!({"id": id})),
        (None, Some((code, text))) => envelope(code, text, json!("")),
        (None, None) => envelope(2005, "No value provided for key field", json!("")),
    }
}

async fn update_contacts(
    State(state): State<AppState>,
    Query(params): Query<UpsertParams>,
    Json(body): Json<Map<String, Value>>,
) -> Json<Value> {
    let create = params.create_if_not_exists.as_deref() == Some("1");
    let (key_field, batch, records) = contact_records(&body);
    let mut store = state.store.write().await;

    let mut ids = Vec::new();
    let mut errors = Map::new();
    for record in records {
        let Some(key_value) = record.get(&key_field).cloned() else {
            continue;
        };
        match store.find(&key_field, &key_value) {
            Some(id) => {
                if let Some(fields) = store.contacts.get_mut(&id) {
                    fields.extend(record);
                }
                ids.push(id);
            }
            None if create => ids.push(store.insert_contact(record)),
            None => {
                errors.insert(
                    value_label(&key_value),
                    json!({"2008": format!("No contact found with the external id: {key_field}")}),
                );
            }
        }
    }

    if batch {
        return ok(json!({"ids": ids, "errors": errors}));
    }
    match ids.first() {
        Some(id) => ok(json!({"id": id})),
        None => envelope(
            2008,
            &format!("No contact found with the external id: {key_field}"),
            json!(""),
        ),
    }
}

fn value_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `GET contact/{field}={value}`
async fn lookup_contact(State(state): State<AppState>, Path(lookup): Path<String>) -> Json<Value> {
    let Some((field, value)) = lookup.split_once('=') else {
        return envelope(2004, "Invalid key field id", json!(""));
    };
    let store = state.store.read().await;
    match store.find(field, &Value::String(value.to_string())) {
        Some(id) => ok(json!({"id": id.to_string()})),
        None => envelope(
            2008,
            &format!("No contact found with the external id: {field}"),
            json!(""),
        ),
    }
}

async fn list_contact_lists(State(state): State<AppState>) -> Json<Value> {
    let store = state.store.read().await;
    let lists: Vec<Value> = store
        .lists
        .values()
        .map(|list| json!({"id": list.id, "name": list.name}))
        .collect();
    ok(Value::Array(lists))
}

#[derive(Debug, Deserialize)]
struct CreateList {
    name: String,
    key_id: Option<Value>,
    #[serde(default)]
    external_ids: Vec<Value>,
}

async fn create_contact_list(
    State(state): State<AppState>,
    Json(input): Json<CreateList>,
) -> Json<Value> {
    let key_field = input
        .key_id
        .as_ref()
        .map_or_else(|| DEFAULT_KEY_FIELD.to_string(), value_label);
    let mut store = state.store.write().await;
    if store.lists.values().any(|list| list.name == input.name) {
        return envelope(
            3003,
            &format!("Contact list with name \"{}\" already exists", input.name),
            json!(""),
        );
    }

    let members: BTreeSet<i64> = input
        .external_ids
        .iter()
        .filter_map(|value| store.find(&key_field, value))
        .collect();
    store.next_list_id += 1;
    let id = store.next_list_id;
    store.lists.insert(
        id,
        ContactList {
            id,
            name: input.name,
            members,
        },
    );
    ok(json!({"id": id, "errors": []}))
}

#[derive(Debug, Deserialize)]
struct AddToList {
    key_id: Option<Value>,
    #[serde(default)]
    external_ids: Vec<Value>,
}

async fn add_to_contact_list(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<AddToList>,
) -> Json<Value> {
    let key_field = input
        .key_id
        .as_ref()
        .map_or_else(|| DEFAULT_KEY_FIELD.to_string(), value_label);
    let mut store = state.store.write().await;
    let found: Vec<i64> = input
        .external_ids
        .iter()
        .filter_map(|value| store.find(&key_field, value))
        .collect();
    let Some(list) = store.lists.get_mut(&id) else {
        return envelope(3004, &format!("Contact list {id} does not exist"), json!(""));
    };
    let inserted = found.into_iter().filter(|id| list.members.insert(*id)).count();
    ok(json!({"inserted_contacts": inserted, "errors": []}))
}
