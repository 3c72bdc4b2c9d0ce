use axum::http::{self, Request, StatusCode};
use axum::Router;
use emarsys_mock_server::{app, wsse_header, MockConfig};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

const USERNAME: &str = "acme001";
const SECRET: &str = "s3cr3t";

fn mock() -> Router {
    app(MockConfig::new(USERNAME, SECRET))
}

fn signed() -> String {
    wsse_header(USERNAME, SECRET, "d36e316282959a9ed4c89851497a717f", "2024-01-03T15:30:00+00:00")
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header("x-wsse", signed())
        .body(String::new())
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .header("x-wsse", signed())
        .body(body.to_string())
        .unwrap()
}

async fn send(app: &Router, request: Request<String>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

// --- authentication ---

#[tokio::test]
async fn missing_header_is_unauthorized() {
    let resp = mock()
        .oneshot(Request::builder().uri("/api/v2/settings").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["replyCode"], 1);
    assert_eq!(body["replyText"], "Unauthorized");
}

#[tokio::test]
async fn wrong_secret_is_unauthorized() {
    let header = wsse_header(USERNAME, "guess", "n", "2024-01-03T15:30:00+00:00");
    let resp = mock()
        .oneshot(
            Request::builder()
                .uri("/api/v2/settings")
                .header("x-wsse", header)
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_route_is_plain_text() {
    let resp = mock().oneshot(get("/api/v2/nowhere")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(resp).await, "Not Found");
}

// --- reference data ---

#[tokio::test]
async fn settings_echo_account() {
    let (status, body) = send(&mock(), get("/api/v2/settings")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["replyCode"], 0);
    assert_eq!(body["data"]["name"], USERNAME);
}

#[tokio::test]
async fn gender_choices_are_listed() {
    let (_, body) = send(&mock(), get("/api/v2/field/5/choice")).await;

    assert_eq!(body["data"], json!([{"id": "1", "choice": "Male"}, {"id": "2", "choice": "Female"}]));
}

#[tokio::test]
async fn field_without_choices_reports_error_code() {
    let (status, body) = send(&mock(), get("/api/v2/field/1/choice")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["replyCode"], 10001);
}

// --- contacts ---

#[tokio::test]
async fn unknown_contact_lookup_is_2008() {
    let (_, body) = send(&mock(), get("/api/v2/contact/3=nobody%40example.com")).await;

    assert_eq!(body["replyCode"], 2008);
    assert_eq!(body["replyText"], "No contact found with the external id: 3");
}

#[tokio::test]
async fn duplicate_contact_is_rejected() {
    let app = mock();
    let contact = json!({"key_id": "3", "3": "jane@example.com"});

    let (_, first) = send(&app, json_request("POST", "/api/v2/contact", contact.clone())).await;
    assert_eq!(first["replyCode"], 0);

    let (_, second) = send(&app, json_request("POST", "/api/v2/contact", contact)).await;
    assert_eq!(second["replyCode"], 2009);
}

#[tokio::test]
async fn update_without_upsert_flag_misses() {
    let (_, body) = send(
        &mock(),
        json_request("PUT", "/api/v2/contact", json!({"key_id": "3", "3": "ghost@example.com"})),
    )
    .await;

    assert_eq!(body["replyCode"], 2008);
}

#[tokio::test]
async fn batch_upsert_reports_ids() {
    let (_, body) = send(
        &mock(),
        json_request(
            "PUT",
            "/api/v2/contact/?create_if_not_exists=1",
            json!({"key_id": "3", "contacts": [{"3": "a@example.com"}, {"3": "b@example.com"}]}),
        ),
    )
    .await;

    assert_eq!(body["replyCode"], 0);
    assert_eq!(body["data"]["ids"], json!([1, 2]));
}

// --- full contact lifecycle ---

#[tokio::test]
async fn contact_lifecycle() {
    let app = mock();

    // create
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v2/contact",
            json!({"key_id": "3", "3": "walk@example.com", "1": "Walker"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_i64().unwrap();

    // lookup by key field, id comes back as a string
    let (_, body) = send(&app, get("/api/v2/contact/3=walk%40example.com")).await;
    assert_eq!(body["data"]["id"], id.to_string());

    // update a field
    let (_, body) = send(
        &app,
        json_request("PUT", "/api/v2/contact", json!({"key_id": "3", "3": "walk@example.com", "2": "Sky"})),
    )
    .await;
    assert_eq!(body["data"]["id"], id);

    // new list containing the contact
    let (_, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v2/contactlist",
            json!({"name": "walkers", "key_id": "3", "external_ids": ["walk@example.com"]}),
        ),
    )
    .await;
    assert_eq!(body["replyCode"], 0);
    let list_id = body["data"]["id"].as_i64().unwrap();

    // adding the same contact again inserts nothing
    let (_, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/api/v2/contactlist/{list_id}/add"),
            json!({"key_id": "3", "external_ids": ["walk@example.com"]}),
        ),
    )
    .await;
    assert_eq!(body["data"]["inserted_contacts"], 0);

    // lists are listed
    let (_, body) = send(&app, get("/api/v2/contactlist")).await;
    assert_eq!(body["data"], json!([{"id": list_id, "name": "walkers"}]));

    // settings count the contact
    let (_, body) = send(&app, get("/api/v2/settings")).await;
    assert_eq!(body["data"]["total_contacts"], 1);
}

#[tokio::test]
async fn adding_to_missing_list_fails() {
    let (_, body) = send(
        &mock(),
        json_request("POST", "/api/v2/contactlist/99/add", json!({"external_ids": []})),
    )
    .await;

    assert_eq!(body["replyCode"], 3004);
}
