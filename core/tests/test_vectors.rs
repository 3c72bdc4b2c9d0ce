//! Replay the JSON vectors stored in `test-vectors/`.
//!
//! Each file lists inputs and the exact outputs expected for them: header
//! parts for the signer, envelopes or error messages for the decoder, and
//! wire bodies for the contact mapping. Bodies are compared as parsed JSON,
//! not raw strings, so key order does not matter.

use std::cell::RefCell;

use chrono::DateTime;
use emarsys_core::signer::{created_stamp, nonce_for, password_digest};
use emarsys_core::{
    Body, ClientConfig, DigestEncoding, EmarsysClient, EmarsysError, HttpMethod, HttpRequest,
    HttpResponse, HttpTransport, TransportError, WsseSigner, Credentials,
};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:3000/api/v2/";

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

/// Captures requests and answers every one with an empty success envelope.
#[derive(Default)]
struct Capture {
    seen: RefCell<Vec<HttpRequest>>,
}

impl HttpTransport for Capture {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.seen.borrow_mut().push(request.clone());
        Ok(HttpResponse::new(200, r#"{"replyCode":0,"replyText":"OK","data":{}}"#))
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

#[test]
fn signature_test_vectors() {
    let raw = include_str!("../../test-vectors/signature.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let username = vectors["username"].as_str().unwrap();
    let secret = vectors["secret"].as_str().unwrap();
    let signer = WsseSigner::new(Credentials::new(username, secret), DigestEncoding::Raw);

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let now = DateTime::parse_from_rfc3339(case["now"].as_str().unwrap()).unwrap();

        let created = created_stamp(now);
        assert_eq!(created, case["created"].as_str().unwrap(), "{name}: created");

        let nonce = nonce_for(now);
        assert_eq!(nonce, case["nonce"].as_str().unwrap(), "{name}: nonce");

        assert_eq!(
            password_digest(&nonce, &created, secret, DigestEncoding::Raw),
            case["password_digest_raw"].as_str().unwrap(),
            "{name}: raw digest"
        );
        assert_eq!(
            password_digest(&nonce, &created, secret, DigestEncoding::HexString),
            case["password_digest_hex"].as_str().unwrap(),
            "{name}: hex digest"
        );
        assert_eq!(signer.signature_at(now), case["header"].as_str().unwrap(), "{name}: header");
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[test]
fn envelope_test_vectors() {
    let raw = include_str!("../../test-vectors/envelope.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let max_depth = vectors["max_depth"].as_u64().unwrap() as usize;
    let client = EmarsysClient::new(
        ClientConfig::new("u", "s").with_max_depth(max_depth),
        Capture::default(),
    )
    .unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let body = case["body"].as_str().unwrap();
        let result = client.parse_response(&HttpResponse::new(200, body));
        let expected = &case["expected"];

        if let Some(ok) = expected.get("ok") {
            let envelope = result.unwrap_or_else(|e| panic!("{name}: unexpected error {e}"));
            assert_eq!(serde_json::to_value(&envelope).unwrap(), *ok, "{name}: envelope");
            continue;
        }

        let err = result.err().unwrap_or_else(|| panic!("{name}: expected an error"));
        let error = &expected["error"];
        match error["kind"].as_str().unwrap() {
            "client" => assert!(matches!(err, EmarsysError::Client(_)), "{name}: kind"),
            "server" => assert!(matches!(err, EmarsysError::Server(_)), "{name}: kind"),
            other => panic!("unknown kind: {other}"),
        }
        if let Some(message) = error.get("message") {
            assert_eq!(err.to_string(), message.as_str().unwrap(), "{name}: message");
        }
        if let Some(prefix) = error.get("message_prefix") {
            assert!(
                err.to_string().starts_with(prefix.as_str().unwrap()),
                "{name}: message {err}"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Contact mapping
// ---------------------------------------------------------------------------

#[test]
fn contact_mapping_test_vectors() {
    let raw = include_str!("../../test-vectors/contacts.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let config = ClientConfig::new("u", "s").with_base_url(BASE_URL);
    let mut client = EmarsysClient::new(config, Capture::default()).unwrap();
    let additions: Vec<(String, i64)> = vectors["fields_mapping"]
        .as_object()
        .unwrap()
        .iter()
        .map(|(k, v)| (k.clone(), v.as_i64().unwrap()))
        .collect();
    client.add_fields_mapping(additions);

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input: Body = serde_json::from_value(case["input"].clone()).unwrap();
        let before = client.transport().seen.borrow().len();

        let result = match case["operation"].as_str().unwrap() {
            "create_contact" => client.create_contact(&input),
            "update_contact" => client.update_contact(&input),
            "update_contact_or_create" => client.update_contact_or_create(&input),
            other => panic!("unknown operation: {other}"),
        };

        if let Some(message) = case.get("expected_error") {
            let err = result.err().unwrap_or_else(|| panic!("{name}: expected an error"));
            assert!(err.is_client(), "{name}: kind");
            assert_eq!(err.to_string(), message.as_str().unwrap(), "{name}: message");
            assert_eq!(client.transport().seen.borrow().len(), before, "{name}: nothing sent");
            continue;
        }

        result.unwrap_or_else(|e| panic!("{name}: unexpected error {e}"));
        let seen = client.transport().seen.borrow();
        let req = seen.last().unwrap();
        let expected = &case["expected_request"];
        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(
            req.url,
            format!("{BASE_URL}{}", expected["path"].as_str().unwrap()),
            "{name}: url"
        );
        assert_eq!(req.header("Content-Type"), Some("application/json"), "{name}: content type");
        let body: Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(body, expected["body"], "{name}: body");
    }
}

#[test]
fn empty_body_is_sent_as_object() {
    let client = EmarsysClient::new(ClientConfig::new("u", "s"), Capture::default()).unwrap();
    client.get_settings().unwrap();
    let seen = client.transport().seen.borrow();
    let body: Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(body, json!({}));
    assert_eq!(seen[0].url, "https://api.emarsys.net/api/v2/settings");
}
