//! Request builder, dispatcher and response parser.
//!
//! # Design
//! `EmarsysClient` owns its mapping table, its signer and a transport. A
//! call is split into `build_request` (URL, headers, body, signature) and
//! `parse_response` (envelope decoding), with `send` running the transport
//! in between. Hosts that do their own I/O use the two halves directly and
//! get the exact same semantics.
//!
//! A non-zero `replyCode` comes back as a normal `ResponseEnvelope`; only
//! failures to sign, transport or decode become errors.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{ClientConfig, ConfigError};
use crate::endpoint::Endpoint;
use crate::envelope::{self, ResponseEnvelope};
use crate::error::{ClientError, EmarsysError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::mapping::{ChoiceRef, FieldKey, FieldRef, MappingTable};
use crate::reference::{bundled_choices, bundled_fields};
use crate::signer::{WsseSigner, WSSE_HEADER};

/// JSON object sent as a request body.
pub type Body = Map<String, Value>;

/// Client for one Emarsys account.
#[derive(Debug, Clone)]
pub struct EmarsysClient<T> {
    transport: T,
    signer: WsseSigner,
    base_url: String,
    max_depth: usize,
    mapping: MappingTable,
}

impl<T> EmarsysClient<T> {
    /// Build a client from `config`, falling back to the bundled reference
    /// data for whichever mapping the config leaves empty.
    pub fn new(config: ClientConfig, transport: T) -> Result<Self, ConfigError> {
        let fields = if config.fields.is_empty() {
            bundled_fields()?
        } else {
            config.fields
        };
        let choices = if config.choices.is_empty() {
            bundled_choices(&fields)?
        } else {
            config.choices
        };

        Ok(Self {
            transport,
            signer: WsseSigner::new(config.credentials, config.digest_encoding),
            base_url: config.base_url,
            max_depth: config.max_depth,
            mapping: MappingTable::new(fields, choices),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn mapping(&self) -> &MappingTable {
        &self.mapping
    }

    pub fn mapping_mut(&mut self) -> &mut MappingTable {
        &mut self.mapping
    }

    pub fn add_fields_mapping<I, K>(&mut self, additions: I)
    where
        I: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
    {
        self.mapping.add_fields_mapping(additions);
    }

    pub fn add_choices_mapping(&mut self, additions: &Map<String, Value>) {
        self.mapping.add_choices_mapping(additions);
    }

    pub fn field_id(&self, name: &str) -> Result<FieldKey, ClientError> {
        self.mapping.field_id(name)
    }

    pub fn field_name(&self, id: i64) -> FieldRef {
        self.mapping.field_name(id)
    }

    pub fn choice_id(&self, field: &str, choice: &str) -> Result<i64, ClientError> {
        self.mapping.choice_id(field, choice)
    }

    pub fn choice_name(
        &self,
        field: impl Into<FieldRef>,
        choice_id: i64,
    ) -> Result<ChoiceRef, ClientError> {
        self.mapping.choice_name(field, choice_id)
    }

    /// Sign and serialize a request for `path`, relative to the base URL.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        body: &Body,
    ) -> Result<HttpRequest, ClientError> {
        let body = serde_json::to_string(body).map_err(|e| ClientError::Serialization {
            message: e.to_string(),
        })?;
        Ok(HttpRequest {
            method,
            url: format!("{}{path}", self.base_url),
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                (WSSE_HEADER.to_string(), self.signer.signature()),
            ],
            body,
        })
    }

    /// Decode a raw reply into an envelope. The HTTP status is ignored.
    pub fn parse_response(&self, response: &HttpResponse) -> crate::Result<ResponseEnvelope> {
        envelope::decode(&response.body, self.max_depth)
    }
}

impl<T: HttpTransport> EmarsysClient<T> {
    /// Build, execute and parse one request.
    pub fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: &Body,
    ) -> crate::Result<ResponseEnvelope> {
        let request = self.build_request(method, path, body)?;
        debug!(method = %request.method, url = %request.url, "sending request");

        let response = self.transport.execute(&request).map_err(|err| {
            warn!(url = %request.url, error = %err, "transport failure");
            EmarsysError::from(err)
        })?;
        debug!(status = response.status, bytes = response.body.len(), "received response");

        self.parse_response(&response)
    }

    /// `send` with the method and path of `endpoint`.
    pub fn call(&self, endpoint: &Endpoint, body: &Body) -> crate::Result<ResponseEnvelope> {
        self.send(endpoint.method(), &endpoint.path(), body)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::error::ServerError;
    use crate::http::TransportError;
    use crate::signer::WsseToken;
    use serde_json::json;

    /// Records every request and answers with a canned reply.
    struct Canned {
        reply: Result<HttpResponse, TransportError>,
        seen: RefCell<Vec<HttpRequest>>,
    }

    impl Canned {
        fn ok(body: &str) -> Self {
            Self {
                reply: Ok(HttpResponse::new(200, body)),
                seen: RefCell::new(Vec::new()),
            }
        }

        fn failing(err: TransportError) -> Self {
            Self {
                reply: Err(err),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl HttpTransport for Canned {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.borrow_mut().push(request.clone());
            self.reply.clone()
        }
    }

    fn client<T>(transport: T) -> EmarsysClient<T> {
        let config = ClientConfig::new("acme001", "s3cr3t").with_base_url("http://localhost:3000/api/v2");
        EmarsysClient::new(config, transport).unwrap()
    }

    fn body(value: Value) -> Body {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn build_request_joins_url_and_signs() {
        let req = client(()).build_request(HttpMethod::Get, "settings", &Body::new()).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/api/v2/settings");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body, "{}");

        let token = WsseToken::parse(req.header("x-wsse").unwrap()).unwrap();
        assert_eq!(token.username, "acme001");
    }

    #[test]
    fn build_request_serializes_body() {
        let req = client(())
            .build_request(HttpMethod::Post, "contact", &body(json!({"3": "a@b.c"})))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        let sent: Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(sent, json!({"3": "a@b.c"}));
    }

    #[test]
    fn parse_response_uses_configured_depth() {
        let config = ClientConfig::new("acme001", "s3cr3t").with_max_depth(512);
        let client = EmarsysClient::new(config, ()).unwrap();
        let body = format!(
            r#"{{"replyCode":0,"replyText":"OK","data":{}1{}}}"#,
            "[".repeat(199),
            "]".repeat(199)
        );

        let envelope = client.parse_response(&HttpResponse::new(200, body)).unwrap();
        assert!(envelope.is_ok());
        assert!(envelope.data().is_array());
    }

    #[test]
    fn bundled_mapping_is_loaded() {
        let client = client(());
        assert_eq!(client.field_id("email").unwrap(), FieldKey::Id(3));
        assert_eq!(client.choice_id("gender", "Male").unwrap(), 1);
        assert_eq!(
            client.choice_name(5_i64, 2).unwrap(),
            ChoiceRef::Label("Female".to_string())
        );
    }

    #[test]
    fn configured_mapping_replaces_bundled_fields() {
        let fields = [("loyalty_tier".to_string(), 7001_i64)].into_iter().collect();
        let config = ClientConfig::new("u", "s").with_fields_mapping(fields);
        let client = EmarsysClient::new(config, ()).unwrap();
        assert_eq!(client.field_id("loyalty_tier").unwrap(), FieldKey::Id(7001));
        assert!(client.field_id("email").is_err());
    }

    #[test]
    fn send_returns_non_zero_reply_as_envelope() {
        let transport = Canned::ok(r#"{"replyCode":2008,"replyText":"No contact found","data":""}"#);
        let client = client(transport);
        let envelope = client.send(HttpMethod::Get, "contact/3=x", &Body::new()).unwrap();
        assert_eq!(envelope.reply_code(), ResponseEnvelope::REPLY_CODE_CONTACT_NOT_FOUND);
        assert_eq!(client.transport().seen.borrow().len(), 1);
    }

    #[test]
    fn call_uses_endpoint_method_and_path() {
        let client = client(Canned::ok(r#"{"replyCode":0,"replyText":"OK","data":[]}"#));
        client
            .call(&Endpoint::UpdateContactOrCreate, &body(json!({"key_id": 3})))
            .unwrap();
        let seen = client.transport().seen.borrow();
        assert_eq!(seen[0].method, HttpMethod::Put);
        assert_eq!(
            seen[0].url,
            "http://localhost:3000/api/v2/contact/?create_if_not_exists=1"
        );
    }

    #[test]
    fn network_failure_is_a_server_error() {
        let client = client(Canned::failing(TransportError::Network("connection refused".into())));
        let err = client.send(HttpMethod::Get, "settings", &Body::new()).unwrap_err();
        assert_eq!(
            err,
            EmarsysError::Server(ServerError::Transport {
                message: "connection refused".to_string()
            })
        );
    }

    #[test]
    fn protocol_failure_is_a_client_error() {
        let client = client(Canned::failing(TransportError::Protocol("bad uri".into())));
        let err = client.send(HttpMethod::Get, "settings", &Body::new()).unwrap_err();
        assert!(err.is_client());
    }

    #[test]
    fn parse_response_ignores_status() {
        let response = HttpResponse::new(401, r#"{"replyCode":1,"replyText":"Unauthorized"}"#);
        let envelope = client(()).parse_response(&response).unwrap();
        assert_eq!(envelope.reply_code(), 1);
        assert_eq!(envelope.data(), &json!({}));
    }

    #[test]
    fn parse_response_rejects_bad_json() {
        let response = HttpResponse::new(200, "not json");
        let err = client(()).parse_response(&response).unwrap_err();
        assert!(matches!(err, EmarsysError::Server(ServerError::Decode { .. })));
    }
}
