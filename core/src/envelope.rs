//! The response envelope shared by every Emarsys endpoint:
//!
//! ```json
//! { "replyCode": 0, "replyText": "OK", "data": {} }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ClientError, ServerError};
use crate::mapping::json_id;

/// Nesting limit applied when no other is configured.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Decoded reply. `reply_code` 0 means success.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    reply_code: i64,
    reply_text: String,
    data: Value,
}

impl ResponseEnvelope {
    pub const REPLY_CODE_OK: i64 = 0;
    pub const REPLY_CODE_INTERNAL_ERROR: i64 = 1;
    pub const REPLY_CODE_INVALID_KEY_FIELD: i64 = 2004;
    pub const REPLY_CODE_MISSING_KEY_FIELD: i64 = 2005;
    pub const REPLY_CODE_CONTACT_NOT_FOUND: i64 = 2008;
    pub const REPLY_CODE_NON_UNIQUE_RESULT: i64 = 2010;
    pub const REPLY_CODE_INVALID_STATUS: i64 = 6003;
    pub const REPLY_CODE_INVALID_DATA: i64 = 10001;

    /// Validate a decoded JSON value.
    ///
    /// `replyCode` (an integer, or digits in a string) and `replyText` must be
    /// present and non-null; `data` defaults to an empty object.
    pub fn from_value(value: Value) -> Result<Self, ClientError> {
        let Value::Object(mut object) = value else {
            return Err(ClientError::InvalidEnvelope);
        };

        let reply_code = object
            .get("replyCode")
            .and_then(json_id)
            .ok_or(ClientError::InvalidEnvelope)?;
        let reply_text = match object.remove("replyText") {
            Some(Value::String(text)) => text,
            Some(Value::Null) | None => return Err(ClientError::InvalidEnvelope),
            Some(other) => other.to_string(),
        };
        let data = match object.remove("data") {
            Some(Value::Null) | None => Value::Object(Map::new()),
            Some(data) => data,
        };

        Ok(Self {
            reply_code,
            reply_text,
            data,
        })
    }

    pub fn reply_code(&self) -> i64 {
        self.reply_code
    }

    pub fn reply_text(&self) -> &str {
        &self.reply_text
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }

    pub fn is_ok(&self) -> bool {
        self.reply_code == Self::REPLY_CODE_OK
    }
}

/// Decode raw response bytes into an envelope.
///
/// Nesting deeper than `max_depth` is a client error; any other decode
/// failure, or a body that decodes to a scalar, is a server error.
pub fn decode(body: &[u8], max_depth: usize) -> crate::Result<ResponseEnvelope> {
    if exceeds_depth(body, max_depth) {
        warn!(max_depth, "response nesting exceeds limit");
        return Err(ClientError::DepthExceeded.into());
    }

    // The pre-scan above bounds nesting, so serde_json's fixed limit of 128
    // is switched off and a larger configured limit takes effect.
    let mut de = serde_json::Deserializer::from_slice(body);
    de.disable_recursion_limit();
    let value = Value::deserialize(&mut de)
        .and_then(|value| de.end().map(|()| value))
        .map_err(|err| {
            warn!(error = %err, "response is not valid JSON");
            ServerError::Decode {
                message: err.to_string(),
            }
        })?;

    match value {
        Value::Object(_) | Value::Array(_) => Ok(ResponseEnvelope::from_value(value)?),
        Value::Null => Err(ServerError::Decode {
            message: "response decoded to null".to_string(),
        }
        .into()),
        scalar => Err(ServerError::NotAStructure {
            body: scalar.to_string(),
        }
        .into()),
    }
}

/// Whether `body` opens more than `max_depth` nested arrays/objects.
fn exceeds_depth(body: &[u8], max_depth: usize) -> bool {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for &byte in body {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' | b'{' => {
                depth += 1;
                if depth > max_depth {
                    return true;
                }
            }
            b']' | b'}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmarsysError;
    use serde_json::json;

    #[test]
    fn builds_from_complete_object() {
        let envelope =
            ResponseEnvelope::from_value(json!({"replyCode": 0, "replyText": "OK", "data": {"id": 42}}))
                .unwrap();
        assert_eq!(envelope.reply_code(), 0);
        assert_eq!(envelope.reply_text(), "OK");
        assert_eq!(envelope.data(), &json!({"id": 42}));
        assert!(envelope.is_ok());
    }

    #[test]
    fn missing_reply_text_is_invalid() {
        let err = ResponseEnvelope::from_value(json!({"replyCode": 0})).unwrap_err();
        assert_eq!(err, ClientError::InvalidEnvelope);
    }

    #[test]
    fn null_reply_code_is_invalid() {
        let err = ResponseEnvelope::from_value(json!({"replyCode": null, "replyText": "OK"})).unwrap_err();
        assert_eq!(err, ClientError::InvalidEnvelope);
    }

    #[test]
    fn data_defaults_to_empty_object() {
        let envelope = ResponseEnvelope::from_value(json!({"replyCode": 1, "replyText": "Error"})).unwrap();
        assert_eq!(envelope.data(), &json!({}));
        assert!(!envelope.is_ok());
    }

    #[test]
    fn string_reply_code_is_accepted() {
        let envelope =
            ResponseEnvelope::from_value(json!({"replyCode": "2008", "replyText": "No contact"})).unwrap();
        assert_eq!(envelope.reply_code(), ResponseEnvelope::REPLY_CODE_CONTACT_NOT_FOUND);
    }

    #[test]
    fn serializes_with_wire_names() {
        let envelope =
            ResponseEnvelope::from_value(json!({"replyCode": 0, "replyText": "OK", "data": []})).unwrap();
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({"replyCode": 0, "replyText": "OK", "data": []})
        );
    }

    #[test]
    fn decode_rejects_deep_nesting_as_client_error() {
        let body = format!("{}{}", "[".repeat(11), "]".repeat(11));
        let err = decode(body.as_bytes(), 10).unwrap_err();
        assert_eq!(err, EmarsysError::Client(ClientError::DepthExceeded));
    }

    #[test]
    fn decode_default_limit_reports_depth() {
        let body = format!("{}{}", "[".repeat(300), "]".repeat(300));
        let err = decode(body.as_bytes(), DEFAULT_MAX_DEPTH).unwrap_err();
        assert_eq!(err, EmarsysError::Client(ClientError::DepthExceeded));
    }

    fn nested_envelope(depth: usize) -> String {
        // The envelope object itself is one level.
        let arrays = depth - 1;
        format!(
            r#"{{"replyCode":0,"replyText":"OK","data":{}1{}}}"#,
            "[".repeat(arrays),
            "]".repeat(arrays)
        )
    }

    #[test]
    fn configured_limit_above_128_is_honoured() {
        let envelope = decode(nested_envelope(200).as_bytes(), 512).unwrap();
        assert!(envelope.is_ok());

        let mut inner = envelope.data();
        for _ in 0..198 {
            inner = &inner[0];
        }
        assert_eq!(inner, &json!([1]));
    }

    #[test]
    fn configured_limit_is_exact() {
        assert!(decode(nested_envelope(300).as_bytes(), 300).is_ok());
        let err = decode(nested_envelope(301).as_bytes(), 300).unwrap_err();
        assert_eq!(err, EmarsysError::Client(ClientError::DepthExceeded));
    }

    #[test]
    fn brackets_inside_strings_do_not_count() {
        let body = r#"{"replyCode":0,"replyText":"[[[[{{{{","data":{"note":"\"[[["}}"#;
        let envelope = decode(body.as_bytes(), 2).unwrap();
        assert_eq!(envelope.reply_text(), "[[[[{{{{");
    }

    #[test]
    fn garbage_is_a_server_decode_error() {
        let err = decode(b"<html>502 Bad Gateway</html>", DEFAULT_MAX_DEPTH).unwrap_err();
        assert!(matches!(err, EmarsysError::Server(ServerError::Decode { .. })));
    }

    #[test]
    fn empty_body_is_a_server_decode_error() {
        let err = decode(b"", DEFAULT_MAX_DEPTH).unwrap_err();
        assert!(matches!(err, EmarsysError::Server(ServerError::Decode { .. })));
    }

    #[test]
    fn scalar_is_not_a_structure() {
        let err = decode(b"42", DEFAULT_MAX_DEPTH).unwrap_err();
        assert_eq!(
            err,
            EmarsysError::Server(ServerError::NotAStructure {
                body: "42".to_string()
            })
        );
    }

    #[test]
    fn array_decodes_but_is_not_an_envelope() {
        let err = decode(b"[1,2]", DEFAULT_MAX_DEPTH).unwrap_err();
        assert_eq!(err, EmarsysError::Client(ClientError::InvalidEnvelope));
    }
}
